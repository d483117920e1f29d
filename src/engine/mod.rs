//! POC verification engine: variable binding, probe sequencing and verdicts.

pub mod binder;
pub mod bridge;
pub mod env;
pub mod extract;
pub mod params;
pub mod pipeline;
pub mod reverse;
pub mod template;
pub mod transport;
pub mod verifier;

pub use binder::ParameterBinder;
pub use bridge::TypeRegistry;
pub use env::Environment;
pub use params::ParameterSet;
pub use pipeline::{ProbePipeline, RunContext, RunState};
pub use reverse::{ReverseFactory, StaticReverseFactory};
pub use transport::{HttpTransport, ProbeRequest, ReqwestTransport, TransportError, DEFAULT_USER_AGENT, PROBE_TIMEOUT_SECS};
pub use verifier::{VerificationOutcome, Verifier};
