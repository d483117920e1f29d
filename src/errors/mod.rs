pub mod types;
pub mod classification;

pub use types::PocError;
pub use classification::{ErrorClassification, FailureStage};
