//! Declarative vulnerability verification.
//!
//! A POC definition binds variables (`set`), then sends a sequence of HTTP
//! probes (`rules`) whose responses are judged by small expressions. See
//! [`engine::Verifier`] for the entry point.

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod expr;
pub mod models;
pub mod poc;
pub mod reporting;

pub use engine::{VerificationOutcome, Verifier};
pub use errors::PocError;
pub use poc::{load_poc, PocDefinition};

/// Version with the git hash and build time embedded by `build.rs`.
pub fn build_info() -> String {
    format!(
        "{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("POCVERIFY_GIT_HASH").unwrap_or("dev"),
        option_env!("POCVERIFY_BUILD_TIMESTAMP").unwrap_or("unknown"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_starts_with_package_version() {
        let info = build_info();
        assert!(info.starts_with(env!("CARGO_PKG_VERSION")));
        assert!(info.contains(", built "));
    }
}
