use std::path::Path;
use std::sync::Arc;
use serde::Serialize;
use crate::errors::PocError;
use crate::poc::{load_poc, PocDefinition};
use super::binder::ParameterBinder;
use super::bridge::TypeRegistry;
use super::env::Environment;
use super::params::ParameterSet;
use super::pipeline::{ProbePipeline, RunContext, RunState};
use super::reverse::ReverseFactory;
use super::transport::HttpTransport;
use tracing::{info, warn};

/// Result of a run that reached a verdict.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationOutcome {
    pub poc: String,
    pub target: String,
    pub matched: bool,
    pub state: RunState,
    pub rules_executed: usize,
    #[serde(skip)]
    pub params: ParameterSet,
}

/// Entry point for verifying POCs against targets.
///
/// A `Verifier` is cheap to clone and safe to share between tasks: every
/// call builds its own bindings, environment and rule copies, and only the
/// transport and reverse factory are shared.
#[derive(Clone)]
pub struct Verifier {
    transport: Arc<dyn HttpTransport>,
    reverse: Arc<dyn ReverseFactory>,
}

impl Verifier {
    pub fn new(transport: Arc<dyn HttpTransport>, reverse: Arc<dyn ReverseFactory>) -> Self {
        Self { transport, reverse }
    }

    /// Load the POC at `poc_path` and verify it against `target`.
    pub async fn verify(&self, poc_path: &Path, target: &str) -> Result<bool, PocError> {
        let poc = load_poc(poc_path).await?;
        Ok(self.verify_definition(&poc, target).await?.matched)
    }

    pub async fn verify_definition(
        &self,
        poc: &PocDefinition,
        target: &str,
    ) -> Result<VerificationOutcome, PocError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(PocError::InvalidTarget("target URL is empty".into()));
        }
        info!(poc = %poc.name, target = %target, "Verifying");

        let mut registry = TypeRegistry::for_poc(poc)?;
        let binder = ParameterBinder::new(self.reverse.as_ref());
        let mut params = binder.prepare(poc, target).await?;
        for (name, value) in params.iter() {
            registry.declare_value(name, value)?;
        }
        let env = Environment::new(registry);
        binder.resolve(poc, &env, &mut params)?;

        let mut ctx = RunContext { target: target.to_string(), params, env };
        let mut pipeline = ProbePipeline::new(self.transport.as_ref());
        let matched = match pipeline.execute(&mut ctx, poc.rules_for_run()).await {
            Ok(matched) => matched,
            Err(e) => {
                warn!(poc = %poc.name, target = %target, error = %e, "Verification aborted");
                return Err(e);
            }
        };

        info!(
            poc = %poc.name,
            target = %target,
            matched,
            rules_executed = pipeline.rules_executed(),
            "Verification finished"
        );

        Ok(VerificationOutcome {
            poc: poc.name.clone(),
            target: target.to_string(),
            matched,
            state: pipeline.state(),
            rules_executed: pipeline.rules_executed(),
            params: ctx.params,
        })
    }
}
