use crate::expr::{DeclType, ExprError, Program, Value};
use super::bridge::TypeRegistry;
use super::params::ParameterSet;

/// Expression environment for one verification run, closed over the type
/// declarations of that run's POC.
#[derive(Debug, Clone)]
pub struct Environment {
    registry: TypeRegistry,
}

impl Environment {
    pub fn new(registry: TypeRegistry) -> Self {
        Self { registry }
    }

    /// Parse and type-check `source`. A bound value's own type wins over its
    /// declaration; names that are neither bound nor declared are rejected.
    pub fn compile(&self, source: &str, params: &ParameterSet) -> Result<Program, ExprError> {
        let program = Program::compile(source)?;
        program.check(&|name: &str| {
            params.get(name)
                .and_then(DeclType::of_value)
                .or_else(|| self.registry.get(name))
        })?;
        Ok(program)
    }

    pub fn evaluate(&self, source: &str, params: &ParameterSet) -> Result<Value, ExprError> {
        self.compile(source, params)?.evaluate(params)
    }
}
