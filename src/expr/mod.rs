//! Embedded expression language used by POC `set` entries and rule verdicts.
//!
//! A CEL-flavoured subset: literals, field selection, method calls, the usual
//! arithmetic/comparison/logical operators and a fixed builtin library. Domain
//! types (`Request`, `Response`, `Reverse`, `Url`) are first-class values.

pub mod check;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod types;
pub mod value;

use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

pub use functions::NEW_REVERSE_CALL;
pub use parser::Expr;
pub use types::DeclType;
pub use value::{RequestValue, ResponseValue, ReverseTarget, UrlValue, Value};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("syntax error at {pos}: {message}")]
    Syntax { pos: usize, message: String },

    #[error("check error: {0}")]
    Check(String),

    #[error("evaluation error: {0}")]
    Runtime(String),
}

/// Variable bindings visible to an evaluation.
pub trait Activation {
    fn resolve(&self, name: &str) -> Option<&Value>;
}

impl Activation for HashMap<String, Value> {
    fn resolve(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl Activation for BTreeMap<String, Value> {
    fn resolve(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// A parsed expression, ready to be checked and evaluated any number of times.
#[derive(Debug, Clone)]
pub struct Program {
    ast: Expr,
}

impl Program {
    pub fn compile(source: &str) -> Result<Self, ExprError> {
        Ok(Self { ast: parser::parse(source)? })
    }

    pub fn check(&self, resolve: &dyn Fn(&str) -> Option<DeclType>) -> Result<DeclType, ExprError> {
        check::check(&self.ast, resolve)
    }

    pub fn evaluate(&self, vars: &dyn Activation) -> Result<Value, ExprError> {
        eval::evaluate(&self.ast, vars)
    }
}
