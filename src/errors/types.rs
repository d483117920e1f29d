use thiserror::Error;
use crate::expr::ExprError;

#[derive(Debug, Error)]
pub enum PocError {
    #[error("Definition load error: {0}")]
    DefinitionLoad(String),

    #[error("Type declaration error for '{name}': {reason}")]
    TypeDeclaration { name: String, reason: String },

    #[error("Expression error in {name}: {cause}")]
    ExpressionEval { name: String, cause: ExprError },

    #[error("Reverse allocation error: {0}")]
    ReverseAllocation(String),

    #[error("URL parse error for '{input}': {reason}")]
    UrlParse { input: String, reason: String },

    #[error("Probe transport error in rules[{rule}]: {message}")]
    ProbeTransport { rule: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PocError {
    pub fn expression(name: impl Into<String>, cause: ExprError) -> Self {
        PocError::ExpressionEval { name: name.into(), cause }
    }

    /// Label used when an expression failure belongs to a rule rather than a variable.
    pub fn rule_label(index: usize) -> String {
        format!("rules[{}]", index)
    }

    /// Index of the rule a probe-stage error belongs to.
    pub fn rule_index(&self) -> Option<usize> {
        match self {
            PocError::ProbeTransport { rule, .. } => Some(*rule),
            PocError::ExpressionEval { name, .. } => name
                .strip_prefix("rules[")?
                .strip_suffix(']')?
                .parse()
                .ok(),
            _ => None,
        }
    }

    /// Requests that completed before this error ended the run. A rule whose
    /// expression failed had already received its response.
    pub fn rules_executed(&self) -> usize {
        match (self, self.rule_index()) {
            (PocError::ProbeTransport { .. }, Some(index)) => index,
            (_, Some(index)) => index + 1,
            (_, None) => 0,
        }
    }
}
