use super::types::PocError;

/// Where in a verification run an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Before the run starts: configuration, CLI input, file access.
    Setup,
    /// While loading or type-declaring the POC definition.
    Definition,
    /// While binding the `set` block.
    Binding,
    /// While sending probes or evaluating rule verdicts.
    Probe,
}

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub stage: FailureStage,
}

impl PocError {
    /// Classify this error by type name and the stage of the run it aborted.
    /// Nothing is retried, so the stage only drives logging and exit codes.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            PocError::DefinitionLoad(_) => ErrorClassification {
                error_type: "DefinitionLoadError",
                stage: FailureStage::Definition,
            },
            PocError::TypeDeclaration { .. } => ErrorClassification {
                error_type: "TypeDeclarationError",
                stage: FailureStage::Definition,
            },
            PocError::ExpressionEval { .. } => ErrorClassification {
                error_type: "ExpressionEvalError",
                stage: if self.rule_index().is_some() {
                    FailureStage::Probe
                } else {
                    FailureStage::Binding
                },
            },
            PocError::ReverseAllocation(_) => ErrorClassification {
                error_type: "ReverseAllocationError",
                stage: FailureStage::Binding,
            },
            PocError::UrlParse { .. } => ErrorClassification {
                error_type: "UrlParseError",
                stage: FailureStage::Binding,
            },
            PocError::ProbeTransport { .. } => ErrorClassification {
                error_type: "ProbeTransportError",
                stage: FailureStage::Probe,
            },
            PocError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                stage: FailureStage::Setup,
            },
            PocError::InvalidTarget(_) => ErrorClassification {
                error_type: "InvalidTargetError",
                stage: FailureStage::Setup,
            },
            PocError::Io(_) => ErrorClassification {
                error_type: "IoError",
                stage: FailureStage::Setup,
            },
            PocError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                stage: FailureStage::Setup,
            },
            PocError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                stage: FailureStage::Definition,
            },
        }
    }
}
