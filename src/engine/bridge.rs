use std::collections::BTreeMap;
use crate::errors::PocError;
use crate::expr::{DeclType, Value, NEW_REVERSE_CALL};
use crate::poc::PocDefinition;
use super::params::{REQUEST_VAR, RESPONSE_VAR};
use tracing::debug;

/// Type declarations handed to the expression environment. Must be complete
/// before the environment is built.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    declarations: BTreeMap<String, DeclType>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        let mut declarations = BTreeMap::new();
        declarations.insert(REQUEST_VAR.to_string(), DeclType::Request);
        declarations.insert(RESPONSE_VAR.to_string(), DeclType::Response);
        Self { declarations }
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare every `set` entry of a POC.
    pub fn for_poc(poc: &PocDefinition) -> Result<Self, PocError> {
        let mut registry = Self::new();
        for (name, source) in &poc.set {
            registry.declare_source(name, source)?;
        }
        Ok(registry)
    }

    pub fn declare_source(&mut self, name: &str, source: &str) -> Result<DeclType, PocError> {
        let decl = infer_decl_type(source).map_err(|reason| PocError::TypeDeclaration {
            name: name.to_string(),
            reason,
        })?;
        // request/response keep their built-in declarations
        if name != REQUEST_VAR && name != RESPONSE_VAR {
            debug!(variable = %name, decl = %decl, "Declared variable");
            self.declarations.insert(name.to_string(), decl);
        }
        Ok(decl)
    }

    /// Declare a value bound before the environment exists. The runtime type
    /// replaces whatever was inferred from the source text.
    pub fn declare_value(&mut self, name: &str, value: &Value) -> Result<DeclType, PocError> {
        let decl = DeclType::of_value(value).ok_or_else(|| PocError::TypeDeclaration {
            name: name.to_string(),
            reason: format!("no declared type for {} value", value.type_name()),
        })?;
        self.declarations.insert(name.to_string(), decl);
        Ok(decl)
    }

    pub fn get(&self, name: &str) -> Option<DeclType> {
        self.declarations.get(name).copied()
    }
}

/// Declared type for a `set` entry, inferred from its source text.
/// Selections ending in a URL are declared as strings because the binder
/// canonicalizes URL results to text.
pub fn infer_decl_type(source: &str) -> Result<DeclType, String> {
    let source = source.trim();
    if source.is_empty() {
        return Err("empty expression".into());
    }
    if source == NEW_REVERSE_CALL {
        return Ok(DeclType::Reverse);
    }
    if source == REQUEST_VAR {
        return Ok(DeclType::Request);
    }
    if source == RESPONSE_VAR {
        return Ok(DeclType::Response);
    }
    if source == "true" || source == "false" {
        return Ok(DeclType::Bool);
    }
    if source.parse::<i64>().is_ok()
        || ["randomInt(", "int(", "size("].iter().any(|p| source.starts_with(p))
    {
        return Ok(DeclType::Int);
    }
    if ["b\"", "b'", "bytes(", "base64Decode("].iter().any(|p| source.starts_with(p)) {
        return Ok(DeclType::Bytes);
    }
    Ok(DeclType::String)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_builtin_shapes() {
        assert_eq!(infer_decl_type("newReverse()").unwrap(), DeclType::Reverse);
        assert_eq!(infer_decl_type("randomInt(100, 200)").unwrap(), DeclType::Int);
        assert_eq!(infer_decl_type("42").unwrap(), DeclType::Int);
        assert_eq!(infer_decl_type("randomLowercase(8)").unwrap(), DeclType::String);
        assert_eq!(infer_decl_type("request.url").unwrap(), DeclType::String);
        assert_eq!(infer_decl_type("b\"\\x00\"").unwrap(), DeclType::Bytes);
        assert_eq!(infer_decl_type("request").unwrap(), DeclType::Request);
        assert_eq!(infer_decl_type("false").unwrap(), DeclType::Bool);
    }

    #[test]
    fn test_empty_source_fails() {
        assert!(infer_decl_type("   ").is_err());
    }

    #[test]
    fn test_for_poc_declares_every_entry() {
        let mut poc = PocDefinition::default();
        poc.set.insert("r1".into(), "randomInt(1, 9)".into());
        poc.set.insert("reverse".into(), "newReverse()".into());
        let registry = TypeRegistry::for_poc(&poc).unwrap();
        assert_eq!(registry.get("r1"), Some(DeclType::Int));
        assert_eq!(registry.get("reverse"), Some(DeclType::Reverse));
        assert_eq!(registry.get("response"), Some(DeclType::Response));
    }

    #[test]
    fn test_for_poc_reports_offending_name() {
        let mut poc = PocDefinition::default();
        poc.set.insert("broken".into(), "".into());
        match TypeRegistry::for_poc(&poc).unwrap_err() {
            PocError::TypeDeclaration { name, .. } => assert_eq!(name, "broken"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_builtin_declarations_are_kept() {
        let mut registry = TypeRegistry::new();
        registry.declare_source("response", "1").unwrap();
        assert_eq!(registry.get("response"), Some(DeclType::Response));
    }

    #[test]
    fn test_declare_value_rejects_null() {
        let mut registry = TypeRegistry::new();
        assert!(registry.declare_value("x", &Value::Null).is_err());
        assert_eq!(registry.declare_value("y", &Value::Int(1)).unwrap(), DeclType::Int);
    }
}
