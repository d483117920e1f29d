use std::collections::BTreeMap;
use crate::expr::{Activation, ResponseValue, Value};

/// Name under which the latest probe response is bound.
pub const RESPONSE_VAR: &str = "response";
/// Name under which the run's base request is bound.
pub const REQUEST_VAR: &str = "request";
/// `set` entry resolved after every other entry.
pub const PAYLOAD_VAR: &str = "payload";

/// Per-run variable bindings. Grows monotonically across all rules of a run
/// and is never shared between runs.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    values: BTreeMap<String, Value>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Replace the previous probe's response.
    pub fn set_response(&mut self, response: ResponseValue) {
        self.values.insert(RESPONSE_VAR.to_string(), Value::Response(response));
    }

    pub fn response(&self) -> Option<&ResponseValue> {
        match self.values.get(RESPONSE_VAR) {
            Some(Value::Response(r)) => Some(r),
            _ => None,
        }
    }

    /// Fold search captures in, overwriting earlier bindings of the same name.
    pub fn merge_captures(&mut self, captures: BTreeMap<String, String>) {
        for (name, text) in captures {
            self.values.insert(name, Value::String(text));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
        )
    }
}

impl Activation for ParameterSet {
    fn resolve(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}
