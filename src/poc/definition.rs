use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A proof-of-check definition as loaded from YAML.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PocDefinition {
    #[serde(default)]
    pub name: String,
    /// Variable name -> expression source. Resolution order is decided by the
    /// binder, never by this map.
    #[serde(default)]
    pub set: HashMap<String, String>,
    /// Executed in sequence order.
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub detail: Option<PocDetail>,
}

impl PocDefinition {
    /// Rules for a single run. Substitution rewrites rules in place, so every
    /// run works on its own copy.
    pub fn rules_for_run(&self) -> Vec<Rule> {
        self.rules.clone()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Rule {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,
    /// Regex with named groups; captures feed later rules.
    #[serde(default)]
    pub search: Option<String>,
    pub expression: String,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_follow_redirects() -> bool {
    true
}

impl Rule {
    pub fn search_pattern(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PocDetail {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
}
