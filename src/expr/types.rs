use std::fmt;
use super::value::Value;

/// Type of a name as declared to the expression environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclType {
    Bool,
    Int,
    String,
    Bytes,
    List,
    Map,
    Url,
    Request,
    Response,
    Reverse,
    Dyn,
}

impl DeclType {
    /// Declared type of a runtime value. `Null` has none.
    pub fn of_value(value: &Value) -> Option<DeclType> {
        Some(match value {
            Value::Null => return None,
            Value::Bool(_) => DeclType::Bool,
            Value::Int(_) => DeclType::Int,
            Value::String(_) => DeclType::String,
            Value::Bytes(_) => DeclType::Bytes,
            Value::List(_) => DeclType::List,
            Value::Map(_) => DeclType::Map,
            Value::Url(_) => DeclType::Url,
            Value::Request(_) => DeclType::Request,
            Value::Response(_) => DeclType::Response,
            Value::Reverse(_) => DeclType::Reverse,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeclType::Bool => "bool",
            DeclType::Int => "int",
            DeclType::String => "string",
            DeclType::Bytes => "bytes",
            DeclType::List => "list",
            DeclType::Map => "map",
            DeclType::Url => "url",
            DeclType::Request => "request",
            DeclType::Response => "response",
            DeclType::Reverse => "reverse",
            DeclType::Dyn => "dyn",
        }
    }

    /// Static type of `self.field`, or an error if the type has no such field.
    pub fn field_type(&self, field: &str) -> Result<DeclType, String> {
        let found = match self {
            DeclType::Dyn | DeclType::Map => return Ok(DeclType::Dyn),
            DeclType::Response => match field {
                "status" => Some(DeclType::Int),
                "body" => Some(DeclType::Bytes),
                "headers" => Some(DeclType::Map),
                "content_type" => Some(DeclType::String),
                _ => None,
            },
            DeclType::Request => match field {
                "url" => Some(DeclType::Url),
                _ => None,
            },
            DeclType::Reverse => match field {
                "url" => Some(DeclType::Url),
                "domain" | "ip" | "port" => Some(DeclType::String),
                _ => None,
            },
            DeclType::Url => match field {
                "scheme" | "host" | "domain" | "port" | "path" | "query" | "fragment" => {
                    Some(DeclType::String)
                }
                _ => None,
            },
            DeclType::Bool | DeclType::Int | DeclType::String | DeclType::Bytes | DeclType::List => {
                return Err(format!("type '{}' does not support field selection", self.name()));
            }
        };
        found.ok_or_else(|| format!("type '{}' has no field '{}'", self.name(), field))
    }
}

impl fmt::Display for DeclType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
