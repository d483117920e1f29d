use std::collections::BTreeMap;
use std::fmt;
use serde::{Deserialize, Serialize};

/// A parsed URL as seen by expressions. Converts back to its canonical text
/// with `Display`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlValue {
    inner: url::Url,
}

impl UrlValue {
    pub fn parse(text: &str) -> Result<Self, url::ParseError> {
        url::Url::parse(text.trim()).map(|inner| Self { inner })
    }

    pub fn scheme(&self) -> &str {
        self.inner.scheme()
    }

    /// Host including a non-default port, e.g. `example.com:8080`.
    pub fn host(&self) -> String {
        match (self.inner.host_str(), self.inner.port()) {
            (Some(h), Some(p)) => format!("{}:{}", h, p),
            (Some(h), None) => h.to_string(),
            _ => String::new(),
        }
    }

    /// Host without the port.
    pub fn domain(&self) -> &str {
        self.inner.host_str().unwrap_or("")
    }

    pub fn port(&self) -> String {
        self.inner.port_or_known_default()
            .map(|p| p.to_string())
            .unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.inner.path()
    }

    pub fn query(&self) -> &str {
        self.inner.query().unwrap_or("")
    }

    pub fn fragment(&self) -> &str {
        self.inner.fragment().unwrap_or("")
    }

    pub fn is_ip(&self) -> bool {
        matches!(self.inner.host(), Some(url::Host::Ipv4(_)) | Some(url::Host::Ipv6(_)))
    }

    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }
}

impl fmt::Display for UrlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.inner.as_str())
    }
}

/// The request side of a probe: currently just the run's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestValue {
    pub url: UrlValue,
}

/// An out-of-band callback endpoint allocated for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseTarget {
    pub url: UrlValue,
}

impl ReverseTarget {
    pub fn domain(&self) -> &str {
        self.url.domain()
    }

    /// The callback host when it is a literal IP address, empty otherwise.
    pub fn ip(&self) -> &str {
        if self.url.is_ip() { self.url.domain() } else { "" }
    }
}

/// Observed result of the most recent probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseValue {
    pub status: i64,
    #[serde(skip)]
    pub body: Vec<u8>,
    pub headers: BTreeMap<String, String>,
    pub content_type: String,
}

/// Dynamically typed value flowing between the binder, the templates and
/// the expression runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Url(UrlValue),
    Request(RequestValue),
    Response(ResponseValue),
    Reverse(ReverseTarget),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Url(_) => "url",
            Value::Request(_) => "request",
            Value::Response(_) => "response",
            Value::Reverse(_) => "reverse",
        }
    }

    /// Borrow string or bytes content as raw bytes.
    pub fn as_byte_slice(&self) -> Option<&[u8]> {
        match self {
            Value::String(s) => Some(s.as_bytes()),
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// JSON projection used for diagnostics output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Response(r) => serde_json::json!({
                "status": r.status,
                "content_type": r.content_type,
                "headers": r.headers,
                "body_len": r.body.len(),
            }),
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

/// Default string form, used for template substitution and for the
/// `"false"` verdict comparison.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("map[")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}:{}", k, v)?;
                }
                f.write_str("]")
            }
            Value::Url(u) => write!(f, "{}", u),
            Value::Request(r) => write!(f, "{}", r.url),
            Value::Response(r) => write!(f, "{}", r.status),
            Value::Reverse(r) => write!(f, "{}", r.url),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}
