use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use crate::errors::PocError;
use crate::expr::ResponseValue;
use tracing::debug;

/// Per-probe timeout. Fixed; not configurable.
pub const PROBE_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_USER_AGENT: &str = concat!("pocverify/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// A fully substituted request, ready to send.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub method: String,
    pub url: String,
    pub body: Vec<u8>,
    pub headers: HashMap<String, String>,
    pub no_follow_redirects: bool,
    pub timeout: Duration,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn perform(&self, request: ProbeRequest) -> Result<ResponseValue, TransportError>;
}

/// `reqwest`-backed transport. Redirect policy is per client, so one client
/// is kept for each policy.
pub struct ReqwestTransport {
    follow: Client,
    no_follow: Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> Result<Self, PocError> {
        let build = |policy: reqwest::redirect::Policy| {
            Client::builder()
                .user_agent(user_agent)
                .redirect(policy)
                .build()
                .map_err(|e| PocError::Config(format!("Failed to build HTTP client: {}", e)))
        };
        Ok(Self {
            follow: build(reqwest::redirect::Policy::limited(10))?,
            no_follow: build(reqwest::redirect::Policy::none())?,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn perform(&self, request: ProbeRequest) -> Result<ResponseValue, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.trim().to_uppercase().as_bytes())
            .map_err(|_| TransportError(format!("invalid HTTP method '{}'", request.method)))?;
        let client = if request.no_follow_redirects { &self.no_follow } else { &self.follow };

        debug!(method = %method, url = %request.url, "Sending probe");
        let mut builder = client.request(method, &request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder.send().await.map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16() as i64;
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            headers.entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
        let content_type = headers.get("content-type").cloned().unwrap_or_default();
        let body = response.bytes().await.map_err(|e| TransportError(e.to_string()))?;

        Ok(ResponseValue {
            status,
            body: body.to_vec(),
            headers,
            content_type,
        })
    }
}
