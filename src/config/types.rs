use serde::{Deserialize, Serialize};

/// Default number of concurrent verification runs.
pub const DEFAULT_WORKERS: usize = 8;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PocConfig {
    pub reverse: Option<ReverseConfig>,
    pub http: Option<HttpConfig>,
    pub scan: Option<ScanConfig>,
}

/// Out-of-band callback settings for blind checks.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ReverseConfig {
    /// Base URL of a listener reachable from targets. Each allocation appends
    /// a random path token.
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct HttpConfig {
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ScanConfig {
    pub workers: Option<usize>,
}

impl PocConfig {
    pub fn reverse_url(&self) -> Option<&str> {
        self.reverse.as_ref()?.url.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.http.as_ref()?.user_agent.as_deref()
    }

    pub fn workers(&self) -> Option<usize> {
        self.scan.as_ref()?.workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let config = PocConfig::default();
        assert!(config.reverse_url().is_none());
        assert!(config.user_agent().is_none());
        assert!(config.workers().is_none());
    }

    #[test]
    fn test_deserialize_all_sections() {
        let config: PocConfig = serde_yaml::from_str(
            "reverse:\n  url: http://cb.example.net\nhttp:\n  user_agent: probe/1\nscan:\n  workers: 4\n",
        )
        .unwrap();
        assert_eq!(config.reverse_url(), Some("http://cb.example.net"));
        assert_eq!(config.user_agent(), Some("probe/1"));
        assert_eq!(config.workers(), Some(4));
    }

    #[test]
    fn test_partial_sections() {
        let config: PocConfig = serde_yaml::from_str("scan: {}\n").unwrap();
        assert!(config.scan.is_some());
        assert!(config.workers().is_none());
    }
}
