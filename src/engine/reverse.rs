use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use crate::errors::PocError;

/// Provisions externally reachable callback URLs for blind checks. Shared by
/// concurrent runs.
#[async_trait]
pub trait ReverseFactory: Send + Sync {
    async fn allocate(&self) -> Result<String, PocError>;
}

/// Derives a fresh callback URL per allocation from a configured base URL
/// (for example a self-hosted listener) by appending a random path token.
#[derive(Debug, Clone, Default)]
pub struct StaticReverseFactory {
    base: Option<String>,
}

impl StaticReverseFactory {
    pub fn new(base: Option<String>) -> Self {
        Self { base: base.filter(|b| !b.trim().is_empty()) }
    }
}

#[async_trait]
impl ReverseFactory for StaticReverseFactory {
    async fn allocate(&self) -> Result<String, PocError> {
        let base = self.base.as_deref().ok_or_else(|| {
            PocError::ReverseAllocation("no reverse callback URL configured".into())
        })?;
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(|c| (c as char).to_ascii_lowercase())
            .collect();
        Ok(format!("{}/{}", base.trim().trim_end_matches('/'), token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allocations_are_distinct() {
        let factory = StaticReverseFactory::new(Some("http://cb.example.net/".into()));
        let a = factory.allocate().await.unwrap();
        let b = factory.allocate().await.unwrap();
        assert!(a.starts_with("http://cb.example.net/"));
        assert_eq!(a.len(), "http://cb.example.net/".len() + 12);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_unconfigured_factory_fails() {
        let factory = StaticReverseFactory::new(Some("  ".into()));
        let err = factory.allocate().await.unwrap_err();
        assert!(matches!(err, PocError::ReverseAllocation(_)));
    }
}
