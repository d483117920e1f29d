use std::path::Path;
use crate::errors::PocError;
use super::types::PocConfig;
use tracing::warn;

const MAX_CONFIG_SIZE: u64 = 1_048_576;

pub async fn parse_config(path: &Path) -> Result<PocConfig, PocError> {
    if !path.exists() {
        return Err(PocError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_SIZE {
        return Err(PocError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<PocConfig, PocError> {
    // An empty file is a valid, empty config.
    if content.trim().is_empty() {
        return Ok(PocConfig::default());
    }
    let config: PocConfig = serde_yaml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Semantic checks serde cannot express.
fn validate_config(config: &PocConfig) -> Result<(), PocError> {
    if config.workers() == Some(0) {
        return Err(PocError::Config("scan.workers must be at least 1".into()));
    }

    if let Some(url) = config.reverse_url() {
        let parsed = url::Url::parse(url)
            .map_err(|e| PocError::Config(format!("Invalid reverse.url '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PocError::Config(format!(
                "reverse.url must be http or https, got '{}'",
                parsed.scheme()
            )));
        }
    }

    if let Some(ua) = config.user_agent() {
        if ua.trim().is_empty() {
            warn!("http.user_agent is empty, the default user agent will be used");
        }
    }

    Ok(())
}
