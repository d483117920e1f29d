use std::path::{Path, PathBuf};
use crate::errors::PocError;
use super::definition::PocDefinition;
use tracing::{debug, info};

const MAX_POC_SIZE: u64 = 1_048_576;

pub async fn load_poc(path: &Path) -> Result<PocDefinition, PocError> {
    if !path.exists() {
        return Err(PocError::DefinitionLoad(format!("POC file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_POC_SIZE {
        return Err(PocError::DefinitionLoad(format!(
            "POC file exceeds 1MB limit: {}",
            path.display()
        )));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let mut poc = parse_poc(&content)
        .map_err(|e| PocError::DefinitionLoad(format!("{}: {}", path.display(), e)))?;

    if poc.name.is_empty() {
        poc.name = path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    debug!(poc = %poc.name, set = poc.set.len(), rules = poc.rules.len(), "Loaded POC");
    Ok(poc)
}

pub fn parse_poc(content: &str) -> Result<PocDefinition, PocError> {
    let poc: PocDefinition = serde_yaml::from_str(content)?;
    if poc.rules.is_empty() {
        return Err(PocError::DefinitionLoad("POC declares no rules".into()));
    }
    if let Some((i, _)) = poc.rules.iter().enumerate().find(|(_, r)| r.expression.trim().is_empty()) {
        return Err(PocError::DefinitionLoad(format!("rules[{}] has an empty expression", i)));
    }
    Ok(poc)
}

/// Expand a POC argument into files: a single file, a directory of
/// `*.yml`/`*.yaml`, or a glob pattern.
pub fn discover_pocs(location: &str) -> Result<Vec<PathBuf>, PocError> {
    let path = Path::new(location);
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let patterns: Vec<String> = if path.is_dir() {
        ["*.yml", "*.yaml"].iter()
            .map(|ext| path.join(ext).to_string_lossy().into_owned())
            .collect()
    } else {
        vec![location.to_string()]
    };

    let mut found = Vec::new();
    for pattern in &patterns {
        for entry in glob::glob(pattern)
            .map_err(|e| PocError::Config(format!("Invalid glob pattern: {}", e)))?
        {
            let entry = entry.map_err(|e| PocError::Config(format!("Glob error: {}", e)))?;
            if entry.is_file() {
                found.push(entry);
            }
        }
    }
    found.sort();
    found.dedup();

    if found.is_empty() {
        return Err(PocError::DefinitionLoad(format!("No POC files matched: {}", location)));
    }
    info!(count = found.len(), source = %location, "Discovered POC files");
    Ok(found)
}
