use std::path::{Path, PathBuf};
use std::sync::Arc;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use crate::cli::commands::VerifyArgs;
use crate::config::{self, PocConfig, DEFAULT_WORKERS};
use crate::engine::{ReqwestTransport, StaticReverseFactory, Verifier, DEFAULT_USER_AGENT};
use crate::errors::PocError;
use crate::models::{ReportSummary, VerificationReport};
use crate::poc::{discover_pocs, load_poc, PocDefinition};
use crate::reporting::{format_report_line, format_summary, render_json};
use tracing::{info, warn};

/// Effective settings after merging CLI flags over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub reverse_url: Option<String>,
    pub user_agent: String,
    pub workers: usize,
}

pub fn resolve_settings(args: &VerifyArgs, file_config: &PocConfig) -> Result<RunSettings, PocError> {
    let workers = args.workers.or(file_config.workers()).unwrap_or(DEFAULT_WORKERS);
    if workers == 0 {
        return Err(PocError::Config("--workers must be at least 1".into()));
    }

    let user_agent = args.user_agent.as_deref()
        .or(file_config.user_agent())
        .filter(|ua| !ua.trim().is_empty())
        .unwrap_or(DEFAULT_USER_AGENT)
        .to_string();

    let reverse_url = args.reverse_url.clone()
        .or_else(|| file_config.reverse_url().map(String::from));

    Ok(RunSettings { reverse_url, user_agent, workers })
}

/// Targets from `--target` flags followed by the targets file. Blank lines
/// and `#` comments are skipped; duplicates are dropped keeping first order.
pub async fn collect_targets(args: &VerifyArgs) -> Result<Vec<String>, PocError> {
    let mut raw: Vec<String> = args.targets.clone();
    if let Some(file) = &args.targets_file {
        let path = Path::new(file);
        if !path.exists() {
            return Err(PocError::Config(format!("Targets file not found: {}", path.display())));
        }
        let content = tokio::fs::read_to_string(path).await?;
        raw.extend(
            content.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from),
        );
    }

    let mut targets: Vec<String> = Vec::new();
    for target in raw {
        let target = normalize_target(&target)?;
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    if targets.is_empty() {
        return Err(PocError::InvalidTarget("no targets given (use --target or --targets-file)".into()));
    }
    Ok(targets)
}

/// Rule paths are appended verbatim, so a trailing slash on the base URL is
/// dropped to avoid `//path`.
fn normalize_target(raw: &str) -> Result<String, PocError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| PocError::InvalidTarget(format!("{}: {}", raw, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PocError::InvalidTarget(format!("{}: scheme must be http or https", raw)));
    }
    Ok(trimmed.to_string())
}

struct Job {
    poc_path: PathBuf,
    poc: Result<Arc<PocDefinition>, Arc<PocError>>,
    target: String,
}

pub async fn handle_verify(args: VerifyArgs, quiet: bool) -> Result<ReportSummary, PocError> {
    let file_config = match &args.config {
        Some(path) => config::parse_config(Path::new(path)).await?,
        None => PocConfig::default(),
    };
    let settings = resolve_settings(&args, &file_config)?;

    let poc_paths = discover_pocs(&args.poc)?;
    let targets = collect_targets(&args).await?;

    // Load every definition once; a broken file becomes a failed row per target.
    let mut definitions = Vec::with_capacity(poc_paths.len());
    for path in poc_paths {
        let loaded = load_poc(&path).await.map(Arc::new).map_err(|e| {
            warn!(poc = %path.display(), error = %e, "Failed to load POC");
            Arc::new(e)
        });
        definitions.push((path, loaded));
    }

    let jobs: Vec<Job> = definitions.iter()
        .flat_map(|(path, poc)| {
            targets.iter().map(move |target| Job {
                poc_path: path.clone(),
                poc: poc.clone(),
                target: target.clone(),
            })
        })
        .collect();

    info!(
        pocs = definitions.len(),
        targets = targets.len(),
        runs = jobs.len(),
        workers = settings.workers,
        "Starting verification"
    );

    let transport = Arc::new(ReqwestTransport::new(&settings.user_agent)?);
    let reverse = Arc::new(StaticReverseFactory::new(settings.reverse_url.clone()));
    let verifier = Verifier::new(transport, reverse);

    let bar = if quiet || args.json {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(jobs.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("  {bar:30.cyan/dark_gray} {pos}/{len} runs | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        bar
    };

    let reports: Vec<VerificationReport> = stream::iter(jobs)
        .map(|job| {
            let verifier = verifier.clone();
            async move { run_job(&verifier, job).await }
        })
        .buffer_unordered(settings.workers)
        .inspect(|report| {
            bar.inc(1);
            bar.set_message(report.poc.clone());
            if !args.json && (!quiet || report.is_match()) {
                bar.suspend(|| println!("{}", format_report_line(report)));
            }
        })
        .collect()
        .await;
    bar.finish_and_clear();

    let summary = ReportSummary::from_reports(&reports);
    if args.json || args.output.is_some() {
        let json = render_json(&reports)?;
        if let Some(output) = &args.output {
            tokio::fs::write(output, &json).await?;
            info!(path = %output, "Results written");
        }
        if args.json {
            println!("{}", json);
        }
    }
    if !args.json && !quiet {
        println!("{}", format_summary(&summary));
    }

    Ok(summary)
}

async fn run_job(verifier: &Verifier, job: Job) -> VerificationReport {
    let started_at = Utc::now();
    let poc_path = job.poc_path.display().to_string();
    let poc = match job.poc {
        Ok(poc) => poc,
        Err(e) => {
            let name = job.poc_path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            return VerificationReport::from_error(&e, &name, &poc_path, &job.target, started_at);
        }
    };

    match verifier.verify_definition(&poc, &job.target).await {
        Ok(outcome) => VerificationReport::from_outcome(&outcome, &poc_path, started_at),
        Err(e) => VerificationReport::from_error(&e, &poc.name, &poc_path, &job.target, started_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> VerifyArgs {
        VerifyArgs {
            poc: "pocs".into(),
            targets: vec![],
            targets_file: None,
            config: None,
            reverse_url: None,
            workers: None,
            user_agent: None,
            json: false,
            output: None,
        }
    }

    #[test]
    fn test_defaults_without_config() {
        let settings = resolve_settings(&args(), &PocConfig::default()).unwrap();
        assert_eq!(settings.workers, DEFAULT_WORKERS);
        assert_eq!(settings.user_agent, DEFAULT_USER_AGENT);
        assert!(settings.reverse_url.is_none());
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let file = config::parse_config_str(
            "reverse:\n  url: http://file.example\nhttp:\n  user_agent: file-ua\nscan:\n  workers: 3\n",
        )
        .unwrap();
        let from_file = resolve_settings(&args(), &file).unwrap();
        assert_eq!(from_file.workers, 3);
        assert_eq!(from_file.user_agent, "file-ua");
        assert_eq!(from_file.reverse_url.as_deref(), Some("http://file.example"));

        let mut overridden = args();
        overridden.workers = Some(1);
        overridden.user_agent = Some("cli-ua".into());
        overridden.reverse_url = Some("http://cli.example".into());
        let settings = resolve_settings(&overridden, &file).unwrap();
        assert_eq!(settings, RunSettings {
            reverse_url: Some("http://cli.example".into()),
            user_agent: "cli-ua".into(),
            workers: 1,
        });
    }

    #[test]
    fn test_zero_workers_flag_rejected() {
        let mut a = args();
        a.workers = Some(0);
        assert!(matches!(resolve_settings(&a, &PocConfig::default()), Err(PocError::Config(_))));
    }

    #[tokio::test]
    async fn test_collect_targets_merges_file_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("targets.txt");
        tokio::fs::write(&file, "# staging\nhttp://b.local/\n\nhttp://a.local\n").await.unwrap();

        let mut a = args();
        a.targets = vec!["http://a.local".into()];
        a.targets_file = Some(file.display().to_string());
        let targets = collect_targets(&a).await.unwrap();
        assert_eq!(targets, vec!["http://a.local", "http://b.local"]);
    }

    #[tokio::test]
    async fn test_collect_targets_requires_one() {
        let err = collect_targets(&args()).await.unwrap_err();
        assert!(matches!(err, PocError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn test_collect_targets_rejects_non_http() {
        let mut a = args();
        a.targets = vec!["ftp://files.local".into()];
        assert!(matches!(collect_targets(&a).await, Err(PocError::InvalidTarget(_))));
    }
}
