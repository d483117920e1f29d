use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::engine::{RunState, VerificationOutcome};
use crate::errors::PocError;

/// One POC/target pair as recorded for output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub run_id: Uuid,
    pub poc: String,
    pub poc_path: String,
    pub target: String,
    /// `None` when the run aborted before reaching a verdict.
    pub matched: Option<bool>,
    pub state: RunState,
    pub error: Option<String>,
    pub error_type: Option<String>,
    pub rules_executed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Final bindings, for diagnosing a verdict.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

impl VerificationReport {
    pub fn from_outcome(
        outcome: &VerificationOutcome,
        poc_path: &str,
        started_at: DateTime<Utc>,
    ) -> Self {
        let finished_at = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            poc: outcome.poc.clone(),
            poc_path: poc_path.to_string(),
            target: outcome.target.clone(),
            matched: Some(outcome.matched),
            state: outcome.state,
            error: None,
            error_type: None,
            rules_executed: outcome.rules_executed,
            started_at,
            finished_at,
            duration_ms: elapsed_ms(started_at, finished_at),
            params: outcome.params.to_json(),
        }
    }

    pub fn from_error(
        error: &PocError,
        poc: &str,
        poc_path: &str,
        target: &str,
        started_at: DateTime<Utc>,
    ) -> Self {
        let finished_at = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            poc: poc.to_string(),
            poc_path: poc_path.to_string(),
            target: target.to_string(),
            matched: None,
            state: RunState::Aborted,
            error: Some(error.to_string()),
            error_type: Some(error.classify().error_type.to_string()),
            rules_executed: error.rules_executed(),
            started_at,
            finished_at,
            duration_ms: elapsed_ms(started_at, finished_at),
            params: serde_json::Value::Null,
        }
    }

    pub fn is_match(&self) -> bool {
        self.matched == Some(true)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

fn elapsed_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    (end - start).num_milliseconds().max(0) as u64
}

/// Totals over a batch of reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub matched: usize,
    pub rejected: usize,
    pub errors: usize,
}

impl ReportSummary {
    pub fn from_reports(reports: &[VerificationReport]) -> Self {
        let mut summary = Self { total: reports.len(), ..Default::default() };
        for report in reports {
            match report.matched {
                Some(true) => summary.matched += 1,
                Some(false) => summary.rejected += 1,
                None => summary.errors += 1,
            }
        }
        summary
    }
}
