use console::style;
use crate::errors::PocError;
use crate::models::{ReportSummary, VerificationReport};

/// One console line per run: verdict tag, POC, target and timing.
pub fn format_report_line(report: &VerificationReport) -> String {
    let tag = match report.matched {
        Some(true) => style("[VULN]").red().bold().to_string(),
        Some(false) => style("[SAFE]").green().to_string(),
        None => style("[FAIL]").yellow().to_string(),
    };
    let mut line = format!(
        "{} {} {} ({} rules, {}ms)",
        tag,
        style(&report.poc).cyan(),
        report.target,
        report.rules_executed,
        report.duration_ms,
    );
    if let Some(error) = &report.error {
        line.push_str(&format!(" {}", style(error).dim()));
    }
    line
}

pub fn format_summary(summary: &ReportSummary) -> String {
    format!(
        "{} runs: {} vulnerable, {} not vulnerable, {} failed",
        summary.total,
        style(summary.matched).red().bold(),
        style(summary.rejected).green(),
        style(summary.errors).yellow(),
    )
}

/// Reports plus summary as pretty JSON.
pub fn render_json(reports: &[VerificationReport]) -> Result<String, PocError> {
    let summary = ReportSummary::from_reports(reports);
    let doc = serde_json::json!({
        "summary": summary,
        "results": reports,
    });
    Ok(serde_json::to_string_pretty(&doc)?)
}
