pub mod formatter;

pub use formatter::{format_report_line, format_summary, render_json};
