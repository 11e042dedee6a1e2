//! Output formatting for analysis results

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::listener::AnalysisReport;

pub mod console;
pub mod json;
pub mod pretty;
pub mod table;

pub use console::ConsoleSink;

/// Render one analysis in the requested format
pub fn render(report: &AnalysisReport, format: OutputFormat) -> Result<String> {
    let output = match format {
        OutputFormat::Pretty => pretty::format_pretty(report),
        OutputFormat::Table => {
            let mut lines = vec![format!("{} ({})", report.title, report.url)];
            if let Some(ref cause) = report.error {
                lines.push(cause.clone());
            } else {
                lines.push(table::format_table(&report.findings));
            }
            lines.push(report.footer());
            lines.join("\n")
        }
        OutputFormat::Json => json::format_json(report)?,
    };
    Ok(output)
}
