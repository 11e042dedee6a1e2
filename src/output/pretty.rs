//! Human-oriented rendering of an analysis

use colored::Colorize;

use crate::listener::AnalysisReport;

/// Title, link, one bullet per finding, then the timing footer
pub fn format_pretty(report: &AnalysisReport) -> String {
    let mut lines = Vec::new();

    if report.is_error() {
        lines.push(report.title.red().bold().to_string());
    } else {
        lines.push(report.title.bold().to_string());
    }
    lines.push(report.url.cyan().to_string());
    lines.push(String::new());

    if let Some(ref cause) = report.error {
        lines.push(format!("  {} {}", "✗".red(), cause));
    }
    for finding in &report.findings {
        lines.push(format!("  {} {}", "•".yellow(), finding.title.bold()));
        lines.push(format!("    {}", finding.detail));
    }

    lines.push(String::new());
    lines.push(report.footer().dimmed().to_string());
    lines.join("\n")
}
