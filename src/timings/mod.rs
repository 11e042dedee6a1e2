//! Timings report handling: link extraction, decoding and diagnostics

pub mod finding;
pub mod link;
pub mod report;
pub mod rules;
pub mod suggestions;

pub use finding::Finding;
pub use link::{ReportUrl, extract_report_url};
pub use rules::RuleEngine;
