//! Final result of one analysis request

use std::time::Duration;

use serde::Serialize;

use crate::error::Error;
use crate::timings::{Finding, ReportUrl};

pub const ANALYSIS_TITLE: &str = "Timings Analysis";
pub const ERROR_TITLE: &str = "An unexpected error occurred while processing this request";

/// Time spent in each stage of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timing {
    /// Request start until the download completed
    pub network_ms: u64,
    /// Download completion until the checks finished
    pub processing_ms: u64,
}

impl Timing {
    pub fn new(network: Duration, processing: Duration) -> Self {
        Self {
            network_ms: saturating_millis(network),
            processing_ms: saturating_millis(processing),
        }
    }

    pub fn footer(&self) -> String {
        format!(
            "Timing: {}ms network, {}ms processing",
            self.network_ms, self.processing_ms
        )
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Everything a sink needs to render the outcome of one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub title: String,

    /// Normalized report link
    pub url: String,

    /// One-line cause when the request failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub findings: Vec<Finding>,

    pub timing: Timing,
}

impl AnalysisReport {
    pub fn success(url: &ReportUrl, findings: Vec<Finding>, timing: Timing) -> Self {
        Self {
            title: ANALYSIS_TITLE.to_string(),
            url: url.to_string(),
            error: None,
            findings,
            timing,
        }
    }

    pub fn failure(url: &ReportUrl, cause: &Error, timing: Timing) -> Self {
        Self {
            title: ERROR_TITLE.to_string(),
            url: url.to_string(),
            error: Some(cause.to_string()),
            findings: Vec::new(),
            timing,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn footer(&self) -> String {
        self.timing.footer()
    }
}
