//! Diagnostic findings

use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One observation about a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tabled)]
pub struct Finding {
    #[tabled(rename = "FINDING")]
    pub title: String,

    #[tabled(rename = "DETAIL")]
    pub detail: String,
}

impl Finding {
    pub fn new(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail: detail.into(),
        }
    }

    /// Stand-in finding for a report without problems
    pub fn all_good() -> Self {
        Self::new("All good", "Analyzed with no issues")
    }
}
