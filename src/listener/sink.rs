//! Reply channel abstraction

use async_trait::async_trait;

use super::AnalysisReport;
use crate::error::Result;

/// Where results for one incoming message are delivered.
///
/// A placeholder goes out first; once the analysis finishes it is
/// replaced through the handle the placeholder produced.
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    /// Editable reference to a message already sent
    type Handle: Send + 'static;

    async fn send_placeholder(&self, title: &str) -> Result<Self::Handle>;

    /// Replace the placeholder behind `handle` with the final report
    async fn update(&self, handle: Self::Handle, report: &AnalysisReport) -> Result<()>;
}
