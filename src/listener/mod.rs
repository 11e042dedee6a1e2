//! Message handling: from a linked report to a delivered analysis
//!
//! For every message carrying a report link two branches run side by side:
//! the sink sends an "in progress" placeholder while the report is fetched
//! (through the shared cache), decoded and checked. When both are done the
//! placeholder is replaced with the result.

pub mod report;
pub mod sink;

use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::time::Instant;

use crate::cache::RequestCache;
use crate::client::{Fetcher, RawResponse};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::timings::{Finding, ReportUrl, RuleEngine, extract_report_url};

pub use report::{AnalysisReport, Timing};
pub use sink::Sink;

pub const IN_PROGRESS_TITLE: &str = "Query in progress";

/// A chat message as handed over by the ingestion layer
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub text: String,
    pub sender: String,
}

impl IncomingMessage {
    pub fn new(text: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: sender.into(),
        }
    }
}

/// Where a single request is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    InProgressSent,
    Fetching,
    Processing,
    Done,
    Error,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::InProgressSent => "in progress sent",
            Stage::Fetching => "fetching",
            Stage::Processing => "processing",
            Stage::Done => "done",
            Stage::Error => "error",
        };
        f.write_str(name)
    }
}

fn enter(url: &ReportUrl, stage: Stage) {
    debug!("{url}: {stage}");
}

/// Turns report links in messages into delivered analyses
pub struct TimingsListener<F> {
    cache: Arc<RequestCache<F>>,
    engine: Arc<RuleEngine>,
    host_prefix: String,
}

impl<F: Fetcher + 'static> TimingsListener<F> {
    pub fn new(cache: Arc<RequestCache<F>>, config: &Config) -> Self {
        Self {
            cache,
            engine: Arc::new(RuleEngine::new(
                config.analysis.current_minecraft_version.clone(),
            )),
            host_prefix: config.extractor.host_prefix.clone(),
        }
    }

    /// Handle one message.
    ///
    /// Returns `None` without touching the sink when the message links no
    /// report. Otherwise returns the report that was delivered (or would
    /// have been, if the placeholder could not be sent).
    pub async fn on_message<S: Sink>(
        &self,
        message: &IncomingMessage,
        sink: Arc<S>,
    ) -> Option<AnalysisReport> {
        let started = Instant::now();
        let url = extract_report_url(&message.text, &self.host_prefix)?;
        info!("Querying {url} for {}", message.sender);
        enter(&url, Stage::Start);

        let placeholder = tokio::spawn({
            let sink = Arc::clone(&sink);
            async move { sink.send_placeholder(IN_PROGRESS_TITLE).await }
        });
        enter(&url, Stage::InProgressSent);

        let report = self.analyze(&url, started).await;

        match placeholder.await {
            Ok(Ok(handle)) => {
                if let Err(err) = sink.update(handle, &report).await {
                    warn!("An unexpected error occurred while sending message: {err}");
                }
            }
            Ok(Err(err)) => warn!("An unexpected error occurred while sending message: {err}"),
            Err(err) => warn!("Placeholder task failed: {err}"),
        }

        Some(report)
    }

    /// Fetch (or reuse) the report behind `url` and run the checks.
    ///
    /// Any failure evicts the cached download so the next request retries.
    pub async fn analyze(&self, url: &ReportUrl, started: Instant) -> AnalysisReport {
        let key = url.cache_key();

        enter(url, Stage::Fetching);
        let fetch = self.cache.get_or_fetch(&key);
        let fetched = fetch.clone().await;
        let fetched_at = Instant::now();

        let outcome = match fetched {
            Ok(response) => {
                enter(url, Stage::Processing);
                self.process(response).await
            }
            Err(err) => Err(Error::from(err)),
        };
        let timing = Timing::new(fetched_at - started, fetched_at.elapsed());

        match outcome {
            Ok(findings) => {
                enter(url, Stage::Done);
                AnalysisReport::success(url, findings, timing)
            }
            Err(err) => {
                enter(url, Stage::Error);
                self.cache.invalidate(&key, &fetch);
                warn!("An unexpected error occurred while processing {url}: {err}");
                AnalysisReport::failure(url, &err, timing)
            }
        }
    }

    /// Checks run on the blocking pool; a panicking check becomes an error
    async fn process(&self, response: Arc<RawResponse>) -> Result<Vec<Finding>> {
        debug!(
            "{} answered {} ({} bytes, reusable for {:?})",
            response.url,
            response.status,
            response.body.len(),
            response.keep_alive
        );
        let engine = Arc::clone(&self.engine);
        let findings = tokio::task::spawn_blocking(move || engine.analyze(&response.body))
            .await
            .map_err(|e| Error::Other(format!("Analysis task failed: {e}")))??;
        Ok(findings)
    }
}
