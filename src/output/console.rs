//! Terminal sink: a spinner stands in for the placeholder message

use std::time::Duration;

use async_trait::async_trait;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::render;
use crate::cli::OutputFormat;
use crate::error::{Error, Result};
use crate::listener::{AnalysisReport, Sink};

/// Prints each analysis to stdout once it is ready.
///
/// Spinners draw on stderr and stay hidden when it is not a terminal.
pub struct ConsoleSink {
    format: OutputFormat,
    progress: MultiProgress,
}

impl ConsoleSink {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            progress: MultiProgress::new(),
        }
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    type Handle = ProgressBar;

    async fn send_placeholder(&self, title: &str) -> Result<ProgressBar> {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .map_err(|e| Error::Other(format!("Invalid spinner template: {e}")))?;
        let spinner = self.progress.add(ProgressBar::new_spinner());
        spinner.set_style(style);
        spinner.set_message(title.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        Ok(spinner)
    }

    async fn update(&self, handle: ProgressBar, report: &AnalysisReport) -> Result<()> {
        handle.finish_and_clear();
        self.progress.remove(&handle);

        let output = render(report, self.format)?;
        self.progress.suspend(|| println!("{output}"));
        Ok(())
    }
}
