//! Mock fetcher for testing
//!
//! Serves a canned body without network access, optionally after a delay,
//! and counts how many downloads were actually issued.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{FetchResult, Fetcher, RawResponse};
use crate::error::FetchError;

/// Mock fetcher for testing.
///
/// # Example
/// ```ignore
/// let mock = MockFetcher::new(r#"{"timingsMaster":{}}"#)
///     .with_delay(Duration::from_millis(50));
/// mock.fail_next(FetchError::Cancelled);
/// ```
pub struct MockFetcher {
    /// Body returned on success
    body: String,
    /// Simulated network latency
    delay: Duration,
    /// Errors returned before falling back to `body`, consumed in order
    failures: Mutex<VecDeque<FetchError>>,
    /// Number of fetches issued
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            delay: Duration::ZERO,
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make the next un-failed fetch return `err`
    pub fn fail_next(&self, err: FetchError) {
        self.failures.lock().unwrap().push_back(err);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<RawResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        Ok(RawResponse {
            url: url.to_string(),
            status: 200,
            keep_alive: Duration::from_secs(60),
            body: self.body.clone(),
        })
    }
}
