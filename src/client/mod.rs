//! HTTP access to timings report data

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;

pub mod keep_alive;
#[cfg(test)]
pub mod mock;
pub mod pool;

#[cfg(test)]
pub use mock::MockFetcher;
pub use pool::HttpPool;

/// Result of a single download
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Downloads one URL per call.
///
/// Implemented by [`HttpPool`] for real traffic and by a mock in tests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue exactly one GET for `url` and return the full response
    async fn fetch(&self, url: &str) -> FetchResult<RawResponse>;
}

/// A fully read HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// URL that was requested
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// How long the server allows the connection to be reused
    pub keep_alive: Duration,

    /// Response body decoded as text
    pub body: String,
}
