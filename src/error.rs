//! Error types for timingsbot

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for timingsbot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

/// Failures of a single report download.
///
/// Cloneable because one fetch result is handed to every caller that
/// coalesced onto the same in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Timed out after {0:?} waiting for a pooled connection")]
    PoolTimeout(Duration),

    #[error("Request was cancelled")]
    Cancelled,

    #[error("HTTP client pool is closed")]
    Closed,

    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if err.is_connect() {
            FetchError::Connect(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Decode and rule evaluation failures
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Malformed timings report: {0}")]
    Json(String),

    #[error("Timings report is not a JSON object")]
    NotAnObject,

    #[error("{check}: {message}")]
    Rule {
        check: &'static str,
        message: String,
    },
}

impl ReportError {
    pub fn rule(check: &'static str, message: impl Into<String>) -> Self {
        ReportError::Rule {
            check,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        ReportError::Json(err.to_string())
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
