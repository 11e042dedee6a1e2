//! Configuration management for timingsbot

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client pool limits and timeouts
    #[serde(default)]
    pub http: HttpConfig,

    /// Report cache freshness and capacity
    #[serde(default)]
    pub cache: CacheConfig,

    /// Which message tokens are treated as report links
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Rule engine parameters
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// HTTP client pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Connections open at once across all hosts
    pub max_connections: usize,

    /// Connections open at once to a single host
    pub max_connections_per_route: usize,

    pub connect_timeout_secs: u64,

    pub response_timeout_secs: u64,

    /// How long a request may wait for a free connection slot
    pub acquire_timeout_secs: u64,

    /// Socket read idle timeout
    pub socket_timeout_secs: u64,

    /// Keep-alive used when the server does not announce one
    pub keep_alive_secs: u64,

    /// Upper bound on the graceful drain at shutdown
    pub shutdown_grace_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_connections: 16,
            max_connections_per_route: 8,
            connect_timeout_secs: 10,
            response_timeout_secs: 10,
            acquire_timeout_secs: 10,
            socket_timeout_secs: 10,
            keep_alive_secs: 60,
            shutdown_grace_secs: 30,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Report cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Freshness window of a successful download
    pub ttl_secs: u64,

    /// Soft upper bound on cached reports
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 30 * 60,
            capacity: 256,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// URL extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Scheme and host prefix a token must start with
    pub host_prefix: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            host_prefix: "https://timin".to_string(),
        }
    }
}

/// Rule engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Release every server is expected to run
    pub current_minecraft_version: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            current_minecraft_version: "1.16.5".to_string(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".timingsbot").join("config.yaml"))
    }

    /// Load configuration from an explicit path, or from the default path.
    ///
    /// A missing default file yields the built-in defaults; a missing
    /// explicit file is an error.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(Path::new(path)),
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    log::debug!("No config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;

        Ok(config)
    }

    /// Reject settings the pool or cache cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.http.max_connections == 0 || self.http.max_connections_per_route == 0 {
            return Err(ConfigError::Invalid("connection limits must be at least 1".into()).into());
        }
        if self.http.max_connections_per_route > self.http.max_connections {
            return Err(ConfigError::Invalid(
                "max_connections_per_route cannot exceed max_connections".into(),
            )
            .into());
        }
        if self.cache.capacity == 0 {
            return Err(ConfigError::Invalid("cache capacity must be at least 1".into()).into());
        }
        if self.extractor.host_prefix.is_empty() {
            return Err(ConfigError::Invalid("extractor host_prefix is empty".into()).into());
        }
        Ok(())
    }
}
