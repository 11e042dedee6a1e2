//! Command execution context
//!
//! Loads configuration once and wires the shared HTTP pool, request cache
//! and listener that every command runs against.

use std::sync::Arc;

use crate::cache::RequestCache;
use crate::cli::GlobalOptions;
use crate::client::HttpPool;
use crate::config::Config;
use crate::error::Result;
use crate::listener::TimingsListener;
use crate::output::ConsoleSink;

/// Shared state for one bot run.
///
/// Call [`CommandContext::shutdown`] when done so the pool drains.
pub struct CommandContext {
    /// Loaded and validated configuration
    pub config: Config,
    /// Connection pool (Arc-wrapped so the cache's download tasks can share it)
    pub pool: Arc<HttpPool>,
    /// Single-flight cache in front of the pool
    pub cache: Arc<RequestCache<HttpPool>>,
    /// Message handler
    pub listener: Arc<TimingsListener<HttpPool>>,
    /// Reply channel, rendering in the requested output format
    pub sink: Arc<ConsoleSink>,
}

impl CommandContext {
    /// Load the config (default location unless overridden) and start the pool
    ///
    /// # Errors
    /// Returns error if the config cannot be loaded or the client cannot be built.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let config = Config::load_at(opts.config_ref())?;

        let pool = Arc::new(HttpPool::start(&config.http)?);
        let cache = Arc::new(RequestCache::new(Arc::clone(&pool), &config.cache));
        let listener = Arc::new(TimingsListener::new(Arc::clone(&cache), &config));

        Ok(Self {
            config,
            pool,
            cache,
            listener,
            sink: Arc::new(ConsoleSink::new(opts.format)),
        })
    }

    /// Close the pool, letting running downloads drain, then drop the cache.
    ///
    /// Only downloads still running after the grace period get cancelled.
    pub async fn shutdown(self) {
        self.pool.close().await;
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::cli::OutputFormat;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn context(dir: &std::path::Path) -> CommandContext {
        let path = dir.join("config.yaml");
        std::fs::write(&path, "http:\n  shutdown_grace_secs: 5\n").unwrap();
        let opts = GlobalOptions {
            format: OutputFormat::Json,
            config: Some(path.to_string_lossy().into_owned()),
        };
        CommandContext::new(&opts).unwrap()
    }

    #[tokio::test]
    async fn test_shutdown_drains_running_downloads() {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let (accepted_tx, accepted_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = server.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = accepted_tx.send(());
            tokio::time::sleep(Duration::from_millis(200)).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}")
                .await
                .unwrap();
        });

        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path());
        let cache = Arc::clone(&ctx.cache);
        let pending = cache.get_or_fetch(&CacheKey::for_report(&format!("http://{addr}/"), "1"));
        accepted_rx.await.unwrap();

        ctx.shutdown().await;

        let response = pending.await.unwrap();
        assert_eq!(response.body, "{}");
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_twice_is_safe() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path());
        let pool = Arc::clone(&ctx.pool);

        ctx.shutdown().await;
        pool.close().await;
        assert!(pool.is_closed());
    }
}
