//! Bounded, connection-reusing HTTP client

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client as HttpClient;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

use super::keep_alive::keep_alive_duration;
use super::{FetchResult, Fetcher, RawResponse};
use crate::config::HttpConfig;
use crate::error::FetchError;

/// Connection slots held for the duration of one request
struct Permits {
    _route: OwnedSemaphorePermit,
    _total: OwnedSemaphorePermit,
}

/// Client whose idle connections live exactly as long as the host allows
#[derive(Clone)]
struct RouteClient {
    keep_alive: Duration,
    http: HttpClient,
}

/// Per-host limits and the client currently serving the host
struct Route {
    permits: Arc<Semaphore>,
    client: Mutex<RouteClient>,
}

impl Route {
    fn client(&self) -> RouteClient {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a client with a new reuse window when the host announces one.
    ///
    /// Requests still running on the old client finish on it; its idle
    /// connections close once the last of them drops it.
    fn renegotiate(&self, keep_alive: Duration, config: &HttpConfig) {
        let mut current = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        if current.keep_alive == keep_alive {
            return;
        }
        match build_client(config, keep_alive) {
            Ok(http) => {
                debug!(
                    "Connection reuse window {:?} -> {keep_alive:?}",
                    current.keep_alive
                );
                *current = RouteClient { keep_alive, http };
            }
            Err(err) => warn!("Keeping reuse window {:?}: {err}", current.keep_alive),
        }
    }
}

/// HTTP client pool with a global and a per-route connection cap.
///
/// Created with [`HttpPool::start`] and released with [`HttpPool::close`],
/// which waits (bounded by the configured grace period) for in-flight
/// requests before refusing new ones.
pub struct HttpPool {
    /// Shared by every route until its host negotiates its own window
    default_client: RouteClient,
    total: Arc<Semaphore>,
    routes: Mutex<HashMap<String, Arc<Route>>>,
    config: HttpConfig,
    closed: AtomicBool,
}

fn build_client(config: &HttpConfig, keep_alive: Duration) -> FetchResult<HttpClient> {
    HttpClient::builder()
        .connect_timeout(config.connect_timeout())
        .read_timeout(config.socket_timeout())
        .pool_max_idle_per_host(config.max_connections_per_route)
        .pool_idle_timeout(keep_alive)
        .tcp_nodelay(true)
        .tcp_keepalive(config.keep_alive())
        .build()
        .map_err(|e| FetchError::Network(e.to_string()))
}

impl HttpPool {
    /// Build the client and open the pool for requests
    pub fn start(config: &HttpConfig) -> FetchResult<Self> {
        let default_client = RouteClient {
            keep_alive: config.keep_alive(),
            http: build_client(config, config.keep_alive())?,
        };

        debug!(
            "HTTP pool started ({} total, {} per route)",
            config.max_connections, config.max_connections_per_route
        );

        Ok(Self {
            default_client,
            total: Arc::new(Semaphore::new(config.max_connections)),
            routes: Mutex::new(HashMap::new()),
            config: config.clone(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// How long idle connections to the host serving `url` are kept
    #[cfg(test)]
    fn reuse_window(&self, url: &str) -> Option<Duration> {
        let url = Url::parse(url).ok()?;
        let routes = self.routes.lock().ok()?;
        routes
            .get(&route_key(&url))
            .map(|route| route.client().keep_alive)
    }

    /// Stop accepting requests and drain in-flight ones.
    ///
    /// Safe to call more than once; only the first call waits.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let grace = self.config.shutdown_grace();
        let all = u32::try_from(self.config.max_connections).unwrap_or(u32::MAX);
        match tokio::time::timeout(grace, self.total.acquire_many(all)).await {
            Ok(Ok(_drained)) => debug!("HTTP pool drained"),
            Ok(Err(_)) => {}
            Err(_) => warn!("HTTP pool still busy after {grace:?}, closing anyway"),
        }

        self.total.close();
        if let Ok(routes) = self.routes.lock() {
            for route in routes.values() {
                route.permits.close();
            }
        }
        info!("HTTP pool closed");
    }

    fn route(&self, url: &Url) -> FetchResult<Arc<Route>> {
        let mut routes = self
            .routes
            .lock()
            .map_err(|_| FetchError::Network("route table poisoned".to_string()))?;

        let route = routes.entry(route_key(url)).or_insert_with(|| {
            Arc::new(Route {
                permits: Arc::new(Semaphore::new(self.config.max_connections_per_route)),
                client: Mutex::new(self.default_client.clone()),
            })
        });
        Ok(Arc::clone(route))
    }

    /// Wait for a route slot, then a global slot, within the acquire timeout
    async fn acquire(&self, route: &Route) -> FetchResult<Permits> {
        let wait = self.config.acquire_timeout();
        let acquire = async {
            let route_permit = Arc::clone(&route.permits)
                .acquire_owned()
                .await
                .map_err(|_| FetchError::Closed)?;
            let total_permit = Arc::clone(&self.total)
                .acquire_owned()
                .await
                .map_err(|_| FetchError::Closed)?;
            Ok::<_, FetchError>(Permits {
                _route: route_permit,
                _total: total_permit,
            })
        };

        tokio::time::timeout(wait, acquire)
            .await
            .map_err(|_| FetchError::PoolTimeout(wait))?
    }
}

#[async_trait]
impl Fetcher for HttpPool {
    async fn fetch(&self, url: &str) -> FetchResult<RawResponse> {
        if self.is_closed() {
            return Err(FetchError::Closed);
        }

        let target = Url::parse(url)
            .map_err(|e| FetchError::Network(format!("Invalid URL {url}: {e}")))?;
        let route = self.route(&target)?;
        let _permits = self.acquire(&route).await?;
        let client = route.client();

        info!("Queuing request for {url}");
        let response_timeout = self.config.response_timeout();
        let response = tokio::time::timeout(response_timeout, client.http.get(target).send())
            .await
            .map_err(|_| {
                FetchError::Timeout(format!("No response within {response_timeout:?}"))
            })??;

        let status = response.status().as_u16();
        let keep_alive = keep_alive_duration(response.headers(), self.config.keep_alive());
        route.renegotiate(keep_alive, &self.config);

        let body = response.text().await?;
        debug!("{url} answered {status} with {} bytes", body.len());

        Ok(RawResponse {
            url: url.to_string(),
            status,
            keep_alive,
            body,
        })
    }
}

/// Scheme, host and port of a URL
fn route_key(url: &Url) -> String {
    format!(
        "{}://{}:{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        url.port_or_known_default().unwrap_or_default()
    )
}
