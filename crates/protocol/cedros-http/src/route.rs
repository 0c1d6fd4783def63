//! Route-prefix discovery.
//!
//! The backend may be mounted under a path prefix (for example `/api`). The
//! prefix is read once from `GET {server}/cedros-health` and cached. Only
//! definitive answers are cached: a 2xx body or a 4xx status. Transport
//! failures, 5xx responses and undecodable bodies are retried, and if the
//! retries run out the call falls back to an empty prefix without caching
//! it, so the next call tries again.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use cedros_resilience::sync::lock;
use cedros_resilience::{CallContext, RequestDeduplicator, RetryPolicy};
use cedros_types::constants::HEALTH_PATH;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Default)]
struct RouteState {
    cached: Option<String>,
    generation: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    #[serde(default)]
    route_prefix: Option<String>,
}

/// Discovers and caches the API route prefix for one server.
#[derive(Debug)]
pub struct RouteResolver {
    http: reqwest::Client,
    server_url: String,
    retry: RetryPolicy,
    timeout: Duration,
    state: Arc<Mutex<RouteState>>,
    inflight: RequestDeduplicator<String, ApiError>,
}

impl RouteResolver {
    /// Create a resolver for `server_url`.
    pub fn new(http: reqwest::Client, server_url: &str, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
            retry,
            timeout,
            state: Arc::new(Mutex::new(RouteState::default())),
            // Zero window: concurrent first calls share one request, later
            // calls go straight to the cache.
            inflight: RequestDeduplicator::new(Duration::ZERO),
        }
    }

    /// Server base URL without trailing slash.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Current cached prefix; `None` while unresolved.
    pub fn cached(&self) -> Option<String> {
        lock(&self.state).cached.clone()
    }

    /// Resolve the prefix, fetching it on first use.
    pub async fn resolve(&self) -> String {
        let generation = {
            let state = lock(&self.state);
            if let Some(prefix) = &state.cached {
                return prefix.clone();
            }
            state.generation
        };

        let key = format!("route-prefix:{}", generation);
        let task = ResolveTask {
            http: self.http.clone(),
            url: format!("{}{}", self.server_url, HEALTH_PATH),
            retry: self.retry,
            timeout: self.timeout,
            state: Arc::clone(&self.state),
            generation,
        };

        self.inflight
            .dedupe(&key, move || task.run())
            .await
            .unwrap_or_default()
    }

    /// Forget the cached prefix. A resolution already in flight will not
    /// write its result.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.cached = None;
        state.generation += 1;
        drop(state);
        self.inflight.clear();
        debug!(server = %self.server_url, "Route prefix reset");
    }
}

struct ResolveTask {
    http: reqwest::Client,
    url: String,
    retry: RetryPolicy,
    timeout: Duration,
    state: Arc<Mutex<RouteState>>,
    generation: u64,
}

impl ResolveTask {
    async fn run(self) -> ApiResult<String> {
        let ctx = CallContext::with_timeout(self.timeout);
        let outcome = self
            .retry
            .run_with(
                || ctx.run(fetch_prefix(&self.http, &self.url)),
                |e: &ApiError, _| e.is_retryable() || matches!(e, ApiError::Decode(_)),
            )
            .await;

        match outcome {
            Ok(prefix) => {
                let mut state = lock(&self.state);
                if state.generation == self.generation {
                    info!(url = %self.url, prefix = %prefix, "Route prefix resolved");
                    state.cached = Some(prefix.clone());
                } else {
                    debug!(url = %self.url, "Discarding route prefix from before reset");
                }
                Ok(prefix)
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Route discovery failed, using empty prefix");
                Ok(String::new())
            }
        }
    }
}

async fn fetch_prefix(http: &reqwest::Client, url: &str) -> ApiResult<String> {
    debug!(url = %url, "Discovering route prefix");
    let response = http.get(url).send().await?;
    let status = response.status();

    // Any 4xx, 429 included, means "no discovery endpoint here".
    if status.is_client_error() {
        debug!(status = status.as_u16(), "Health endpoint rejected request, using empty prefix");
        return Ok(String::new());
    }

    let body = response.text().await?;
    if !status.is_success() {
        return Err(ApiError::from_status(status.as_u16(), &body));
    }
    if body.trim().is_empty() {
        return Ok(String::new());
    }

    let health: HealthResponse = serde_json::from_str(&body)
        .map_err(|e| ApiError::decode(format!("health response: {}", e)))?;
    Ok(health
        .route_prefix
        .as_deref()
        .map(normalize_prefix)
        .unwrap_or_default())
}

/// Normalise a prefix to `/segment[/segment...]`, or `""` for the root.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
