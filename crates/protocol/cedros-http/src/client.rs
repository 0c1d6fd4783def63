//! JSON-over-HTTP client for the paywall API.
//!
//! Every URL is built as `{server}{route prefix}{path}`. Every call runs
//! under a [`CallContext`] (deadline plus optional cancellation); mutating
//! calls carry an `Idempotency-Key`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use cedros_resilience::{CallContext, CancellationToken, RetryPolicy};
use cedros_types::constants::{DEFAULT_REQUEST_TIMEOUT_MS, HEADER_IDEMPOTENCY_KEY};

use crate::error::{ApiError, ApiResult};
use crate::route::RouteResolver;

/// Fresh idempotency key (UUID v4).
pub fn new_idempotency_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Value for the `Idempotency-Key` header
    pub idempotency_key: Option<String>,
    /// Bearer token for the `Authorization` header
    pub bearer_token: Option<String>,
    /// Extra headers
    pub headers: Vec<(String, String)>,
    /// Overrides the client's default timeout
    pub timeout: Option<Duration>,
    /// Caller cancellation
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    /// Options carrying an idempotency key.
    pub fn idempotent(key: impl Into<String>) -> Self {
        Self {
            idempotency_key: Some(key.into()),
            ..Self::default()
        }
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a bearer token.
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Attach a cancellation token.
    pub fn cancellable(mut self, token: Option<CancellationToken>) -> Self {
        self.cancel = token;
        self
    }
}

/// A fully-read response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: u16,
    headers: HeaderMap,
    body: String,
}

impl ApiResponse {
    /// Build a response from parts.
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    async fn read(response: reqwest::Response) -> ApiResult<Self> {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Ok(Self::new(status, headers, body))
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Raw body text.
    pub fn text(&self) -> &str {
        &self.body
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| ApiError::decode(format!("HTTP {} body: {}", self.status, e)))
    }

    /// Turn any status other than 2xx or one of `also_ok` into an error.
    pub fn accept(self, also_ok: &[u16]) -> ApiResult<Self> {
        if self.is_success() || also_ok.contains(&self.status) {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, &self.body))
        }
    }
}

/// HTTP client bound to one paywall server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    server_url: String,
    timeout: Duration,
    routes: Arc<RouteResolver>,
}

impl ApiClient {
    /// Create a client with the default timeout and route-discovery retry.
    pub fn new(server_url: &str) -> ApiResult<Self> {
        Self::with_settings(
            server_url,
            Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            RetryPolicy::quick(),
        )
    }

    /// Create a client with an explicit timeout and discovery retry policy.
    pub fn with_settings(server_url: &str, timeout: Duration, route_retry: RetryPolicy) -> ApiResult<Self> {
        let server_url = server_url.trim().trim_end_matches('/');
        if !(server_url.starts_with("http://") || server_url.starts_with("https://")) {
            return Err(ApiError::InvalidUrl(format!(
                "server URL must start with http:// or https://: {}",
                server_url
            )));
        }

        let http = Client::builder()
            .build()
            .map_err(|e| ApiError::network(format!("failed to create HTTP client: {}", e)))?;
        let routes = Arc::new(RouteResolver::new(http.clone(), server_url, route_retry, timeout));

        Ok(Self {
            http,
            server_url: server_url.to_string(),
            timeout,
            routes,
        })
    }

    /// Server base URL without trailing slash.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Default per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Shared route resolver.
    pub fn routes(&self) -> &Arc<RouteResolver> {
        &self.routes
    }

    /// Absolute URL for an API path, resolving the prefix if needed.
    pub async fn endpoint(&self, path: &str) -> String {
        let prefix = self.routes.resolve().await;
        format!("{}{}{}", self.server_url, prefix, path)
    }

    fn context(&self, options: &RequestOptions) -> CallContext {
        CallContext {
            timeout: options.timeout.unwrap_or(self.timeout),
            cancel: options.cancel.clone(),
        }
    }

    fn apply(&self, mut builder: reqwest::RequestBuilder, options: &RequestOptions) -> reqwest::RequestBuilder {
        if let Some(key) = &options.idempotency_key {
            builder = builder.header(HEADER_IDEMPOTENCY_KEY, key);
        }
        if let Some(token) = &options.bearer_token {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    /// POST a JSON body. Returns the response whatever its status.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: &RequestOptions,
    ) -> ApiResult<ApiResponse> {
        let ctx = self.context(options);
        if ctx.is_cancelled() {
            return Err(cedros_resilience::ResilienceError::Cancelled.into());
        }

        let url = self.endpoint(path).await;
        debug!(url = %url, idempotency_key = ?options.idempotency_key, "POST");

        let request = self.apply(self.http.post(&url).json(body), options);
        let response = ctx
            .run(async move {
                let response = request.send().await?;
                ApiResponse::read(response).await
            })
            .await?;

        debug!(url = %url, status = response.status(), "Response received");
        Ok(response)
    }

    /// GET an API path. Returns the response whatever its status.
    pub async fn get(&self, path: &str, options: &RequestOptions) -> ApiResult<ApiResponse> {
        let ctx = self.context(options);
        if ctx.is_cancelled() {
            return Err(cedros_resilience::ResilienceError::Cancelled.into());
        }

        let url = self.endpoint(path).await;
        debug!(url = %url, "GET");

        let request = self.apply(self.http.get(&url), options);
        ctx.run(async move {
            let response = request.send().await?;
            ApiResponse::read(response).await
        })
        .await
    }
}
