//! HTTP transport for the Cedros paywall API.
//!
//! - [`ApiClient`]: route-prefixed JSON requests with deadlines,
//!   cancellation and idempotency keys
//! - [`RouteResolver`]: one-time discovery of the API path prefix
//! - [`ApiError`]: status and body mapping, including business codes
//!
//! # Example
//!
//! ```no_run
//! use cedros_http::{ApiClient, RequestOptions, new_idempotency_key};
//! use serde_json::json;
//!
//! # async fn example() -> cedros_http::ApiResult<()> {
//! let client = ApiClient::new("https://pay.example.com")?;
//! let response = client
//!     .post_json(
//!         "/paywall/v1/quote",
//!         &json!({ "resource": "article-1" }),
//!         &RequestOptions::idempotent(new_idempotency_key()),
//!     )
//!     .await?
//!     .accept(&[402])?;
//! println!("status {}", response.status());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod route;

pub use client::{new_idempotency_key, ApiClient, ApiResponse, RequestOptions};
pub use error::{ApiError, ApiResult};
pub use route::{normalize_prefix, RouteResolver};
