//! Hosted card checkout.
//!
//! The card rail only creates a processor session and hands it to a
//! [`CheckoutRedirector`]; the processor collects the card.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cedros_http::{new_idempotency_key, ApiClient, RequestOptions};
use cedros_resilience::{CancellationToken, CircuitBreaker, RateLimitPreset, RateLimiter};
use cedros_types::constants::{CHECKOUT_SESSION_PATH, CIRCUIT_CARD_CHECKOUT};

use crate::error::{CheckoutError, CheckoutResult};
use crate::guard::{guarded, RailConfig};

/// Opens a hosted checkout session for the user.
#[async_trait]
pub trait CheckoutRedirector: Send + Sync {
    async fn redirect_to_checkout(&self, session: &CheckoutSession) -> CheckoutResult<()>;
}

/// Card checkout request.
#[derive(Debug, Clone, Default)]
pub struct CheckoutRequest {
    pub resource: String,
    pub customer_email: Option<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
    pub coupon_code: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub cancel: Option<CancellationToken>,
}

impl CheckoutRequest {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn with_urls(mut self, success_url: impl Into<String>, cancel_url: impl Into<String>) -> Self {
        self.success_url = Some(success_url.into());
        self.cancel_url = Some(cancel_url.into());
        self
    }

    pub fn with_coupon(mut self, code: impl Into<String>) -> Self {
        self.coupon_code = Some(code.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionBody<'a> {
    resource: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    success_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cancel_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    coupon_code: Option<&'a str>,
    metadata: &'a BTreeMap<String, String>,
}

/// Processor session created by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Card-rail manager.
#[derive(Debug)]
pub struct HostedCheckoutManager {
    api: ApiClient,
    config: RailConfig,
    breaker: CircuitBreaker,
    limiter: RateLimiter,
}

impl HostedCheckoutManager {
    pub fn new(api: ApiClient, config: RailConfig) -> Self {
        Self {
            breaker: CircuitBreaker::new(CIRCUIT_CARD_CHECKOUT, config.breaker),
            limiter: RateLimitPreset::Strict.limiter("checkout-session"),
            api,
            config,
        }
    }

    /// The `card-checkout` circuit.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Create a processor session. One idempotency key covers every retry.
    pub async fn create_session(&self, request: &CheckoutRequest) -> CheckoutResult<CheckoutSession> {
        if request.resource.trim().is_empty() {
            return Err(CheckoutError::invalid_request("missing resource"));
        }

        let body = SessionBody {
            resource: &request.resource,
            customer_email: request.customer_email.as_deref(),
            success_url: request.success_url.as_deref(),
            cancel_url: request.cancel_url.as_deref(),
            coupon_code: request.coupon_code.as_deref(),
            metadata: &request.metadata,
        };
        let options = RequestOptions::idempotent(new_idempotency_key()).cancellable(request.cancel.clone());
        let (body, options) = (&body, &options);

        let session = guarded(&self.limiter, &self.config.retry, &self.breaker, move || async move {
            let response = self
                .api
                .post_json(CHECKOUT_SESSION_PATH, body, options)
                .await?
                .accept(&[])?;
            let session: CheckoutSession = response.json()?;
            Ok::<_, CheckoutError>(session)
        })
        .await?;

        if session.session_id.trim().is_empty() {
            return Err(CheckoutError::Api(cedros_http::ApiError::decode(
                "checkout session without sessionId",
            )));
        }

        debug!(
            resource = %request.resource,
            session_id = %session.session_id,
            "Checkout session created"
        );
        Ok(session)
    }

    /// Create a session and hand it to `redirector`.
    pub async fn process_payment(
        &self,
        request: &CheckoutRequest,
        redirector: &dyn CheckoutRedirector,
    ) -> CheckoutResult<CheckoutSession> {
        let session = self.create_session(request).await?;
        redirector.redirect_to_checkout(&session).await?;
        info!(
            resource = %request.resource,
            session_id = %session.session_id,
            "Redirected to hosted checkout"
        );
        Ok(session)
    }
}
