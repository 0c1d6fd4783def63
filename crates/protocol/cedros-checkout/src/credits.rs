//! Credits rail: reserve a hold, then authorize it.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use cedros_http::{new_idempotency_key, ApiClient, RequestOptions};
use cedros_resilience::{CircuitBreaker, RateLimitPreset, RateLimiter};
use cedros_types::constants::{CIRCUIT_CREDITS, CREDITS_AUTHORIZE_PATH, CREDITS_HOLD_PATH};
use cedros_x402::SettlementResult;

use crate::error::{CheckoutError, CheckoutResult};
use crate::guard::{guarded, RailConfig};

/// Credits reserved for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsHold {
    pub hold_id: String,
    /// Credits reserved, in minor units.
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeResponse {
    success: bool,
    #[serde(default)]
    transaction_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Credits-rail manager.
#[derive(Debug)]
pub struct CreditsManager {
    api: ApiClient,
    config: RailConfig,
    breaker: CircuitBreaker,
    hold_limiter: RateLimiter,
    authorize_limiter: RateLimiter,
}

impl CreditsManager {
    pub fn new(api: ApiClient, config: RailConfig) -> Self {
        Self {
            breaker: CircuitBreaker::new(CIRCUIT_CREDITS, config.breaker),
            hold_limiter: RateLimitPreset::Strict.limiter("credits-hold"),
            authorize_limiter: RateLimitPreset::Standard.limiter("credits-authorize"),
            api,
            config,
        }
    }

    /// The `credits` circuit.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    fn options(auth_token: &str) -> CheckoutResult<RequestOptions> {
        if auth_token.trim().is_empty() {
            return Err(CheckoutError::Unauthenticated);
        }
        Ok(RequestOptions::idempotent(new_idempotency_key()).bearer(auth_token.trim()))
    }

    /// Reserve credits for `resource`.
    pub async fn create_hold(
        &self,
        resource: &str,
        coupon_code: Option<&str>,
        auth_token: &str,
    ) -> CheckoutResult<CreditsHold> {
        if resource.trim().is_empty() {
            return Err(CheckoutError::invalid_request("missing resource"));
        }
        let options = Self::options(auth_token)?;
        let mut body = json!({ "resource": resource });
        if let Some(code) = coupon_code {
            body["couponCode"] = json!(code);
        }
        let (body, options) = (&body, &options);

        let hold = guarded(&self.hold_limiter, &self.config.retry, &self.breaker, move || async move {
            let response = self
                .api
                .post_json(CREDITS_HOLD_PATH, body, options)
                .await?
                .accept(&[])?;
            let hold: CreditsHold = response.json()?;
            Ok::<_, CheckoutError>(hold)
        })
        .await?;

        debug!(resource, hold_id = %hold.hold_id, amount = hold.amount, "Credits hold created");
        Ok(hold)
    }

    /// Capture a hold.
    ///
    /// `transaction_id` falls back to the hold id when the server omits it.
    pub async fn authorize(
        &self,
        hold_id: &str,
        resource: &str,
        auth_token: &str,
    ) -> CheckoutResult<SettlementResult> {
        if hold_id.trim().is_empty() {
            return Err(CheckoutError::invalid_request("missing hold id"));
        }
        let options = Self::options(auth_token)?;
        let body = json!({ "holdId": hold_id, "resource": resource });
        let (body, options) = (&body, &options);

        let response = guarded(
            &self.authorize_limiter,
            &self.config.retry,
            &self.breaker,
            move || async move {
                let response = self
                    .api
                    .post_json(CREDITS_AUTHORIZE_PATH, body, options)
                    .await?
                    .accept(&[])?;
                let parsed: AuthorizeResponse = response.json()?;
                Ok::<_, CheckoutError>(parsed)
            },
        )
        .await?;

        if !response.success {
            return Err(CheckoutError::Declined {
                reason: response
                    .error
                    .unwrap_or_else(|| "credits authorization failed".to_string()),
            });
        }

        let result = SettlementResult {
            success: true,
            transaction_id: response
                .transaction_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| hold_id.to_string()),
            settlement: None,
        };
        info!(resource, hold_id, transaction_id = %result.transaction_id, "Credits authorized");
        Ok(result)
    }
}
