//! Top-level error type and the mapping to user-facing errors.

use thiserror::Error;

use cedros_checkout::CheckoutError;
use cedros_http::ApiError;
use cedros_resilience::error::whole_seconds;
use cedros_resilience::ResilienceError;
use cedros_types::{ErrorCode, UserFacingError};
use cedros_x402::X402Error;

/// Result type for Cedros Pay operations.
pub type PayResult<T> = Result<T, PayError>;

/// Any error a Cedros Pay manager can return.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayError {
    /// Configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport, status, admission or deadline error.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// On-chain rail error.
    #[error(transparent)]
    X402(#[from] X402Error),

    /// Card or credits rail error.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

impl PayError {
    /// Create a new Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Underlying transport error, whichever rail produced it.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) | Self::X402(X402Error::Api(e)) | Self::Checkout(CheckoutError::Api(e)) => {
                Some(e)
            }
            _ => None,
        }
    }

    /// Underlying resilience error, if any.
    pub fn resilience_error(&self) -> Option<&ResilienceError> {
        match self.api_error() {
            Some(ApiError::Resilience(e)) => Some(e),
            _ => None,
        }
    }

    /// Check if this error is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Api(e) => e.is_retryable(),
            Self::X402(e) => e.is_retryable(),
            Self::Checkout(e) => e.is_retryable(),
        }
    }

    /// Local refusal (rate limit, open circuit, duplicate).
    pub fn is_admission(&self) -> bool {
        self.resilience_error().is_some_and(ResilienceError::is_admission)
    }

    /// Business code for this error, if any.
    pub fn business_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Config(_) => None,
            Self::Api(e) => e.business_code(),
            Self::X402(e) => e.business_code(),
            Self::Checkout(e) => e.business_code(),
        }
    }

    /// Returns a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &str {
        match self {
            Self::Config(_) => "Check the Cedros Pay configuration",
            Self::Api(e) => e.suggestion(),
            Self::X402(e) => e.suggestion(),
            Self::Checkout(e) => e.suggestion(),
        }
    }

    /// Map to the error shape handed to UI callers.
    ///
    /// Raw transport text never reaches the result.
    pub fn to_user_facing(&self) -> UserFacingError {
        if let Some(e) = self.resilience_error() {
            return resilience_user_facing(e);
        }

        // Known business codes win over everything else.
        match self.business_code() {
            Some(ErrorCode::Unknown) => return UserFacingError::generic(self.is_retryable()),
            Some(code) => return UserFacingError::from_code(code),
            None => {}
        }

        match self {
            Self::Config(_) => UserFacingError::new(
                "CONFIGURATION_ERROR",
                "Payments are not configured correctly for this site.",
                false,
            ),
            Self::Api(e) => api_user_facing(e),
            Self::X402(e) => x402_user_facing(e),
            Self::Checkout(e) => checkout_user_facing(e),
        }
    }
}

impl From<ResilienceError> for PayError {
    fn from(e: ResilienceError) -> Self {
        Self::Api(ApiError::Resilience(e))
    }
}

fn resilience_user_facing(e: &ResilienceError) -> UserFacingError {
    match e {
        ResilienceError::CircuitOpen { retry_after, .. } => UserFacingError::new(
            "SERVICE_UNAVAILABLE",
            format!(
                "Service temporarily unavailable. Please try again in {}s.",
                whole_seconds(retry_after)
            ),
            true,
        ),
        ResilienceError::RateLimited { .. } => UserFacingError::from_code(ErrorCode::RateLimited),
        ResilienceError::Duplicate { .. } => UserFacingError::new(
            "DUPLICATE_REQUEST",
            "This payment is already being processed.",
            false,
        ),
        ResilienceError::TimedOut { .. } => UserFacingError::new(
            "TIMEOUT",
            "The payment service took too long to respond. Please try again.",
            true,
        ),
        ResilienceError::Cancelled => UserFacingError::new("CANCELLED", "The payment was cancelled.", false),
    }
}

fn api_user_facing(e: &ApiError) -> UserFacingError {
    match e {
        ApiError::Network(_) => UserFacingError::new(
            "NETWORK_ERROR",
            "Could not reach the payment service. Check your connection and try again.",
            true,
        ),
        ApiError::Status { status: 429, .. } => UserFacingError::from_code(ErrorCode::RateLimited),
        ApiError::Status { status, .. } if *status >= 500 => {
            UserFacingError::from_code(ErrorCode::ServiceUnavailable)
        }
        ApiError::Decode(_) => protocol_user_facing(),
        ApiError::Status { .. } | ApiError::InvalidUrl(_) | ApiError::Resilience(_) => {
            UserFacingError::generic(e.is_retryable())
        }
    }
}

fn x402_user_facing(e: &X402Error) -> UserFacingError {
    match e {
        X402Error::Api(api) => api_user_facing(api),
        X402Error::UnknownAsset { .. } => UserFacingError::new(
            "UNSUPPORTED_TOKEN",
            "This token is not on the list of supported payment tokens.",
            false,
        ),
        X402Error::Wallet(_) => UserFacingError::new(
            "WALLET_ERROR",
            "Your wallet did not approve the transaction.",
            true,
        ),
        X402Error::WalletNotConnected => UserFacingError::new(
            "WALLET_NOT_CONNECTED",
            "Connect your wallet to continue.",
            false,
        ),
        X402Error::Chain(_) => UserFacingError::new(
            "NETWORK_ERROR",
            "Could not reach the Solana network. Please try again.",
            true,
        ),
        X402Error::SettlementRejected { .. } => {
            UserFacingError::from_code(ErrorCode::PaymentVerificationFailed)
        }
        X402Error::InvalidStage { .. } => UserFacingError::generic(false),
        _ if e.is_protocol() => protocol_user_facing(),
        _ => UserFacingError::generic(e.is_retryable()),
    }
}

fn checkout_user_facing(e: &CheckoutError) -> UserFacingError {
    match e {
        CheckoutError::Api(api) => api_user_facing(api),
        CheckoutError::Declined { .. } => {
            UserFacingError::new("PAYMENT_DECLINED", "Your payment was declined.", false)
        }
        CheckoutError::Redirect(_) => UserFacingError::new(
            "REDIRECT_FAILED",
            "Could not open the checkout page. Please try again.",
            true,
        ),
        CheckoutError::InvalidRequest { .. } | CheckoutError::Unauthenticated => {
            UserFacingError::generic(false)
        }
    }
}

fn protocol_user_facing() -> UserFacingError {
    UserFacingError::new(
        "PROTOCOL_ERROR",
        "The payment server sent a response we could not understand. Please try again later.",
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_circuit_open_is_calm() {
        let err: PayError = X402Error::from(ResilienceError::circuit_open(
            "onchain-protocol",
            Duration::from_millis(29_400),
        ))
        .into();
        let user = err.to_user_facing();
        assert_eq!(user.code, "SERVICE_UNAVAILABLE");
        assert_eq!(
            user.message,
            "Service temporarily unavailable. Please try again in 30s."
        );
        assert!(user.retryable);
        assert!(!user.message.contains("onchain-protocol"));
        assert!(err.is_admission());
    }

    #[test]
    fn test_business_code_uses_table() {
        let err = PayError::X402(X402Error::Api(ApiError::from_status(
            400,
            r#"{"error": {"code": "coupon_expired", "message": "coupon SUMMER ended 2024-01-01"}}"#,
        )));
        let user = err.to_user_facing();
        assert_eq!(user.message, ErrorCode::CouponExpired.message());
        assert!(!user.message.contains("SUMMER"));
    }

    #[test]
    fn test_unknown_code_falls_back() {
        let err = PayError::Api(ApiError::from_status(
            409,
            r#"{"code": "brand_new_code", "message": "internal detail"}"#,
        ));
        let user = err.to_user_facing();
        assert_eq!(user, UserFacingError::generic(false));
    }

    #[test]
    fn test_transport_text_never_leaks() {
        let err = PayError::Api(ApiError::network("tcp connect error: 10.0.0.7:443 refused"));
        let user = err.to_user_facing();
        assert_eq!(user.code, "NETWORK_ERROR");
        assert!(user.retryable);
        assert!(!user.message.contains("10.0.0.7"));

        let err = PayError::Api(ApiError::from_status(503, ""));
        assert_eq!(
            err.to_user_facing(),
            UserFacingError::from_code(ErrorCode::ServiceUnavailable)
        );
    }

    #[test]
    fn test_protocol_errors_are_distinct() {
        let err = PayError::X402(X402Error::malformed_settlement("bad base64"));
        let user = err.to_user_facing();
        assert_eq!(user.code, "PROTOCOL_ERROR");
        assert!(!user.retryable);

        let err = PayError::X402(X402Error::UnknownAsset { mint: "So11".into() });
        assert_eq!(err.to_user_facing().code, "UNSUPPORTED_TOKEN");
    }

    #[test]
    fn test_insufficient_balance_maps_to_funds_message() {
        let err = PayError::X402(X402Error::InsufficientBalance { have: 1, need: 2 });
        assert_eq!(
            err.to_user_facing(),
            UserFacingError::from_code(ErrorCode::InsufficientFunds)
        );
    }

    #[test]
    fn test_timeout_and_cancel() {
        let timed_out: PayError = ResilienceError::TimedOut {
            after: Duration::from_secs(15),
        }
        .into();
        assert!(timed_out.is_retryable());
        assert_eq!(timed_out.to_user_facing().code, "TIMEOUT");

        let cancelled: PayError = ResilienceError::Cancelled.into();
        assert!(!cancelled.to_user_facing().retryable);
    }

    #[test]
    fn test_credits_unauthenticated() {
        let err = PayError::Checkout(CheckoutError::Unauthenticated);
        assert_eq!(
            err.to_user_facing(),
            UserFacingError::from_code(ErrorCode::Unauthorized)
        );
    }
}
