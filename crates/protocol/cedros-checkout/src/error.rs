//! Error types for the card and credits rails.

use thiserror::Error;

use cedros_http::ApiError;
use cedros_resilience::ResilienceError;
use cedros_types::ErrorCode;

/// Result type for checkout and credits operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

/// Errors from the hosted checkout and credits managers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckoutError {
    /// Transport, status, admission or deadline error.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Request is missing something the server needs.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// What is wrong
        reason: String,
    },

    /// Credits call made without an auth token.
    #[error("credits require an authenticated user")]
    Unauthenticated,

    /// Server declined to authorize the hold.
    #[error("authorization declined: {reason}")]
    Declined {
        /// Server-provided reason
        reason: String,
    },

    /// The redirector could not open the session.
    #[error("redirect failed: {0}")]
    Redirect(String),
}

impl CheckoutError {
    /// Create a new InvalidRequest error.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Create a new Redirect error.
    pub fn redirect(msg: impl Into<String>) -> Self {
        Self::Redirect(msg.into())
    }

    /// Check if this error is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Local refusal (rate limit, open circuit, duplicate).
    pub fn is_admission(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_admission())
    }

    /// Business code for this error, if any.
    pub fn business_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api(e) => e.business_code(),
            Self::Unauthenticated => Some(ErrorCode::Unauthorized),
            _ => None,
        }
    }

    /// Returns a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &str {
        match self {
            Self::Api(e) => e.suggestion(),
            Self::InvalidRequest { .. } => "Check the checkout parameters",
            Self::Unauthenticated => "Sign in before paying with credits",
            Self::Declined { .. } => "Check your credit balance",
            Self::Redirect(_) => "Open the checkout link manually",
        }
    }
}

impl From<ResilienceError> for CheckoutError {
    fn from(e: ResilienceError) -> Self {
        Self::Api(ApiError::Resilience(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_classification() {
        assert!(CheckoutError::Api(ApiError::network("reset")).is_retryable());
        assert!(!CheckoutError::invalid_request("missing resource").is_retryable());

        let open: CheckoutError =
            ResilienceError::circuit_open("card-checkout", Duration::from_secs(12)).into();
        assert!(open.is_admission());
        assert!(!open.is_retryable());
    }

    #[test]
    fn test_business_code() {
        assert_eq!(
            CheckoutError::Unauthenticated.business_code(),
            Some(ErrorCode::Unauthorized)
        );
        assert_eq!(CheckoutError::redirect("blocked").business_code(), None);
    }
}
