//! Error types for the HTTP transport.

use serde::Deserialize;
use thiserror::Error;

use cedros_resilience::ResilienceError;
use cedros_types::ErrorCode;

/// Result type for transport operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors talking to the paywall backend.
///
/// `Clone` so one failure can be shared by every coalesced caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Connection-level failure (DNS, refused, reset, TLS).
    #[error("network error: {0}")]
    Network(String),

    /// Server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Business error code from the body, if the server sent one
        code: Option<String>,
        /// Server message, or the canonical reason phrase
        message: String,
    },

    /// Body or header could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// Server URL or path is unusable.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Local admission, deadline, or cancellation.
    #[error(transparent)]
    Resilience(#[from] ResilienceError),
}

impl ApiError {
    /// Create a new Network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new Decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a Status error from a response status and body.
    ///
    /// Understands `{"error": {"code", "message"}}`, `{"code", "message"}`
    /// and `{"error": "message"}`.
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorBody>(body).ok();
        let (code, message) = match parsed {
            Some(ErrorBody::Nested { error }) => (error.code, error.message),
            Some(ErrorBody::Flat { code, message }) => (code, message),
            Some(ErrorBody::Plain { error }) => (None, Some(error)),
            None => (None, None),
        };
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| reason_phrase(status).to_string());
        Self::Status {
            status,
            code,
            message,
        }
    }

    /// HTTP status, if this error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Business error code carried by the response body.
    pub fn business_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Status { code: Some(code), .. } => Some(ErrorCode::from_wire(code)),
            _ => None,
        }
    }

    /// Local refusal that must not be retried.
    pub fn is_admission(&self) -> bool {
        matches!(self, Self::Resilience(e) if e.is_admission())
    }

    /// Check if this error is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            Self::Resilience(e) => e.is_retryable(),
            Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }

    /// Returns a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &str {
        match self {
            Self::Network(_) => "Check network connectivity to the payment server",
            Self::Status { status, .. } if *status >= 500 => "The payment server is having trouble; retry shortly",
            Self::Status { .. } => "Check the request parameters",
            Self::Decode(_) => "The server response was not understood; check server version",
            Self::InvalidUrl(_) => "Check the configured server URL",
            Self::Resilience(_) => "Wait a moment before retrying",
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else if e.is_builder() {
            Self::InvalidUrl(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Nested { error: ErrorDetail },
    Plain { error: String },
    Flat {
        code: Option<String>,
        message: Option<String>,
    },
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

fn reason_phrase(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("unexpected status")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_nested_error_body() {
        let err = ApiError::from_status(
            400,
            r#"{"error":{"code":"invalid_coupon","message":"Coupon SAVE10 is not valid"}}"#,
        );
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.business_code(), Some(ErrorCode::InvalidCoupon));
        assert_eq!(err.to_string(), "HTTP 400: Coupon SAVE10 is not valid");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_flat_error_body() {
        let err = ApiError::from_status(409, r#"{"code":"already_paid","message":"paid"}"#);
        assert_eq!(err.business_code(), Some(ErrorCode::AlreadyPaid));
    }

    #[test]
    fn test_plain_error_body() {
        let err = ApiError::from_status(500, r#"{"error":"database unavailable"}"#);
        assert_eq!(err.business_code(), None);
        assert_eq!(err.to_string(), "HTTP 500: database unavailable");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_unparseable_body_uses_reason() {
        let err = ApiError::from_status(503, "<html>oops</html>");
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
        assert!(err.is_retryable());

        let err = ApiError::from_status(429, "");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_admission_not_retryable() {
        let err: ApiError = ResilienceError::circuit_open("credits", Duration::from_secs(3)).into();
        assert!(err.is_admission());
        assert!(!err.is_retryable());

        let err: ApiError = ResilienceError::TimedOut {
            after: Duration::from_secs(15),
        }
        .into();
        assert!(!err.is_admission());
        assert!(err.is_retryable());
    }
}
