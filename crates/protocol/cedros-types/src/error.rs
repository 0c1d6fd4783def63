//! Business error codes and the user-facing error shape.
//!
//! The paywall backend reports business failures as structured codes
//! (`{"error": {"code": "quote_expired", "message": "..."}}`). This module
//! maps every known code to a calm, stable message for end users, with a
//! generic fallback for codes this client does not know yet.

use serde::{Deserialize, Serialize};

/// Business error codes issued by the paywall backend.
///
/// Wire form is lower snake case. Codes not in this table decode to
/// [`ErrorCode::Unknown`] and keep the generic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    // =========================================================================
    // Payment errors
    // =========================================================================
    /// Payer's token balance is below the required amount
    InsufficientFunds,
    /// Quote validity window has passed
    QuoteExpired,
    /// Amount in the proof differs from the quoted amount
    AmountMismatch,
    /// Proof could not be verified on chain
    PaymentVerificationFailed,
    /// Transaction signature is invalid
    InvalidSignature,
    /// Transaction was submitted but failed on chain
    TransactionFailed,
    /// Transaction signature is unknown to the cluster
    TransactionNotFound,
    /// Transfer destination is not the quoted recipient
    InvalidRecipient,
    /// Token mint is not accepted for this resource
    InvalidTokenMint,
    /// Resource was already paid for with this proof
    AlreadyPaid,

    // =========================================================================
    // Coupon errors
    // =========================================================================
    /// Coupon code does not exist or does not apply
    InvalidCoupon,
    /// Coupon code is past its end date
    CouponExpired,
    /// Coupon code has reached its redemption limit
    CouponExhausted,

    // =========================================================================
    // Resource / session errors
    // =========================================================================
    /// Resource id is not known to the paywall
    ResourceNotFound,
    /// Cart contains an invalid or empty item list
    InvalidCart,
    /// Hosted checkout session expired before completion
    SessionExpired,

    // =========================================================================
    // Credits errors
    // =========================================================================
    /// Credits balance is below the required amount
    InsufficientCredits,
    /// Credits hold expired before authorization
    HoldExpired,
    /// Caller is not authenticated for the credits rail
    Unauthorized,

    // =========================================================================
    // Server errors
    // =========================================================================
    /// Backend refused the request due to its own rate limit
    RateLimited,
    /// Backend is temporarily unavailable
    ServiceUnavailable,
    /// Backend failed unexpectedly
    InternalError,

    /// Any code not in this table
    #[serde(other)]
    Unknown,
}

/// Generic message for codes without a specific entry.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong with your payment. Please try again.";

impl ErrorCode {
    /// Decode a wire code. Case-insensitive; unknown codes map to `Unknown`.
    pub fn from_wire(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "insufficient_funds" | "insufficient_balance" => Self::InsufficientFunds,
            "quote_expired" => Self::QuoteExpired,
            "amount_mismatch" => Self::AmountMismatch,
            "payment_verification_failed" | "verification_failed" => {
                Self::PaymentVerificationFailed
            }
            "invalid_signature" => Self::InvalidSignature,
            "transaction_failed" => Self::TransactionFailed,
            "transaction_not_found" => Self::TransactionNotFound,
            "invalid_recipient" => Self::InvalidRecipient,
            "invalid_token_mint" => Self::InvalidTokenMint,
            "already_paid" => Self::AlreadyPaid,
            "invalid_coupon" | "coupon_not_found" => Self::InvalidCoupon,
            "coupon_expired" => Self::CouponExpired,
            "coupon_exhausted" | "coupon_usage_limit_reached" => Self::CouponExhausted,
            "resource_not_found" => Self::ResourceNotFound,
            "invalid_cart" | "empty_cart" => Self::InvalidCart,
            "session_expired" => Self::SessionExpired,
            "insufficient_credits" => Self::InsufficientCredits,
            "hold_expired" => Self::HoldExpired,
            "unauthorized" => Self::Unauthorized,
            "rate_limited" | "rate_limit_exceeded" => Self::RateLimited,
            "service_unavailable" => Self::ServiceUnavailable,
            "internal_error" => Self::InternalError,
            _ => Self::Unknown,
        }
    }

    /// Wire form of this code.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::InsufficientFunds => "insufficient_funds",
            Self::QuoteExpired => "quote_expired",
            Self::AmountMismatch => "amount_mismatch",
            Self::PaymentVerificationFailed => "payment_verification_failed",
            Self::InvalidSignature => "invalid_signature",
            Self::TransactionFailed => "transaction_failed",
            Self::TransactionNotFound => "transaction_not_found",
            Self::InvalidRecipient => "invalid_recipient",
            Self::InvalidTokenMint => "invalid_token_mint",
            Self::AlreadyPaid => "already_paid",
            Self::InvalidCoupon => "invalid_coupon",
            Self::CouponExpired => "coupon_expired",
            Self::CouponExhausted => "coupon_exhausted",
            Self::ResourceNotFound => "resource_not_found",
            Self::InvalidCart => "invalid_cart",
            Self::SessionExpired => "session_expired",
            Self::InsufficientCredits => "insufficient_credits",
            Self::HoldExpired => "hold_expired",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::ServiceUnavailable => "service_unavailable",
            Self::InternalError => "internal_error",
            Self::Unknown => "unknown",
        }
    }

    /// Message shown to end users for this code.
    pub fn message(&self) -> &'static str {
        match self {
            // Payment errors
            Self::InsufficientFunds => "Your wallet does not have enough funds for this payment.",
            Self::QuoteExpired => "This price quote has expired. Please try again for a fresh quote.",
            Self::AmountMismatch => "The payment amount did not match the quoted price.",
            Self::PaymentVerificationFailed => "We could not verify your payment. Please try again.",
            Self::InvalidSignature => "The transaction signature was rejected. Please try again.",
            Self::TransactionFailed => "The transaction failed on chain. No funds were taken.",
            Self::TransactionNotFound => "The transaction could not be found. It may still be confirming.",
            Self::InvalidRecipient => "The payment was sent to the wrong recipient.",
            Self::InvalidTokenMint => "This token is not accepted for this purchase.",
            Self::AlreadyPaid => "This purchase has already been paid for.",

            // Coupon errors
            Self::InvalidCoupon => "This coupon code is not valid.",
            Self::CouponExpired => "This coupon code has expired.",
            Self::CouponExhausted => "This coupon code has reached its usage limit.",

            // Resource / session errors
            Self::ResourceNotFound => "This item is no longer available.",
            Self::InvalidCart => "Your cart could not be priced. Please review the items.",
            Self::SessionExpired => "Your checkout session expired. Please start again.",

            // Credits errors
            Self::InsufficientCredits => "You do not have enough credits for this purchase.",
            Self::HoldExpired => "The credits reservation expired. Please try again.",
            Self::Unauthorized => "Please sign in to pay with credits.",

            // Server errors
            Self::RateLimited => "Too many requests. Please wait a moment and try again.",
            Self::ServiceUnavailable => "The payment service is temporarily unavailable.",
            Self::InternalError => GENERIC_ERROR_MESSAGE,
            Self::Unknown => GENERIC_ERROR_MESSAGE,
        }
    }

    /// Whether a user retry can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::QuoteExpired
                | Self::PaymentVerificationFailed
                | Self::InvalidSignature
                | Self::TransactionFailed
                | Self::TransactionNotFound
                | Self::SessionExpired
                | Self::HoldExpired
                | Self::RateLimited
                | Self::ServiceUnavailable
                | Self::InternalError
        )
    }

    /// Get an operator-facing hint for recovering from this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InsufficientFunds => Some("Fund the payer's token account and retry."),
            Self::QuoteExpired => Some("Request a new quote; do not reuse a displayed requirement."),
            Self::AmountMismatch | Self::InvalidRecipient => {
                Some("Rebuild the transaction from the latest quote.")
            }
            Self::InvalidTokenMint => Some("Check the mint against the stable asset allow-list."),
            Self::InvalidCoupon | Self::CouponExpired | Self::CouponExhausted => {
                Some("Remove the coupon code or try a different one.")
            }
            Self::ResourceNotFound => Some("Verify the resource id configured on the paywall."),
            Self::Unauthorized => Some("Pass a valid bearer token to the credits rail."),
            Self::RateLimited => Some("Wait before retrying. Consider reducing request frequency."),
            Self::ServiceUnavailable => Some("Check the server health endpoint."),
            _ => None,
        }
    }

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InsufficientFunds
            | Self::QuoteExpired
            | Self::AmountMismatch
            | Self::PaymentVerificationFailed
            | Self::InvalidSignature
            | Self::TransactionFailed
            | Self::TransactionNotFound
            | Self::InvalidRecipient
            | Self::InvalidTokenMint
            | Self::AlreadyPaid => "Payment",
            Self::InvalidCoupon | Self::CouponExpired | Self::CouponExhausted => "Coupon",
            Self::ResourceNotFound | Self::InvalidCart | Self::SessionExpired => "Resource",
            Self::InsufficientCredits | Self::HoldExpired | Self::Unauthorized => "Credits",
            Self::RateLimited | Self::ServiceUnavailable | Self::InternalError | Self::Unknown => {
                "Server"
            }
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_wire().to_ascii_uppercase())
    }
}

/// Error shape handed to UI callers.
///
/// Never carries raw transport text: `message` is either a table message,
/// a server-provided business message, or one of the fixed calm messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFacingError {
    /// Stable machine-readable code (upper snake case)
    pub code: String,
    /// Message safe to show to end users
    pub message: String,
    /// Whether retrying the same action may succeed
    pub retryable: bool,
}

impl UserFacingError {
    /// Create a user-facing error with an explicit code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }

    /// Build from a business code using the static message table.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code.to_string(), code.message(), code.is_retryable())
    }

    /// Generic fallback.
    pub fn generic(retryable: bool) -> Self {
        Self::new("UNKNOWN", GENERIC_ERROR_MESSAGE, retryable)
    }
}

impl std::fmt::Display for UserFacingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UserFacingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_wire_known_codes() {
        assert_eq!(ErrorCode::from_wire("quote_expired"), ErrorCode::QuoteExpired);
        assert_eq!(ErrorCode::from_wire("INSUFFICIENT_FUNDS"), ErrorCode::InsufficientFunds);
        assert_eq!(ErrorCode::from_wire(" invalid_coupon "), ErrorCode::InvalidCoupon);
        assert_eq!(ErrorCode::from_wire("empty_cart"), ErrorCode::InvalidCart);
    }

    #[test]
    fn test_from_wire_unknown_falls_back() {
        let code = ErrorCode::from_wire("flux_capacitor_overheated");
        assert_eq!(code, ErrorCode::Unknown);
        assert_eq!(code.message(), GENERIC_ERROR_MESSAGE);
        assert!(!code.is_retryable());
    }

    #[test]
    fn test_wire_roundtrip_for_every_named_code() {
        let codes = [
            ErrorCode::InsufficientFunds,
            ErrorCode::QuoteExpired,
            ErrorCode::CouponExhausted,
            ErrorCode::HoldExpired,
            ErrorCode::ServiceUnavailable,
        ];
        for code in codes {
            assert_eq!(ErrorCode::from_wire(code.as_wire()), code);
        }
    }

    #[test]
    fn test_display_is_upper_snake() {
        assert_eq!(ErrorCode::QuoteExpired.to_string(), "QUOTE_EXPIRED");
        assert_eq!(ErrorCode::Unknown.to_string(), "UNKNOWN");
    }

    #[test]
    fn test_serde_unknown_variant() {
        let code: ErrorCode = serde_json::from_str("\"coupon_expired\"").unwrap();
        assert_eq!(code, ErrorCode::CouponExpired);

        let code: ErrorCode = serde_json::from_str("\"brand_new_code\"").unwrap();
        assert_eq!(code, ErrorCode::Unknown);
    }

    #[test]
    fn test_categories() {
        assert_eq!(ErrorCode::InsufficientFunds.category(), "Payment");
        assert_eq!(ErrorCode::InvalidCoupon.category(), "Coupon");
        assert_eq!(ErrorCode::HoldExpired.category(), "Credits");
        assert_eq!(ErrorCode::Unknown.category(), "Server");
    }

    #[test]
    fn test_user_facing_from_code() {
        let err = UserFacingError::from_code(ErrorCode::InsufficientFunds);
        assert_eq!(err.code, "INSUFFICIENT_FUNDS");
        assert!(!err.retryable);
        assert_eq!(err.to_string(), ErrorCode::InsufficientFunds.message());
    }

    #[test]
    fn test_user_facing_serializes() {
        let err = UserFacingError::generic(true);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "UNKNOWN");
        assert_eq!(json["retryable"], true);
    }
}
