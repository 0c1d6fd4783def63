//! Error types for the x402 payment flow.

use thiserror::Error;

use cedros_http::ApiError;
use cedros_resilience::ResilienceError;
use cedros_types::ErrorCode;

/// Result type for x402 operations.
pub type X402Result<T> = Result<T, X402Error>;

/// Errors that can occur while quoting, building, signing or settling an
/// x402 payment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum X402Error {
    /// Transport, status, admission or deadline error.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Quote is missing a required field or carries an unusable value.
    #[error("invalid payment requirement: {reason}")]
    InvalidRequirement {
        /// What is wrong
        reason: String,
    },

    /// Mint is not in the stable asset allow-list.
    #[error("unknown asset mint {mint}")]
    UnknownAsset {
        /// The rejected mint
        mint: String,
    },

    /// `X-PAYMENT-RESPONSE` was present but could not be decoded.
    #[error("malformed settlement header: {reason}")]
    MalformedSettlement {
        /// Decode failure
        reason: String,
    },

    /// Transaction could not be built, decoded or encoded.
    #[error("invalid transaction: {reason}")]
    InvalidTransaction {
        /// What is wrong
        reason: String,
    },

    /// Backend-built gasless transaction names a different fee payer.
    #[error("fee payer mismatch: expected {expected}, got {actual}")]
    FeePayerMismatch {
        /// Fee payer from the quote
        expected: String,
        /// Fee payer in the transaction
        actual: String,
    },

    /// Payer token balance is below the quoted amount.
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance {
        /// Available minor units
        have: u64,
        /// Required minor units
        need: u64,
    },

    /// Wallet refused or failed to sign.
    #[error("wallet error: {0}")]
    Wallet(String),

    /// Wallet has no public key.
    #[error("wallet not connected")]
    WalletNotConnected,

    /// Chain RPC failure.
    #[error("chain RPC error: {0}")]
    Chain(String),

    /// Server accepted the request but reported the settlement as failed.
    #[error("settlement rejected: {reason}")]
    SettlementRejected {
        /// Server-provided reason
        reason: String,
    },

    /// Payment stage moved out of order.
    #[error("invalid payment stage transition {from} -> {to}")]
    InvalidStage {
        /// Current stage
        from: String,
        /// Requested stage
        to: String,
    },
}

impl X402Error {
    /// Create a new InvalidRequirement error.
    pub fn invalid_requirement(reason: impl Into<String>) -> Self {
        Self::InvalidRequirement {
            reason: reason.into(),
        }
    }

    /// Create a new InvalidTransaction error.
    pub fn invalid_transaction(reason: impl Into<String>) -> Self {
        Self::InvalidTransaction {
            reason: reason.into(),
        }
    }

    /// Create a new MalformedSettlement error.
    pub fn malformed_settlement(reason: impl Into<String>) -> Self {
        Self::MalformedSettlement {
            reason: reason.into(),
        }
    }

    /// Create a new Wallet error.
    pub fn wallet(msg: impl Into<String>) -> Self {
        Self::Wallet(msg.into())
    }

    /// Create a new Chain error.
    pub fn chain(msg: impl Into<String>) -> Self {
        Self::Chain(msg.into())
    }

    /// Returns true if this error is transient and the operation may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api(e) => e.is_retryable(),
            Self::Chain(_) => true,
            _ => false,
        }
    }

    /// Local refusal (rate limit, open circuit, duplicate).
    pub fn is_admission(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_admission())
    }

    /// Protocol violation by the server or the quote; never retried.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequirement { .. }
                | Self::UnknownAsset { .. }
                | Self::MalformedSettlement { .. }
                | Self::InvalidTransaction { .. }
                | Self::FeePayerMismatch { .. }
                | Self::Api(ApiError::Decode(_))
        )
    }

    /// Business code for this error, if any.
    pub fn business_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api(e) => e.business_code(),
            Self::InsufficientBalance { .. } => Some(ErrorCode::InsufficientFunds),
            _ => None,
        }
    }

    /// Returns a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &str {
        match self {
            Self::Api(e) => e.suggestion(),
            Self::InvalidRequirement { .. } => "The server sent an incomplete quote; check server version",
            Self::UnknownAsset { .. } => "Enable allow_unknown_mints only if you trust this token",
            Self::MalformedSettlement { .. } => "The server settlement header is corrupt; check server version",
            Self::InvalidTransaction { .. } => "Request a fresh quote and rebuild the transaction",
            Self::FeePayerMismatch { .. } => "The gasless transaction does not match the quote; do not sign it",
            Self::InsufficientBalance { .. } => "Fund the payer's token account",
            Self::Wallet(_) => "Approve the request in your wallet",
            Self::WalletNotConnected => "Connect a wallet first",
            Self::Chain(_) => "Check the Solana RPC endpoint",
            Self::SettlementRejected { .. } => "Request a fresh quote and try again",
            Self::InvalidStage { .. } => "This is an internal error; please report it",
        }
    }
}

impl From<ResilienceError> for X402Error {
    fn from(e: ResilienceError) -> Self {
        Self::Api(ApiError::Resilience(e))
    }
}
