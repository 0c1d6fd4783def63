//! CLI error types.

use thiserror::Error;

use cedros_checkout::CheckoutError;
use cedros_http::ApiError;
use cedros_pay::PayError;
use cedros_x402::X402Error;

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error enum wrapping all crate errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Payment error from any rail.
    #[error("{0}")]
    Pay(#[from] PayError),

    /// IO error.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Keypair file missing or unreadable.
    #[error("Cannot read keypair {path}: {reason}")]
    Keypair { path: String, reason: String },

    /// No keypair configured for a command that signs.
    #[error("No keypair configured. Pass --keypair or set wallet.keypair in the config file.")]
    KeypairNotConfigured,

    /// Config file already exists.
    #[error("Config file already exists: {0}. Use --force to overwrite.")]
    ConfigExists(String),

    /// User-facing error with actionable message.
    #[error("{0}")]
    User(String),
}

impl CliError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a user-facing error.
    pub fn user(msg: impl Into<String>) -> Self {
        Self::User(msg.into())
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors: 1
            Self::User(_) | Self::KeypairNotConfigured | Self::ConfigExists(_) => 1,
            // Keypair errors: 2
            Self::Keypair { .. } => 2,
            // Config errors: 3
            Self::Config(_) | Self::Toml(_) | Self::Pay(PayError::Config(_)) => 3,
            // Admission errors (rate limit, open circuit): 4
            Self::Pay(e) if e.is_admission() => 4,
            // Transient errors: 5
            Self::Pay(e) if e.is_retryable() => 5,
            // Business, protocol and wallet errors: 6
            Self::Pay(_) => 6,
            // IO errors: 9
            Self::Io(_) => 9,
            // JSON/format errors: 10
            Self::Json(_) => 10,
        }
    }

    /// Stable code shown next to the error.
    pub fn error_code(&self) -> String {
        match self {
            Self::Pay(e) => e.to_user_facing().code,
            Self::Config(_) | Self::Toml(_) => "CONFIGURATION_ERROR".to_string(),
            Self::Keypair { .. } | Self::KeypairNotConfigured => "WALLET_ERROR".to_string(),
            Self::ConfigExists(_) | Self::User(_) => "USAGE".to_string(),
            Self::Io(_) | Self::Json(_) => "INTERNAL".to_string(),
        }
    }

    /// Operator hint for recovering from this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Pay(e) => Some(e.suggestion()),
            Self::Config(_) | Self::Toml(_) => Some("Check the config file, or run 'cedros init'"),
            Self::Keypair { .. } => Some("Pass a Solana CLI keypair file (JSON array of 64 bytes)"),
            _ => None,
        }
    }
}

impl From<X402Error> for CliError {
    fn from(e: X402Error) -> Self {
        Self::Pay(e.into())
    }
}

impl From<CheckoutError> for CliError {
    fn from(e: CheckoutError) -> Self {
        Self::Pay(e.into())
    }
}

impl From<ApiError> for CliError {
    fn from(e: ApiError) -> Self {
        Self::Pay(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cedros_resilience::ResilienceError;
    use std::time::Duration;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::user("bad").exit_code(), 1);
        assert_eq!(CliError::config("bad").exit_code(), 3);
        assert_eq!(
            CliError::from(X402Error::from(ResilienceError::circuit_open(
                "onchain-protocol",
                Duration::from_secs(30)
            )))
            .exit_code(),
            4
        );
        assert_eq!(CliError::from(ApiError::network("reset")).exit_code(), 5);
        assert_eq!(
            CliError::from(X402Error::InsufficientBalance { have: 0, need: 1 }).exit_code(),
            6
        );
    }

    #[test]
    fn test_error_code_uses_user_facing_code() {
        let err = CliError::from(CheckoutError::Unauthenticated);
        assert_eq!(err.error_code(), "UNAUTHORIZED");
        assert_eq!(err.suggestion(), Some("Sign in before paying with credits"));
    }
}
