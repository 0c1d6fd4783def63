//! Shared types for the Cedros Pay client core.
//!
//! This crate holds the pieces every payment rail agrees on and nothing
//! else: wire constants (paths, header names, defaults), the business error
//! code table returned by the paywall backend, and the [`UserFacingError`]
//! shape handed to UI callers.
//!
//! # Module Organization
//!
//! - [`constants`] - Endpoint paths, header names, timing defaults
//! - [`error`] - Business error codes and user-facing error type
//! - [`enums`] - Small enums shared by several rails
//!
//! # Example
//!
//! ```
//! use cedros_types::{ErrorCode, UserFacingError};
//!
//! let code = ErrorCode::from_wire("quote_expired");
//! assert_eq!(code, ErrorCode::QuoteExpired);
//!
//! let err = UserFacingError::from_code(code);
//! assert!(err.retryable);
//! ```

/// Crate version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod constants;
pub mod enums;
pub mod error;

pub use enums::{PaymentRail, ResourceType};
pub use error::{ErrorCode, UserFacingError};
