//! Card and credits payment rails for the Cedros paywall.
//!
//! Both managers use the same composition as the on-chain rail: a rate
//! limiter per operation, a retry policy, a named circuit breaker
//! (`card-checkout`, `credits`) and the shared [`ApiClient`](cedros_http::ApiClient).

pub mod checkout;
pub mod credits;
pub mod error;
mod guard;

pub use checkout::{CheckoutRedirector, CheckoutRequest, CheckoutSession, HostedCheckoutManager};
pub use credits::{CreditsHold, CreditsManager};
pub use error::{CheckoutError, CheckoutResult};
pub use guard::RailConfig;
