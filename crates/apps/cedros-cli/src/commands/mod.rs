//! CLI command implementations.

pub mod checkout;
pub mod completions;
pub mod credits;
pub mod init;
pub mod pay;
pub mod quote;
pub mod route;
pub mod status;

// Re-export command handlers
pub use checkout::{checkout, CheckoutArgs};
pub use completions::completions;
pub use credits::credits;
pub use init::init;
pub use pay::pay;
pub use quote::quote;
pub use route::route;
pub use status::status;
