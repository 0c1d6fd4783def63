//! Cedros Pay client core.
//!
//! Turns a "buy this resource" intent into a settled payment over one of
//! three rails, all sharing one resilience layer:
//!
//! - **On-chain** ([`X402Manager`](cedros_x402::X402Manager)): x402 quote,
//!   SPL `transfer_checked`, proof in `X-PAYMENT`, settlement parsing
//! - **Card** ([`HostedCheckoutManager`](cedros_checkout::HostedCheckoutManager)):
//!   hosted checkout session plus redirect
//! - **Credits** ([`CreditsManager`](cedros_checkout::CreditsManager)): hold
//!   plus authorize
//!
//! A [`CedrosPay`] owns a reference-counted cache of [`ManagerSet`]s keyed by
//! a deployment [`fingerprint`](fingerprint::fingerprint). Every component
//! that acquires the same configuration gets the same breakers, rate
//! limiters and route prefix.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cedros_pay::{CedrosConfig, CedrosPay, SolanaNetwork};
//! use cedros_pay::x402::{ChainClient, PaymentRequest, WalletSigner};
//!
//! # async fn example(chain: Arc<dyn ChainClient>, wallet: &dyn WalletSigner) -> Result<(), cedros_pay::PayError> {
//! let pay = CedrosPay::new();
//! let config = CedrosConfig::new("https://pay.example.com").with_network(SolanaNetwork::Devnet);
//!
//! let managers = pay.acquire(&config, chain)?;
//! match managers.x402().pay(PaymentRequest::resource("article-1"), wallet).await {
//!     Ok(receipt) => println!("paid: {}", receipt.settlement.transaction_id),
//!     Err(e) => println!("{}", cedros_pay::PayError::from(e).to_user_facing()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod instance_cache;
pub mod manager_set;

pub use config::{CedrosConfig, SolanaNetwork};
pub use error::{PayError, PayResult};
pub use instance_cache::{InstanceCache, Lease};
pub use manager_set::{CedrosPay, ManagerLease, ManagerSet};

// Re-export the rail crates so integrators need one dependency.
pub use cedros_checkout as checkout;
pub use cedros_http as http;
pub use cedros_resilience as resilience;
pub use cedros_types as types;
pub use cedros_x402 as x402;
