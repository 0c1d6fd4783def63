//! x402 payment protocol client for Solana SPL token transfers.
//!
//! The client side of the paywall's challenge/response flow:
//!
//! ```text
//! ┌──────────┐   POST /quote        ┌──────────┐
//! │  Client  │ ───────────────────→ │ Paywall  │
//! │          │ ←─────────────────── │ server   │
//! │          │   402 + requirement  │          │
//! │  build   │                      │          │
//! │  + sign  │   POST /verify       │          │
//! │          │   X-PAYMENT: proof   │          │
//! │          │ ───────────────────→ │          │
//! │          │ ←─────────────────── │          │
//! │          │   X-PAYMENT-RESPONSE │          │
//! └──────────┘                      └──────────┘
//! ```
//!
//! # Components
//!
//! - **[`types`]**: requirement, proof and settlement types
//! - **[`compat`]**: translation of server wire variants
//! - **[`assets`]**: stable mint allow-list
//! - **[`transaction`]**: `transfer_checked` construction and encoding
//! - **[`wallet`]**: [`WalletSigner`] and [`ChainClient`] collaborator traits
//! - **[`stage`]**: per-attempt stage history
//! - **[`manager`]**: [`X402Manager`], the orchestrator
//! - **[`error`]**: error types with recovery suggestions
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cedros_http::ApiClient;
//! use cedros_x402::{ChainClient, PaymentRequest, WalletSigner, X402Manager, X402ManagerConfig};
//!
//! # async fn example(chain: Arc<dyn ChainClient>, wallet: &dyn WalletSigner) -> Result<(), Box<dyn std::error::Error>> {
//! let api = ApiClient::new("https://pay.example.com")?;
//! let manager = X402Manager::new(api, chain, X402ManagerConfig::default());
//!
//! let receipt = manager
//!     .pay(PaymentRequest::resource("article-1").with_coupon("SAVE10"), wallet)
//!     .await?;
//! println!("settled: {}", receipt.settlement.transaction_id);
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod compat;
pub mod error;
pub mod manager;
pub mod stage;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use assets::{StableAsset, STABLE_ASSETS};
pub use error::{X402Error, X402Result};
pub use manager::{PaymentReceipt, PaymentRequest, ProofContext, X402Manager, X402ManagerConfig};
pub use stage::{PaymentAttempt, PaymentStage};
pub use types::{
    CartItem, CartQuote, PaymentProof, PaymentRequirement, ProofPayload, RequirementExtra,
    SettlementResponse, SettlementResult,
};
pub use wallet::{ChainClient, LocalKeypairWallet, TransactionStatus, WalletSigner};
