//! Shared test utilities for the Cedros Pay client.
//!
//! - [`MockChain`]: in-memory [`ChainClient`](cedros_x402::ChainClient)
//! - [`TestWallet`]: keypair-backed [`WalletSigner`](cedros_x402::WalletSigner)
//!   that records what it signed
//! - [`helpers`]: requirement fixtures and server-side encoders

pub mod helpers;
pub mod mock_chain;
pub mod test_wallet;

pub use helpers::*;
pub use mock_chain::MockChain;
pub use test_wallet::TestWallet;
