//! Command-line interface for Cedros Pay.
//!
//! This crate provides the `cedros` binary, an operator tool for a Cedros
//! Pay paywall. It includes commands for:
//!
//! - **Setup**: write a config file and check route discovery
//! - **On-chain payments**: quote resources or carts, pay with a local
//!   Solana keypair, check a transaction's status
//! - **Card and credits**: create hosted checkout sessions, pay with credits
//!
//! # Quick Start
//!
//! ```bash
//! # Point the CLI at a paywall server
//! cedros init --server https://pay.example.com --keypair ~/.config/solana/id.json
//!
//! # Price a resource
//! cedros quote article-1
//!
//! # Pay for it
//! cedros pay article-1
//! ```
//!
//! # Output Formats
//!
//! All commands support `--format`:
//!
//! - `human` (default): Human-readable with colors
//! - `json`: Machine-readable JSON
//!
//! # Configuration
//!
//! Configuration is loaded from the platform config directory
//! (`~/.config/cedros/config.toml` on Linux). Override with `--config` or
//! `CEDROS_CONFIG_DIR`.

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod output;
pub mod rpc;

// Re-export main types
pub use cli::{Cli, Commands, CompletionShell, NetworkArg, OutputFormatArg};
pub use config::CliConfig;
pub use context::CliContext;
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, Render};
pub use rpc::RpcChainClient;
