//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use cedros_pay::SolanaNetwork;

use crate::output::OutputFormat;

/// Cedros Pay CLI.
#[derive(Parser, Debug)]
#[command(name = "cedros")]
#[command(author = "Cedros Pay Contributors")]
#[command(version)]
#[command(about = "Command-line interface for Cedros Pay")]
#[command(
    long_about = "Operator tool for a Cedros Pay paywall: route discovery, quotes, \
on-chain payments with a local keypair, card checkout sessions and credits.\n\n\
Run 'cedros init --server-url <URL>' to get started."
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Paywall server URL (overrides the config file).
    #[arg(short, long, global = true, env = "CEDROS_SERVER_URL")]
    pub server: Option<String>,

    /// Solana cluster (overrides the config file).
    #[arg(short, long, global = true)]
    pub network: Option<NetworkArg>,

    /// Output format (human or json).
    #[arg(short, long, global = true, default_value = "human")]
    pub format: OutputFormatArg,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Output format argument for clap.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormatArg {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Solana cluster argument for clap.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum NetworkArg {
    MainnetBeta,
    Devnet,
    Testnet,
    Localnet,
}

impl From<NetworkArg> for SolanaNetwork {
    fn from(arg: NetworkArg) -> Self {
        match arg {
            NetworkArg::MainnetBeta => SolanaNetwork::MainnetBeta,
            NetworkArg::Devnet => SolanaNetwork::Devnet,
            NetworkArg::Testnet => SolanaNetwork::Testnet,
            NetworkArg::Localnet => SolanaNetwork::Localnet,
        }
    }
}

/// Shell for completions.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // =========================================================================
    // Setup
    // =========================================================================
    /// Write a configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,

        /// Solana CLI keypair file used by `pay`.
        #[arg(short, long)]
        keypair: Option<PathBuf>,
    },

    /// Discover the server's API route prefix.
    Route,

    // =========================================================================
    // On-chain (x402)
    // =========================================================================
    /// Request a payment quote for a resource.
    Quote {
        /// Resource id; with --cart, one or more `resource[:quantity]` items.
        #[arg(required = true)]
        resources: Vec<String>,

        /// Quote the resources as one cart.
        #[arg(long)]
        cart: bool,

        /// Coupon code.
        #[arg(long)]
        coupon: Option<String>,
    },

    /// Pay for a resource with a local keypair.
    Pay {
        /// Resource id.
        resource: String,

        /// Solana CLI keypair file (default from config).
        #[arg(short, long)]
        keypair: Option<PathBuf>,

        /// Coupon code.
        #[arg(long)]
        coupon: Option<String>,

        /// Pay network fees from the wallet even when the quote offers a
        /// backend fee payer.
        #[arg(long)]
        no_gasless: bool,

        /// Accept a mint outside the stable asset allow-list.
        #[arg(long)]
        allow_unknown_mint: bool,
    },

    /// Check a transaction's confirmation status.
    Status {
        /// Transaction signature (base58).
        signature: String,
    },

    // =========================================================================
    // Card and credits
    // =========================================================================
    /// Create a hosted card checkout session.
    Checkout {
        /// Resource id.
        resource: String,

        /// Customer email to prefill.
        #[arg(long)]
        email: Option<String>,

        /// Redirect after a successful payment.
        #[arg(long)]
        success_url: Option<String>,

        /// Redirect after a cancelled payment.
        #[arg(long)]
        cancel_url: Option<String>,

        /// Coupon code.
        #[arg(long)]
        coupon: Option<String>,
    },

    /// Pay for a resource with account credits.
    Credits {
        /// Resource id.
        resource: String,

        /// Bearer token of the signed-in user.
        #[arg(long, env = "CEDROS_AUTH_TOKEN", hide_env_values = true)]
        token: String,

        /// Coupon code.
        #[arg(long)]
        coupon: Option<String>,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: CompletionShell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_pay() {
        let cli = Cli::try_parse_from([
            "cedros",
            "--format",
            "json",
            "pay",
            "article-1",
            "--keypair",
            "/keys/payer.json",
            "--no-gasless",
        ])
        .unwrap();

        assert!(matches!(cli.format, OutputFormatArg::Json));
        match cli.command {
            Commands::Pay {
                resource,
                keypair,
                no_gasless,
                coupon,
                ..
            } => {
                assert_eq!(resource, "article-1");
                assert_eq!(keypair, Some(PathBuf::from("/keys/payer.json")));
                assert!(no_gasless);
                assert!(coupon.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_cart_quote_with_network() {
        let cli = Cli::try_parse_from([
            "cedros",
            "quote",
            "--cart",
            "a:2",
            "b",
            "--network",
            "devnet",
        ])
        .unwrap();

        assert!(matches!(cli.network, Some(NetworkArg::Devnet)));
        match cli.command {
            Commands::Quote { resources, cart, .. } => {
                assert!(cart);
                assert_eq!(resources, vec!["a:2", "b"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_quote_requires_resource() {
        assert!(Cli::try_parse_from(["cedros", "quote"]).is_err());
    }
}
