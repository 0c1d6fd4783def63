//! Deployment configuration for a Cedros Pay manager set.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use cedros_checkout::RailConfig;
use cedros_resilience::RetryPolicy;
use cedros_types::constants::DEFAULT_REQUEST_TIMEOUT_MS;

use crate::error::{PayError, PayResult};

/// Solana cluster selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SolanaNetwork {
    #[default]
    MainnetBeta,
    Devnet,
    Testnet,
    Localnet,
}

impl SolanaNetwork {
    /// Get the cluster name as used in payment requirements.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MainnetBeta => "mainnet-beta",
            Self::Devnet => "devnet",
            Self::Testnet => "testnet",
            Self::Localnet => "localnet",
        }
    }

    /// Public RPC endpoint for the cluster.
    pub fn default_rpc_endpoint(&self) -> &'static str {
        match self {
            Self::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Self::Devnet => "https://api.devnet.solana.com",
            Self::Testnet => "https://api.testnet.solana.com",
            Self::Localnet => "http://127.0.0.1:8899",
        }
    }
}

impl fmt::Display for SolanaNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SolanaNetwork {
    type Err = PayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet-beta" | "mainnet" => Ok(Self::MainnetBeta),
            "devnet" => Ok(Self::Devnet),
            "testnet" => Ok(Self::Testnet),
            "localnet" | "localhost" => Ok(Self::Localnet),
            other => Err(PayError::config(format!("unknown Solana network: {}", other))),
        }
    }
}

/// Configuration for one deployment of the paywall client.
///
/// Missing fields take their defaults, so a TOML file only needs the
/// values that differ:
///
/// ```toml
/// server_url = "https://pay.example.com"
/// network = "devnet"
/// request_timeout_ms = 10000
///
/// [checkout.breaker]
/// failure_threshold = 3
/// timeout = 60000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CedrosConfig {
    /// Card processor publishable key
    pub public_key: String,

    /// Paywall backend base URL
    pub server_url: String,

    /// Solana cluster
    pub network: SolanaNetwork,

    /// RPC endpoint override; the cluster default otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solana_endpoint: Option<String>,

    /// Accept mints outside the stable asset allow-list
    pub allow_unknown_mints: bool,

    /// Take the backend-built gasless path when the quote names a fee payer.
    /// Set to false to always pay network fees from the payer's wallet.
    pub enable_gasless: bool,

    /// Deadline for every outbound request
    #[serde(rename = "request_timeout_ms", with = "cedros_resilience::duration_ms")]
    pub request_timeout: Duration,

    /// Retry policy for route-prefix discovery
    pub route_retry: RetryPolicy,

    /// x402 rail retry and `onchain-protocol` breaker. Unlike the other
    /// rails it defaults to the `standard` retry preset, but a partial
    /// `[onchain]` table fills its gaps from [`RailConfig::default`].
    pub onchain: RailConfig,

    /// Card rail retry and `card-checkout` breaker
    pub checkout: RailConfig,

    /// Credits rail retry and `credits` breaker
    pub credits: RailConfig,
}

impl Default for CedrosConfig {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            server_url: "http://localhost:8080".to_string(),
            network: SolanaNetwork::default(),
            solana_endpoint: None,
            allow_unknown_mints: false,
            enable_gasless: true,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            route_retry: RetryPolicy::quick(),
            onchain: RailConfig {
                retry: RetryPolicy::standard(),
                ..RailConfig::default()
            },
            checkout: RailConfig::default(),
            credits: RailConfig::default(),
        }
    }
}

impl CedrosConfig {
    /// Create a configuration for `server_url` with defaults elsewhere.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    /// Set the card processor publishable key.
    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.public_key = public_key.into();
        self
    }

    /// Select the Solana cluster.
    pub fn with_network(mut self, network: SolanaNetwork) -> Self {
        self.network = network;
        self
    }

    /// Override the cluster's RPC endpoint.
    pub fn with_solana_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.solana_endpoint = Some(endpoint.into());
        self
    }

    /// Accept mints outside the stable asset allow-list.
    pub fn allow_unknown_mints(mut self, allow: bool) -> Self {
        self.allow_unknown_mints = allow;
        self
    }

    /// Enable or disable the gasless path.
    pub fn enable_gasless(mut self, enable: bool) -> Self {
        self.enable_gasless = enable;
        self
    }

    /// Set the per-request deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// RPC endpoint to use: the override if set, else the cluster default.
    pub fn rpc_endpoint(&self) -> &str {
        self.solana_endpoint
            .as_deref()
            .unwrap_or_else(|| self.network.default_rpc_endpoint())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> PayResult<()> {
        if !is_http_url(&self.server_url) {
            return Err(PayError::config(format!(
                "server_url must start with http:// or https://: {:?}",
                self.server_url
            )));
        }

        if let Some(endpoint) = &self.solana_endpoint {
            if !is_http_url(endpoint) {
                return Err(PayError::config(format!(
                    "solana_endpoint must start with http:// or https://: {:?}",
                    endpoint
                )));
            }
        }

        if self.request_timeout.is_zero() {
            return Err(PayError::config("request_timeout_ms must be greater than zero"));
        }

        validate_retry("route_retry", &self.route_retry)?;
        for (name, rail) in [
            ("onchain", &self.onchain),
            ("checkout", &self.checkout),
            ("credits", &self.credits),
        ] {
            validate_retry(name, &rail.retry)?;
            if rail.breaker.failure_threshold == 0 {
                return Err(PayError::config(format!(
                    "{}.breaker.failure_threshold must be at least 1",
                    name
                )));
            }
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty())
}

fn validate_retry(name: &str, retry: &RetryPolicy) -> PayResult<()> {
    if !retry.backoff_factor.is_finite() || retry.backoff_factor < 1.0 {
        return Err(PayError::config(format!(
            "{}: backoff_factor must be a finite number >= 1.0",
            name
        )));
    }
    if retry.initial_delay > retry.max_delay {
        return Err(PayError::config(format!(
            "{}: initial_delay exceeds max_delay",
            name
        )));
    }
    Ok(())
}
