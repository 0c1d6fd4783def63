//! Manager context for CLI operations.

use std::sync::Arc;

use cedros_pay::{CedrosPay, ManagerLease};
use cedros_x402::ChainClient;

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::rpc::RpcChainClient;

/// Manager set acquired for one command.
pub struct CliContext {
    /// Leased managers for the configured deployment.
    pub managers: ManagerLease,
    /// Configuration.
    pub config: CliConfig,
}

impl CliContext {
    /// Build a context that talks to the configured Solana RPC endpoint.
    pub fn new(config: CliConfig) -> CliResult<Self> {
        let chain = Arc::new(RpcChainClient::new(config.cedros.rpc_endpoint()));
        Self::with_chain(config, chain)
    }

    /// Build a context over an explicit chain client.
    pub fn with_chain(config: CliConfig, chain: Arc<dyn ChainClient>) -> CliResult<Self> {
        let managers = CedrosPay::new().acquire(&config.cedros, chain)?;
        Ok(Self { managers, config })
    }
}
