//! Solana JSON-RPC backed chain client.

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use spl_associated_token_account::get_associated_token_address;
use tracing::debug;

use cedros_x402::error::{X402Error, X402Result};
use cedros_x402::{ChainClient, TransactionStatus};

/// [`ChainClient`] over the nonblocking Solana RPC client.
pub struct RpcChainClient {
    rpc: RpcClient,
}

impl RpcChainClient {
    /// Create a client for `endpoint` at `confirmed` commitment.
    pub fn new(endpoint: &str) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(endpoint.to_string(), CommitmentConfig::confirmed()),
        }
    }

    /// RPC endpoint URL.
    pub fn endpoint(&self) -> String {
        self.rpc.url()
    }
}

impl std::fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("endpoint", &self.rpc.url())
            .finish()
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn get_latest_blockhash(&self) -> X402Result<Hash> {
        self.rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| X402Error::chain(e.to_string()))
    }

    async fn get_token_balance(&self, owner: &Pubkey, mint: &Pubkey) -> X402Result<u64> {
        let token_account = get_associated_token_address(owner, mint);

        let account = self
            .rpc
            .get_account_with_commitment(&token_account, self.rpc.commitment())
            .await
            .map_err(|e| X402Error::chain(e.to_string()))?;
        if account.value.is_none() {
            debug!(owner = %owner, mint = %mint, "Token account does not exist");
            return Ok(0);
        }

        let balance = self
            .rpc
            .get_token_account_balance(&token_account)
            .await
            .map_err(|e| X402Error::chain(e.to_string()))?;
        balance
            .amount
            .parse::<u64>()
            .map_err(|e| X402Error::chain(format!("invalid token amount {:?}: {}", balance.amount, e)))
    }

    async fn get_signature_status(&self, signature: &Signature) -> X402Result<Option<TransactionStatus>> {
        let response = self
            .rpc
            .get_signature_statuses(&[*signature])
            .await
            .map_err(|e| X402Error::chain(e.to_string()))?;

        let Some(Some(status)) = response.value.into_iter().next() else {
            return Ok(None);
        };

        if let Some(err) = &status.err {
            return Ok(Some(TransactionStatus::Failed(err.to_string())));
        }

        let state = if status.satisfies_commitment(CommitmentConfig::finalized()) {
            TransactionStatus::Finalized
        } else if status.satisfies_commitment(CommitmentConfig::confirmed()) {
            TransactionStatus::Confirmed
        } else {
            TransactionStatus::Processed
        };
        Ok(Some(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let client = RpcChainClient::new("https://api.devnet.solana.com");
        assert_eq!(client.endpoint(), "https://api.devnet.solana.com");
    }
}
