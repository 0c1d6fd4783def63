//! Mock implementation of the `ChainClient` trait for testing.
//!
//! Token balances, signature statuses and the blockhash are held in memory.
//! Every call is counted so tests can assert how often the chain was read.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use cedros_x402::{ChainClient, TransactionStatus, X402Error, X402Result};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

struct MockChainInner {
    blockhash: Hash,
    /// (owner, mint) -> minor units
    balances: HashMap<(Pubkey, Pubkey), u64>,
    statuses: HashMap<Signature, TransactionStatus>,
    /// Remaining calls that fail with a chain error before succeeding.
    failures_remaining: u32,
    blockhash_calls: u32,
    balance_calls: u32,
    status_calls: u32,
}

/// A mock chain.
///
/// Uses `Arc<RwLock<...>>` internally, so clones share state.
#[derive(Clone)]
pub struct MockChain {
    inner: Arc<RwLock<MockChainInner>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    /// Create a chain with a fixed random blockhash and no balances.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockChainInner {
                blockhash: Hash::new_unique(),
                balances: HashMap::new(),
                statuses: HashMap::new(),
                failures_remaining: 0,
                blockhash_calls: 0,
                balance_calls: 0,
                status_calls: 0,
            })),
        }
    }

    /// Set the blockhash returned by `get_latest_blockhash`.
    pub fn with_blockhash(self, blockhash: Hash) -> Self {
        self.inner.write().unwrap().blockhash = blockhash;
        self
    }

    /// Set the token balance of `owner` for `mint`.
    pub fn with_balance(self, owner: Pubkey, mint: Pubkey, amount: u64) -> Self {
        self.set_balance(owner, mint, amount);
        self
    }

    /// Fail the next `count` calls with a chain error.
    pub fn with_failures(self, count: u32) -> Self {
        self.inner.write().unwrap().failures_remaining = count;
        self
    }

    pub fn set_balance(&self, owner: Pubkey, mint: Pubkey, amount: u64) {
        self.inner.write().unwrap().balances.insert((owner, mint), amount);
    }

    pub fn set_status(&self, signature: Signature, status: TransactionStatus) {
        self.inner.write().unwrap().statuses.insert(signature, status);
    }

    // =========================================================================
    // Assertion Helpers
    // =========================================================================

    pub fn blockhash(&self) -> Hash {
        self.inner.read().unwrap().blockhash
    }

    pub fn blockhash_calls(&self) -> u32 {
        self.inner.read().unwrap().blockhash_calls
    }

    pub fn balance_calls(&self) -> u32 {
        self.inner.read().unwrap().balance_calls
    }

    pub fn status_calls(&self) -> u32 {
        self.inner.read().unwrap().status_calls
    }

    fn check_failure(inner: &mut MockChainInner) -> X402Result<()> {
        if inner.failures_remaining > 0 {
            inner.failures_remaining -= 1;
            return Err(X402Error::chain("mock chain unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_latest_blockhash(&self) -> X402Result<Hash> {
        let mut inner = self.inner.write().unwrap();
        inner.blockhash_calls += 1;
        Self::check_failure(&mut inner)?;
        Ok(inner.blockhash)
    }

    async fn get_token_balance(&self, owner: &Pubkey, mint: &Pubkey) -> X402Result<u64> {
        let mut inner = self.inner.write().unwrap();
        inner.balance_calls += 1;
        Self::check_failure(&mut inner)?;
        Ok(inner.balances.get(&(*owner, *mint)).copied().unwrap_or(0))
    }

    async fn get_signature_status(&self, signature: &Signature) -> X402Result<Option<TransactionStatus>> {
        let mut inner = self.inner.write().unwrap();
        inner.status_calls += 1;
        Self::check_failure(&mut inner)?;
        Ok(inner.statuses.get(signature).cloned())
    }
}
