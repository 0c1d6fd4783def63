//! Keypair-backed wallet that records every signing request.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use cedros_x402::{LocalKeypairWallet, WalletSigner, X402Error, X402Result};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;

#[derive(Default)]
struct TestWalletInner {
    connected: bool,
    reject: bool,
    connect_calls: u32,
    full_signs: u32,
    partial_signs: u32,
    messages: Vec<Vec<u8>>,
}

/// A wallet for tests.
///
/// Starts disconnected unless built with [`TestWallet::connected`].
#[derive(Clone)]
pub struct TestWallet {
    pubkey: Pubkey,
    signer: Arc<LocalKeypairWallet>,
    inner: Arc<RwLock<TestWalletInner>>,
}

impl Default for TestWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWallet {
    /// Disconnected wallet with a fresh keypair.
    pub fn new() -> Self {
        Self::from_keypair(Keypair::new())
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            pubkey: keypair.pubkey(),
            signer: Arc::new(LocalKeypairWallet::new(keypair)),
            inner: Arc::new(RwLock::new(TestWalletInner::default())),
        }
    }

    /// Already-connected wallet with a fresh keypair.
    pub fn connected() -> Self {
        let wallet = Self::new();
        wallet.inner.write().unwrap().connected = true;
        wallet
    }

    /// Refuse every signing request.
    pub fn rejecting(self) -> Self {
        self.inner.write().unwrap().reject = true;
        self
    }

    /// Public key regardless of connection state.
    pub fn address(&self) -> Pubkey {
        self.pubkey
    }

    // =========================================================================
    // Assertion Helpers
    // =========================================================================

    pub fn connect_calls(&self) -> u32 {
        self.inner.read().unwrap().connect_calls
    }

    pub fn full_signs(&self) -> u32 {
        self.inner.read().unwrap().full_signs
    }

    pub fn partial_signs(&self) -> u32 {
        self.inner.read().unwrap().partial_signs
    }

    pub fn signed_messages(&self) -> Vec<Vec<u8>> {
        self.inner.read().unwrap().messages.clone()
    }

    fn check_reject(&self) -> X402Result<()> {
        if self.inner.read().unwrap().reject {
            return Err(X402Error::wallet("user rejected the request"));
        }
        Ok(())
    }
}

#[async_trait]
impl WalletSigner for TestWallet {
    fn pubkey(&self) -> Option<Pubkey> {
        if self.inner.read().unwrap().connected {
            Some(self.pubkey)
        } else {
            None
        }
    }

    async fn connect(&self) -> X402Result<Pubkey> {
        let mut inner = self.inner.write().unwrap();
        inner.connect_calls += 1;
        inner.connected = true;
        Ok(self.pubkey)
    }

    async fn sign_message(&self, message: &[u8]) -> X402Result<Signature> {
        self.check_reject()?;
        self.inner.write().unwrap().messages.push(message.to_vec());
        self.signer.sign_message(message).await
    }

    async fn sign_transaction(&self, tx: Transaction) -> X402Result<Transaction> {
        self.check_reject()?;
        self.inner.write().unwrap().full_signs += 1;
        self.signer.sign_transaction(tx).await
    }

    async fn partial_sign_transaction(&self, tx: Transaction) -> X402Result<Transaction> {
        self.check_reject()?;
        self.inner.write().unwrap().partial_signs += 1;
        self.signer.partial_sign_transaction(tx).await
    }
}
