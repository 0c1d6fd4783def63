//! Wallet and chain collaborator traits.
//!
//! Concrete wallet adapters and RPC clients live outside this crate; the
//! manager only talks to these traits.

use std::fmt;

use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;

use crate::error::{X402Error, X402Result};

/// Signs payment transactions on behalf of the payer.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Connected public key, if any.
    fn pubkey(&self) -> Option<Pubkey>;

    /// Connect and return the public key.
    async fn connect(&self) -> X402Result<Pubkey>;

    /// Sign an arbitrary message.
    async fn sign_message(&self, message: &[u8]) -> X402Result<Signature>;

    /// Sign every signature slot owned by this wallet. The wallet must be
    /// the only required signer.
    async fn sign_transaction(&self, tx: Transaction) -> X402Result<Transaction>;

    /// Sign only this wallet's slot, leaving other signers (the gasless fee
    /// payer) empty.
    async fn partial_sign_transaction(&self, tx: Transaction) -> X402Result<Transaction>;
}

/// Confirmation state of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Processed,
    Confirmed,
    Finalized,
    /// Landed but failed on chain.
    Failed(String),
}

impl TransactionStatus {
    /// Confirmed or finalized without error.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Finalized)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processed => write!(f, "processed"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Finalized => write!(f, "finalized"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Read-only chain access.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Latest blockhash to stamp on a new transaction.
    async fn get_latest_blockhash(&self) -> X402Result<Hash>;

    /// Token balance of `owner` for `mint` in minor units; 0 if the account
    /// does not exist.
    async fn get_token_balance(&self, owner: &Pubkey, mint: &Pubkey) -> X402Result<u64>;

    /// Status of a signature; `None` if the cluster has not seen it.
    async fn get_signature_status(&self, signature: &Signature) -> X402Result<Option<TransactionStatus>>;
}

/// Wallet backed by a local keypair.
pub struct LocalKeypairWallet {
    keypair: Keypair,
}

impl LocalKeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

impl fmt::Debug for LocalKeypairWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKeypairWallet")
            .field("pubkey", &self.keypair.pubkey())
            .finish()
    }
}

#[async_trait]
impl WalletSigner for LocalKeypairWallet {
    fn pubkey(&self) -> Option<Pubkey> {
        Some(self.keypair.pubkey())
    }

    async fn connect(&self) -> X402Result<Pubkey> {
        Ok(self.keypair.pubkey())
    }

    async fn sign_message(&self, message: &[u8]) -> X402Result<Signature> {
        Ok(self.keypair.sign_message(message))
    }

    async fn sign_transaction(&self, mut tx: Transaction) -> X402Result<Transaction> {
        let blockhash = tx.message.recent_blockhash;
        tx.try_sign(&[&self.keypair], blockhash)
            .map_err(|e| X402Error::wallet(e.to_string()))?;
        Ok(tx)
    }

    async fn partial_sign_transaction(&self, mut tx: Transaction) -> X402Result<Transaction> {
        let blockhash = tx.message.recent_blockhash;
        tx.try_partial_sign(&[&self.keypair], blockhash)
            .map_err(|e| X402Error::wallet(e.to_string()))?;
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::message::Message;
    use solana_sdk::system_instruction;

    #[tokio::test]
    async fn test_local_wallet_signs_message() {
        let wallet = LocalKeypairWallet::new(Keypair::new());
        let pubkey = wallet.connect().await.unwrap();
        let sig = wallet.sign_message(b"hello").await.unwrap();
        assert!(sig.verify(pubkey.as_ref(), b"hello"));
    }

    #[tokio::test]
    async fn test_partial_sign_leaves_fee_payer_empty() {
        let wallet = LocalKeypairWallet::new(Keypair::new());
        let payer = wallet.pubkey().unwrap();
        let fee_payer = Pubkey::new_unique();

        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 1);
        let message = Message::new_with_blockhash(&[ix], Some(&fee_payer), &Hash::new_unique());
        let tx = Transaction::new_unsigned(message);

        let signed = wallet.partial_sign_transaction(tx.clone()).await.unwrap();
        assert_eq!(signed.signatures[0], Signature::default());
        assert_ne!(signed.signatures[1], Signature::default());

        // A full sign needs every signer.
        assert!(wallet.sign_transaction(tx).await.is_err());
    }

    #[test]
    fn test_status_display() {
        assert!(TransactionStatus::Finalized.is_confirmed());
        assert!(!TransactionStatus::Processed.is_confirmed());
        assert_eq!(
            TransactionStatus::Failed("custom 1".into()).to_string(),
            "failed: custom 1"
        );
    }
}
