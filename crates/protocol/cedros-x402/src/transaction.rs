//! SPL transfer transaction construction and encoding.

use base64::Engine as _;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;

use crate::error::{X402Error, X402Result};
use crate::types::{parse_pubkey, PaymentRequirement};

/// SPL memo program.
pub const MEMO_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr");

/// Destination token account: `extra.recipientTokenAccount` or ATA(payTo, mint).
pub fn recipient_token_account(requirement: &PaymentRequirement) -> X402Result<Pubkey> {
    match requirement
        .extra
        .as_ref()
        .and_then(|e| e.recipient_token_account.as_deref())
    {
        Some(account) => parse_pubkey("recipientTokenAccount", account),
        None => Ok(get_associated_token_address(
            &requirement.pay_to_pubkey()?,
            &requirement.mint()?,
        )),
    }
}

/// Build the unsigned standard-path transfer.
///
/// The payer is the fee payer. The transfer moves exactly the quoted amount
/// from the payer's associated token account.
pub fn build_transfer_transaction(
    requirement: &PaymentRequirement,
    payer: &Pubkey,
    blockhash: Hash,
    decimals: u8,
) -> X402Result<Transaction> {
    let mint = requirement.mint()?;
    let amount = requirement.amount()?;
    let source = get_associated_token_address(payer, &mint);
    let destination = recipient_token_account(requirement)?;

    let mut instructions = vec![spl_token::instruction::transfer_checked(
        &spl_token::id(),
        &source,
        &mint,
        &destination,
        payer,
        &[],
        amount,
        decimals,
    )
    .map_err(|e| X402Error::invalid_transaction(e.to_string()))?];

    if let Some(memo) = requirement
        .extra
        .as_ref()
        .and_then(|e| e.memo.as_deref())
        .filter(|m| !m.is_empty())
    {
        instructions.push(Instruction {
            program_id: MEMO_PROGRAM_ID,
            accounts: vec![],
            data: memo.as_bytes().to_vec(),
        });
    }

    let message = Message::new_with_blockhash(&instructions, Some(payer), &blockhash);
    Ok(Transaction::new_unsigned(message))
}

/// Serialize a transaction as base64 bincode.
pub fn encode_transaction(tx: &Transaction) -> X402Result<String> {
    let bytes = bincode::serialize(tx)
        .map_err(|e| X402Error::invalid_transaction(format!("serialize failed: {}", e)))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Decode a base64 bincode transaction.
///
/// The signature list is padded to the number of required signers so the
/// transaction can be partially signed.
pub fn decode_transaction(encoded: &str) -> X402Result<Transaction> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| X402Error::invalid_transaction(format!("base64 decode failed: {}", e)))?;
    let mut tx: Transaction = bincode::deserialize(&bytes)
        .map_err(|e| X402Error::invalid_transaction(format!("deserialize failed: {}", e)))?;

    let required = tx.message.header.num_required_signatures as usize;
    if tx.message.account_keys.len() < required {
        return Err(X402Error::invalid_transaction(
            "fewer account keys than required signers",
        ));
    }
    if tx.signatures.len() != required {
        tx.signatures.resize(required, Signature::default());
    }
    Ok(tx)
}

/// Fee payer of a transaction (first account key).
pub fn fee_payer(tx: &Transaction) -> Option<Pubkey> {
    tx.message.account_keys.first().copied()
}

/// Index of `signer` among the transaction's required signers.
pub fn signer_index(tx: &Transaction, signer: &Pubkey) -> Option<usize> {
    let required = tx.message.header.num_required_signatures as usize;
    tx.message
        .account_keys
        .iter()
        .take(required)
        .position(|key| key == signer)
}

/// The payer's non-empty signature.
pub fn payer_signature(tx: &Transaction, payer: &Pubkey) -> X402Result<Signature> {
    let index = signer_index(tx, payer)
        .ok_or_else(|| X402Error::invalid_transaction(format!("{} is not a signer", payer)))?;
    match tx.signatures.get(index) {
        Some(sig) if *sig != Signature::default() => Ok(*sig),
        _ => Err(X402Error::invalid_transaction("transaction is not signed by the payer")),
    }
}
