//! Fixtures for requirements and the server side of the wire contract.

use std::str::FromStr;

use base64::Engine as _;
use cedros_types::constants::SCHEME_EXACT;
use cedros_x402::transaction::encode_transaction;
use cedros_x402::{PaymentRequirement, RequirementExtra, SettlementResponse};
use serde_json::{json, Value};
use solana_sdk::hash::Hash;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;

/// Mainnet USDC.
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// A mint outside the allow-list (wrapped SOL).
pub const UNKNOWN_MINT: &str = "So11111111111111111111111111111111111111112";

pub fn usdc_mint() -> Pubkey {
    Pubkey::from_str(USDC_MINT).unwrap()
}

/// Standard-path USDC requirement for `resource`.
pub fn usdc_requirement(resource: &str, pay_to: &Pubkey, amount: u64) -> PaymentRequirement {
    PaymentRequirement {
        scheme: SCHEME_EXACT.to_string(),
        network: "mainnet-beta".to_string(),
        pay_to: pay_to.to_string(),
        asset: USDC_MINT.to_string(),
        max_amount_required: amount.to_string(),
        resource: resource.to_string(),
        max_timeout_seconds: 300,
        description: Some(format!("Access to {}", resource)),
        extra: None,
    }
}

/// Requirement offering the gasless path with `fee_payer`.
pub fn gasless_requirement(
    resource: &str,
    pay_to: &Pubkey,
    fee_payer: &Pubkey,
    amount: u64,
) -> PaymentRequirement {
    PaymentRequirement {
        extra: Some(RequirementExtra {
            fee_payer: Some(fee_payer.to_string()),
            ..Default::default()
        }),
        ..usdc_requirement(resource, pay_to, amount)
    }
}

/// Quote response in the `{ crypto }` shape.
pub fn quote_body(requirement: &PaymentRequirement) -> Value {
    json!({ "crypto": requirement })
}

/// Quote response in the `{ accepts: [...] }` shape.
pub fn accepts_body(requirements: &[PaymentRequirement]) -> Value {
    json!({ "accepts": requirements })
}

/// Base64 `X-PAYMENT-RESPONSE` value.
pub fn settlement_header(success: bool, tx_hash: Option<&str>) -> String {
    let settlement = SettlementResponse {
        success,
        error_reason: (!success).then(|| "transaction failed".to_string()),
        tx_hash: tx_hash.map(str::to_string),
        network: Some("mainnet-beta".to_string()),
    };
    settlement.to_header().unwrap()
}

/// Base64 of an arbitrary string, for malformed-header tests.
pub fn base64_of(raw: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(raw)
}

/// Transaction the backend returns on the gasless path: `fee_payer` pays
/// fees, `payer` authorizes the transfer. Encoded base64 bincode.
pub fn backend_gasless_transaction(
    requirement: &PaymentRequirement,
    payer: &Pubkey,
    fee_payer: &Pubkey,
    blockhash: Hash,
) -> String {
    let mint = Pubkey::from_str(&requirement.asset).unwrap();
    let pay_to = Pubkey::from_str(&requirement.pay_to).unwrap();
    let amount: u64 = requirement.max_amount_required.parse().unwrap();

    let ix = spl_token::instruction::transfer_checked(
        &spl_token::id(),
        &get_associated_token_address(payer, &mint),
        &mint,
        &get_associated_token_address(&pay_to, &mint),
        payer,
        &[],
        amount,
        6,
    )
    .unwrap();
    let message = Message::new_with_blockhash(&[ix], Some(fee_payer), &blockhash);
    encode_transaction(&Transaction::new_unsigned(message)).unwrap()
}
