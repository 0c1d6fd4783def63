//! x402 protocol types.
//!
//! Canonical shapes used inside the client. Server variations in field
//! names are translated in [`crate::compat`] before they reach these types.

use std::collections::BTreeMap;
use std::str::FromStr;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use cedros_types::constants::X402_VERSION;
use cedros_types::ResourceType;

use crate::error::{X402Error, X402Result};

// =============================================================================
// Payment Requirement (quote)
// =============================================================================

/// Server-issued description of the payment that satisfies a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirement {
    /// Payment scheme (e.g. "solana-spl-transfer").
    pub scheme: String,

    /// Cluster identifier (e.g. "mainnet-beta", "devnet").
    pub network: String,

    /// Recipient wallet (base58).
    pub pay_to: String,

    /// SPL token mint (base58).
    pub asset: String,

    /// Amount in integer minor units, as a decimal string.
    pub max_amount_required: String,

    /// Resource identifier the quote is for.
    pub resource: String,

    /// How long the quote stays valid.
    pub max_timeout_seconds: u64,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Scheme-specific extras.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<RequirementExtra>,
}

/// Scheme-specific extras carried by a requirement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementExtra {
    /// Backend fee payer for the gasless path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_payer: Option<String>,

    /// Explicit destination token account; defaults to ATA(payTo, asset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_token_account: Option<String>,

    /// Memo to attach to the transfer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,

    /// Token decimals, used for mints outside the allow-list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
}

impl PaymentRequirement {
    /// Check that every required field is present and usable.
    pub fn validate(&self) -> X402Result<()> {
        let required = [
            ("scheme", &self.scheme),
            ("network", &self.network),
            ("payTo", &self.pay_to),
            ("asset", &self.asset),
            ("resource", &self.resource),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(X402Error::invalid_requirement(format!("missing {}", name)));
            }
        }
        self.amount()?;
        self.pay_to_pubkey()?;
        self.mint()?;
        if let Some(fee_payer) = self.extra.as_ref().and_then(|e| e.fee_payer.as_deref()) {
            parse_pubkey("feePayer", fee_payer)?;
        }
        Ok(())
    }

    /// Amount in minor units; must be a positive integer.
    pub fn amount(&self) -> X402Result<u64> {
        let amount: u64 = self.max_amount_required.trim().parse().map_err(|_| {
            X402Error::invalid_requirement(format!(
                "amount is not an integer: {}",
                self.max_amount_required
            ))
        })?;
        if amount == 0 {
            return Err(X402Error::invalid_requirement("amount must be positive"));
        }
        Ok(amount)
    }

    /// Recipient wallet.
    pub fn pay_to_pubkey(&self) -> X402Result<Pubkey> {
        parse_pubkey("payTo", &self.pay_to)
    }

    /// Token mint.
    pub fn mint(&self) -> X402Result<Pubkey> {
        parse_pubkey("asset", &self.asset)
    }

    /// Backend fee payer, if the quote offers the gasless path.
    pub fn fee_payer(&self) -> Option<&str> {
        self.extra.as_ref().and_then(|e| e.fee_payer.as_deref())
    }

    /// Whether the quote offers the gasless path.
    pub fn is_gasless(&self) -> bool {
        self.fee_payer().is_some()
    }
}

pub(crate) fn parse_pubkey(field: &str, value: &str) -> X402Result<Pubkey> {
    Pubkey::from_str(value.trim())
        .map_err(|e| X402Error::invalid_requirement(format!("{} is not a valid address: {}", field, e)))
}

// =============================================================================
// Cart
// =============================================================================

/// One line of a cart quote request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Resource identifier.
    pub resource: String,
    /// Quantity, at least 1.
    pub quantity: u32,
    /// Per-item metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl CartItem {
    /// Item with quantity 1 and no metadata.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            quantity: 1,
            metadata: BTreeMap::new(),
        }
    }

    /// Set the quantity.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }
}

/// Server-aggregated quote for a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartQuote {
    /// Cart identifier; used as the proof resource.
    pub cart_id: String,
    /// Requirement covering the whole cart.
    pub requirement: PaymentRequirement,
}

// =============================================================================
// Payment Proof (X-PAYMENT)
// =============================================================================

/// Versioned proof envelope carried base64(JSON) in `X-PAYMENT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
    /// x402 envelope version.
    pub x402_version: u32,
    /// Scheme from the requirement.
    pub scheme: String,
    /// Network from the requirement.
    pub network: String,
    /// Signed payload.
    pub payload: ProofPayload,
}

/// Proof payload. Resource identifiers travel here and never in the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofPayload {
    /// Payer signature (base58).
    pub signature: String,
    /// Signed or partially signed transaction (base64 bincode).
    pub transaction: String,
    /// Payer wallet (base58).
    pub payer: String,
    /// Resource or cart id.
    pub resource: String,
    /// What is being paid for.
    pub resource_type: ResourceType,
    /// Caller metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Coupon applied to the quote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    /// Backend fee payer on the gasless path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_payer: Option<String>,
}

impl PaymentProof {
    /// Wrap a payload for `requirement`.
    pub fn new(requirement: &PaymentRequirement, payload: ProofPayload) -> Self {
        Self {
            x402_version: X402_VERSION,
            scheme: requirement.scheme.clone(),
            network: requirement.network.clone(),
            payload,
        }
    }

    /// Decode a proof from a base64-encoded header value.
    pub fn from_header(header_value: &str) -> X402Result<Self> {
        decode_header(header_value).map_err(X402Error::invalid_transaction)
    }

    /// Encode this proof to a base64 string for the header.
    pub fn to_header(&self) -> X402Result<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| X402Error::invalid_transaction(format!("JSON encode error: {}", e)))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(json))
    }
}

// =============================================================================
// Settlement (X-PAYMENT-RESPONSE)
// =============================================================================

/// Settlement detail decoded from `X-PAYMENT-RESPONSE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    /// Whether the server settled the payment.
    pub success: bool,
    /// Failure reason when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    /// On-chain transaction hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Network the transaction landed on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

impl SettlementResponse {
    /// Decode from a base64-encoded header value.
    pub fn from_header(header_value: &str) -> X402Result<Self> {
        decode_header(header_value).map_err(X402Error::malformed_settlement)
    }

    /// Encode to a base64 header value.
    pub fn to_header(&self) -> X402Result<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| X402Error::malformed_settlement(format!("JSON encode error: {}", e)))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(json))
    }
}

fn decode_header<T: serde::de::DeserializeOwned>(header_value: &str) -> Result<T, String> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(header_value.trim())
        .map_err(|e| format!("base64 decode error: {}", e))?;
    serde_json::from_slice(&decoded).map_err(|e| format!("JSON parse error: {}", e))
}

/// Outcome of proof submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResult {
    /// Whether the payment is settled.
    pub success: bool,
    /// Server signature, or the signing-time signature.
    pub transaction_id: String,
    /// Header detail, when the server sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement: Option<SettlementResponse>,
}

// =============================================================================
// Gasless
// =============================================================================

/// Body of the gasless transaction request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GaslessRequest {
    pub resource_id: String,
    pub user_wallet: String,
    pub fee_payer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

/// Backend-built transaction for the gasless path.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaslessResponse {
    /// Base64 bincode transaction.
    pub transaction: String,
    /// Blockhash to stamp before signing.
    pub blockhash: String,
}

/// Body of the verify response.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct VerifyResponse {
    #[serde(default)]
    pub signature: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requirement() -> PaymentRequirement {
        PaymentRequirement {
            scheme: "solana-spl-transfer".into(),
            network: "mainnet-beta".into(),
            pay_to: Pubkey::new_unique().to_string(),
            asset: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".into(),
            max_amount_required: "1000000".into(),
            resource: "article-1".into(),
            max_timeout_seconds: 300,
            description: None,
            extra: None,
        }
    }

    #[test]
    fn test_requirement_validates() {
        let req = requirement();
        assert!(req.validate().is_ok());
        assert_eq!(req.amount().unwrap(), 1_000_000);
        assert!(!req.is_gasless());
    }

    #[test]
    fn test_requirement_missing_field() {
        let mut req = requirement();
        req.pay_to = "  ".into();
        let err = req.validate().unwrap_err();
        assert_eq!(err, X402Error::invalid_requirement("missing payTo"));
    }

    #[test]
    fn test_requirement_amount_must_be_positive_integer() {
        let mut req = requirement();
        req.max_amount_required = "1.5".into();
        assert!(req.amount().is_err());
        req.max_amount_required = "0".into();
        assert!(req.amount().is_err());
        req.max_amount_required = "-3".into();
        assert!(req.amount().is_err());
    }

    #[test]
    fn test_requirement_bad_address() {
        let mut req = requirement();
        req.asset = "not-a-mint".into();
        assert!(matches!(
            req.validate(),
            Err(X402Error::InvalidRequirement { .. })
        ));
    }

    #[test]
    fn test_gasless_requirement() {
        let mut req = requirement();
        let fee_payer = Pubkey::new_unique().to_string();
        req.extra = Some(RequirementExtra {
            fee_payer: Some(fee_payer.clone()),
            ..Default::default()
        });
        assert!(req.is_gasless());
        assert_eq!(req.fee_payer(), Some(fee_payer.as_str()));
    }

    #[test]
    fn test_proof_header_roundtrip() {
        let req = requirement();
        let proof = PaymentProof::new(
            &req,
            ProofPayload {
                signature: "sig".into(),
                transaction: "dHg=".into(),
                payer: "payer".into(),
                resource: "article-1".into(),
                resource_type: ResourceType::Regular,
                metadata: BTreeMap::from([("orderId".to_string(), "42".to_string())]),
                coupon_code: Some("SAVE10".into()),
                fee_payer: None,
            },
        );

        let header = proof.to_header().unwrap();
        let decoded = PaymentProof::from_header(&header).unwrap();
        assert_eq!(decoded, proof);

        let raw: serde_json::Value = serde_json::from_slice(
            &base64::engine::general_purpose::STANDARD.decode(&header).unwrap(),
        )
        .unwrap();
        assert_eq!(raw["x402Version"], 1);
        assert_eq!(raw["payload"]["resourceType"], "regular");
        assert_eq!(raw["payload"]["couponCode"], "SAVE10");
        assert!(raw["payload"].get("feePayer").is_none());
    }

    #[test]
    fn test_settlement_header_malformed() {
        let err = SettlementResponse::from_header("%%%not-base64").unwrap_err();
        assert!(matches!(err, X402Error::MalformedSettlement { .. }));

        let not_json = base64::engine::general_purpose::STANDARD.encode("hello");
        assert!(SettlementResponse::from_header(&not_json).is_err());
    }

    #[test]
    fn test_settlement_header_decodes() {
        let header = base64::engine::general_purpose::STANDARD
            .encode(r#"{"success":true,"txHash":"5abc","network":"devnet"}"#);
        let settlement = SettlementResponse::from_header(&header).unwrap();
        assert!(settlement.success);
        assert_eq!(settlement.tx_hash.as_deref(), Some("5abc"));
        assert_eq!(settlement.error_reason, None);
    }
}
