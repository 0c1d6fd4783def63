//! Enumerations shared across payment rails.

use serde::{Deserialize, Serialize};

/// What a payment proof is paying for.
///
/// Travels inside the encoded proof payload, never in a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// A single paywalled resource.
    #[default]
    Regular,
    /// A cart quote aggregated by the server.
    Cart,
    /// A refund authorization.
    Refund,
}

impl ResourceType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Cart => "cart",
            Self::Refund => "refund",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "regular" => Ok(Self::Regular),
            "cart" => Ok(Self::Cart),
            "refund" => Ok(Self::Refund),
            _ => Err(format!("unknown resource type: {}", s)),
        }
    }
}

/// The three settlement rails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentRail {
    /// Hosted card checkout.
    Card,
    /// On-chain x402 transfer.
    Crypto,
    /// Internal credits ledger.
    Credits,
}
