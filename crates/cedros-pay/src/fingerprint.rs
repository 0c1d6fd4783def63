//! Deployment fingerprints.
//!
//! Two configurations that talk to the same backend, cluster and RPC
//! endpoint with the same key, mint policy and fee path share one manager set:
//!
//! ```text
//! Fingerprint = hex(SHA-256(0x43 || field(public_key) || field(server_url)
//!                           || field(network) || field(rpc_override)
//!                           || field(mint_policy) || field(fee_path)))
//! field(s)    = len(s) as u64be || s
//! ```
//!
//! Timeouts, retry and breaker tuning are not part of the key.

use sha2::{Digest, Sha256};

use crate::config::CedrosConfig;

/// Domain separator for deployment fingerprints.
const DOMAIN_FINGERPRINT: u8 = 0x43;

/// Compute the fingerprint of `config`.
pub fn fingerprint(config: &CedrosConfig) -> String {
    let server_url = config.server_url.trim().trim_end_matches('/');
    let endpoint = config
        .solana_endpoint
        .as_deref()
        .map(|e| e.trim().trim_end_matches('/'))
        .unwrap_or("");
    let mint_policy = if config.allow_unknown_mints {
        "allow-unknown"
    } else {
        "stable-only"
    };
    let fee_path = if config.enable_gasless {
        "gasless-when-offered"
    } else {
        "payer-pays"
    };

    let mut hasher = Sha256::new();
    hasher.update([DOMAIN_FINGERPRINT]);
    for field in [
        config.public_key.trim(),
        server_url,
        config.network.as_str(),
        endpoint,
        mint_policy,
        fee_path,
    ] {
        // Length prefix keeps ("ab", "c") distinct from ("a", "bc").
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())
}
