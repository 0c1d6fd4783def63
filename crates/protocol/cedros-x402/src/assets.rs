//! Stable asset allow-list.
//!
//! Quotes naming a mint outside this list are rejected unless the manager
//! was configured with `allow_unknown_mints`.

use tracing::warn;

use crate::error::{X402Error, X402Result};

/// Decimals assumed for an unknown mint when the quote does not say.
pub const FALLBACK_DECIMALS: u8 = 6;

/// A token the client pays with by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StableAsset {
    pub symbol: &'static str,
    pub mint: &'static str,
    pub decimals: u8,
}

/// Known stable mints.
pub const STABLE_ASSETS: &[StableAsset] = &[
    StableAsset {
        symbol: "USDC",
        mint: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
        decimals: 6,
    },
    StableAsset {
        symbol: "USDT",
        mint: "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
        decimals: 6,
    },
    StableAsset {
        symbol: "PYUSD",
        mint: "2b1kV6DkPAnxd5ixfnxCpjxmKwqjjaYmCZfHsFu24GXo",
        decimals: 6,
    },
    StableAsset {
        symbol: "USDG",
        mint: "2u1tszSeqZ3qBWF3uNGPFc8TzMk2tdiwknnRMWGWjGWH",
        decimals: 6,
    },
    // devnet USDC
    StableAsset {
        symbol: "USDC",
        mint: "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
        decimals: 6,
    },
];

/// Look up a mint in the allow-list.
pub fn lookup(mint: &str) -> Option<&'static StableAsset> {
    STABLE_ASSETS.iter().find(|a| a.mint == mint.trim())
}

/// Decimals to use for `mint`.
///
/// Known mints use the table value. Unknown mints fail with
/// [`X402Error::UnknownAsset`] unless `allow_unknown` is set, in which case
/// the quote's `decimals` is used, falling back to [`FALLBACK_DECIMALS`].
pub fn resolve_decimals(mint: &str, quoted: Option<u8>, allow_unknown: bool) -> X402Result<u8> {
    if let Some(asset) = lookup(mint) {
        return Ok(asset.decimals);
    }
    if !allow_unknown {
        return Err(X402Error::UnknownAsset {
            mint: mint.to_string(),
        });
    }
    match quoted {
        Some(decimals) => Ok(decimals),
        None => {
            warn!(
                mint,
                decimals = FALLBACK_DECIMALS,
                "Unknown mint without decimals, assuming default"
            );
            Ok(FALLBACK_DECIMALS)
        }
    }
}
