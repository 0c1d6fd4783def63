//! Wire constants for the Cedros paywall API.
//!
//! Paths are relative to the discovered route prefix unless noted.

// =============================================================================
// Endpoints
// =============================================================================

/// Route discovery endpoint, always relative to the server root.
pub const HEALTH_PATH: &str = "/cedros-health";

/// Single-resource quote.
pub const QUOTE_PATH: &str = "/paywall/v1/quote";

/// Cart quote (server aggregates items into one requirement).
pub const CART_QUOTE_PATH: &str = "/paywall/v1/cart/quote";

/// Backend-built transaction for the gasless path.
pub const GASLESS_TRANSACTION_PATH: &str = "/paywall/v1/gasless-transaction";

/// Proof submission and settlement.
pub const VERIFY_PATH: &str = "/paywall/v1/verify";

/// Hosted card checkout session creation.
pub const CHECKOUT_SESSION_PATH: &str = "/paywall/v1/stripe-session";

/// Credits hold creation.
pub const CREDITS_HOLD_PATH: &str = "/paywall/v1/credits/hold";

/// Credits hold authorization.
pub const CREDITS_AUTHORIZE_PATH: &str = "/paywall/v1/credits/authorize";

// =============================================================================
// Headers
// =============================================================================

/// Base64 JSON payment proof (client → server).
pub const HEADER_PAYMENT: &str = "X-PAYMENT";

/// Base64 JSON settlement summary (server → client).
pub const HEADER_PAYMENT_RESPONSE: &str = "X-PAYMENT-RESPONSE";

/// Client-generated idempotency token carried by every mutating request.
pub const HEADER_IDEMPOTENCY_KEY: &str = "Idempotency-Key";

// =============================================================================
// Timing defaults
// =============================================================================

/// Per-request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;

/// Window after completion during which a repeated operation key is
/// rejected as a duplicate.
pub const DEFAULT_DEDUP_WINDOW_MS: u64 = 2_000;

/// Minimum spacing between two accepted clicks on the same control.
pub const DEFAULT_CLICK_COOLDOWN_MS: u64 = 200;

/// Consecutive failures that open a circuit.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// How long an open circuit rejects calls, in milliseconds.
pub const DEFAULT_CIRCUIT_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// Protocol
// =============================================================================

/// x402 envelope version sent in payment proofs.
pub const X402_VERSION: u32 = 1;

/// The only payment scheme the client builds proofs for.
pub const SCHEME_EXACT: &str = "solana-spl-transfer";

/// Circuit breaker names, one per logical remote.
pub const CIRCUIT_ONCHAIN: &str = "onchain-protocol";
pub const CIRCUIT_CARD_CHECKOUT: &str = "card-checkout";
pub const CIRCUIT_CREDITS: &str = "credits";
