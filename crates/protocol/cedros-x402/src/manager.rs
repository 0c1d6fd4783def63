//! x402 payment orchestration.
//!
//! The `X402Manager` drives one on-chain payment attempt:
//! 1. Quote the resource (or cart) unless the caller already has a requirement
//! 2. Build the transfer (locally, or by the backend on the gasless path)
//! 3. Sign it with the payer's wallet
//! 4. Submit the proof in `X-PAYMENT` and parse the settlement
//!
//! Every remote call goes through the manager's rate limiter, retry policy,
//! `onchain-protocol` circuit breaker and a per-call deadline.

use std::collections::BTreeMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{json, Value};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use tracing::{debug, info, warn};

use cedros_http::{new_idempotency_key, ApiClient, RequestOptions};
use cedros_resilience::{
    CallContext, CancellationToken, CircuitBreaker, CircuitBreakerConfig, RateLimitPreset,
    RateLimiter, RetryPolicy,
};
use cedros_types::constants::{
    CART_QUOTE_PATH, CIRCUIT_ONCHAIN, GASLESS_TRANSACTION_PATH, HEADER_PAYMENT,
    HEADER_PAYMENT_RESPONSE, QUOTE_PATH, VERIFY_PATH,
};
use cedros_types::ResourceType;

use crate::assets;
use crate::compat;
use crate::error::{X402Error, X402Result};
use crate::stage::{PaymentAttempt, PaymentStage};
use crate::transaction;
use crate::types::{
    parse_pubkey, CartItem, CartQuote, GaslessRequest, GaslessResponse, PaymentProof,
    PaymentRequirement, ProofPayload, SettlementResponse, SettlementResult, VerifyResponse,
};
use crate::wallet::{ChainClient, TransactionStatus, WalletSigner};

/// Manager settings.
#[derive(Debug, Clone)]
pub struct X402ManagerConfig {
    /// Accept mints outside the stable allow-list.
    pub allow_unknown_mints: bool,
    /// Take the backend-built gasless path whenever the quote names a fee
    /// payer. When false, every quote is paid on the standard path.
    pub enable_gasless: bool,
    /// Retry policy for remote calls.
    pub retry: RetryPolicy,
    /// Circuit breaker settings for the `onchain-protocol` circuit.
    pub breaker: CircuitBreakerConfig,
}

impl Default for X402ManagerConfig {
    fn default() -> Self {
        Self {
            allow_unknown_mints: false,
            enable_gasless: true,
            retry: RetryPolicy::standard(),
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// What the caller wants to pay for.
#[derive(Debug, Clone, Default)]
pub struct PaymentRequest {
    /// Resource id; ignored for carts, which use the quoted cart id.
    pub resource: String,
    pub resource_type: ResourceType,
    /// Cart lines; non-empty for cart payments.
    pub items: Vec<CartItem>,
    pub coupon_code: Option<String>,
    pub metadata: BTreeMap<String, String>,
    /// Requirement already shown to the user. Skips the quote.
    pub requirement: Option<PaymentRequirement>,
    pub cancel: Option<CancellationToken>,
}

impl PaymentRequest {
    /// Pay for a single resource.
    pub fn resource(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Self::default()
        }
    }

    /// Pay for a cart.
    pub fn cart(items: Vec<CartItem>) -> Self {
        Self {
            resource_type: ResourceType::Cart,
            items,
            ..Self::default()
        }
    }

    /// Pay a refund resource.
    pub fn refund(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            resource_type: ResourceType::Refund,
            ..Self::default()
        }
    }

    pub fn with_coupon(mut self, code: impl Into<String>) -> Self {
        self.coupon_code = Some(code.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_requirement(mut self, requirement: PaymentRequirement) -> Self {
        self.requirement = Some(requirement);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cart(&self) -> bool {
        self.resource_type == ResourceType::Cart
    }
}

/// Fields carried inside the proof payload.
#[derive(Debug, Clone, Default)]
pub struct ProofContext {
    pub resource: String,
    pub resource_type: ResourceType,
    pub metadata: BTreeMap<String, String>,
    pub coupon_code: Option<String>,
    /// Sign partially and name the backend fee payer.
    pub gasless: bool,
}

/// Result of a completed payment attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub settlement: SettlementResult,
    /// Stages visited, ending in `Success`.
    pub stages: Vec<PaymentStage>,
    pub gasless: bool,
    pub payer: String,
    pub resource: String,
}

/// Rate limiters for each remote operation class.
#[derive(Debug)]
struct Limiters {
    quote: RateLimiter,
    cart: RateLimiter,
    gasless: RateLimiter,
    verify: RateLimiter,
}

impl Limiters {
    fn new() -> Self {
        Self {
            quote: RateLimitPreset::Standard.limiter("quote"),
            cart: RateLimitPreset::Relaxed.limiter("cart-quote"),
            gasless: RateLimitPreset::Relaxed.limiter("gasless-transaction"),
            verify: RateLimitPreset::Standard.limiter("verify"),
        }
    }
}

/// Orchestrates x402 payments against one paywall server.
pub struct X402Manager {
    api: ApiClient,
    chain: Arc<dyn ChainClient>,
    config: X402ManagerConfig,
    breaker: CircuitBreaker,
    limiters: Limiters,
}

impl std::fmt::Debug for X402Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X402Manager")
            .field("server_url", &self.api.server_url())
            .field("config", &self.config)
            .field("breaker", &self.breaker.state())
            .finish()
    }
}

impl X402Manager {
    /// Create a manager sharing `api` with the other managers of a set.
    pub fn new(api: ApiClient, chain: Arc<dyn ChainClient>, config: X402ManagerConfig) -> Self {
        let breaker = CircuitBreaker::new(CIRCUIT_ONCHAIN, config.breaker);
        Self {
            api,
            chain,
            config,
            breaker,
            limiters: Limiters::new(),
        }
    }

    pub fn config(&self) -> &X402ManagerConfig {
        &self.config
    }

    /// The `onchain-protocol` circuit.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Admit once, then retry transient failures through the breaker.
    async fn call<T, F, Fut>(&self, limiter: &RateLimiter, op: F) -> X402Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = X402Result<T>>,
    {
        limiter.admit()?;
        let op = &op;
        self.config
            .retry
            .run_with(
                move || {
                    self.breaker
                        .execute_with(move || op(), |e: &X402Error| e.is_retryable())
                },
                |e: &X402Error, _| e.is_retryable(),
            )
            .await
    }

    /// Chain reads get the deadline and retry but not the paywall circuit.
    async fn chain_call<T, F, Fut>(&self, cancel: Option<&CancellationToken>, op: F) -> X402Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = X402Result<T>>,
    {
        let ctx = CallContext {
            timeout: self.api.timeout(),
            cancel: cancel.cloned(),
        };
        let ctx = &ctx;
        let op = &op;
        self.config
            .retry
            .run_with(move || ctx.run(op()), |e: &X402Error, _| e.is_retryable())
            .await
    }

    fn options(key: Option<String>, cancel: Option<&CancellationToken>) -> RequestOptions {
        RequestOptions {
            idempotency_key: key,
            ..RequestOptions::default()
        }
        .cancellable(cancel.cloned())
    }

    // =========================================================================
    // Quotes
    // =========================================================================

    /// Fetch the requirement for a single resource.
    ///
    /// `402 Payment Required` and 2xx both carry the requirement.
    pub async fn request_quote(
        &self,
        resource: &str,
        coupon_code: Option<&str>,
    ) -> X402Result<PaymentRequirement> {
        self.quote(resource, coupon_code, None).await
    }

    async fn quote(
        &self,
        resource: &str,
        coupon_code: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> X402Result<PaymentRequirement> {
        let body = compat::quote_request(resource, coupon_code);
        let options = Self::options(Some(new_idempotency_key()), cancel);
        let (body, options) = (&body, &options);

        let requirement = self
            .call(&self.limiters.quote, move || async move {
                let response = self
                    .api
                    .post_json(QUOTE_PATH, body, options)
                    .await?
                    .accept(&[402])?;
                let value: Value = response.json()?;
                compat::parse_quote_response(value, Some(resource))
            })
            .await?;

        debug!(
            resource,
            amount = %requirement.max_amount_required,
            asset = %requirement.asset,
            gasless = requirement.is_gasless(),
            "Quote received"
        );
        Ok(requirement)
    }

    /// Fetch the aggregated requirement for a cart.
    pub async fn request_cart_quote(
        &self,
        items: &[CartItem],
        metadata: &BTreeMap<String, String>,
        coupon_code: Option<&str>,
    ) -> X402Result<CartQuote> {
        self.cart_quote(items, metadata, coupon_code, None).await
    }

    async fn cart_quote(
        &self,
        items: &[CartItem],
        metadata: &BTreeMap<String, String>,
        coupon_code: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> X402Result<CartQuote> {
        if items.is_empty() {
            return Err(X402Error::invalid_requirement("cart has no items"));
        }
        if let Some(item) = items.iter().find(|i| i.quantity == 0) {
            return Err(X402Error::invalid_requirement(format!(
                "cart item {} has zero quantity",
                item.resource
            )));
        }

        let body = compat::cart_quote_request(items, metadata, coupon_code);
        let options = Self::options(Some(new_idempotency_key()), cancel);
        let (body, options) = (&body, &options);

        let quote = self
            .call(&self.limiters.cart, move || async move {
                let response = self
                    .api
                    .post_json(CART_QUOTE_PATH, body, options)
                    .await?
                    .accept(&[402])?;
                let value: Value = response.json()?;
                compat::parse_cart_quote_response(value)
            })
            .await?;

        debug!(
            cart_id = %quote.cart_id,
            items = items.len(),
            amount = %quote.requirement.max_amount_required,
            "Cart quote received"
        );
        Ok(quote)
    }

    // =========================================================================
    // Transaction construction
    // =========================================================================

    /// Build the standard-path transfer with the payer as fee payer.
    pub async fn build_payment_transaction(
        &self,
        requirement: &PaymentRequirement,
        payer: &Pubkey,
    ) -> X402Result<Transaction> {
        self.build_standard(requirement, payer, None).await
    }

    async fn build_standard(
        &self,
        requirement: &PaymentRequirement,
        payer: &Pubkey,
        cancel: Option<&CancellationToken>,
    ) -> X402Result<Transaction> {
        requirement.validate()?;
        let decimals = self.decimals_for(requirement)?;
        let blockhash = self
            .chain_call(cancel, || self.chain.get_latest_blockhash())
            .await?;
        transaction::build_transfer_transaction(requirement, payer, blockhash, decimals)
    }

    fn decimals_for(&self, requirement: &PaymentRequirement) -> X402Result<u8> {
        assets::resolve_decimals(
            &requirement.asset,
            requirement.extra.as_ref().and_then(|e| e.decimals),
            self.config.allow_unknown_mints,
        )
    }

    /// Fetch the backend-built gasless transaction.
    ///
    /// The transaction must name the quote's fee payer and include the payer
    /// as a signer. The backend blockhash is stamped before returning.
    pub async fn build_gasless_transaction(
        &self,
        requirement: &PaymentRequirement,
        resource_id: &str,
        payer: &Pubkey,
        coupon_code: Option<&str>,
    ) -> X402Result<Transaction> {
        self.build_gasless(requirement, resource_id, payer, coupon_code, None)
            .await
    }

    async fn build_gasless(
        &self,
        requirement: &PaymentRequirement,
        resource_id: &str,
        payer: &Pubkey,
        coupon_code: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> X402Result<Transaction> {
        requirement.validate()?;
        self.decimals_for(requirement)?;
        let expected_fee_payer = match requirement.fee_payer() {
            Some(fee_payer) => parse_pubkey("feePayer", fee_payer)?,
            None => {
                return Err(X402Error::invalid_requirement(
                    "quote does not offer a fee payer",
                ))
            }
        };

        let body = GaslessRequest {
            resource_id: resource_id.to_string(),
            user_wallet: payer.to_string(),
            fee_payer: expected_fee_payer.to_string(),
            coupon_code: coupon_code.map(str::to_string),
        };
        let options = Self::options(Some(new_idempotency_key()), cancel);
        let (body, options) = (&body, &options);

        let response = self
            .call(&self.limiters.gasless, move || async move {
                let response = self
                    .api
                    .post_json(GASLESS_TRANSACTION_PATH, body, options)
                    .await?
                    .accept(&[])?;
                let parsed: GaslessResponse = response.json()?;
                Ok::<_, X402Error>(parsed)
            })
            .await?;

        let mut tx = transaction::decode_transaction(&response.transaction)?;

        let actual_fee_payer = transaction::fee_payer(&tx)
            .ok_or_else(|| X402Error::invalid_transaction("transaction has no accounts"))?;
        if actual_fee_payer != expected_fee_payer {
            return Err(X402Error::FeePayerMismatch {
                expected: expected_fee_payer.to_string(),
                actual: actual_fee_payer.to_string(),
            });
        }
        if transaction::signer_index(&tx, payer).is_none() {
            return Err(X402Error::invalid_transaction(format!(
                "payer {} is not a signer of the gasless transaction",
                payer
            )));
        }

        let blockhash = Hash::from_str(response.blockhash.trim()).map_err(|e| {
            X402Error::invalid_transaction(format!("invalid blockhash {}: {}", response.blockhash, e))
        })?;
        tx.message.recent_blockhash = blockhash;

        debug!(
            resource_id,
            payer = %payer,
            fee_payer = %actual_fee_payer,
            "Gasless transaction received"
        );
        Ok(tx)
    }

    // =========================================================================
    // Proof and settlement
    // =========================================================================

    /// Sign `tx` and wrap it in a proof.
    ///
    /// Standard transactions are fully signed; gasless transactions carry
    /// only the payer's signature and name the backend fee payer.
    pub async fn create_payment_proof(
        &self,
        requirement: &PaymentRequirement,
        tx: Transaction,
        wallet: &dyn WalletSigner,
        context: &ProofContext,
    ) -> X402Result<PaymentProof> {
        let payer = wallet.pubkey().ok_or(X402Error::WalletNotConnected)?;

        let signed = if context.gasless {
            wallet.partial_sign_transaction(tx).await?
        } else {
            wallet.sign_transaction(tx).await?
        };
        let signature = transaction::payer_signature(&signed, &payer)?;

        let fee_payer = if context.gasless {
            let fee_payer = transaction::fee_payer(&signed)
                .ok_or_else(|| X402Error::invalid_transaction("transaction has no accounts"))?;
            Some(fee_payer.to_string())
        } else {
            None
        };

        let payload = ProofPayload {
            signature: signature.to_string(),
            transaction: transaction::encode_transaction(&signed)?,
            payer: payer.to_string(),
            resource: context.resource.clone(),
            resource_type: context.resource_type,
            metadata: context.metadata.clone(),
            coupon_code: context.coupon_code.clone(),
            fee_payer,
        };
        Ok(PaymentProof::new(requirement, payload))
    }

    /// Submit a proof for verification and settlement.
    ///
    /// The resource travels only inside the proof; the URL is fixed.
    pub async fn submit_payment(
        &self,
        proof: &PaymentProof,
        idempotency_key: &str,
    ) -> X402Result<SettlementResult> {
        self.submit(proof, idempotency_key, None).await
    }

    async fn submit(
        &self,
        proof: &PaymentProof,
        idempotency_key: &str,
        cancel: Option<&CancellationToken>,
    ) -> X402Result<SettlementResult> {
        let options = Self::options(Some(idempotency_key.to_string()), cancel)
            .header(HEADER_PAYMENT, proof.to_header()?);
        let body = json!({});
        let (body, options) = (&body, &options);

        let (settlement, verified) = self
            .call(&self.limiters.verify, move || async move {
                let response = self
                    .api
                    .post_json(VERIFY_PATH, body, options)
                    .await?
                    .accept(&[])?;
                let settlement = response
                    .header(HEADER_PAYMENT_RESPONSE)
                    .map(SettlementResponse::from_header)
                    .transpose()?;
                let verified: VerifyResponse = if response.text().trim().is_empty() {
                    VerifyResponse::default()
                } else {
                    response.json()?
                };
                Ok::<_, X402Error>((settlement, verified))
            })
            .await?;

        let transaction_id = verified
            .signature
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| proof.payload.signature.clone());

        let result = SettlementResult {
            success: settlement.as_ref().map(|s| s.success).unwrap_or(true),
            transaction_id,
            settlement,
        };

        info!(
            resource = %proof.payload.resource,
            transaction_id = %result.transaction_id,
            success = result.success,
            "Payment submitted"
        );
        Ok(result)
    }

    // =========================================================================
    // Full attempt
    // =========================================================================

    /// Run one payment attempt end to end.
    pub async fn pay(
        &self,
        request: PaymentRequest,
        wallet: &dyn WalletSigner,
    ) -> X402Result<PaymentReceipt> {
        let mut attempt = PaymentAttempt::new();
        match self.run_attempt(&request, wallet, &mut attempt).await {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                let stage = attempt.current();
                attempt.fail();
                warn!(
                    resource = %request.resource,
                    stage = %stage,
                    error = %e,
                    "Payment attempt failed"
                );
                Err(e)
            }
        }
    }

    async fn run_attempt(
        &self,
        request: &PaymentRequest,
        wallet: &dyn WalletSigner,
        attempt: &mut PaymentAttempt,
    ) -> X402Result<PaymentReceipt> {
        let cancel = request.cancel.as_ref();
        let coupon = request.coupon_code.as_deref();

        let payer = match wallet.pubkey() {
            Some(pubkey) => pubkey,
            None => wallet.connect().await?,
        };

        // Step 1: Quote, unless the user already saw a requirement
        let (requirement, cart_id) = match &request.requirement {
            Some(requirement) => (requirement.clone(), None),
            None => {
                attempt.advance(PaymentStage::Quoting)?;
                if request.is_cart() {
                    let CartQuote { cart_id, requirement } = self
                        .cart_quote(&request.items, &request.metadata, coupon, cancel)
                        .await?;
                    (requirement, Some(cart_id))
                } else {
                    (self.quote(&request.resource, coupon, cancel).await?, None)
                }
            }
        };
        requirement.validate()?;
        // A cart is paid under its cart id, never under the quote's echo.
        let resource = match cart_id {
            Some(cart_id) => cart_id,
            None if request.is_cart() || request.resource.is_empty() => {
                requirement.resource.clone()
            }
            None => request.resource.clone(),
        };

        // Step 2: Build
        attempt.advance(PaymentStage::Building)?;
        let gasless = requirement.is_gasless() && self.config.enable_gasless;
        let tx = if gasless {
            self.build_gasless(&requirement, &resource, &payer, coupon, cancel)
                .await?
        } else {
            let need = requirement.amount()?;
            let mint = requirement.mint()?;
            let have = self
                .chain_call(cancel, || self.chain.get_token_balance(&payer, &mint))
                .await?;
            if have < need {
                return Err(X402Error::InsufficientBalance { have, need });
            }
            self.build_standard(&requirement, &payer, cancel).await?
        };

        // Step 3: Sign
        attempt.advance(PaymentStage::Signing)?;
        let context = ProofContext {
            resource: resource.clone(),
            resource_type: request.resource_type,
            metadata: request.metadata.clone(),
            coupon_code: request.coupon_code.clone(),
            gasless,
        };
        let proof = self
            .create_payment_proof(&requirement, tx, wallet, &context)
            .await?;

        // Step 4: Submit
        attempt.advance(PaymentStage::Submitting)?;
        let settlement = self
            .submit(&proof, &new_idempotency_key(), cancel)
            .await?;
        if !settlement.success {
            let reason = settlement
                .settlement
                .as_ref()
                .and_then(|s| s.error_reason.clone())
                .unwrap_or_else(|| "unknown settlement failure".to_string());
            return Err(X402Error::SettlementRejected { reason });
        }

        attempt.advance(PaymentStage::Success)?;
        info!(
            resource = %resource,
            payer = %payer,
            gasless,
            transaction_id = %settlement.transaction_id,
            "Payment settled"
        );

        Ok(PaymentReceipt {
            settlement,
            stages: attempt.history().to_vec(),
            gasless,
            payer: payer.to_string(),
            resource,
        })
    }

    /// Confirmation status of a submitted transaction.
    pub async fn transaction_status(&self, signature: &str) -> X402Result<Option<TransactionStatus>> {
        let signature = Signature::from_str(signature.trim()).map_err(|e| {
            X402Error::invalid_transaction(format!("invalid signature {}: {}", signature, e))
        })?;
        self.chain_call(None, || self.chain.get_signature_status(&signature))
            .await
    }
}
