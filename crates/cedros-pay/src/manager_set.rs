//! Manager sets and the `CedrosPay` entry point.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use cedros_checkout::{CreditsManager, HostedCheckoutManager};
use cedros_http::{ApiClient, RouteResolver};
use cedros_resilience::ClickGuard;
use cedros_x402::{ChainClient, X402Manager, X402ManagerConfig};

use crate::config::CedrosConfig;
use crate::error::PayResult;
use crate::fingerprint::fingerprint;
use crate::instance_cache::{InstanceCache, Lease};

/// The three rail managers for one deployment.
///
/// All three share one [`ApiClient`], so route discovery runs once per set.
pub struct ManagerSet {
    config: CedrosConfig,
    api: ApiClient,
    x402: X402Manager,
    checkout: HostedCheckoutManager,
    credits: CreditsManager,
    click_guard: ClickGuard,
}

impl ManagerSet {
    /// Build a set from a validated configuration.
    pub fn new(config: &CedrosConfig, chain: Arc<dyn ChainClient>) -> PayResult<Self> {
        config.validate()?;

        let api = ApiClient::with_settings(&config.server_url, config.request_timeout, config.route_retry)?;
        let x402 = X402Manager::new(
            api.clone(),
            chain,
            X402ManagerConfig {
                allow_unknown_mints: config.allow_unknown_mints,
                enable_gasless: config.enable_gasless,
                retry: config.onchain.retry,
                breaker: config.onchain.breaker,
            },
        );
        let checkout = HostedCheckoutManager::new(api.clone(), config.checkout);
        let credits = CreditsManager::new(api.clone(), config.credits);

        info!(
            server_url = %api.server_url(),
            network = %config.network,
            gasless = config.enable_gasless,
            "Created manager set"
        );

        Ok(Self {
            config: config.clone(),
            api,
            x402,
            checkout,
            credits,
            click_guard: ClickGuard::new(),
        })
    }

    /// Configuration the set was built from.
    pub fn config(&self) -> &CedrosConfig {
        &self.config
    }

    /// Shared transport.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Shared route resolver.
    pub fn routes(&self) -> &Arc<RouteResolver> {
        self.api.routes()
    }

    /// On-chain (x402) rail.
    pub fn x402(&self) -> &X402Manager {
        &self.x402
    }

    /// Hosted card checkout rail.
    pub fn checkout(&self) -> &HostedCheckoutManager {
        &self.checkout
    }

    /// Credits rail.
    pub fn credits(&self) -> &CreditsManager {
        &self.credits
    }

    /// Click cooldowns for this set's payment controls.
    pub fn click_guard(&self) -> &ClickGuard {
        &self.click_guard
    }
}

impl fmt::Debug for ManagerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerSet")
            .field("server_url", &self.api.server_url())
            .field("network", &self.config.network)
            .finish()
    }
}

/// Counted handle to a cached [`ManagerSet`]; releases on drop.
pub type ManagerLease = Lease<ManagerSet>;

/// Owner of the manager-set cache.
///
/// Acquiring the same deployment twice returns the same set, so breakers,
/// rate limiters and the discovered route prefix are shared between the
/// two holders.
#[derive(Debug, Clone, Default)]
pub struct CedrosPay {
    cache: Arc<InstanceCache<ManagerSet>>,
}

impl CedrosPay {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the manager set for `config`.
    ///
    /// `chain` is used only when the set is built; a cached set keeps the
    /// client it was created with.
    pub fn acquire(&self, config: &CedrosConfig, chain: Arc<dyn ChainClient>) -> PayResult<ManagerLease> {
        config.validate()?;
        let key = fingerprint(config);
        self.cache.lease(&key, || ManagerSet::new(config, chain))
    }

    /// Reference count for `config`'s set, 0 if not cached.
    pub fn ref_count(&self, config: &CedrosConfig) -> usize {
        self.cache.ref_count(&fingerprint(config))
    }

    /// Number of cached sets.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if no set is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drop every cached set.
    pub fn clear(&self) {
        self.cache.clear();
    }
}
