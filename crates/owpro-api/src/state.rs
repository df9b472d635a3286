//! Application state wiring the router and its collaborators together.
//!
//! AppState holds the single [`RequestRouter`] used by both CLI commands and
//! REST API handlers. The registry, prober, and ledger are shared through it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use owpro_core::llm::health::HealthProber;
use owpro_core::llm::ledger::UsageLedger;
use owpro_core::llm::pricing::PricingTable;
use owpro_core::llm::registry::ModelRegistry;
use owpro_core::llm::router::RequestRouter;
use owpro_infra::config::{load_gateway_config, resolve_data_dir};
use owpro_infra::llm::{create_providers, resolve_api_key};
use owpro_types::config::GatewayConfig;

/// Shared application state.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<RequestRouter>,
    pub config: Arc<GatewayConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load configuration from the data directory and wire the router.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_gateway_config(&data_dir).await;
        let api_key = resolve_api_key(&config.remote);
        Self::from_config(config, api_key, data_dir)
    }

    /// Wire the router from an already-loaded configuration.
    pub fn from_config(
        config: GatewayConfig,
        api_key: Option<secrecy::SecretString>,
        data_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        let registry = ModelRegistry::new(config.effective_models())
            .context("invalid model registry in config")?;
        let providers =
            create_providers(&config, api_key).context("failed to create model providers")?;
        let prober = HealthProber::from_config(providers.clone(), &config.probe);
        let ledger = UsageLedger::new(PricingTable::new(config.effective_pricing()));

        tracing::info!(
            models = registry.len(),
            local = %config.local.base_url,
            remote = %config.remote.base_url,
            "Gateway state initialized"
        );

        let router = RequestRouter::new(
            Arc::new(registry),
            providers,
            Arc::new(prober),
            Arc::new(ledger),
        );

        Ok(Self {
            router: Arc::new(router),
            config: Arc::new(config),
            data_dir,
        })
    }
}
