//! Shared application state

use escrow_engine::{
    EscrowManager, HttpRegistry, InMemoryRegistry, RegistryError, RegistrySync,
};
use pactum_core::settings::{RegistryMode, Settings};
use std::{sync::Arc, time::Duration};
use tracing::info;

/// State handed to every route handler
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<EscrowManager>,
    /// Registry served by this process on the `/register-contract` routes
    pub registry: Arc<InMemoryRegistry>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Build state from settings; `remote` mode syncs escrows to an external registry
    pub fn from_settings(settings: Settings) -> Result<Self, RegistryError> {
        let registry = Arc::new(InMemoryRegistry::new());

        let sync: Arc<dyn RegistrySync> = match settings.registry.mode {
            RegistryMode::Embedded => {
                info!("Using embedded registry");
                registry.clone()
            }
            RegistryMode::Remote => {
                let url = settings.registry.url.as_deref().unwrap_or_default();
                let timeout = Duration::from_secs(settings.registry.timeout_secs);
                Arc::new(HttpRegistry::new(url, timeout)?)
            }
        };

        Ok(Self {
            manager: Arc::new(EscrowManager::new(sync)),
            registry,
            settings: Arc::new(settings),
        })
    }

    /// Shareable link for an indexed escrow
    pub fn contract_link(&self, address: &str) -> String {
        format!(
            "{}/contract/{}",
            self.settings.registry.public_base_url.trim_end_matches('/'),
            address
        )
    }
}

impl Default for AppState {
    fn default() -> Self {
        let registry = Arc::new(InMemoryRegistry::new());
        Self {
            manager: Arc::new(EscrowManager::new(registry.clone())),
            registry,
            settings: Arc::new(Settings::default()),
        }
    }
}
