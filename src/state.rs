use std::sync::OnceLock;

use crate::service::ServiceRegistry;
use crate::storage::StorageManager;

use crate::{
    config::AppConfig,
    error::{BotError, BotResult},
};

#[derive(Clone)]
pub struct AppState {
    pub service_registry: ServiceRegistry,
}

static APP_STATE: OnceLock<AppState> = OnceLock::new();

impl AppState {
    pub async fn new(config: &AppConfig) -> BotResult<Self> {
        let storage = StorageManager::init(&config.storage).await?;

        let service_registry = ServiceRegistry::new(config, storage)?;

        Ok(Self { service_registry })
    }

    pub fn set_global(state: AppState) -> BotResult<()> {
        APP_STATE
            .set(state)
            .map_err(|_| BotError::AppStateError("Failed to set global app state".into()))
    }

    pub fn get() -> BotResult<AppState> {
        APP_STATE
            .get()
            .cloned()
            .ok_or_else(|| BotError::AppStateError("App state not initialized".into()))
    }

    #[cfg(test)]
    pub async fn new_test(generator: std::sync::Arc<dyn crate::service::generation::ImageGenerator>) -> BotResult<Self> {
        let config = AppConfig::new_test_config();

        let storage = StorageManager::init(&config.storage).await?;
        let service_registry = ServiceRegistry::with_generator(&config, storage, generator);

        Ok(Self { service_registry })
    }
}
