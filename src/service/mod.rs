use std::sync::Arc;

use account::AccountService;
use edit::EditService;
use generation::{GeminiClient, ImageGenerator};
use session::SessionService;

use crate::{config::AppConfig, storage::StorageManager};

pub mod account;
pub mod edit;
mod error;
pub mod generation;
pub mod session;

pub use error::ServiceError;

#[derive(Clone)]
pub struct ServiceRegistry {
    pub account: AccountService,
    pub edit: EditService,
}

impl ServiceRegistry {
    pub fn new(config: &AppConfig, storage: StorageManager) -> Result<Self, ServiceError> {
        let generator = Arc::new(GeminiClient::new(&config.gemini)?);
        Ok(Self::with_generator(config, storage, generator))
    }

    /// Wires the registry around an arbitrary generator. Tests inject mocks
    /// through this.
    pub fn with_generator(config: &AppConfig, storage: StorageManager, generator: Arc<dyn ImageGenerator>) -> Self {
        info!("Initializing service registry");

        let account = AccountService::new(storage, config.admin.telegram_user_id);
        let session = SessionService::new(config.session.max_images);
        let edit = EditService::new(session, generator, config.session.max_image_side);

        info!("Service registry initialized");

        Self { account, edit }
    }
}
