mod error;
mod turso;

pub use error::StorageError;
pub use turso::TursoClient;

use crate::config::StorageConfig;

#[derive(Clone)]
pub struct StorageManager {
    turso: TursoClient,
}

impl StorageManager {
    pub async fn init(config: &StorageConfig) -> Result<Self, StorageError> {
        let turso = TursoClient::new(config).await?;
        turso.init_schema().await?;

        Ok(Self { turso })
    }

    pub fn turso(&self) -> &TursoClient {
        &self.turso
    }
}
