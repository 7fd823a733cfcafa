use libsql::{Builder, Connection, Database};
use std::sync::Arc;

use crate::config::StorageConfig;

use super::StorageError;

#[derive(Clone)]
pub struct TursoClient {
    #[allow(dead_code)]
    inner: Arc<Database>,
    conn: Connection,
}

impl TursoClient {
    pub async fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let db = match (&config.turso_url, &config.turso_token) {
            (Some(url), Some(token)) => {
                info!("Connecting to remote database...");
                Builder::new_remote(url.clone(), token.clone()).build().await?
            }
            _ => {
                info!("Opening local database at {}", config.database_path);
                Builder::new_local(config.database_path.as_str()).build().await?
            }
        };

        let conn = db.connect()?;

        Ok(Self {
            inner: Arc::new(db),
            conn,
        })
    }

    /// All callers share one underlying handle. A fresh `connect()` per call
    /// would hand in-memory databases a separate, empty store each time.
    pub fn get_connection(&self) -> Connection {
        self.conn.clone()
    }

    pub async fn init_schema(&self) -> Result<(), StorageError> {
        info!("Initializing database schema...");
        let conn = self.get_connection();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT,
                is_premium INTEGER DEFAULT 0,
                credits INTEGER DEFAULT 0,
                validity_expire_at TEXT,
                selected_model TEXT,
                tts_speed TEXT,
                created_at TEXT,
                updated_at TEXT
            )",
            (),
        )
        .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS admins (
                user_id INTEGER PRIMARY KEY
            )",
            (),
        )
        .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS voices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                file_path TEXT,
                created_at TEXT
            )",
            (),
        )
        .await?;

        // Older data files may predate the tts_speed column.
        if let Err(e) = conn.execute("ALTER TABLE users ADD COLUMN tts_speed TEXT", ()).await {
            debug!("tts_speed column migration skipped: {e}");
        }

        info!("Database schema ready");
        Ok(())
    }
}
