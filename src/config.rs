use std::env;
use std::sync::OnceLock;

use teloxide::types::UserId;

use crate::error::{BotError, BotResult};

static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    MissingKey(&'static str),
    #[error("Invalid value for environment variable {0}")]
    InvalidKey(&'static str),
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub gemini: GeminiConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub admin: AdminConfig,
}

impl AppConfig {
    pub fn set_global(config: AppConfig) -> BotResult<()> {
        APP_CONFIG
            .set(config)
            .map_err(|_| BotError::AppStateError("Failed to set global app config".to_string()))
    }

    pub fn get() -> BotResult<&'static AppConfig> {
        APP_CONFIG
            .get()
            .ok_or_else(|| BotError::AppStateError("App config not initialized".to_string()))
    }

    #[cfg(test)]
    pub fn new_test_config() -> AppConfig {
        AppConfig {
            telegram: TelegramConfig("123456:TEST_TOKEN".to_string()),
            gemini: GeminiConfig {
                api_key: "test-key".to_string(),
                model: DEFAULT_GEMINI_MODEL.to_string(),
                base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
                timeout_secs: 5,
            },
            storage: StorageConfig {
                database_path: ":memory:".to_string(),
                turso_url: None,
                turso_token: None,
            },
            session: SessionConfig {
                max_images: 3,
                max_image_side: 1536,
            },
            admin: AdminConfig {
                telegram_user_id: Some(UserId(1111)),
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct TelegramConfig(pub String);

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Local SQLite file by default; a remote Turso database when both
/// `TURSO_URL` and `TURSO_TOKEN` are present.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub database_path: String,
    pub turso_url: Option<String>,
    pub turso_token: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub max_images: usize,
    pub max_image_side: u32,
}

#[derive(Clone, Debug)]
pub struct AdminConfig {
    pub telegram_user_id: Option<UserId>,
}

fn require(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingKey(key))
}

fn parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidKey(key)),
        Err(_) => Ok(default),
    }
}

pub fn build_config() -> Result<AppConfig, ConfigError> {
    info!("Building AppConfig...");

    let admin_user_id = match env::var("ADMIN_USER_ID") {
        Ok(raw) => Some(UserId(raw.parse::<u64>().map_err(|_| ConfigError::InvalidKey("ADMIN_USER_ID"))?)),
        Err(_) => None,
    };

    let config = AppConfig {
        telegram: TelegramConfig(require("TELEGRAM_BOT_TOKEN")?),
        gemini: GeminiConfig {
            api_key: require("GEMINI_API_KEY")?,
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            timeout_secs: parse_or("GEMINI_TIMEOUT_SECS", 120)?,
        },
        storage: StorageConfig {
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "retouch.db".to_string()),
            turso_url: env::var("TURSO_URL").ok(),
            turso_token: env::var("TURSO_TOKEN").ok(),
        },
        session: SessionConfig {
            max_images: parse_or("SESSION_MAX_IMAGES", 3)?,
            max_image_side: parse_or("IMAGE_MAX_SIDE", 1536)?,
        },
        admin: AdminConfig {
            telegram_user_id: admin_user_id,
        },
    };

    info!("AppConfig built");

    Ok(config)
}
