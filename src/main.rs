use bot::BotService;
use config::{build_config, AppConfig};

extern crate pretty_env_logger;
#[macro_use]
extern crate log;

mod bot;
mod command;
mod config;
mod error;
mod handler;
mod service;
mod state;
mod storage;
mod utils;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    let _ = pretty_env_logger::try_init_timed();

    info!("Starting bot...");

    let config = build_config().expect("Failed to build config");
    AppConfig::set_global(config).expect("Failed to set global app config");

    let bot_service = BotService::new().await.expect("Failed to initialize bot service");
    info!("Bot instance created");

    bot_service.start().await.expect("Failed to start bot");
}
