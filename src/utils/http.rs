use std::time::Duration;

use teloxide::{net, Bot};

/// Builds the bot with a transport client tuned for long polling.
///
/// The builder must come from `teloxide::net`: the crate-level reqwest is a
/// newer major version whose `Client` the `Bot` API does not accept.
pub fn create_telegram_bot(token: String) -> Bot {
    let client = net::default_reqwest_settings()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(60))
        .tcp_keepalive(Duration::from_secs(30))
        .user_agent("TelegramBot/1.0")
        .build()
        .expect("Failed to build client");

    Bot::with_client(token, client)
}
