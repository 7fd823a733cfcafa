pub mod http;
pub mod image;

use teloxide::types::UserId;

use crate::{error::BotResult, state::AppState};

pub async fn is_admin(user_id: UserId) -> BotResult<bool> {
    let registry = AppState::get()?.service_registry;
    Ok(registry.account.is_admin(user_id).await?)
}
