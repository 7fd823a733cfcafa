use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::Message;
use teloxide::Bot;

use crate::error::{BotError, HandlerResult};
use crate::service::edit::EditError;
use crate::service::session::SessionError;
use crate::service::ServiceError;
use crate::state::AppState;

pub fn has_image_payload(msg: &Message) -> bool {
    if msg.photo().is_some() {
        return true;
    }

    msg.document()
        .and_then(|doc| doc.mime_type.as_ref())
        .is_some_and(|mime| mime.essence_str().starts_with("image/"))
}

fn limit_message(max: usize) -> String {
    format!("⚠️ Max {max} images reached. Use /clear to start a new project.")
}

/// Resolves the message to raw image bytes. Photo sizes arrive smallest
/// first, so the last entry is the best resolution Telegram has.
async fn download_image_bytes(bot: &Bot, msg: &Message) -> HandlerResult<Option<Vec<u8>>> {
    let file_id = if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        photo.file.id.clone()
    } else if let Some(document) = msg.document() {
        let is_image = document
            .mime_type
            .as_ref()
            .is_some_and(|mime| mime.essence_str().starts_with("image/"));
        if !is_image {
            return Ok(None);
        }
        document.file.id.clone()
    } else {
        return Ok(None);
    };

    let file = bot.get_file(file_id).await?;
    let mut bytes = Vec::with_capacity(file.meta.size as usize);
    bot.download_file(&file.path, &mut bytes).await?;

    Ok(Some(bytes))
}

pub async fn handle_message_image(bot: Bot, msg: Message) -> HandlerResult<()> {
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };

    let registry = AppState::get()?.service_registry;
    registry.account.ensure_user(user.id, user.username.as_deref()).await?;

    // Check before downloading so a full session costs no bandwidth.
    let status = registry.edit.status(user.id);
    if status.images >= status.max_images {
        bot.send_message(msg.chat.id, limit_message(status.max_images)).await?;
        return Ok(());
    }

    let bytes = match download_image_bytes(&bot, &msg).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            bot.send_message(msg.chat.id, "I can only accept images (photo or image file).")
                .await?;
            return Ok(());
        }
        Err(e) => {
            error!("Failed to download image from user {}: {}", user.id, e);
            bot.send_message(msg.chat.id, "⚠️ Could not download that image. Please try again.")
                .await?;
            return Ok(());
        }
    };

    match registry.edit.add_image(user.id, bytes) {
        Ok(position) => {
            bot.send_message(
                msg.chat.id,
                format!("Image {position} received. Please send a text prompt to describe the changes."),
            )
            .await?;
        }
        Err(EditError::Session(SessionError::LimitExceeded { max })) => {
            bot.send_message(msg.chat.id, limit_message(max)).await?;
        }
        Err(e) => return Err(BotError::ServiceError(ServiceError::Edit(e)).into()),
    }

    Ok(())
}
