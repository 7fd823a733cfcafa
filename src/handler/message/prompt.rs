use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, Message};
use teloxide::Bot;

use crate::error::HandlerResult;
use crate::service::edit::EditError;
use crate::state::AppState;

/// A non-empty, non-command text message, extracted by the handler tree.
#[derive(Clone)]
pub struct Prompt(pub String);

#[cfg(not(test))]
async fn send_typing(bot: &Bot, chat_id: ChatId) {
    use teloxide::types::ChatAction;

    if let Err(e) = bot.send_chat_action(chat_id, ChatAction::Typing).await {
        warn!("Failed to send chat action: {}", e);
    }
}

#[cfg(test)]
async fn send_typing(_bot: &Bot, _chat_id: ChatId) {}

pub async fn handle_message_prompt(bot: Bot, msg: Message, Prompt(prompt): Prompt) -> HandlerResult<()> {
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };

    let registry = AppState::get()?.service_registry;
    registry.account.ensure_user(user.id, user.username.as_deref()).await?;

    send_typing(&bot, msg.chat.id).await;
    let progress = bot.send_message(msg.chat.id, "Your request is progressing...").await?;

    let outcome = registry.edit.submit_prompt(user.id, &prompt).await;

    if let Err(e) = bot.delete_message(progress.chat.id, progress.id).await {
        warn!("Failed to delete progress message: {}", e);
    }

    match outcome {
        Ok(done) => {
            let photo = InputFile::memory(done.output.clone()).file_name("result.png");
            let delivery = bot
                .send_photo(msg.chat.id, photo)
                .caption(format!("Generated based on your prompt: \"{prompt}\""))
                .await;

            match delivery {
                Ok(_) => {
                    done.confirm_delivered();
                    bot.send_message(msg.chat.id, "Process finished. You can start a new project by sending images.")
                        .await?;
                }
                Err(e) => {
                    error!("Failed to deliver result to user {}: {}", user.id, e);
                    bot.send_message(
                        msg.chat.id,
                        "⚠️ Could not send the result. Your images and prompt are kept, send the prompt again to retry.",
                    )
                    .await?;
                }
            }
        }
        Err(EditError::NoImages) => {
            bot.send_message(
                msg.chat.id,
                format!(
                    "Please send 1-{} images first, then describe the edit.",
                    registry.edit.max_images()
                ),
            )
            .await?;
        }
        Err(EditError::Busy) => {
            bot.send_message(msg.chat.id, "⏳ Another edit is already in progress. Please wait for it to finish.")
                .await?;
        }
        Err(e) => {
            error!("Edit failed for user {}: {}", user.id, e);
            bot.send_message(
                msg.chat.id,
                format!("❌ Failed: {e}\nTip: your images and prompt are kept, try again or /clear."),
            )
            .await?;
        }
    }

    Ok(())
}
