use teloxide::dispatching::{HandlerExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::{types::Message, Bot};

use crate::command::{setup_commands, Command};
use crate::error::HandlerResult;
use crate::state::AppState;
use crate::utils::is_admin;

fn start_text(max_images: usize) -> String {
    format!(
        "✅ Image Edit Bot\n\n\
         How it works:\n\
         1) Send 1-{max_images} images\n\
         2) Then send a text prompt (e.g. \"make her touching her hair\")\n\n\
         Commands:\n\
         /status - show how many images are uploaded\n\
         /clear - reset everything"
    )
}

async fn handle_start(bot: Bot, msg: Message) -> HandlerResult<()> {
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };

    let registry = AppState::get()?.service_registry;
    registry.account.ensure_user(user.id, user.username.as_deref()).await?;

    bot.send_message(msg.chat.id, start_text(registry.edit.max_images())).await?;

    let admin = is_admin(user.id).await.unwrap_or(false);
    setup_commands(&bot, admin, msg.chat.id).await?;

    Ok(())
}

async fn handle_help(bot: Bot, msg: Message) -> HandlerResult<()> {
    let registry = AppState::get()?.service_registry;
    bot.send_message(msg.chat.id, start_text(registry.edit.max_images())).await?;

    Ok(())
}

async fn handle_status(bot: Bot, msg: Message) -> HandlerResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let registry = AppState::get()?.service_registry;
    let status = registry.edit.status(user.id);

    let mut text = format!(
        "Images uploaded: {}/{}\nPrompt: {}",
        status.images,
        status.max_images,
        status.prompt.as_deref().unwrap_or("None")
    );
    if registry.edit.is_generating(user.id) {
        text.push_str("\nAn edit is running right now.");
    }

    bot.send_message(msg.chat.id, text).await?;

    Ok(())
}

async fn handle_clear(bot: Bot, msg: Message) -> HandlerResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let registry = AppState::get()?.service_registry;
    registry.edit.clear(user.id);

    bot.send_message(msg.chat.id, "✅ Cleared. Images & prompt reset.").await?;

    Ok(())
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command) -> HandlerResult<()> {
    match cmd {
        Command::Start => handle_start(bot, msg).await?,
        Command::Help => handle_help(bot, msg).await?,
        Command::Status => handle_status(bot, msg).await?,
        Command::Clear => handle_clear(bot, msg).await?,
    }

    Ok(())
}

pub fn get_command_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_message()
        .filter_command::<Command>()
        .endpoint(handle_command)
}
