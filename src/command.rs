use teloxide::{
    macros::BotCommands,
    payloads::{DeleteMyCommandsSetters, SetMyCommandsSetters},
    prelude::Requester,
    types::{BotCommand, BotCommandScope, ChatId, Recipient},
    Bot,
};

use crate::error::HandlerResult;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    Start,
    Help,
    Status,
    Clear,
}

/// Ledger and admin-set management. Only reachable for admins, enforced in
/// the handler tree.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum AdminCommand {
    #[command(parse_with = "split")]
    Grant { user_id: u64, amount: i64 },
    #[command(parse_with = "split")]
    Deduct { user_id: u64, amount: i64 },
    #[command(parse_with = "split")]
    Validity { user_id: u64, days: i64 },
    #[command(parse_with = "split")]
    Revoke { user_id: u64 },
    #[command(parse_with = "split")]
    User { user_id: u64 },
    Users,
    Premium,
    #[command(parse_with = "split")]
    AddAdmin { user_id: u64 },
    #[command(parse_with = "split")]
    DelAdmin { user_id: u64 },
    Admins,
}

impl Command {
    pub fn user_commands() -> Vec<BotCommand> {
        vec![
            BotCommand::new("start", "Start the bot"),
            BotCommand::new("help", "How to use the bot"),
            BotCommand::new("status", "Show uploaded images and prompt"),
            BotCommand::new("clear", "Reset images and prompt"),
        ]
    }
}

impl AdminCommand {
    pub fn admin_commands() -> Vec<BotCommand> {
        let mut commands = Command::user_commands();
        commands.extend([
            BotCommand::new("grant", "Add credits: /grant <user_id> <amount>"),
            BotCommand::new("deduct", "Remove credits: /deduct <user_id> <amount>"),
            BotCommand::new("validity", "Set validity: /validity <user_id> <days>"),
            BotCommand::new("revoke", "Revoke validity: /revoke <user_id>"),
            BotCommand::new("user", "Show one account: /user <user_id>"),
            BotCommand::new("users", "List recent accounts"),
            BotCommand::new("premium", "List premium accounts"),
            BotCommand::new("addadmin", "Add an admin: /addadmin <user_id>"),
            BotCommand::new("deladmin", "Remove an admin: /deladmin <user_id>"),
            BotCommand::new("admins", "List admins"),
        ]);
        commands
    }
}

pub async fn setup_user_commands(bot: &Bot) -> HandlerResult<()> {
    bot.delete_my_commands().await?;
    bot.set_my_commands(Command::user_commands()).await?;
    Ok(())
}

/// Replaces the command menu in the admin's own chat with the full set.
#[allow(unused)]
async fn setup_admin_commands(bot: &Bot, chat_id: ChatId) -> HandlerResult<()> {
    bot.delete_my_commands()
        .scope(BotCommandScope::Chat {
            chat_id: Recipient::Id(chat_id),
        })
        .await?;
    bot.set_my_commands(AdminCommand::admin_commands())
        .scope(BotCommandScope::Chat {
            chat_id: Recipient::Id(chat_id),
        })
        .await?;
    Ok(())
}

#[cfg(not(test))]
pub async fn setup_commands(bot: &Bot, is_admin: bool, chat_id: ChatId) -> HandlerResult<()> {
    if is_admin {
        setup_admin_commands(bot, chat_id).await?;
    }
    Ok(())
}

#[cfg(test)]
pub async fn setup_commands(_bot: &Bot, _is_admin: bool, _chat_id: ChatId) -> HandlerResult<()> {
    Ok(())
}
