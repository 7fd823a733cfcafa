use chrono::Utc;
use teloxide::dispatching::{HandlerExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{Message, UserId};
use teloxide::Bot;

use crate::command::AdminCommand;
use crate::error::HandlerResult;
use crate::service::account::{AccountError, UserAccount};
use crate::state::AppState;
use crate::utils::is_admin;

const LIST_LIMIT: u32 = 100;

pub fn get_admin_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_message()
        .filter_command::<AdminCommand>()
        .filter_async(|msg: Message| async move {
            match msg.from.as_ref() {
                Some(user) => is_admin(user.id).await.unwrap_or(false),
                None => false,
            }
        })
        .endpoint(handle_admin_command)
}

async fn handle_admin_command(bot: Bot, msg: Message, cmd: AdminCommand) -> HandlerResult<()> {
    let registry = AppState::get()?.service_registry;
    let account = &registry.account;

    let reply = match cmd {
        AdminCommand::Grant { user_id, amount } => {
            let user = account.grant_credits(UserId(user_id), amount).await?;
            format!("Granted {} credits to {}. Balance: {}", amount, user_id, user.credits)
        }
        AdminCommand::Deduct { user_id, amount } => {
            match account.consume_credits(UserId(user_id), amount).await {
                Ok(user) => format!("Deducted {} credits from {}. Balance: {}", amount, user_id, user.credits),
                Err(AccountError::UserNotFound(_)) => format!("User {} is not registered.", user_id),
                Err(e) => return Err(e.into()),
            }
        }
        AdminCommand::Validity { user_id, days } => {
            match account.grant_validity(UserId(user_id), days).await {
                Ok(user) => format!(
                    "Validity for {} set to {} day(s), until {}.",
                    user_id,
                    days,
                    format_expiry(&user)
                ),
                Err(AccountError::ValidityOutOfRange(days)) => format!("{} day(s) is out of range.", days),
                Err(e) => return Err(e.into()),
            }
        }
        AdminCommand::Revoke { user_id } => match account.revoke_validity(UserId(user_id)).await {
            Ok(_) => format!("Validity for {} revoked.", user_id),
            Err(AccountError::UserNotFound(_)) => format!("User {} is not registered.", user_id),
            Err(e) => return Err(e.into()),
        },
        AdminCommand::User { user_id } => match account.get_user(UserId(user_id)).await? {
            Some(user) => {
                let valid_now = account.is_currently_valid(UserId(user_id)).await?;
                format_account(&user, valid_now)
            }
            None => format!("User {} is not registered.", user_id),
        },
        AdminCommand::Users => {
            let users = account.list_users(LIST_LIMIT).await?;
            if users.is_empty() {
                "No users yet.".to_string()
            } else {
                users.iter().map(format_account_line).collect::<Vec<_>>().join("\n")
            }
        }
        AdminCommand::Premium => {
            let users = account.list_premium_users(LIST_LIMIT).await?;
            if users.is_empty() {
                "No premium users.".to_string()
            } else {
                users.iter().map(format_account_line).collect::<Vec<_>>().join("\n")
            }
        }
        AdminCommand::AddAdmin { user_id } => {
            account.add_admin(UserId(user_id)).await?;
            format!("Added {} to admins.", user_id)
        }
        AdminCommand::DelAdmin { user_id } => {
            account.remove_admin(UserId(user_id)).await?;
            format!("Removed {} from admins.", user_id)
        }
        AdminCommand::Admins => {
            let admins = account.list_admins().await?;
            if admins.is_empty() {
                "No admins configured.".to_string()
            } else {
                admins.iter().map(|id| id.0.to_string()).collect::<Vec<_>>().join("\n")
            }
        }
    };

    bot.send_message(msg.chat.id, reply).await?;

    Ok(())
}

fn format_expiry(user: &UserAccount) -> String {
    user.validity_expire_at
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_account(user: &UserAccount, valid_now: bool) -> String {
    let validity = match user.validity_expire_at {
        Some(at) => format!(
            "{} ({})",
            at.format("%Y-%m-%d %H:%M UTC"),
            if valid_now { "active" } else { "expired" }
        ),
        None => "-".to_string(),
    };

    format!(
        "ID: {}\nUsername: {}\nPremium: {}\nCredits: {}\nValid until: {}\nCreated: {}",
        user.id.0,
        user.username.as_deref().unwrap_or("-"),
        if user.is_premium_now(Utc::now()) { "yes" } else { "no" },
        user.credits,
        validity,
        user.created_at.format("%Y-%m-%d %H:%M UTC"),
    )
}

fn format_account_line(user: &UserAccount) -> String {
    format!(
        "{} | {} | credits: {} | premium: {}",
        user.id.0,
        user.username.as_deref().unwrap_or("-"),
        user.credits,
        if user.is_premium_now(Utc::now()) { "yes" } else { "no" },
    )
}
