mod admin;
mod command;
mod message;

use admin::get_admin_handler;
use command::get_command_handler;
use message::{get_message_handler, handle_message_unknown};
use teloxide::{
    dispatching::{UpdateFilterExt, UpdateHandler},
    dptree,
    types::Update,
};

pub fn get_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(get_admin_handler())
        .branch(get_command_handler())
        .branch(get_message_handler())
        .branch(Update::filter_message().endpoint(handle_message_unknown))
}
