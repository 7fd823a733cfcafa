mod image;
mod prompt;

use teloxide::{
    dispatching::{UpdateFilterExt, UpdateHandler},
    dptree,
    prelude::Requester,
    types::{Message, Update},
    Bot,
};

use crate::error::HandlerResult;

pub fn get_message_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_message()
        .branch(dptree::filter(|msg: Message| image::has_image_payload(&msg)).endpoint(image::handle_message_image))
        .branch(
            dptree::filter_map(|msg: Message| {
                msg.text()
                    .map(str::trim)
                    .filter(|text| !text.is_empty() && !text.starts_with('/'))
                    .map(|text| prompt::Prompt(text.to_string()))
            })
            .endpoint(prompt::handle_message_prompt),
        )
}

pub async fn handle_message_unknown(bot: Bot, message: Message) -> HandlerResult<()> {
    bot.send_message(
        message.chat.id,
        "Send an image (photo or image file). Commands: /status /clear",
    )
    .await?;

    Ok(())
}
