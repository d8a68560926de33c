//! Delivery of status texts that may exceed the Telegram message limit.

use super::resilient::{edit_message_resilient, send_message_resilient};
use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId};
use tracing::debug;
use whisper_relay_core::utils::split_text;

/// Max characters per message (Telegram allows 4096; 4000 leaves margin)
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

/// Splits `text` into the messages needed to show it.
///
/// Text within the limit is kept exactly as is.
#[must_use]
pub fn plan_chunks(text: &str) -> Vec<String> {
    if text.chars().count() <= TELEGRAM_MESSAGE_LIMIT {
        return vec![text.to_string()];
    }
    split_text(text, TELEGRAM_MESSAGE_LIMIT)
}

/// Puts `text` into the message `msg_id`, sending any overflow as follow-up
/// messages in order.
///
/// # Errors
///
/// Returns an error if the edit or any follow-up send fails after retries.
pub async fn edit_with_overflow(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: &str,
) -> Result<()> {
    let mut chunks = plan_chunks(text).into_iter();
    let Some(first) = chunks.next() else {
        return edit_message_resilient(bot, chat_id, msg_id, text).await;
    };

    edit_message_resilient(bot, chat_id, msg_id, first).await?;
    for (index, chunk) in chunks.enumerate() {
        debug!(message_id = msg_id.0, part = index + 2, "Sending overflow chunk");
        send_message_resilient(bot, chat_id, chunk, Some(msg_id)).await?;
    }
    Ok(())
}
