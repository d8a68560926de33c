//! Telegram API calls wrapped in the retry policy from
//! [`whisper_relay_core::utils`].
//!
//! Edits are idempotent and retried on any failure. Sends are only retried
//! when Telegram cannot have delivered the message: flood control rejected
//! it, or the connection was never established.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Message, MessageId, ReplyParameters};
use teloxide::{ApiError, RequestError};
use tracing::{debug, warn};
use whisper_relay_core::utils::{retry_telegram_operation, retry_telegram_operation_if};

/// Send a plain-text message, optionally as a reply.
///
/// # Errors
///
/// Returns an error once every attempt has failed, or immediately when the
/// failure may have happened after delivery.
pub async fn send_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
    reply_to: Option<MessageId>,
) -> Result<Message> {
    let text = text.into();
    retry_telegram_operation_if(
        || async {
            let mut req = bot.send_message(chat_id, text.clone());
            if let Some(id) = reply_to {
                req = req.reply_parameters(ReplyParameters::new(id));
            }
            match req.await {
                Ok(msg) => Ok(msg),
                Err(e) => Err(wait_out_flood_control(e).await),
            }
        },
        is_safe_to_resend,
    )
    .await
}

/// Replace the text of a message.
///
/// An edit that leaves the text unchanged counts as success.
///
/// # Errors
///
/// Returns an error once every attempt has failed.
pub async fn edit_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: impl Into<String>,
) -> Result<()> {
    let text = text.into();
    retry_telegram_operation(|| async {
        match bot.edit_message_text(chat_id, msg_id, text.clone()).await {
            Ok(_) => Ok(()),
            Err(RequestError::Api(ApiError::MessageNotModified)) => {
                debug!(message_id = msg_id.0, "Message update skipped: not modified");
                Ok(())
            }
            Err(e) => Err(wait_out_flood_control(e).await),
        }
    })
    .await
}

/// Sleeps for the delay Telegram asked for before the error reaches the
/// retry policy, whose own backoff is far shorter than a flood-control wait.
async fn wait_out_flood_control(e: RequestError) -> anyhow::Error {
    if let RequestError::RetryAfter(delay) = &e {
        warn!(seconds = delay.seconds(), "Telegram flood control, waiting");
        tokio::time::sleep(delay.duration()).await;
    }
    anyhow::Error::from(e)
}

/// Whether a failed send certainly did not reach the chat
fn is_safe_to_resend(e: &anyhow::Error) -> bool {
    match e.downcast_ref::<RequestError>() {
        Some(RequestError::RetryAfter(_)) => true,
        Some(RequestError::Network(err)) => err.is_connect(),
        _ => false,
    }
}
