//! [`RelayTransport`] backed by the Telegram Bot API.

use super::media::{exceeds_download_limit, TELEGRAM_MAX_DOWNLOAD_BYTES};
use super::messaging::edit_with_overflow;
use super::resilient::send_message_resilient;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::Path;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatId, FileId, MessageId};
use whisper_relay_core::relay::{IncomingAttachment, RelayTransport, StatusMessageId};
use whisper_relay_core::utils::retry_telegram_operation;

/// Relay transport bound to one chat.
///
/// The status message is sent as a reply to `reply_to` when set.
#[derive(Clone)]
pub struct TelegramRelayTransport {
    bot: Bot,
    chat_id: ChatId,
    reply_to: Option<MessageId>,
}

impl TelegramRelayTransport {
    /// Create a transport for `chat_id`
    #[must_use]
    pub const fn new(bot: Bot, chat_id: ChatId, reply_to: Option<MessageId>) -> Self {
        Self {
            bot,
            chat_id,
            reply_to,
        }
    }

    /// Transport replying to `msg` in its chat
    #[must_use]
    pub fn for_message(bot: Bot, msg: &Message) -> Self {
        Self::new(bot, msg.chat.id, Some(msg.id))
    }

    fn check_size(attachment: &IncomingAttachment) -> Result<()> {
        if exceeds_download_limit(attachment) {
            bail!(
                "file is too big ({} bytes, Telegram allows bots {} MB)",
                attachment.size.unwrap_or_default(),
                TELEGRAM_MAX_DOWNLOAD_BYTES / 1024 / 1024
            );
        }
        Ok(())
    }

    async fn file_path(&self, attachment: &IncomingAttachment) -> Result<String> {
        let file = self
            .bot
            .get_file(FileId(attachment.file_id.clone()))
            .await?;
        Ok(file.path)
    }
}

#[async_trait]
impl RelayTransport for TelegramRelayTransport {
    async fn send_status(&self, text: &str) -> Result<StatusMessageId> {
        let msg = send_message_resilient(&self.bot, self.chat_id, text, self.reply_to).await?;
        Ok(StatusMessageId(msg.id.0))
    }

    async fn edit_status(&self, id: StatusMessageId, text: &str) -> Result<()> {
        edit_with_overflow(&self.bot, self.chat_id, MessageId(id.0), text).await
    }

    async fn download(&self, attachment: &IncomingAttachment) -> Result<Vec<u8>> {
        Self::check_size(attachment)?;
        retry_telegram_operation(|| async {
            let path = self.file_path(attachment).await?;
            let mut buf = Vec::new();
            self.bot.download_file(&path, &mut buf).await?;
            Ok(buf)
        })
        .await
    }

    async fn download_to_file(&self, attachment: &IncomingAttachment, path: &Path) -> Result<()> {
        Self::check_size(attachment)?;
        retry_telegram_operation(|| async {
            let remote = self.file_path(attachment).await?;
            // Truncates whatever a failed attempt left behind
            let mut file = tokio::fs::File::create(path).await?;
            self.bot.download_file(&remote, &mut file).await?;
            file.sync_all().await?;
            Ok(())
        })
        .await
    }
}
