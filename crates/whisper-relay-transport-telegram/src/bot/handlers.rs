use super::transport::TelegramRelayTransport;
use anyhow::Result;
use std::sync::Arc;
use teloxide::{prelude::*, utils::command::BotCommands};
use tracing::{debug, info};
use whisper_relay_core::relay::{IncomingAttachment, Relay, RelayOutcome};

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Supported commands for the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message
    #[command(description = "Start the bot.")]
    Start,
    /// Show usage help
    #[command(description = "How to use the bot.")]
    Help,
}

const USAGE: &str = "Send me a voice message, an audio file or a document with a recording \
and I will reply with its transcription.\n\n\
The reply is updated while the file is being processed.";

/// Start handler
///
/// # Errors
///
/// Returns an error if the welcome message cannot be sent.
pub async fn start(bot: Bot, msg: Message) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    info!("User {user_id} initiated /start command.");
    bot.send_message(msg.chat.id, format!("👋 Hi!\n\n{USAGE}"))
        .await?;
    Ok(())
}

/// Help handler
///
/// # Errors
///
/// Returns an error if the help message cannot be sent.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    info!("Help command received from user {user_id}.");
    bot.send_message(
        msg.chat.id,
        format!("{USAGE}\n\n{}", Command::descriptions()),
    )
    .await?;
    Ok(())
}

/// Relays an attachment to the transcription service and reports back in
/// the chat.
///
/// Relay failures are already rendered into the status message, so they are
/// not returned.
///
/// # Errors
///
/// Currently infallible; the signature matches the other handlers.
pub async fn handle_attachment(
    bot: Bot,
    msg: Message,
    attachment: IncomingAttachment,
    relay: Arc<Relay>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    info!(
        user_id,
        chat_id = msg.chat.id.0,
        kind = attachment.kind.label(),
        "Attachment received"
    );

    let transport = TelegramRelayTransport::for_message(bot, &msg);
    match relay.handle(&transport, &attachment).await {
        Ok(RelayOutcome::Transcribed(_)) => debug!(user_id, "Relay finished with text"),
        Ok(RelayOutcome::Empty) => debug!(user_id, "Relay finished without text"),
        Err(e) => debug!(user_id, error = %e, "Relay ended with an error"),
    }
    Ok(())
}
