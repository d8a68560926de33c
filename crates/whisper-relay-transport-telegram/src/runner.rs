use crate::bot;
use crate::bot::handlers::Command;
use crate::config::BotSettings;
use anyhow::{Context, Result};
use std::convert::Infallible;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};
use whisper_relay_core::relay::{IncomingAttachment, Relay};

/// Run the Telegram transport runtime until ctrl-c.
///
/// # Errors
///
/// Returns an error if the Telegram HTTP client cannot be built.
pub async fn run_bot(settings: Arc<BotSettings>) -> Result<()> {
    let relay = Arc::new(Relay::from_settings(settings.relay.as_ref()));
    info!(
        base_url = %settings.relay.transcription_base_url,
        max_concurrent = relay.gate().capacity(),
        spool = relay.config().spool_mode.label(),
        "Relay initialized."
    );

    let bot = init_bot(&settings)?;
    prepare_bot(&bot).await;
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![relay, settings])
        .distribution_function(|_| None::<Infallible>)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_bot(settings: &BotSettings) -> Result<Bot> {
    // The read timeout bounds stalls; the deadline leaves room for large downloads
    let client = teloxide::net::default_reqwest_settings()
        .read_timeout(settings.telegram.http_timeout())
        .timeout(settings.telegram.request_deadline())
        .build()
        .context("Failed to build Telegram HTTP client")?;
    Ok(Bot::with_client(
        settings.telegram.telegram_bot_token.clone(),
        client,
    ))
}

async fn prepare_bot(bot: &Bot) {
    match bot.delete_webhook().drop_pending_updates(true).await {
        Ok(_) => info!("Dropped pending updates."),
        Err(e) => warn!("Failed to drop pending updates: {e}"),
    }
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            dptree::filter_map(|msg: Message| bot::extract_attachment(&msg))
                .endpoint(handle_attachment),
        )
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => bot::handlers::start(bot, msg).await,
        Command::Help => bot::handlers::help(bot, msg).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_attachment(
    bot: Bot,
    msg: Message,
    attachment: IncomingAttachment,
    relay: Arc<Relay>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_attachment(bot, msg, attachment, relay).await {
        error!("Attachment handler error: {}", e);
    }
    respond(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelegramSettings;
    use whisper_relay_core::config::RelaySettings;

    #[test]
    fn test_bot_client_builds_with_split_timeouts() {
        let telegram = TelegramSettings {
            telegram_bot_token: "123:abc".to_string(),
            telegram_http_timeout_secs: 30,
            telegram_request_deadline_secs: 300,
        };
        let settings = BotSettings::new(RelaySettings::default(), telegram);

        assert!(init_bot(&settings).is_ok());
        assert!(settings.telegram.request_deadline() > settings.telegram.http_timeout());
    }
}
