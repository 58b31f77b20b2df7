use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use teloxide::prelude::*;
use teloxide::types::UpdateKind;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::platform::{ChatSender, Update};
use crate::processor::Processor;

/// Telegram rejects messages over 4096 characters; chunk below that.
const MAX_MESSAGE_LENGTH: usize = 4000;

/// Pause after a failed `getUpdates` call before asking again.
const POLL_ERROR_PAUSE: Duration = Duration::from_secs(1);

/// Headroom between the long-poll wait and the HTTP client timeout.
const POLL_TIMEOUT_SLACK_SECS: u64 = 10;

/// Split long messages for Telegram's message length limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

/// Build the bot with an HTTP timeout long enough to outlast a long-poll wait.
pub fn build_bot(token: &str, poll_timeout_secs: u32) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(
            u64::from(poll_timeout_secs) + POLL_TIMEOUT_SLACK_SECS,
        ))
        .build()
        .context("Failed to build Telegram HTTP client")?;
    Ok(Bot::with_client(token, client))
}

/// `getMe` handshake; fails when the token is rejected or Telegram is unreachable.
pub async fn authorize(bot: &Bot) -> Result<String> {
    let me = bot
        .get_me()
        .await
        .context("Failed to initialize Telegram bot (getMe)")?;
    let username = me.username().to_string();
    info!("Authorized on account {}", username);
    Ok(username)
}

pub async fn register_webhook(bot: &Bot, url: Url) -> Result<()> {
    bot.set_webhook(url.clone())
        .await
        .with_context(|| format!("Failed to register webhook {}", url))?;
    info!("Webhook registered at {}", url);
    Ok(())
}

#[async_trait]
impl ChatSender for Bot {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_LENGTH) {
            self.send_message(ChatId(chat_id), chunk)
                .await
                .context("sendMessage failed")?;
        }
        Ok(())
    }
}

fn to_update(update: teloxide::types::Update) -> Option<Update> {
    match update.kind {
        UpdateKind::Message(msg) => Some(Update::new(msg.chat.id.0, msg.text().map(str::to_owned))),
        _ => None,
    }
}

/// Cancelled on the first Ctrl-C. The listener lives for the whole run, so a
/// signal that lands while an update is being answered is not lost.
pub fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        cancel.cancel();
    });
    token
}

/// Offset confirming `update_id`, or `None` if it does not fit the Bot API's i32.
fn next_offset(update_id: u32) -> Option<i32> {
    i32::try_from(update_id).ok()?.checked_add(1)
}

/// Feed one `getUpdates` batch to the processor, one update at a time, and
/// return the offset to poll from next. Stops early once `shutdown` fires;
/// updates left unconfirmed are redelivered on the next start.
async fn handle_batch(
    updates: Vec<teloxide::types::Update>,
    processor: &Processor,
    sender: &dyn ChatSender,
    mut offset: i32,
    shutdown: &CancellationToken,
) -> i32 {
    for update in updates {
        if shutdown.is_cancelled() {
            break;
        }
        match next_offset(update.id.0) {
            Some(next) => offset = offset.max(next),
            None => error!("Update id {} is out of offset range, not confirming it", update.id.0),
        }
        match to_update(update) {
            Some(update) => processor.handle(sender, &update).await,
            None => debug!("Received non-message update, ignoring"),
        }
    }
    offset
}

/// Long-poll `getUpdates` and process each message in order until `shutdown` fires.
pub async fn run_polling(
    bot: Bot,
    processor: &Processor,
    timeout_secs: u32,
    shutdown: CancellationToken,
) -> Result<()> {
    if let Err(e) = bot.delete_webhook().await {
        warn!("Failed to delete webhook before polling: {}", e);
    }

    info!("Polling for updates (timeout {}s)...", timeout_secs);

    let mut offset: i32 = 0;
    while !shutdown.is_cancelled() {
        let batch = tokio::select! {
            _ = shutdown.cancelled() => break,
            batch = async { bot.get_updates().offset(offset).timeout(timeout_secs).await } => batch,
        };

        let updates = match batch {
            Ok(updates) => updates,
            Err(e) => {
                error!("getUpdates failed: {}", e);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(POLL_ERROR_PAUSE) => continue,
                }
            }
        };

        debug!("Received {} update(s)", updates.len());
        offset = handle_batch(updates, processor, &bot, offset, &shutdown).await;
    }

    info!("Polling stopped");
    Ok(())
}
