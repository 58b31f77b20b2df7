pub mod telegram;
pub mod webhook;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

/// Prefix that marks a message as a bot command.
pub const COMMAND_MARKER: char = '/';

/// One inbound message, independent of how it reached us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub chat_id: i64,
    pub text: Option<String>,
}

impl Update {
    pub fn new(chat_id: i64, text: Option<String>) -> Self {
        Self { chat_id, text }
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    pub fn is_command(&self) -> bool {
        self.text().starts_with(COMMAND_MARKER)
    }

    /// `/start@NutriBot now` yields `start`. `None` for non-commands.
    pub fn command_name(&self) -> Option<&str> {
        let rest = self.text().strip_prefix(COMMAND_MARKER)?;
        let token = rest.split(char::is_whitespace).next().unwrap_or_default();
        Some(token.split('@').next().unwrap_or_default())
    }
}

/// Telegram update as POSTed to the webhook. Only the fields we read are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct WireUpdate {
    #[serde(default)]
    pub update_id: Option<i64>,
    #[serde(default)]
    pub message: Option<WireMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    pub chat: WireChat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireChat {
    pub id: i64,
}

impl WireUpdate {
    /// `None` for updates that carry no message (edits, callbacks, member changes).
    pub fn into_update(self) -> Option<Update> {
        self.message
            .map(|message| Update::new(message.chat.id, message.text))
    }
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;
}
