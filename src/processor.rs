use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::commands;
use crate::llm::{ChatMessage, CompletionRequest, CompletionService};
use crate::platform::{ChatSender, Update};

pub const SYSTEM_PROMPT: &str = "You are an AI nutritionist. Provide helpful and accurate nutritional advice, meal ideas, and healthy eating tips. Be encouraging and supportive.";

pub const COMPLETION_FAILED_REPLY: &str = "Sorry, I couldn't get a response from ChatGPT.";

pub const NO_CHOICES_REPLY: &str = "No response from ChatGPT.";

/// Text to send back to a chat. An empty text means there is nothing to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub chat_id: i64,
    pub text: String,
}

impl Reply {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.text.is_empty()
    }
}

/// Turns one update into one reply. Shared by both transports; holds no
/// per-update state, so a single instance serves concurrent requests.
pub struct Processor {
    completion: Arc<dyn CompletionService>,
    model: String,
}

impl Processor {
    pub fn new(completion: Arc<dyn CompletionService>, model: impl Into<String>) -> Self {
        Self {
            completion,
            model: model.into(),
        }
    }

    pub fn completion_request(&self, question: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(question)],
        }
    }

    /// Never fails: completion errors become [`COMPLETION_FAILED_REPLY`].
    pub async fn process(&self, update: &Update) -> Reply {
        if update.is_command() {
            let name = update.command_name().unwrap_or_default();
            debug!("Command /{} from chat {}", name, update.chat_id);
            return Reply::new(update.chat_id, commands::reply_for(name));
        }

        let question = update.text();
        if question.is_empty() {
            debug!("Empty message from chat {}, nothing to answer", update.chat_id);
            return Reply::new(update.chat_id, "");
        }

        Reply::new(update.chat_id, self.answer(question).await)
    }

    async fn answer(&self, question: &str) -> String {
        let request = self.completion_request(question);
        match self.completion.complete(&request).await {
            Ok(response) => match response.first_content() {
                Some(content) => {
                    if content.is_empty() {
                        warn!("Completion service returned an empty answer, nothing will be sent");
                    }
                    content.to_string()
                }
                None => {
                    warn!("Completion service returned no choices");
                    NO_CHOICES_REPLY.to_string()
                }
            },
            Err(e) => {
                error!("Chat completion failed: {:#}", e);
                COMPLETION_FAILED_REPLY.to_string()
            }
        }
    }

    /// Process then deliver. Delivery failures are logged, never returned.
    pub async fn handle(&self, sender: &dyn ChatSender, update: &Update) {
        info!(
            "Update from chat {} ({} chars)",
            update.chat_id,
            update.text().chars().count()
        );
        debug!("Update text: {:?}", update.text());
        let reply = self.process(update).await;
        deliver(sender, &reply).await;
    }
}

/// Returns whether the reply went out. No-op replies are skipped.
pub async fn deliver(sender: &dyn ChatSender, reply: &Reply) -> bool {
    if reply.is_noop() {
        return false;
    }
    match sender.send_text(reply.chat_id, &reply.text).await {
        Ok(()) => true,
        Err(e) => {
            error!("Failed to send message to chat {}: {:#}", reply.chat_id, e);
            false
        }
    }
}
