//! Test doubles for the completion and chat-platform seams.

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::llm::{ChatMessage, ChatResponse, Choice, CompletionRequest, CompletionService};
use crate::platform::ChatSender;

/// Records every request and answers from a canned outcome.
pub struct StubCompletion {
    choices: Option<Vec<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StubCompletion {
    pub fn with_choices(choices: &[&str]) -> Self {
        Self {
            choices: Some(choices.iter().map(|c| c.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(text: &str) -> Self {
        Self::with_choices(&[text])
    }

    pub fn failing() -> Self {
        Self {
            choices: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for StubCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<ChatResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let choices = self
            .choices
            .as_ref()
            .ok_or_else(|| anyhow!("Completion API error (503 Service Unavailable): overloaded"))?;
        Ok(ChatResponse {
            choices: choices
                .iter()
                .map(|text| Choice {
                    message: ChatMessage {
                        role: "assistant".to_string(),
                        content: Some(text.clone()),
                    },
                })
                .collect(),
        })
    }
}

/// Records successful sends; sends to the listed chats fail.
#[derive(Default)]
pub struct RecordingSender {
    failing_chats: Vec<i64>,
    attempts: Mutex<usize>,
    sent: Mutex<Vec<(i64, String)>>,
}

impl RecordingSender {
    pub fn failing_for(chat_ids: &[i64]) -> Self {
        Self {
            failing_chats: chat_ids.to_vec(),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl ChatSender for RecordingSender {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;
        if self.failing_chats.contains(&chat_id) {
            return Err(anyhow!("Forbidden: bot was blocked by the user"));
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }
}
