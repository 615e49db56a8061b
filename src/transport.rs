//! The chat-transport seam.
//!
//! The router only talks to [`ChatTransport`]. The Telegram adapter in
//! [`crate::telegram`] is the production implementation; tests plug in a
//! recording double.

use crate::error::PdfBotError;
use async_trait::async_trait;
use std::fmt;

/// A sent message that carries interactive actions (the "prompt").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PromptId {
    pub chat_id: i64,
    pub message_id: i32,
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.chat_id, self.message_id)
    }
}

/// One labelled button. `id` is echoed back verbatim when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub label: String,
    pub id: String,
}

impl Action {
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
        }
    }
}

/// Everything the bot needs from a chat platform.
///
/// Every method is one network call; none of them retry.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Download an uploaded file by its platform reference.
    async fn fetch_file(&self, file_ref: &str) -> Result<Vec<u8>, PdfBotError>;

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), PdfBotError>;

    async fn send_photo(&self, chat_id: i64, data: Vec<u8>) -> Result<(), PdfBotError>;

    async fn send_document(
        &self,
        chat_id: i64,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<(), PdfBotError>;

    /// Send `text` with one button per action, one per row.
    async fn send_prompt(
        &self,
        chat_id: i64,
        text: &str,
        actions: &[Action],
    ) -> Result<PromptId, PdfBotError>;

    /// Replace the prompt's buttons. An empty slice removes them.
    async fn set_prompt_actions(
        &self,
        prompt: PromptId,
        actions: &[Action],
    ) -> Result<(), PdfBotError>;

    /// Remove every button from the prompt.
    async fn clear_prompt_actions(&self, prompt: PromptId) -> Result<(), PdfBotError> {
        self.set_prompt_actions(prompt, &[]).await
    }

    /// Replace the prompt's text (its buttons are dropped).
    async fn edit_prompt_text(&self, prompt: PromptId, text: &str) -> Result<(), PdfBotError>;

    /// Acknowledge a button press so the client stops its spinner.
    async fn acknowledge(&self, callback_id: &str) -> Result<(), PdfBotError>;
}
