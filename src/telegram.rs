//! Telegram adapter: the production [`ChatTransport`] and the webhook
//! runner.

use crate::config::BotConfig;
use crate::error::PdfBotError;
use crate::router::{BotEvent, Router};
use crate::session::{SessionKey, SessionStore};
use crate::transport::{Action, ChatTransport, PromptId};
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId,
};
use teloxide::update_listeners::webhooks;
use tracing::{debug, info};

fn transport_error(e: impl std::fmt::Display) -> PdfBotError {
    PdfBotError::Transport(e.to_string())
}

fn keyboard(actions: &[Action]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(actions.iter().map(|action| {
        vec![InlineKeyboardButton::callback(
            action.label.clone(),
            action.id.clone(),
        )]
    }))
}

/// [`ChatTransport`] over the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn fetch_file(&self, file_ref: &str) -> Result<Vec<u8>, PdfBotError> {
        let file = self
            .bot
            .get_file(file_ref.to_string())
            .await
            .map_err(transport_error)?;
        let mut buf = Vec::new();
        self.bot
            .download_file(&file.path, &mut buf)
            .await
            .map_err(transport_error)?;
        Ok(buf)
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), PdfBotError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, data: Vec<u8>) -> Result<(), PdfBotError> {
        self.bot
            .send_photo(ChatId(chat_id), InputFile::memory(data))
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: i64,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<(), PdfBotError> {
        let file = InputFile::memory(data).file_name(file_name.to_string());
        self.bot
            .send_document(ChatId(chat_id), file)
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn send_prompt(
        &self,
        chat_id: i64,
        text: &str,
        actions: &[Action],
    ) -> Result<PromptId, PdfBotError> {
        let msg = self
            .bot
            .send_message(ChatId(chat_id), text)
            .reply_markup(keyboard(actions))
            .await
            .map_err(transport_error)?;
        Ok(PromptId {
            chat_id,
            message_id: msg.id.0,
        })
    }

    async fn set_prompt_actions(
        &self,
        prompt: PromptId,
        actions: &[Action],
    ) -> Result<(), PdfBotError> {
        let request = self
            .bot
            .edit_message_reply_markup(ChatId(prompt.chat_id), MessageId(prompt.message_id));
        // Omitting the markup removes the keyboard.
        let result = if actions.is_empty() {
            request.await
        } else {
            request.reply_markup(keyboard(actions)).await
        };
        result.map_err(transport_error)?;
        Ok(())
    }

    async fn edit_prompt_text(&self, prompt: PromptId, text: &str) -> Result<(), PdfBotError> {
        self.bot
            .edit_message_text(ChatId(prompt.chat_id), MessageId(prompt.message_id), text)
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), PdfBotError> {
        self.bot
            .answer_callback_query(callback_id.to_string())
            .await
            .map_err(transport_error)?;
        Ok(())
    }
}

/// Map a message onto a router event. Plain text other than `/start` is
/// ignored.
fn message_event(msg: &Message) -> Option<BotEvent> {
    if let Some(doc) = msg.document() {
        return Some(BotEvent::Document {
            mime_type: doc.mime_type.as_ref().map(|m| m.to_string()),
            file_ref: doc.file.id.to_string(),
            file_name: doc.file_name.clone(),
        });
    }
    let command = msg.text()?.split_whitespace().next()?;
    let name = command.split('@').next()?;
    (name == "/start").then_some(BotEvent::Start)
}

fn message_session(msg: &Message) -> SessionKey {
    let chat_id = msg.chat.id.0;
    let user_id = msg
        .from
        .as_ref()
        .map_or(chat_id as u64, |user| user.id.0);
    SessionKey::new(chat_id, user_id)
}

fn callback_event(q: &CallbackQuery) -> (SessionKey, BotEvent) {
    let user_id = q.from.id.0;
    let prompt = q.message.as_ref().map(|m| PromptId {
        chat_id: m.chat().id.0,
        message_id: m.id().0,
    });
    // Without the message, a private chat's id equals the user's id.
    let chat_id = prompt.map_or(user_id as i64, |p| p.chat_id);
    let event = BotEvent::Action {
        action_id: q.data.clone().unwrap_or_default(),
        callback_id: q.id.to_string(),
        prompt,
    };
    (SessionKey::new(chat_id, user_id), event)
}

async fn on_message(msg: Message, router: Arc<Router>) -> ResponseResult<()> {
    match message_event(&msg) {
        Some(event) => router.dispatch(message_session(&msg), event).await,
        None => debug!("Chat {}: message ignored", msg.chat.id),
    }
    respond(())
}

async fn on_callback(q: CallbackQuery, router: Arc<Router>) -> ResponseResult<()> {
    let (key, event) = callback_event(&q);
    router.dispatch(key, event).await;
    respond(())
}

/// Register the webhook and serve updates until Ctrl-C.
///
/// # Errors
/// Returns [`PdfBotError::Transport`] when the webhook cannot be set up.
pub async fn run_webhook(config: BotConfig) -> Result<(), PdfBotError> {
    let bot = Bot::new(config.bot_token.clone());
    let url = config.webhook_url()?;
    let addr = config.listen_addr();

    let listener = webhooks::axum(bot.clone(), webhooks::Options::new(addr, url))
        .await
        .map_err(|e| PdfBotError::Transport(format!("Webhook setup failed: {e}")))?;
    info!(
        "Webhook registered at {}/<token>, listening on {}",
        config.public_url.as_str().trim_end_matches('/'),
        addr
    );

    let transport: Arc<dyn ChatTransport> = Arc::new(TelegramTransport::new(bot.clone()));
    let router = Arc::new(Router::new(
        transport,
        Arc::new(SessionStore::new()),
        config.pipeline.clone(),
    ));

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router])
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    info!("Dispatcher stopped");
    Ok(())
}
