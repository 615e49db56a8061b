//! Command router: the per-session conversation state machine.
//!
//! ```text
//!            upload (PDF)                 download_word
//!   Idle ─────────────────▶ Delivered ─────────────────┐
//!    ▲                        │   ▲                     │
//!    │       start_over       │   └─────────────────────┘
//!    └────────────────────────┘
//! ```
//!
//! A rejected or unreadable upload leaves the state as it was. `/start` only
//! greets.

use crate::assemble::{assemble, OUTPUT_FILE_NAME};
use crate::config::PipelineConfig;
use crate::deliver::{
    self, delivered_actions, start_over_actions, ACTION_DOWNLOAD_WORD, ACTION_START_OVER,
};
use crate::error::PdfBotError;
use crate::extract::extract;
use crate::pipeline::input;
use crate::session::{SessionGuard, SessionKey, SessionStore};
use crate::transport::{ChatTransport, PromptId};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const GREETING: &str =
    "👋 Hi! Send me a PDF and I'll echo its text and images, then build a Word file on request.";
pub const PROCESSING: &str = "⏳ Processing your file, this may take a few seconds...";
pub const NOT_A_PDF: &str = "This is not a PDF.";
pub const UNREADABLE_PDF: &str = "⚠️ Sorry, I could not read this PDF.";
pub const NOTHING_FOUND: &str = "No text or images were found in this PDF. Send another file.";
pub const READY: &str = "✅ Your text is ready! Choose an action below:";
pub const NO_DATA: &str = "No data to build a Word document.";
pub const UPLOAD_AGAIN: &str = "🔄 Send a new PDF file here.";
pub const BUSY: &str = "⏳ Still processing your previous request, please wait.";

/// An inbound chat event, already mapped off the transport's own types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotEvent {
    /// The `/start` command.
    Start,
    /// A file was uploaded.
    Document {
        mime_type: Option<String>,
        file_ref: String,
        file_name: Option<String>,
    },
    /// A prompt button was pressed.
    Action {
        action_id: String,
        callback_id: String,
        /// The prompt the button belongs to, when the platform still has it.
        prompt: Option<PromptId>,
    },
}

/// Routes events to handlers and owns nothing but shared handles.
pub struct Router {
    transport: Arc<dyn ChatTransport>,
    store: Arc<SessionStore>,
    config: PipelineConfig,
}

impl Router {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        store: Arc<SessionStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            transport,
            store,
            config,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Handle one event and log, rather than return, any failure.
    pub async fn dispatch(&self, key: SessionKey, event: BotEvent) {
        if let Err(e) = self.handle(key, event).await {
            error!("Session {}: handler failed: {}", key, e);
        }
    }

    /// Handle one event for session `key`.
    ///
    /// # Errors
    /// Transport failures on the main path, or an assembly packaging
    /// failure. User-caused problems are answered in the chat and return
    /// `Ok`.
    pub async fn handle(&self, key: SessionKey, event: BotEvent) -> Result<(), PdfBotError> {
        let chat_id = key.chat_id;

        if event == BotEvent::Start {
            info!("Session {}: /start", key);
            return self.transport.send_text(chat_id, GREETING).await;
        }

        if let BotEvent::Action { callback_id, .. } = &event {
            if let Err(e) = self.transport.acknowledge(callback_id).await {
                warn!("Session {}: could not acknowledge action: {}", key, e);
            }
        }

        let session = match self.store.try_begin(key).await {
            Ok(session) => session,
            Err(PdfBotError::SessionBusy { .. }) => {
                info!("Session {}: busy, event dropped", key);
                return self.transport.send_text(chat_id, BUSY).await;
            }
            Err(e) => return Err(e),
        };

        match event {
            BotEvent::Start => Ok(()),
            BotEvent::Document {
                mime_type,
                file_ref,
                file_name,
            } => {
                self.on_upload(key, session, mime_type.as_deref(), &file_ref, file_name.as_deref())
                    .await
            }
            BotEvent::Action {
                action_id, prompt, ..
            } => match action_id.as_str() {
                ACTION_DOWNLOAD_WORD => self.on_download(key, session, prompt).await,
                ACTION_START_OVER => self.on_start_over(key, session, prompt).await,
                other => {
                    debug!("Session {}: unknown action '{}' ignored", key, other);
                    Ok(())
                }
            },
        }
    }

    async fn on_upload(
        &self,
        key: SessionKey,
        mut session: SessionGuard,
        mime_type: Option<&str>,
        file_ref: &str,
        file_name: Option<&str>,
    ) -> Result<(), PdfBotError> {
        let chat_id = key.chat_id;
        info!(
            "Session {}: upload '{}' ({})",
            key,
            file_name.unwrap_or("unnamed"),
            mime_type.unwrap_or("no MIME type")
        );
        self.transport.send_text(chat_id, PROCESSING).await?;

        if let Err(e) = input::check_mime(mime_type) {
            info!("Session {}: {}", key, e);
            return self.transport.send_text(chat_id, NOT_A_PDF).await;
        }

        let bytes = self.transport.fetch_file(file_ref).await?;
        debug!("Session {}: downloaded {} bytes", key, bytes.len());

        let extraction = match extract(bytes, &self.config).await {
            Ok(extraction) => extraction,
            Err(e) if e.is_user_facing() => {
                warn!("Session {}: {}", key, e);
                return self.transport.send_text(chat_id, UNREADABLE_PDF).await;
            }
            Err(e) => return Err(e),
        };

        if let Some(old) = session.take_prompt() {
            if let Err(e) = self.transport.clear_prompt_actions(old).await {
                debug!("Session {}: could not retire prompt {}: {}", key, old, e);
            }
        }

        if extraction.blocks.is_empty() {
            session.clear();
            return self.transport.send_text(chat_id, NOTHING_FOUND).await;
        }

        let blocks = Arc::new(extraction.blocks);
        session.store(Arc::clone(&blocks));

        let report = deliver::deliver(
            self.transport.as_ref(),
            chat_id,
            &blocks,
            self.config.chunk_size,
        )
        .await;
        if report.failures > 0 {
            warn!(
                "Session {}: {} block(s) could not be delivered",
                key, report.failures
            );
        }

        let prompt = self
            .transport
            .send_prompt(chat_id, READY, &delivered_actions())
            .await?;
        session.set_prompt(prompt);
        Ok(())
    }

    async fn on_download(
        &self,
        key: SessionKey,
        session: SessionGuard,
        pressed: Option<PromptId>,
    ) -> Result<(), PdfBotError> {
        let chat_id = key.chat_id;
        let prompt = pressed.or(session.prompt());

        let Some(blocks) = session.blocks().filter(|b| !b.is_empty()) else {
            info!("Session {}: download requested with nothing stored", key);
            return match prompt {
                Some(prompt) => self.transport.edit_prompt_text(prompt, NO_DATA).await,
                None => self.transport.send_text(chat_id, NO_DATA).await,
            };
        };

        let config = self.config.clone();
        let assembled = tokio::task::spawn_blocking(move || assemble(&blocks, &config))
            .await
            .map_err(|e| PdfBotError::Internal(format!("Assembly task panicked: {e}")))??;
        info!(
            "Session {}: sending {} ({} bytes)",
            key,
            OUTPUT_FILE_NAME,
            assembled.bytes.len()
        );
        self.transport
            .send_document(chat_id, OUTPUT_FILE_NAME, assembled.bytes)
            .await?;

        if let Some(prompt) = prompt {
            if let Err(e) = self
                .transport
                .set_prompt_actions(prompt, &start_over_actions())
                .await
            {
                debug!("Session {}: could not narrow prompt {}: {}", key, prompt, e);
            }
        }
        Ok(())
    }

    async fn on_start_over(
        &self,
        key: SessionKey,
        mut session: SessionGuard,
        pressed: Option<PromptId>,
    ) -> Result<(), PdfBotError> {
        let prompt = pressed.or(session.prompt());
        session.clear();
        info!("Session {}: start over", key);

        if let Some(prompt) = prompt {
            if let Err(e) = self.transport.clear_prompt_actions(prompt).await {
                debug!("Session {}: could not clear prompt {}: {}", key, prompt, e);
            }
        }
        self.transport.send_text(key.chat_id, UPLOAD_AGAIN).await
    }
}
