//! Conversation state store.
//!
//! One [`Session`] per chat/user pair, holding at most one live
//! [`BlockSequence`]. The store is an explicit object handed to the router.
//!
//! Each session sits behind its own async mutex. Handlers claim it with
//! [`SessionStore::try_begin`], which fails fast with
//! [`PdfBotError::SessionBusy`] while another event for the same session is
//! still running, so a second upload can never interleave with the first.
//! Different sessions only share the brief map lookup.

use crate::error::PdfBotError;
use crate::model::BlockSequence;
use crate::transport::PromptId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Identifies one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub chat_id: i64,
    pub user_id: u64,
}

impl SessionKey {
    pub fn new(chat_id: i64, user_id: u64) -> Self {
        Self { chat_id, user_id }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chat_id, self.user_id)
    }
}

/// Where a session is in the upload → download → start-over cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing stored; waiting for a PDF.
    Idle,
    /// Blocks stored and echoed; the action prompt is live.
    Delivered,
}

/// Per-conversation state.
#[derive(Debug, Default)]
pub struct Session {
    blocks: Option<Arc<BlockSequence>>,
    prompt: Option<PromptId>,
}

impl Session {
    pub fn phase(&self) -> SessionPhase {
        if self.blocks.is_some() {
            SessionPhase::Delivered
        } else {
            SessionPhase::Idle
        }
    }

    /// The stored sequence, if any.
    pub fn blocks(&self) -> Option<Arc<BlockSequence>> {
        self.blocks.clone()
    }

    /// Replace the stored sequence wholesale.
    pub fn store(&mut self, blocks: Arc<BlockSequence>) {
        self.blocks = Some(blocks);
    }

    /// Drop the stored sequence and forget the prompt.
    pub fn clear(&mut self) {
        self.blocks = None;
        self.prompt = None;
    }

    pub fn prompt(&self) -> Option<PromptId> {
        self.prompt
    }

    pub fn set_prompt(&mut self, prompt: PromptId) {
        self.prompt = Some(prompt);
    }

    pub fn take_prompt(&mut self) -> Option<PromptId> {
        self.prompt.take()
    }
}

/// Exclusive access to one session for the duration of an event.
pub type SessionGuard = OwnedMutexGuard<Session>;

/// Session-keyed store. Lives for the process lifetime; nothing expires.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionKey, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, key: SessionKey) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock().await;
        Arc::clone(sessions.entry(key).or_default())
    }

    /// Claim the session for one event, or fail if it is busy.
    pub async fn try_begin(&self, key: SessionKey) -> Result<SessionGuard, PdfBotError> {
        let slot = self.slot(key).await;
        slot.try_lock_owned().map_err(|_| {
            debug!("Session {} busy", key);
            PdfBotError::SessionBusy {
                session: key.to_string(),
            }
        })
    }

    /// Wait for the session and return its stored sequence.
    pub async fn blocks(&self, key: SessionKey) -> Option<Arc<BlockSequence>> {
        let sessions = self.sessions.lock().await;
        let slot = Arc::clone(sessions.get(&key)?);
        drop(sessions);
        let session = slot.lock().await;
        session.blocks()
    }

    /// Number of sessions ever seen.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContentBlock;

    fn key(n: i64) -> SessionKey {
        SessionKey::new(n, n as u64)
    }

    #[tokio::test]
    async fn store_replace_and_clear() {
        let store = SessionStore::new();
        {
            let mut s = store.try_begin(key(1)).await.unwrap();
            assert_eq!(s.phase(), SessionPhase::Idle);
            s.store(Arc::new(vec![ContentBlock::text("one")].into()));
            s.store(Arc::new(vec![ContentBlock::text("two")].into()));
            assert_eq!(s.phase(), SessionPhase::Delivered);
        }
        let blocks = store.blocks(key(1)).await.unwrap();
        assert_eq!(blocks[0].as_text(), Some("two"));

        {
            let mut s = store.try_begin(key(1)).await.unwrap();
            s.set_prompt(PromptId {
                chat_id: 1,
                message_id: 9,
            });
            s.clear();
            assert!(s.prompt().is_none());
        }
        assert!(store.blocks(key(1)).await.is_none());
    }

    #[tokio::test]
    async fn same_session_is_exclusive() {
        let store = SessionStore::new();
        let guard = store.try_begin(key(1)).await.unwrap();
        let err = store.try_begin(key(1)).await.unwrap_err();
        assert!(matches!(err, PdfBotError::SessionBusy { .. }));
        drop(guard);
        assert!(store.try_begin(key(1)).await.is_ok());
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = SessionStore::new();
        let mut a = store.try_begin(key(1)).await.unwrap();
        let b = store.try_begin(key(2)).await;
        assert!(b.is_ok(), "other sessions must not be blocked");
        a.store(Arc::new(vec![ContentBlock::text("a")].into()));
        drop(a);
        drop(b);
        assert!(store.blocks(key(2)).await.is_none());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn unknown_session_has_no_blocks() {
        let store = SessionStore::new();
        assert!(store.blocks(key(42)).await.is_none());
        assert!(store.is_empty().await);
    }
}
