//! Delivery dispatcher: echo a [`BlockSequence`] back into the chat.
//!
//! One transport call per image and per text chunk, in sequence order.
//! Sends are not retried; a failed send is logged and counted, and delivery
//! moves on to the next block.

use crate::model::ContentBlock;
use crate::transport::{Action, ChatTransport};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Action id of the "download as Word" button.
pub const ACTION_DOWNLOAD_WORD: &str = "download_word";
/// Action id of the "upload another PDF" button.
pub const ACTION_START_OVER: &str = "start_over";

pub const DOWNLOAD_WORD_LABEL: &str = "📥 Download as Word";
pub const START_OVER_LABEL: &str = "🔄 Upload another PDF";

/// Both actions, as shown right after delivery.
pub fn delivered_actions() -> Vec<Action> {
    vec![
        Action::new(DOWNLOAD_WORD_LABEL, ACTION_DOWNLOAD_WORD),
        Action::new(START_OVER_LABEL, ACTION_START_OVER),
    ]
}

/// Only "start over", shown once the document has been sent.
pub fn start_over_actions() -> Vec<Action> {
    vec![Action::new(START_OVER_LABEL, ACTION_START_OVER)]
}

/// Outcome of one delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub messages: usize,
    pub photos: usize,
    pub failures: usize,
}

/// Split `text` into consecutive pieces of at most `max_chars` characters.
///
/// Splits only on `char` boundaries. Empty input yields no chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let split = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(offset, _)| offset);
        let (head, tail) = rest.split_at(split);
        chunks.push(head);
        rest = tail;
    }
    chunks
}

/// Send every block to `chat_id`.
pub async fn deliver(
    transport: &dyn ChatTransport,
    chat_id: i64,
    blocks: &[ContentBlock],
    chunk_size: usize,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for (index, block) in blocks.iter().enumerate() {
        match block {
            ContentBlock::Text(text) => {
                let chunks = chunk_text(text, chunk_size);
                debug!("Block {}: text in {} chunk(s)", index, chunks.len());
                for chunk in chunks {
                    match transport.send_text(chat_id, chunk).await {
                        Ok(()) => report.messages += 1,
                        Err(e) => {
                            warn!("Block {}: text chunk not delivered: {}", index, e);
                            report.failures += 1;
                        }
                    }
                }
            }
            ContentBlock::Image { data, extension } => {
                match transport.send_photo(chat_id, data.clone()).await {
                    Ok(()) => report.photos += 1,
                    Err(e) => {
                        warn!("Block {}: .{} image not delivered: {}", index, extension, e);
                        report.failures += 1;
                    }
                }
            }
        }
    }

    info!(
        "Delivered to chat {}: {} messages, {} photos, {} failures",
        chat_id, report.messages, report.photos, report.failures
    );
    report
}
