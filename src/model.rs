//! Data model: content blocks and the reports that travel with them.

use crate::error::ItemError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// A unit of extracted content, in source-document order.
#[derive(Clone, PartialEq, Eq)]
pub enum ContentBlock {
    /// Normalised text of one page. Never empty.
    Text(String),
    /// One unique embedded image, bytes as extracted.
    Image {
        data: Vec<u8>,
        /// File extension of `data`, e.g. `jpeg`, `png`, `jpx`.
        extension: String,
    },
}

impl ContentBlock {
    pub fn text(s: impl Into<String>) -> Self {
        ContentBlock::Text(s.into())
    }

    pub fn image(data: Vec<u8>, extension: impl Into<String>) -> Self {
        ContentBlock::Image {
            data,
            extension: extension.into(),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ContentBlock::Text(_))
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ContentBlock::Image { .. })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text(t) => Some(t),
            ContentBlock::Image { .. } => None,
        }
    }
}

// Image payloads can be megabytes; keep Debug output readable.
impl fmt::Debug for ContentBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentBlock::Text(t) => f.debug_tuple("Text").field(&t.chars().count()).finish(),
            ContentBlock::Image { data, extension } => f
                .debug_struct("Image")
                .field("bytes", &data.len())
                .field("extension", extension)
                .finish(),
        }
    }
}

/// Ordered list of blocks extracted from one PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSequence(Vec<ContentBlock>);

impl BlockSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: ContentBlock) {
        self.0.push(block);
    }

    pub fn text_count(&self) -> usize {
        self.0.iter().filter(|b| b.is_text()).count()
    }

    pub fn image_count(&self) -> usize {
        self.0.iter().filter(|b| b.is_image()).count()
    }

    pub fn into_inner(self) -> Vec<ContentBlock> {
        self.0
    }
}

impl Deref for BlockSequence {
    type Target = [ContentBlock];

    fn deref(&self) -> &[ContentBlock] {
        &self.0
    }
}

impl From<Vec<ContentBlock>> for BlockSequence {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        Self(blocks)
    }
}

impl FromIterator<ContentBlock> for BlockSequence {
    fn from_iter<I: IntoIterator<Item = ContentBlock>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a BlockSequence {
    type Item = &'a ContentBlock;
    type IntoIter = std::slice::Iter<'a, ContentBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// What one page contributed to the sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    /// 1-indexed page number.
    pub page: usize,
    /// Characters in the emitted text block, `None` when no block was emitted.
    pub text_chars: Option<usize>,
    /// Unique images first seen on this page.
    pub images: usize,
    /// Images skipped because an identical one was already emitted.
    pub duplicate_images: usize,
}

/// Partial-success report of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub page_count: usize,
    pub text_blocks: usize,
    pub image_blocks: usize,
    pub duplicate_images: usize,
    pub pages: Vec<PageSummary>,
    /// Per-item failures that were skipped.
    pub issues: Vec<ItemError>,
    pub duration_ms: u64,
}

impl ExtractionReport {
    /// `true` when no page or image was skipped because of an error.
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Result of a full extraction: the usable blocks plus what went wrong.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub blocks: BlockSequence,
    pub report: ExtractionReport,
}

/// Partial-success report of one document assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyReport {
    pub paragraphs: usize,
    pub images_embedded: usize,
    pub issues: Vec<ItemError>,
}

/// An assembled Word document.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub bytes: Vec<u8>,
    pub report: AssemblyReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_counts() {
        let seq: BlockSequence = vec![
            ContentBlock::text("a"),
            ContentBlock::image(vec![1, 2, 3], "png"),
            ContentBlock::text("b"),
        ]
        .into();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.text_count(), 2);
        assert_eq!(seq.image_count(), 1);
        assert_eq!(seq[2].as_text(), Some("b"));
    }

    #[test]
    fn debug_hides_image_bytes() {
        let block = ContentBlock::image(vec![0xAB; 1024], "jpeg");
        let dbg = format!("{block:?}");
        assert!(dbg.contains("1024"));
        assert!(!dbg.contains("171"), "raw bytes leaked: {dbg}");
    }
}
