//! Pipeline stages for PDF-to-blocks extraction.
//!
//! Each submodule implements exactly one step, so each is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text ──▶ normalize ──┐
//! (MIME,    (pdfium   (hyphens,   ├──▶ ordered ContentBlocks
//!  magic)    / lopdf)  spaces)    │
//!       └──▶ images ─────────────┘
//!            (lopdf XObjects, SHA-256 dedup)
//! ```
//!
//! 1. [`input`] rejects non-PDF uploads before any parsing
//! 2. [`text`] reads raw per-page text with the configured engine
//! 3. [`normalize`] rejoins hyphenated words and collapses whitespace
//! 4. [`images`] enumerates image XObjects per page and drops duplicates

pub mod images;
pub mod input;
pub mod normalize;
pub mod text;
