//! Error types for the edgequake-pdfbot library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PdfBotError`]: **fatal** for one operation. The upload is not a PDF,
//!   the PDF cannot be opened, there is nothing to convert, or the bot is
//!   misconfigured. Returned as `Err(PdfBotError)` from [`crate::extract()`],
//!   [`crate::assemble()`] and the router.
//!
//! * [`ItemError`]: **non-fatal**. A single page's text or a single image
//!   failed, but everything else is fine. Stored inside
//!   [`crate::model::ExtractionReport`] and [`crate::model::AssemblyReport`]
//!   so partial success stays observable instead of being silently dropped.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfbot library.
#[derive(Debug, Error)]
pub enum PdfBotError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The uploaded file does not carry the PDF MIME type.
    #[error("Unsupported file type '{mime_type}': only application/pdf is accepted")]
    UnsupportedInput { mime_type: String },

    /// The payload was received, but it does not start with `%PDF`.
    #[error("Payload is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF could not be parsed: {detail}")]
    Parse { detail: String },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// Assembly was requested but the session holds no blocks.
    #[error("No extracted content is available to convert")]
    NoContent,

    /// The Word document could not be packaged.
    #[error("Document assembly failed: {detail}")]
    Assembly { detail: String },

    // ── Runtime errors ────────────────────────────────────────────────────
    /// The session is still handling a previous event.
    #[error("Session {session} is still processing a previous request")]
    SessionBusy { session: String },

    /// A call to the chat transport failed.
    #[error("Chat transport error: {0}")]
    Transport(String),

    /// Could not create or write an output file (offline conversion).
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// A required start-up value is missing or invalid.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium system-wide, or set PDFIUM_LIB_PATH=/path/to/libpdfium.\n\
Alternatively run with --text-engine lopdf to use the pure-Rust text reader.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfBotError {
    /// `true` when the error is caused by what the user sent rather than by
    /// the bot itself.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            PdfBotError::UnsupportedInput { .. }
                | PdfBotError::NotAPdf { .. }
                | PdfBotError::Parse { .. }
                | PdfBotError::NoContent
                | PdfBotError::SessionBusy { .. }
        )
    }
}

/// A non-fatal error for a single page or image.
///
/// Collected into the extraction and assembly reports; the surrounding
/// operation always continues.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ItemError {
    /// Text extraction failed for one page (or the text reader could not
    /// open the document at all). The page contributes no text block.
    #[error("Page {page}: text extraction failed: {detail}")]
    PageText { page: usize, detail: String },

    /// An image XObject could not be read out of the PDF.
    #[error("Page {page}: image '{name}' could not be extracted: {detail}")]
    ImageExtract {
        page: usize,
        name: String,
        detail: String,
    },

    /// An image block could not be embedded into the Word document.
    #[error("Block {index}: image could not be embedded: {detail}")]
    ImageEmbed { index: usize, detail: String },
}
