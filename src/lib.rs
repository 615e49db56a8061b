//! # edgequake-pdfbot
//!
//! A Telegram bot that reads an uploaded PDF, echoes its text and images
//! back into the chat, and on request turns them into a Word document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Input     MIME check, download, %PDF magic check
//!  ├─ 2. Text      per-page text via pdfium (or lopdf), hyphen/line-break cleanup
//!  ├─ 3. Images    image XObjects via lopdf, SHA-256 dedup across the document
//!  ├─ 4. Store     BlockSequence saved for the chat/user session
//!  ├─ 5. Deliver   text in ≤4096-char chunks, one photo per unique image
//!  └─ 6. Assemble  on "Download as Word": paragraphs + embedded pictures → converted.docx
//! ```
//!
//! Extraction and assembly are CPU-bound and run on tokio's blocking pool.
//! Single pages or images that fail are recorded in the
//! [`ExtractionReport`] / [`AssemblyReport`] instead of aborting the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfbot::{convert_to_file, PipelineConfig, TextEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .text_engine(TextEngine::Lopdf)
//!         .build()?;
//!     let summary = convert_to_file("document.pdf", "document.docx", &config).await?;
//!     eprintln!(
//!         "{} pages, {} text blocks, {} images",
//!         summary.extraction.page_count,
//!         summary.extraction.text_blocks,
//!         summary.extraction.image_blocks
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfbot` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-pdfbot = { version = "0.1", default-features = false }
//! ```
//!
//! ## Text Engines
//!
//! | Engine   | Needs            | Notes |
//! |----------|------------------|-------|
//! | `pdfium` | libpdfium at runtime | Default. Best reading order and encodings |
//! | `lopdf`  | nothing          | Pure Rust. Weaker on exotic font encodings |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assemble;
pub mod config;
pub mod convert;
pub mod deliver;
pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod router;
pub mod session;
pub mod telegram;
pub mod transport;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assemble::{assemble, OUTPUT_FILE_NAME};
pub use config::{BotConfig, BotConfigBuilder, PipelineConfig, PipelineConfigBuilder, TextEngine};
pub use convert::{convert_bytes, convert_sync, convert_to_file, Conversion, ConversionSummary};
pub use deliver::{chunk_text, deliver, DeliveryReport};
pub use error::{ItemError, PdfBotError};
pub use extract::{extract, extract_file};
pub use model::{
    Assembled, AssemblyReport, BlockSequence, ContentBlock, Extraction, ExtractionReport,
    PageSummary,
};
pub use router::{BotEvent, Router};
pub use session::{SessionKey, SessionStore};
pub use telegram::{run_webhook, TelegramTransport};
pub use transport::{Action, ChatTransport, PromptId};
