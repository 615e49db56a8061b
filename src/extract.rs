//! Extraction entry points: PDF bytes → ordered [`ContentBlock`]s.
//!
//! The document is opened twice, by two independent readers: the configured
//! text engine and the lopdf structure reader. Pages are walked in document
//! order; for each page the normalised text (if any) is emitted first, then
//! every image not already emitted earlier in this run.
//!
//! Failures for one page's text or one image are recorded in the
//! [`ExtractionReport`] and never abort the run.

use crate::config::PipelineConfig;
use crate::error::{ItemError, PdfBotError};
use crate::model::{BlockSequence, ContentBlock, Extraction, ExtractionReport, PageSummary};
use crate::pipeline::images::{self, ImageDeduper};
use crate::pipeline::{input, normalize, text};
use lopdf::Document;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract blocks from PDF bytes.
///
/// Parsing is CPU-bound and pdfium is not async-safe, so the work runs on
/// tokio's blocking pool.
///
/// # Errors
/// - [`PdfBotError::NotAPdf`] when the bytes do not start with `%PDF`
/// - [`PdfBotError::Parse`] when the structure reader cannot open the file
pub async fn extract(bytes: Vec<u8>, config: &PipelineConfig) -> Result<Extraction, PdfBotError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || extract_blocking(&bytes, &config))
        .await
        .map_err(|e| PdfBotError::Internal(format!("Extraction task panicked: {e}")))?
}

/// Extract blocks from a local PDF file.
pub async fn extract_file(
    path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<Extraction, PdfBotError> {
    let bytes = input::read_local(path.as_ref()).await?;
    extract(bytes, config).await
}

/// Blocking implementation of [`extract`].
pub fn extract_blocking(bytes: &[u8], config: &PipelineConfig) -> Result<Extraction, PdfBotError> {
    let start = Instant::now();
    input::check_magic(bytes)?;

    let structure = Document::load_mem(bytes).map_err(|e| PdfBotError::Parse {
        detail: e.to_string(),
    })?;
    let page_ids: Vec<_> = structure.get_pages().into_values().collect();
    info!("PDF loaded: {} pages", page_ids.len());

    let texts = match text::read_page_texts(config, bytes, &structure) {
        Ok(texts) => Some(texts),
        Err(detail) => {
            warn!("{} text reader could not open the PDF: {}", config.text_engine, detail);
            None
        }
    };
    if let Some(ref texts) = texts {
        if texts.len() != page_ids.len() {
            warn!(
                "Text reader saw {} pages, structure reader saw {}",
                texts.len(),
                page_ids.len()
            );
        }
    }

    let mut blocks = BlockSequence::new();
    let mut report = ExtractionReport {
        page_count: page_ids.len(),
        ..ExtractionReport::default()
    };
    let mut deduper = ImageDeduper::new();

    for (idx, &page_id) in page_ids.iter().enumerate() {
        let page = idx + 1;
        let mut summary = PageSummary {
            page,
            ..PageSummary::default()
        };

        // ── Text ─────────────────────────────────────────────────────────
        let raw = match texts.as_ref() {
            None => Err("text reader could not open the document".to_string()),
            Some(texts) => texts
                .get(idx)
                .cloned()
                .unwrap_or_else(|| Err("page missing from text reader".to_string())),
        };
        match raw {
            Ok(raw) => {
                if let Some(normalised) = normalize::normalize_page_text(&raw) {
                    summary.text_chars = Some(normalised.chars().count());
                    blocks.push(ContentBlock::Text(normalised));
                    report.text_blocks += 1;
                }
            }
            Err(detail) => {
                debug!("Page {}: no text ({})", page, detail);
                report.issues.push(ItemError::PageText { page, detail });
            }
        }

        // ── Images ───────────────────────────────────────────────────────
        for item in images::page_images(&structure, page_id, page) {
            match item {
                Ok(image) => {
                    if deduper.first_sighting(&image.data) {
                        blocks.push(ContentBlock::image(image.data, image.extension));
                        summary.images += 1;
                        report.image_blocks += 1;
                    } else {
                        debug!("Page {}: duplicate image '{}' skipped", page, image.name);
                        summary.duplicate_images += 1;
                        report.duplicate_images += 1;
                    }
                }
                Err(issue) => {
                    warn!("{}", issue);
                    report.issues.push(issue);
                }
            }
        }

        report.pages.push(summary);
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Extraction complete: {} text blocks, {} images ({} duplicates, {} issues) in {}ms",
        report.text_blocks,
        report.image_blocks,
        report.duplicate_images,
        report.issues.len(),
        report.duration_ms
    );

    Ok(Extraction { blocks, report })
}
