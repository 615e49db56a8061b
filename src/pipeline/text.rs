//! Raw page-text reading with the configured [`TextEngine`].
//!
//! The text reader is independent of the structure reader used for images:
//! if it cannot open the document, the caller still gets images, and every
//! page records why it has no text.
//!
//! pdfium is bound at runtime. `pdfium-render` wraps a C++ library that is
//! not async-safe, so this module is only ever called from the blocking
//! section of [`crate::extract()`].

use crate::config::{PipelineConfig, TextEngine};
use crate::error::PdfBotError;
use lopdf::Document;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// Per-page raw text, in document order. `Err` carries the failure detail.
pub type PageTexts = Vec<Result<String, String>>;

/// Read raw text for every page.
///
/// `structure` is the already-loaded lopdf document; the lopdf engine reuses
/// it, the pdfium engine opens `bytes` on its own.
///
/// # Errors
/// Returns `Err(detail)` when the engine cannot open the document at all.
pub fn read_page_texts(
    config: &PipelineConfig,
    bytes: &[u8],
    structure: &Document,
) -> Result<PageTexts, String> {
    match config.text_engine {
        TextEngine::Pdfium => {
            let pdfium = bind_pdfium(config.pdfium_lib_path.as_deref()).map_err(|e| e.to_string())?;
            pdfium_page_texts(&pdfium, bytes)
        }
        TextEngine::Lopdf => Ok(lopdf_page_texts(structure)),
    }
}

/// Bind to pdfium: an explicit library file when given, else the system
/// library.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, PdfBotError> {
    let bindings = match lib_path {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| PdfBotError::PdfiumBindingFailed(e.to_string()))?;
    Ok(Pdfium::new(bindings))
}

fn pdfium_page_texts(pdfium: &Pdfium, bytes: &[u8]) -> Result<PageTexts, String> {
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| format!("{e:?}"))?;

    let texts: PageTexts = document
        .pages()
        .iter()
        .map(|page| {
            page.text()
                .map(|text| text.all())
                .map_err(|e| format!("{e:?}"))
        })
        .collect();

    debug!("pdfium read text for {} pages", texts.len());
    Ok(texts)
}

fn lopdf_page_texts(document: &Document) -> PageTexts {
    let texts: PageTexts = document
        .get_pages()
        .keys()
        .map(|&number| document.extract_text(&[number]).map_err(|e| e.to_string()))
        .collect();

    debug!("lopdf read text for {} pages", texts.len());
    texts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_missing_library_fails_cleanly() {
        let err = bind_pdfium(Some(Path::new("/nonexistent/libpdfium.so"))).unwrap_err();
        assert!(matches!(err, PdfBotError::PdfiumBindingFailed(_)));
    }

    #[test]
    fn lopdf_engine_on_empty_document() {
        let doc = Document::with_version("1.5");
        let config = PipelineConfig::builder()
            .text_engine(TextEngine::Lopdf)
            .build()
            .unwrap();
        let texts = read_page_texts(&config, b"", &doc).unwrap();
        assert!(texts.is_empty());
    }
}
