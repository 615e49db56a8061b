//! Input validation: decide whether an upload is a PDF at all.
//!
//! Two checks run at different moments. The MIME check runs on the upload
//! event, before the file is downloaded, and is the user-facing rejection.
//! The magic-byte check runs on the payload, so a file that claims to be a
//! PDF but is not fails with a meaningful error instead of a parser crash.

use crate::error::PdfBotError;
use std::path::Path;
use tracing::debug;

/// The only MIME type the bot accepts.
pub const PDF_MIME: &str = "application/pdf";

/// Accept `application/pdf` (case-insensitive, parameters ignored).
pub fn check_mime(mime_type: Option<&str>) -> Result<(), PdfBotError> {
    let raw = mime_type.unwrap_or("").trim();
    let essence = raw.split(';').next().unwrap_or("").trim();
    if essence.eq_ignore_ascii_case(PDF_MIME) {
        Ok(())
    } else {
        Err(PdfBotError::UnsupportedInput {
            mime_type: if raw.is_empty() {
                "unknown".to_string()
            } else {
                raw.to_string()
            },
        })
    }
}

/// Verify the PDF magic bytes (`%PDF`).
pub fn check_magic(bytes: &[u8]) -> Result<(), PdfBotError> {
    if bytes.len() >= 4 && &bytes[..4] == b"%PDF" {
        Ok(())
    } else {
        Err(PdfBotError::NotAPdf {
            magic: bytes.iter().take(4).copied().collect(),
        })
    }
}

/// Read a local PDF for offline conversion, validating the magic bytes.
pub async fn read_local(path: &Path) -> Result<Vec<u8>, PdfBotError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| PdfBotError::Parse {
        detail: format!("cannot read '{}': {e}", path.display()),
    })?;
    check_magic(&bytes)?;
    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}
