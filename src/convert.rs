//! Offline conversion: PDF → `.docx` without a chat in between.
//!
//! Runs the same extraction and assembly the bot uses, which makes it handy
//! for checking how a given PDF will come out before anyone uploads it.

use crate::assemble::assemble;
use crate::config::PipelineConfig;
use crate::error::PdfBotError;
use crate::extract::{extract, extract_file};
use crate::model::{AssemblyReport, Extraction, ExtractionReport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// A converted document and how it got there.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub document: Vec<u8>,
    pub extraction: ExtractionReport,
    pub assembly: AssemblyReport,
}

/// What [`convert_to_file`] wrote. Serialisable for `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionSummary {
    pub output: PathBuf,
    pub bytes: usize,
    pub extraction: ExtractionReport,
    pub assembly: AssemblyReport,
}

async fn finish(
    extraction: Extraction,
    config: &PipelineConfig,
) -> Result<Conversion, PdfBotError> {
    let Extraction { blocks, report } = extraction;
    let config = config.clone();
    let assembled = tokio::task::spawn_blocking(move || assemble(&blocks, &config))
        .await
        .map_err(|e| PdfBotError::Internal(format!("Assembly task panicked: {e}")))??;
    Ok(Conversion {
        document: assembled.bytes,
        extraction: report,
        assembly: assembled.report,
    })
}

/// Convert PDF bytes held in memory.
///
/// # Errors
/// Extraction errors, or [`PdfBotError::NoContent`] when the PDF yields no
/// blocks at all.
pub async fn convert_bytes(
    bytes: Vec<u8>,
    config: &PipelineConfig,
) -> Result<Conversion, PdfBotError> {
    finish(extract(bytes, config).await?, config).await
}

/// Convert `input` and write the document to `output`.
///
/// The file is written to a sibling temp path and renamed into place, so a
/// failed run never leaves a half-written document behind.
pub async fn convert_to_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<ConversionSummary, PdfBotError> {
    let conversion = finish(extract_file(input.as_ref(), config).await?, config).await?;
    let path = output.as_ref();
    let write_err = |source| PdfBotError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("docx.tmp");
    tokio::fs::write(&tmp_path, &conversion.document)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!(
        "Wrote {} ({} bytes)",
        path.display(),
        conversion.document.len()
    );

    Ok(ConversionSummary {
        output: path.to_path_buf(),
        bytes: conversion.document.len(),
        extraction: conversion.extraction,
        assembly: conversion.assembly,
    })
}

/// Blocking wrapper around [`convert_bytes`] for callers without a runtime.
pub fn convert_sync(bytes: Vec<u8>, config: &PipelineConfig) -> Result<Conversion, PdfBotError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PdfBotError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(convert_bytes(bytes, config))
}
