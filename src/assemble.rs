//! Document assembly: blocks → a single `.docx` file.
//!
//! Each text block becomes one paragraph holding the full text. Each image
//! block is decoded in memory, re-packed as PNG and embedded in its own
//! paragraph at a fixed display width, keeping its aspect ratio. No temporary
//! files are involved.
//!
//! An image that cannot be decoded (JPEG 2000, a corrupt JPEG, ...) is
//! logged, recorded in the [`AssemblyReport`] and skipped; the document is
//! still produced.

use crate::config::PipelineConfig;
use crate::error::{ItemError, PdfBotError};
use crate::model::{Assembled, AssemblyReport, ContentBlock};
use docx_rs::{Docx, Paragraph, Pic, Run};
use image::ImageFormat;
use std::io::Cursor;
use tracing::{debug, info, warn};

/// File name of every produced document.
pub const OUTPUT_FILE_NAME: &str = "converted.docx";

/// English Metric Units per inch (OOXML drawing unit).
pub const EMU_PER_INCH: f64 = 914_400.0;

/// Build a Word document from `blocks`.
///
/// # Errors
/// - [`PdfBotError::NoContent`] when `blocks` is empty
/// - [`PdfBotError::Assembly`] when the document cannot be packaged
pub fn assemble(
    blocks: &[ContentBlock],
    config: &PipelineConfig,
) -> Result<Assembled, PdfBotError> {
    if blocks.is_empty() {
        return Err(PdfBotError::NoContent);
    }

    let width_emu = (config.image_width_inches as f64 * EMU_PER_INCH).round() as u32;
    let mut docx = Docx::new();
    let mut report = AssemblyReport::default();

    for (index, block) in blocks.iter().enumerate() {
        match block {
            ContentBlock::Text(text) => {
                docx = docx
                    .add_paragraph(Paragraph::new().add_run(Run::new().add_text(text.as_str())));
                report.paragraphs += 1;
            }
            ContentBlock::Image { data, extension } => match picture(data, extension, width_emu) {
                Ok(pic) => {
                    docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_image(pic)));
                    report.images_embedded += 1;
                }
                Err(detail) => {
                    let issue = ItemError::ImageEmbed { index, detail };
                    warn!("{}", issue);
                    report.issues.push(issue);
                }
            },
        }
    }

    let mut buf = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buf)
        .map_err(|e| PdfBotError::Assembly {
            detail: e.to_string(),
        })?;
    let bytes = buf.into_inner();

    info!(
        "Assembled {}: {} paragraphs, {} images, {} skipped, {} bytes",
        OUTPUT_FILE_NAME,
        report.paragraphs,
        report.images_embedded,
        report.issues.len(),
        bytes.len()
    );

    Ok(Assembled { bytes, report })
}

/// Decode an image block and size it to `width_emu`.
fn picture(data: &[u8], extension: &str, width_emu: u32) -> Result<Pic, String> {
    let decoded = match ImageFormat::from_extension(extension) {
        Some(format) => image::load_from_memory_with_format(data, format),
        None => image::load_from_memory(data),
    }
    .map_err(|e| format!("cannot decode .{extension} image: {e}"))?;

    let (width_px, height_px) = (decoded.width(), decoded.height());
    if width_px == 0 || height_px == 0 {
        return Err(format!("image has no area ({width_px}x{height_px})"));
    }

    let mut png = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| format!("PNG encoding failed: {e}"))?;

    let height_emu = scaled_height(width_emu, width_px, height_px);
    debug!(
        "Embedding {}x{} px .{} image at {}x{} EMU",
        width_px, height_px, extension, width_emu, height_emu
    );

    Ok(Pic::new_with_dimensions(png, width_px, height_px).size(width_emu, height_emu))
}

/// Display height for a `width_px` x `height_px` image shown `width_emu`
/// wide, saturating at `u32::MAX`.
fn scaled_height(width_emu: u32, width_px: u32, height_px: u32) -> u32 {
    let height = width_emu as u64 * height_px as u64 / width_px.max(1) as u64;
    u32::try_from(height).unwrap_or(u32::MAX)
}
