//! Single-shot document tools
//!
//! Each tool takes the uploaded bytes, performs one change and returns the
//! finished file under a fixed download name.

use crate::config::WatermarkConfig;
use crate::engine::{PdfDocument, StandardFont, TextPlacement, A4};
use crate::error::PdfStudioError;
use crate::image::RasterImage;
use crate::range::{parse_page_selector, parse_single_page};
use tracing::info;

/// Approximate advance per watermark character used to center the text
const WATERMARK_CHAR_ADVANCE: f64 = 12.0;
const PAGE_NUMBER_FONT_SIZE: f64 = 12.0;
const PAGE_NUMBER_HALF_WIDTH: f64 = 30.0;
const PAGE_NUMBER_BASELINE: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ToolOutput {
    fn new(file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            bytes,
        }
    }
}

/// Concatenate the pages of every file, in the order given
pub fn merge(files: &[Vec<u8>]) -> Result<ToolOutput, PdfStudioError> {
    if files.len() < 2 {
        return Err(PdfStudioError::InvalidInput(
            "Select at least two PDF files to merge".into(),
        ));
    }

    let mut merged = PdfDocument::load(&files[0])?;
    for file in &files[1..] {
        merged.append_document(PdfDocument::load(file)?)?;
    }

    info!(files = files.len(), pages = merged.page_count(), "Merged documents");
    Ok(ToolOutput::new("Merged_Document.pdf", merged.save()?))
}

/// Keep only the pages named by `selector` ("3" or "2-5")
pub fn extract(bytes: &[u8], selector: &str) -> Result<ToolOutput, PdfStudioError> {
    let mut doc = PdfDocument::load(bytes)?;
    let indices = parse_page_selector(selector, doc.page_count())?;
    doc.copy_pages(&indices)?;

    info!(selector, pages = indices.len(), "Extracted pages");
    Ok(ToolOutput::new("Extracted_Pages.pdf", doc.save()?))
}

/// Remove the single page named by `selector`
pub fn delete_page(bytes: &[u8], selector: &str) -> Result<ToolOutput, PdfStudioError> {
    let mut doc = PdfDocument::load(bytes)?;
    let index = parse_single_page(selector, doc.page_count())?;
    doc.remove_page(index)?;

    info!(page = index + 1, "Deleted page");
    Ok(ToolOutput::new("Cleaned_Document.pdf", doc.save()?))
}

/// Turn every page by `degrees` on top of its current rotation
pub fn rotate(bytes: &[u8], degrees: i64) -> Result<ToolOutput, PdfStudioError> {
    if degrees % 90 != 0 {
        return Err(PdfStudioError::InvalidInput(format!(
            "Rotation must be a multiple of 90 degrees, got {}",
            degrees
        )));
    }

    let mut doc = PdfDocument::load(bytes)?;
    for index in 0..doc.page_count() {
        let current = doc.rotation(index)?;
        doc.set_rotation(index, current + degrees)?;
    }

    info!(degrees, pages = doc.page_count(), "Rotated pages");
    Ok(ToolOutput::new("Rotated_Document.pdf", doc.save()?))
}

/// Stamp translucent, rotated bold text across the middle of every page
pub fn watermark(bytes: &[u8], text: &str, style: &WatermarkConfig) -> Result<ToolOutput, PdfStudioError> {
    if text.trim().is_empty() {
        return Err(PdfStudioError::InvalidInput("Watermark text is empty".into()));
    }

    let mut doc = PdfDocument::load(bytes)?;
    let text_width = text.chars().count() as f64 * WATERMARK_CHAR_ADVANCE;
    for index in 0..doc.page_count() {
        let size = doc.page_size(index)?;
        let placement = TextPlacement::new(
            text,
            size.width / 2.0 - text_width,
            size.height / 2.0,
            style.font_size,
        )
        .with_font(StandardFont::HelveticaBold)
        .with_color(style.color)
        .with_opacity(style.opacity)
        .with_rotation(style.rotation_degrees);
        doc.draw_text(index, &placement)?;
    }

    info!(pages = doc.page_count(), "Watermarked document");
    Ok(ToolOutput::new("Watermarked_Document.pdf", doc.save()?))
}

/// Write "Page i of n" at the bottom center of every page
pub fn page_numbers(bytes: &[u8]) -> Result<ToolOutput, PdfStudioError> {
    let mut doc = PdfDocument::load(bytes)?;
    let total = doc.page_count();
    for index in 0..total {
        let size = doc.page_size(index)?;
        let placement = TextPlacement::new(
            format!("Page {} of {}", index + 1, total),
            size.width / 2.0 - PAGE_NUMBER_HALF_WIDTH,
            PAGE_NUMBER_BASELINE,
            PAGE_NUMBER_FONT_SIZE,
        );
        doc.draw_text(index, &placement)?;
    }

    info!(pages = total, "Numbered pages");
    Ok(ToolOutput::new("Numbered_Document.pdf", doc.save()?))
}

/// Set title and author; blank values leave the existing entry alone
pub fn set_metadata(
    bytes: &[u8],
    title: Option<&str>,
    author: Option<&str>,
) -> Result<ToolOutput, PdfStudioError> {
    let mut doc = PdfDocument::load(bytes)?;
    doc.set_metadata(title, author)?;
    Ok(ToolOutput::new("Updated_Metadata.pdf", doc.save()?))
}

/// Insert an A4 page after the first `after` pages
pub fn insert_blank_page(bytes: &[u8], after: usize) -> Result<ToolOutput, PdfStudioError> {
    let mut doc = PdfDocument::load(bytes)?;
    let at = doc.insert_blank_page(after, A4)?;

    info!(position = at + 1, "Inserted blank page");
    Ok(ToolOutput::new("Inserted_Page.pdf", doc.save()?))
}

/// Wrap a JPEG or PNG in a single page of the same size
pub fn image_to_pdf(image_bytes: &[u8]) -> Result<ToolOutput, PdfStudioError> {
    let image = RasterImage::from_bytes(image_bytes)?;
    let mut doc = PdfDocument::new();
    doc.add_image_page(&image)?;

    info!(width = image.width, height = image.height, "Converted image to PDF");
    Ok(ToolOutput::new("Converted_Image.pdf", doc.save()?))
}
