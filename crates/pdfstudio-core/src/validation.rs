//! Upload validation and document info
//!
//! Checks run before a file reaches a tool: size limit, magic bytes and,
//! for PDFs, a full parse with at least one page.

use crate::engine::decode_text_string;
use crate::error::PdfStudioError;
use crate::image::ImageKind;
use lopdf::{Document, Object};
use serde::Serialize;

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct PdfInfo {
    pub page_count: usize,
    /// Header version, e.g. "1.7"
    pub version: String,
    /// Encrypted files are reported, not rejected; only unlock can use them
    pub encrypted: bool,
    pub size_bytes: usize,
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Reject empty uploads and uploads over `max_size_mb`, without parsing them
pub fn check_upload_size(bytes: &[u8], max_size_mb: u64) -> Result<(), PdfStudioError> {
    if bytes.is_empty() {
        return Err(PdfStudioError::InvalidInput("File is empty".into()));
    }
    if bytes.len() as u64 > max_size_mb.saturating_mul(BYTES_PER_MB) {
        return Err(PdfStudioError::InvalidInput(format!(
            "File is larger than {} MB",
            max_size_mb
        )));
    }
    Ok(())
}

/// Validate a PDF upload and extract basic info
pub fn validate_pdf(bytes: &[u8], max_size_mb: u64) -> Result<PdfInfo, PdfStudioError> {
    check_upload_size(bytes, max_size_mb)?;
    if bytes.len() < 8 || !bytes.starts_with(b"%PDF-") {
        return Err(PdfStudioError::InvalidInput(
            "Not a valid PDF file (missing %PDF- header)".into(),
        ));
    }

    let document = Document::load_mem(bytes)
        .map_err(|e| PdfStudioError::DocumentLoad(format!("Failed to parse PDF: {}", e)))?;

    let page_count = document.get_pages().len();
    if page_count == 0 {
        return Err(PdfStudioError::DocumentLoad("PDF has no pages".into()));
    }

    Ok(PdfInfo {
        page_count,
        version: header_version(bytes),
        encrypted: document.is_encrypted(),
        size_bytes: bytes.len(),
        title: info_entry(&document, b"Title"),
        author: info_entry(&document, b"Author"),
    })
}

/// Accept JPEG and PNG uploads by magic bytes
pub fn validate_image(bytes: &[u8], max_size_mb: u64) -> Result<ImageKind, PdfStudioError> {
    check_upload_size(bytes, max_size_mb)?;
    ImageKind::sniff(bytes).ok_or_else(|| {
        PdfStudioError::InvalidInput("Only JPEG and PNG images are supported".into())
    })
}

fn header_version(bytes: &[u8]) -> String {
    std::str::from_utf8(&bytes[5..8])
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|_| "1.4".to_string())
}

fn info_entry(document: &Document, key: &[u8]) -> Option<String> {
    let info_id = document.trailer.get(b"Info").and_then(Object::as_reference).ok()?;
    let info = document.get_object(info_id).and_then(Object::as_dict).ok()?;
    let text = decode_text_string(info.get(key).and_then(Object::as_str).ok()?);
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PdfDocument;
    use crate::image::test_images;
    use crate::test_support::create_test_pdf;

    #[test]
    fn test_valid_pdf() {
        let pdf = create_test_pdf(3);
        let info = validate_pdf(&pdf, 50).unwrap();
        assert_eq!(info.page_count, 3);
        assert_eq!(info.version, "1.7");
        assert!(!info.encrypted);
        assert_eq!(info.size_bytes, pdf.len());
        assert_eq!(info.title, None);
    }

    #[test]
    fn test_metadata_is_reported() {
        let mut doc = PdfDocument::load(&create_test_pdf(1)).unwrap();
        doc.set_metadata(Some("Quarterly Report"), Some("Zoë")).unwrap();
        let bytes = doc.save().unwrap();

        let info = validate_pdf(&bytes, 50).unwrap();
        assert_eq!(info.title.as_deref(), Some("Quarterly Report"));
        assert_eq!(info.author.as_deref(), Some("Zoë"));
    }

    #[test]
    fn test_missing_header() {
        let result = validate_pdf(b"<html><body>nope</body></html>", 50);
        assert!(matches!(result, Err(PdfStudioError::InvalidInput(_))));
    }

    #[test]
    fn test_truncated_pdf() {
        let pdf = create_test_pdf(2);
        let result = validate_pdf(&pdf[..40], 50);
        assert!(matches!(result, Err(PdfStudioError::DocumentLoad(_))));
    }

    #[test]
    fn test_size_limit() {
        let big = vec![b'%'; (BYTES_PER_MB + 1) as usize];
        assert!(matches!(validate_pdf(&big, 1), Err(PdfStudioError::InvalidInput(_))));
        assert!(matches!(validate_pdf(&[], 50), Err(PdfStudioError::InvalidInput(_))));
    }

    #[test]
    fn test_upload_size_saturates_for_huge_limits() {
        assert!(check_upload_size(b"%PDF-encrypted", u64::MAX).is_ok());
        assert!(check_upload_size(&[0u8; 16], 0).is_err());
    }

    #[test]
    fn test_validate_image() {
        let jpeg = test_images::jpeg_header(4, 4, 3);
        assert_eq!(validate_image(&jpeg, 50).unwrap(), ImageKind::Jpeg);

        let png = test_images::png(1, 1, png::ColorType::Grayscale, &[0]);
        assert_eq!(validate_image(&png, 50).unwrap(), ImageKind::Png);

        assert!(matches!(
            validate_image(b"GIF89a....", 50),
            Err(PdfStudioError::InvalidInput(_))
        ));
    }
}
