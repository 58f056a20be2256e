//! Single-shot tools against generated documents

use lopdf::Document;
use pdfstudio_core::config::WatermarkConfig;
use pdfstudio_core::test_support::{create_test_pdf, shown_strings};
use pdfstudio_core::{tools, validate_pdf, PdfStudioError, ToolCommand, ToolResult};
use pretty_assertions::assert_eq;

fn page_texts(bytes: &[u8]) -> Vec<Vec<String>> {
    let count = Document::load_mem(bytes).unwrap().get_pages().len();
    (1..=count).map(|p| shown_strings(bytes, p)).collect()
}

fn single(text: &str) -> Vec<String> {
    vec![text.to_string()]
}

#[test]
fn merge_then_extract_then_delete() {
    let merged = tools::merge(&[create_test_pdf(2), create_test_pdf(3)]).unwrap();
    assert_eq!(validate_pdf(&merged.bytes, 50).unwrap().page_count, 5);

    let extracted = tools::extract(&merged.bytes, "2-4").unwrap();
    assert_eq!(
        page_texts(&extracted.bytes),
        vec![single("Page 2"), single("Page 1"), single("Page 2")]
    );

    let cleaned = tools::delete_page(&extracted.bytes, "1").unwrap();
    assert_eq!(cleaned.file_name, "Cleaned_Document.pdf");
    assert_eq!(page_texts(&cleaned.bytes), vec![single("Page 1"), single("Page 2")]);
}

#[test]
fn range_errors_surface_unchanged() {
    let pdf = create_test_pdf(3);
    assert!(matches!(tools::extract(&pdf, "3-1"), Err(PdfStudioError::InvalidRange(_))));
    assert!(matches!(tools::extract(&pdf, "4"), Err(PdfStudioError::InvalidPage(_))));
    assert!(matches!(tools::delete_page(&pdf, "1-2"), Err(PdfStudioError::InvalidRange(_))));
}

#[test]
fn watermark_and_numbers_stack() {
    let marked = tools::watermark(&create_test_pdf(2), "DRAFT", &WatermarkConfig::default()).unwrap();
    let numbered = tools::page_numbers(&marked.bytes).unwrap();

    assert_eq!(
        page_texts(&numbered.bytes),
        vec![
            vec!["Page 1".to_string(), "DRAFT".to_string(), "Page 1 of 2".to_string()],
            vec!["Page 2".to_string(), "DRAFT".to_string(), "Page 2 of 2".to_string()],
        ]
    );
}

#[test]
fn json_command_round_trip() {
    let json = serde_json::json!({
        "type": "Rotate",
        "file": create_test_pdf(1),
        "degrees": 90,
    });
    let command: ToolCommand = serde_json::from_value(json).unwrap();
    let result = ToolResult::from_command(&command);

    assert!(result.success);
    assert_eq!(result.file_name.as_deref(), Some("Rotated_Document.pdf"));
}
