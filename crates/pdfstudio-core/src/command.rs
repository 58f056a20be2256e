use crate::config::WatermarkConfig;
use crate::error::PdfStudioError;
use crate::tools::{self, ToolOutput};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// One single-shot tool invocation, as sent by a JSON caller
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ToolCommand {
    Merge {
        files: Vec<Vec<u8>>,
    },
    Extract {
        file: Vec<u8>,
        range: String,
    },
    Delete {
        file: Vec<u8>,
        page: String,
    },
    Rotate {
        file: Vec<u8>,
        degrees: i64,
    },
    Watermark {
        file: Vec<u8>,
        text: String,
        #[serde(default)]
        style: Option<WatermarkConfig>,
    },
    PageNumbers {
        file: Vec<u8>,
    },
    Metadata {
        file: Vec<u8>,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        author: Option<String>,
    },
    InsertBlank {
        file: Vec<u8>,
        after: usize,
    },
    ImageToPdf {
        image: Vec<u8>,
    },
}

impl ToolCommand {
    pub fn input_size(&self) -> usize {
        match self {
            ToolCommand::Merge { files } => files.iter().map(Vec::len).sum(),
            ToolCommand::Extract { file, .. }
            | ToolCommand::Delete { file, .. }
            | ToolCommand::Rotate { file, .. }
            | ToolCommand::Watermark { file, .. }
            | ToolCommand::PageNumbers { file }
            | ToolCommand::Metadata { file, .. }
            | ToolCommand::InsertBlank { file, .. } => file.len(),
            ToolCommand::ImageToPdf { image } => image.len(),
        }
    }

    pub fn run(&self) -> Result<ToolOutput, PdfStudioError> {
        match self {
            ToolCommand::Merge { files } => tools::merge(files),
            ToolCommand::Extract { file, range } => tools::extract(file, range),
            ToolCommand::Delete { file, page } => tools::delete_page(file, page),
            ToolCommand::Rotate { file, degrees } => tools::rotate(file, *degrees),
            ToolCommand::Watermark { file, text, style } => {
                tools::watermark(file, text, &style.clone().unwrap_or_default())
            }
            ToolCommand::PageNumbers { file } => tools::page_numbers(file),
            ToolCommand::Metadata {
                file,
                title,
                author,
            } => tools::set_metadata(file, title.as_deref(), author.as_deref()),
            ToolCommand::InsertBlank { file, after } => tools::insert_blank_page(file, *after),
            ToolCommand::ImageToPdf { image } => tools::image_to_pdf(image),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub file_name: Option<String>,
    /// Base64-encoded output file
    pub data: Option<String>,
    pub error: Option<String>,
    pub metrics: Option<ToolMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolMetrics {
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
}

impl ToolResult {
    /// Run `command`, folding any failure into the result
    pub fn from_command(command: &ToolCommand) -> Self {
        match command.run() {
            Ok(output) => Self {
                success: true,
                metrics: Some(ToolMetrics {
                    input_size_bytes: command.input_size(),
                    output_size_bytes: output.bytes.len(),
                }),
                data: Some(STANDARD.encode(&output.bytes)),
                file_name: Some(output.file_name),
                error: None,
            },
            Err(e) => Self {
                success: false,
                file_name: None,
                data: None,
                error: Some(e.to_string()),
                metrics: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_pdf;

    #[test]
    fn test_command_deserializes_extract() {
        let json = r#"{"type":"Extract","file":[],"range":"2-3"}"#;
        let cmd: ToolCommand = serde_json::from_str(json).unwrap();
        assert!(matches!(cmd, ToolCommand::Extract { ref range, .. } if range == "2-3"));
    }

    #[test]
    fn test_command_deserializes_watermark_without_style() {
        let json = r#"{"type":"Watermark","file":[1,2],"text":"DRAFT"}"#;
        let cmd: ToolCommand = serde_json::from_str(json).unwrap();
        assert!(matches!(cmd, ToolCommand::Watermark { style: None, .. }));
        assert_eq!(cmd.input_size(), 2);
    }

    #[test]
    fn test_result_success_is_base64() {
        let pdf = create_test_pdf(3);
        let cmd = ToolCommand::Extract {
            file: pdf.clone(),
            range: "1".into(),
        };
        let result = ToolResult::from_command(&cmd);
        assert!(result.success);
        assert_eq!(result.file_name.as_deref(), Some("Extracted_Pages.pdf"));

        let decoded = STANDARD.decode(result.data.unwrap()).unwrap();
        assert!(decoded.starts_with(b"%PDF-"));
        let metrics = result.metrics.unwrap();
        assert_eq!(metrics.input_size_bytes, pdf.len());
        assert_eq!(metrics.output_size_bytes, decoded.len());
    }

    #[test]
    fn test_result_failure_carries_message() {
        let cmd = ToolCommand::Merge {
            files: vec![create_test_pdf(1)],
        };
        let result = ToolResult::from_command(&cmd);
        assert!(!result.success);
        assert!(result.data.is_none());
        assert!(result.error.unwrap().contains("at least two"));
    }
}
