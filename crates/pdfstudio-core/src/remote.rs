//! Requests to and responses from the processing server
//!
//! Unlocking, protecting, compression, OCR and format conversion run on a
//! separate HTTP service. This module describes what each call sends and
//! classifies what comes back; the transport lives with the caller.

use crate::error::PdfStudioError;
use crate::image::ImageKind;
use serde::{Deserialize, Serialize};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

pub const ORIGINAL_SIZE_HEADER: &str = "X-Original-Size";
pub const COMPRESSED_SIZE_HEADER: &str = "X-Compressed-Size";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemoteTool {
    Unlock,
    Protect,
    Compress,
    Ocr,
    PdfToImage,
    PdfToWord,
}

impl RemoteTool {
    pub const ALL: [RemoteTool; 6] = [
        RemoteTool::Unlock,
        RemoteTool::Protect,
        RemoteTool::Compress,
        RemoteTool::Ocr,
        RemoteTool::PdfToImage,
        RemoteTool::PdfToWord,
    ];

    /// Path on the processing server
    pub fn route(&self) -> &'static str {
        match self {
            RemoteTool::Unlock => "/unlock",
            RemoteTool::Protect => "/protect",
            RemoteTool::Compress => "/compress",
            RemoteTool::Ocr => "/ocr",
            RemoteTool::PdfToImage => "/pdf-to-img",
            RemoteTool::PdfToWord => "/pdf-to-word",
        }
    }

    pub fn requires_password(&self) -> bool {
        matches!(self, RemoteTool::Unlock | RemoteTool::Protect)
    }

    /// Multipart fields sent besides `file`
    pub fn form_fields(&self) -> &'static [&'static str] {
        match self {
            RemoteTool::Unlock | RemoteTool::Protect => &["password"],
            RemoteTool::PdfToImage => &["format"],
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Value of the `format` form field
    pub fn form_value(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = PdfStudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            other => Err(PdfStudioError::InvalidInput(format!(
                "Unsupported image format: {}",
                other
            ))),
        }
    }
}

/// A validated call to the processing server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRequest {
    pub tool: RemoteTool,
    pub file: Vec<u8>,
    pub password: Option<String>,
    pub format: ImageFormat,
}

impl RemoteRequest {
    pub fn new(
        tool: RemoteTool,
        file: Vec<u8>,
        password: Option<String>,
        format: Option<ImageFormat>,
    ) -> Result<Self, PdfStudioError> {
        if file.is_empty() {
            return Err(PdfStudioError::InvalidInput("No file selected".into()));
        }

        let password = password.filter(|p| !p.trim().is_empty());
        if tool.requires_password() && password.is_none() {
            return Err(PdfStudioError::InvalidInput("Please enter a password".into()));
        }

        Ok(Self {
            tool,
            file,
            password,
            format: format.unwrap_or_default(),
        })
    }

    /// Text fields of the multipart body, in send order
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        self.tool
            .form_fields()
            .iter()
            .filter_map(|&field| match field {
                "password" => self.password.clone().map(|p| (field, p)),
                "format" => Some((field, self.format.form_value().to_string())),
                _ => None,
            })
            .collect()
    }
}

/// Byte counts reported by the compress endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompressionStats {
    pub original_size: u64,
    pub compressed_size: u64,
}

impl CompressionStats {
    /// Negative when the "compressed" file grew
    pub fn saved_bytes(&self) -> i64 {
        self.original_size as i64 - self.compressed_size as i64
    }

    pub fn percent_saved(&self) -> f64 {
        self.saved_bytes() as f64 / self.original_size as f64 * 100.0
    }
}

/// What came back over the wire
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RemoteResponse {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutput {
    Pdf {
        file_name: &'static str,
        bytes: Vec<u8>,
    },
    Compressed {
        bytes: Vec<u8>,
        stats: Option<CompressionStats>,
    },
    Text {
        text: String,
    },
    SingleImage {
        format: ImageFormat,
        bytes: Vec<u8>,
    },
    Archive {
        bytes: Vec<u8>,
    },
    Document {
        bytes: Vec<u8>,
    },
}

impl RemoteOutput {
    pub fn download_name(&self) -> String {
        match self {
            RemoteOutput::Pdf { file_name, .. } => file_name.to_string(),
            RemoteOutput::Compressed { .. } => "Compressed_Document.pdf".to_string(),
            RemoteOutput::Text { .. } => "Extracted_Text.txt".to_string(),
            RemoteOutput::SingleImage { format, .. } => {
                format!("Converted_Image.{}", format.extension())
            }
            RemoteOutput::Archive { .. } => "Converted_Images.zip".to_string(),
            RemoteOutput::Document { .. } => "Converted_Document.docx".to_string(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            RemoteOutput::Pdf { bytes, .. }
            | RemoteOutput::Compressed { bytes, .. }
            | RemoteOutput::SingleImage { bytes, .. }
            | RemoteOutput::Archive { bytes }
            | RemoteOutput::Document { bytes } => bytes,
            RemoteOutput::Text { text } => text.as_bytes(),
        }
    }
}

/// Turn a server response into a typed result.
///
/// Non-2xx answers carry the server's message in the body. Conversion
/// results are identified by their magic bytes rather than the content type.
pub fn classify_response(
    tool: RemoteTool,
    response: RemoteResponse,
) -> Result<RemoteOutput, PdfStudioError> {
    if !(200..300).contains(&response.status) {
        let message = String::from_utf8_lossy(&response.body).trim().to_string();
        return Err(PdfStudioError::RemoteService(if message.is_empty() {
            format!("HTTP {}", response.status)
        } else {
            message
        }));
    }

    let stats = compression_stats(&response);
    let body = response.body;
    match tool {
        RemoteTool::Unlock => Ok(RemoteOutput::Pdf {
            file_name: "Unlocked_Document.pdf",
            bytes: body,
        }),
        RemoteTool::Protect => Ok(RemoteOutput::Pdf {
            file_name: "Protected_Document.pdf",
            bytes: body,
        }),
        RemoteTool::Compress => Ok(RemoteOutput::Compressed { bytes: body, stats }),
        RemoteTool::Ocr => Ok(RemoteOutput::Text {
            text: String::from_utf8_lossy(&body).into_owned(),
        }),
        RemoteTool::PdfToWord => Ok(RemoteOutput::Document { bytes: body }),
        RemoteTool::PdfToImage => match ImageKind::sniff(&body) {
            Some(ImageKind::Jpeg) => Ok(RemoteOutput::SingleImage {
                format: ImageFormat::Jpeg,
                bytes: body,
            }),
            Some(ImageKind::Png) => Ok(RemoteOutput::SingleImage {
                format: ImageFormat::Png,
                bytes: body,
            }),
            None if body.starts_with(ZIP_MAGIC) => Ok(RemoteOutput::Archive { bytes: body }),
            None => Err(PdfStudioError::RemoteService(
                "Server returned neither an image nor an archive".into(),
            )),
        },
    }
}

/// Present only when both size headers are positive integers
fn compression_stats(response: &RemoteResponse) -> Option<CompressionStats> {
    let parse = |name: &str| {
        response
            .header(name)
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|&size| size > 0)
    };
    Some(CompressionStats {
        original_size: parse(ORIGINAL_SIZE_HEADER)?,
        compressed_size: parse(COMPRESSED_SIZE_HEADER)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ok(body: &[u8]) -> RemoteResponse {
        RemoteResponse {
            status: 200,
            headers: vec![],
            body: body.to_vec(),
        }
    }

    #[test]
    fn test_routes() {
        let routes: Vec<&str> = RemoteTool::ALL.iter().map(|t| t.route()).collect();
        assert_eq!(
            routes,
            vec!["/unlock", "/protect", "/compress", "/ocr", "/pdf-to-img", "/pdf-to-word"]
        );
    }

    #[test]
    fn test_password_required_for_unlock_and_protect() {
        for tool in [RemoteTool::Unlock, RemoteTool::Protect] {
            assert!(matches!(
                RemoteRequest::new(tool, b"%PDF".to_vec(), None, None),
                Err(PdfStudioError::InvalidInput(_))
            ));
            assert!(matches!(
                RemoteRequest::new(tool, b"%PDF".to_vec(), Some("   ".into()), None),
                Err(PdfStudioError::InvalidInput(_))
            ));
        }
        assert!(RemoteRequest::new(RemoteTool::Compress, b"%PDF".to_vec(), None, None).is_ok());
    }

    #[test]
    fn test_empty_file_rejected() {
        assert!(matches!(
            RemoteRequest::new(RemoteTool::Ocr, vec![], None, None),
            Err(PdfStudioError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_text_fields() {
        let unlock =
            RemoteRequest::new(RemoteTool::Unlock, b"%PDF".to_vec(), Some("s3cret".into()), None)
                .unwrap();
        assert_eq!(unlock.text_fields(), vec![("password", "s3cret".to_string())]);

        let to_image =
            RemoteRequest::new(RemoteTool::PdfToImage, b"%PDF".to_vec(), None, Some(ImageFormat::Png))
                .unwrap();
        assert_eq!(to_image.text_fields(), vec![("format", "png".to_string())]);

        let ocr = RemoteRequest::new(RemoteTool::Ocr, b"%PDF".to_vec(), None, None).unwrap();
        assert!(ocr.text_fields().is_empty());
        assert_eq!(ocr.format, ImageFormat::Jpeg);
    }

    #[test]
    fn test_error_body_is_surfaced() {
        let response = RemoteResponse {
            status: 400,
            headers: vec![],
            body: b"Incorrect Password!".to_vec(),
        };
        let err = classify_response(RemoteTool::Unlock, response).unwrap_err();
        assert_eq!(err, PdfStudioError::RemoteService("Incorrect Password!".into()));
    }

    #[test]
    fn test_empty_error_body_uses_status() {
        let response = RemoteResponse {
            status: 502,
            ..Default::default()
        };
        let err = classify_response(RemoteTool::Ocr, response).unwrap_err();
        assert_eq!(err, PdfStudioError::RemoteService("HTTP 502".into()));
    }

    #[test]
    fn test_pdf_to_image_sniffs_magic() {
        let jpeg = classify_response(RemoteTool::PdfToImage, ok(&[0xFF, 0xD8, 0xFF, 0xE0])).unwrap();
        assert_eq!(jpeg.download_name(), "Converted_Image.jpg");

        let png = classify_response(RemoteTool::PdfToImage, ok(b"\x89PNG\r\n\x1a\n....")).unwrap();
        assert_eq!(png.download_name(), "Converted_Image.png");

        let zip = classify_response(RemoteTool::PdfToImage, ok(b"PK\x03\x04rest")).unwrap();
        assert!(matches!(zip, RemoteOutput::Archive { .. }));
        assert_eq!(zip.download_name(), "Converted_Images.zip");

        assert!(matches!(
            classify_response(RemoteTool::PdfToImage, ok(b"<html>")),
            Err(PdfStudioError::RemoteService(_))
        ));
    }

    #[test]
    fn test_compress_stats() {
        let response = RemoteResponse {
            status: 200,
            headers: vec![
                ("x-original-size".into(), "1000".into()),
                ("X-Compressed-Size".into(), "250".into()),
            ],
            body: b"%PDF-1.7".to_vec(),
        };
        let output = classify_response(RemoteTool::Compress, response).unwrap();
        let RemoteOutput::Compressed { stats: Some(stats), .. } = &output else {
            panic!("expected compression stats, got {:?}", output);
        };
        assert_eq!(stats.saved_bytes(), 750);
        assert_eq!(stats.percent_saved(), 75.0);
        assert_eq!(output.download_name(), "Compressed_Document.pdf");
    }

    #[test]
    fn test_compress_stats_need_both_positive_headers() {
        let response = RemoteResponse {
            status: 200,
            headers: vec![
                ("X-Original-Size".into(), "0".into()),
                ("X-Compressed-Size".into(), "250".into()),
            ],
            body: b"%PDF-1.7".to_vec(),
        };
        let output = classify_response(RemoteTool::Compress, response).unwrap();
        assert_eq!(
            output,
            RemoteOutput::Compressed {
                bytes: b"%PDF-1.7".to_vec(),
                stats: None
            }
        );
    }

    #[test]
    fn test_other_tools() {
        let text = classify_response(RemoteTool::Ocr, ok(b"Hello world")).unwrap();
        assert_eq!(text.download_name(), "Extracted_Text.txt");
        assert_eq!(text.bytes(), b"Hello world");

        let word = classify_response(RemoteTool::PdfToWord, ok(b"PK\x03\x04docx")).unwrap();
        assert_eq!(word.download_name(), "Converted_Document.docx");

        let unlocked = classify_response(RemoteTool::Unlock, ok(b"%PDF")).unwrap();
        assert_eq!(unlocked.download_name(), "Unlocked_Document.pdf");
        let protected = classify_response(RemoteTool::Protect, ok(b"%PDF")).unwrap();
        assert_eq!(protected.download_name(), "Protected_Document.pdf");
    }

    #[test]
    fn test_image_format_parsing() {
        assert_eq!("PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert!("gif".parse::<ImageFormat>().is_err());
    }
}
