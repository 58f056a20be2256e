//! PDF Studio core
//!
//! Page-level document editing with lopdf: page selection and reordering,
//! overlay text annotations burned into pages, and the single-shot tools
//! (merge, extract, delete, rotate, watermark, numbering, metadata, blank
//! pages, image conversion).
//!
//! [`EditSession`] holds one loaded document for the interactive editors.
//! [`tools`] covers everything that takes a file and returns a file in one
//! step. Work that runs on the processing server is described by [`remote`].

pub mod annotations;
pub mod command;
pub mod config;
pub mod coords;
pub mod engine;
pub mod error;
pub mod image;
pub mod page_order;
pub mod range;
pub mod remote;
pub mod session;
pub mod tools;
pub mod validation;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use annotations::{Annotation, AnnotationStore};
pub use command::{ToolCommand, ToolMetrics, ToolResult};
pub use config::StudioConfig;
pub use coords::OverlayMapping;
pub use engine::{PageSize, PdfDocument, StandardFont, TextPlacement};
pub use error::PdfStudioError;
pub use page_order::{DropPlacement, PageOrderModel};
pub use range::{parse_page_selector, parse_single_page, RangeSelector};
pub use remote::{RemoteOutput, RemoteRequest, RemoteResponse, RemoteTool};
pub use session::{CommitOutput, Direction, EditSession, PageRenderer};
pub use tools::ToolOutput;
pub use validation::{check_upload_size, validate_image, validate_pdf, PdfInfo};
