//! WASM bindings for PDF Studio
//!
//! Document state lives in Rust; JavaScript renders pages with PDF.js,
//! positions the overlay text boxes and handles file I/O.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { EditSession, extractPages } from './pkg/pdfstudio_wasm.js';
//!
//! await init();
//!
//! const session = new EditSession();
//! session.load(bytes);
//! const restored = session.nextPage(JSON.stringify(overlayAnnotations));
//! const edited = session.commitEdits(JSON.stringify(overlayAnnotations));
//! download(edited, session.lastOutputName);
//!
//! const pages = extractPages(bytes, "2-5");
//! ```

pub mod edit_session;

use edit_session::to_js;
use pdfstudio_core::config::{UploadConfig, WatermarkConfig};
use pdfstudio_core::{tools, ToolCommand, ToolResult};
use wasm_bindgen::prelude::*;

pub use edit_session::WasmEditSession;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Page count, version, encryption and metadata of an upload
#[wasm_bindgen(js_name = getPdfInfo)]
pub fn get_pdf_info(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let info = pdfstudio_core::validate_pdf(bytes, UploadConfig::default().max_size_mb)
        .map_err(to_js)?;

    serde_wasm_bindgen::to_value(&info)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Zero-based indices selected by "3" or "2-5"
#[wasm_bindgen(js_name = parsePageSelector)]
pub fn parse_page_selector(input: &str, page_count: u32) -> Result<Vec<u32>, JsValue> {
    pdfstudio_core::parse_page_selector(input, page_count as usize)
        .map(|indices| indices.into_iter().map(|i| i as u32).collect())
        .map_err(to_js)
}

/// Merge an array of Uint8Arrays in order
#[wasm_bindgen(js_name = mergePdfs)]
pub fn merge_pdfs(files: js_sys::Array) -> Result<Vec<u8>, JsValue> {
    let inputs: Vec<Vec<u8>> = files
        .iter()
        .map(|file| js_sys::Uint8Array::new(&file).to_vec())
        .collect();
    tools::merge(&inputs).map(|o| o.bytes).map_err(to_js)
}

#[wasm_bindgen(js_name = extractPages)]
pub fn extract_pages(bytes: &[u8], range: &str) -> Result<Vec<u8>, JsValue> {
    tools::extract(bytes, range).map(|o| o.bytes).map_err(to_js)
}

#[wasm_bindgen(js_name = deletePage)]
pub fn delete_page(bytes: &[u8], page: &str) -> Result<Vec<u8>, JsValue> {
    tools::delete_page(bytes, page).map(|o| o.bytes).map_err(to_js)
}

#[wasm_bindgen(js_name = rotatePages)]
pub fn rotate_pages(bytes: &[u8], degrees: i32) -> Result<Vec<u8>, JsValue> {
    tools::rotate(bytes, degrees as i64).map(|o| o.bytes).map_err(to_js)
}

#[wasm_bindgen(js_name = addWatermark)]
pub fn add_watermark(bytes: &[u8], text: &str) -> Result<Vec<u8>, JsValue> {
    tools::watermark(bytes, text, &WatermarkConfig::default())
        .map(|o| o.bytes)
        .map_err(to_js)
}

#[wasm_bindgen(js_name = addPageNumbers)]
pub fn add_page_numbers(bytes: &[u8]) -> Result<Vec<u8>, JsValue> {
    tools::page_numbers(bytes).map(|o| o.bytes).map_err(to_js)
}

#[wasm_bindgen(js_name = setMetadata)]
pub fn set_metadata(
    bytes: &[u8],
    title: Option<String>,
    author: Option<String>,
) -> Result<Vec<u8>, JsValue> {
    tools::set_metadata(bytes, title.as_deref(), author.as_deref())
        .map(|o| o.bytes)
        .map_err(to_js)
}

#[wasm_bindgen(js_name = insertBlankPage)]
pub fn insert_blank_page(bytes: &[u8], after: u32) -> Result<Vec<u8>, JsValue> {
    tools::insert_blank_page(bytes, after as usize)
        .map(|o| o.bytes)
        .map_err(to_js)
}

#[wasm_bindgen(js_name = imageToPdf)]
pub fn image_to_pdf(bytes: &[u8]) -> Result<Vec<u8>, JsValue> {
    tools::image_to_pdf(bytes).map(|o| o.bytes).map_err(to_js)
}

/// Run a JSON `ToolCommand` and return a JSON `ToolResult`
#[wasm_bindgen(js_name = runTool)]
pub fn run_tool(command_json: &str) -> String {
    run_tool_internal(command_json)
}

pub fn run_tool_internal(command_json: &str) -> String {
    let result = match serde_json::from_str::<ToolCommand>(command_json) {
        Ok(command) => ToolResult::from_command(&command),
        Err(e) => ToolResult {
            success: false,
            file_name: None,
            data: None,
            error: Some(format!("Invalid command: {}", e)),
            metrics: None,
        },
    };
    serde_json::to_string(&result).unwrap_or_else(|e| {
        format!(r#"{{"success":false,"error":"Serialization error: {}"}}"#, e)
    })
}

/// Format bytes as human-readable string
#[wasm_bindgen]
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}
