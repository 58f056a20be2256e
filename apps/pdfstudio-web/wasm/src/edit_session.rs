//! Edit session for the organize and edit panels
//!
//! Wraps the core `EditSession` for JavaScript. Annotations cross the
//! boundary as JSON arrays of
//! `{"page_number", "text", "overlay_left", "overlay_top"}` objects.

use pdfstudio_core::{
    Annotation, CommitOutput, Direction, DropPlacement, EditSession, PdfStudioError,
};
use wasm_bindgen::prelude::*;

/// Session backing one open organize or edit panel
#[wasm_bindgen(js_name = EditSession)]
pub struct WasmEditSession {
    inner: EditSession,
    last_output_name: Option<String>,
}

impl Default for WasmEditSession {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen(js_class = EditSession)]
impl WasmEditSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmEditSession {
        WasmEditSession {
            inner: EditSession::default(),
            last_output_name: None,
        }
    }

    /// Load a document and return its page count
    pub fn load(&mut self, bytes: &[u8]) -> Result<u32, JsValue> {
        self.load_internal(bytes.to_vec())
            .map(|count| count as u32)
            .map_err(to_js)
    }

    #[wasm_bindgen(getter, js_name = isLoaded)]
    pub fn is_loaded(&self) -> bool {
        self.inner.is_loaded()
    }

    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> Option<u32> {
        self.inner.page_count().map(|n| n as u32)
    }

    /// 1-based page in view
    #[wasm_bindgen(getter, js_name = currentPage)]
    pub fn current_page(&self) -> Option<u32> {
        self.inner.current_page().map(|n| n as u32)
    }

    /// Canvas pixels per PDF point the overlay is positioned against
    #[wasm_bindgen(getter, js_name = renderScale)]
    pub fn render_scale(&self) -> f64 {
        self.inner.mapping().render_scale
    }

    /// Download name of the last committed document
    #[wasm_bindgen(getter, js_name = lastOutputName)]
    pub fn last_output_name(&self) -> Option<String> {
        self.last_output_name.clone()
    }

    /// Copy of the loaded bytes for PDF.js, which takes ownership of its buffer
    #[wasm_bindgen(js_name = documentBytes)]
    pub fn document_bytes(&self) -> Option<js_sys::Uint8Array> {
        self.inner.document_bytes().map(|bytes| {
            let array = js_sys::Uint8Array::new_with_length(bytes.len() as u32);
            array.copy_from(bytes);
            array
        })
    }

    /// Save `live_json` for the current page and move forward.
    /// Returns the next page's annotations as JSON, or undefined on the last page.
    #[wasm_bindgen(js_name = nextPage)]
    pub fn next_page(&mut self, live_json: &str) -> Result<Option<String>, JsValue> {
        self.navigate_internal(Direction::Next, live_json)
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = previousPage)]
    pub fn previous_page(&mut self, live_json: &str) -> Result<Option<String>, JsValue> {
        self.navigate_internal(Direction::Previous, live_json)
            .map_err(to_js)
    }

    /// Drop thumbnail `dragged` onto `target` (zero-based original indices).
    /// Returns "before", "after", or undefined when dropped onto itself.
    #[wasm_bindgen(js_name = dropPage)]
    pub fn drop_page(&mut self, dragged: u32, target: u32) -> Result<Option<String>, JsValue> {
        self.drop_page_internal(dragged as usize, target as usize)
            .map(|placement| {
                placement.map(|p| match p {
                    DropPlacement::Before => "before".to_string(),
                    DropPlacement::After => "after".to_string(),
                })
            })
            .map_err(to_js)
    }

    /// Keyboard reorder: place `moved` directly before `target`
    #[wasm_bindgen(js_name = movePageBefore)]
    pub fn move_page_before(&mut self, moved: u32, target: u32) -> Result<(), JsValue> {
        self.inner
            .move_page_before(moved as usize, target as usize)
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = movePageAfter)]
    pub fn move_page_after(&mut self, moved: u32, target: u32) -> Result<(), JsValue> {
        self.inner
            .move_page_after(moved as usize, target as usize)
            .map_err(to_js)
    }

    /// Current order as original page indices
    #[wasm_bindgen(js_name = pageOrder)]
    pub fn page_order(&self) -> Vec<u32> {
        self.inner
            .page_order()
            .map(|order| order.final_order().iter().map(|&i| i as u32).collect())
            .unwrap_or_default()
    }

    #[wasm_bindgen(js_name = commitReorder)]
    pub fn commit_reorder(&mut self) -> Result<Vec<u8>, JsValue> {
        self.commit_reorder_internal()
            .map(|output| output.bytes)
            .map_err(to_js)
    }

    /// Burn in every annotation; `live_json` is the overlay of the page in view
    #[wasm_bindgen(js_name = commitEdits)]
    pub fn commit_edits(&mut self, live_json: &str) -> Result<Vec<u8>, JsValue> {
        self.commit_edits_internal(live_json)
            .map(|output| output.bytes)
            .map_err(to_js)
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

impl WasmEditSession {
    pub fn load_internal(&mut self, bytes: Vec<u8>) -> Result<usize, PdfStudioError> {
        self.last_output_name = None;
        self.inner.load(bytes)
    }

    pub fn navigate_internal(
        &mut self,
        direction: Direction,
        live_json: &str,
    ) -> Result<Option<String>, PdfStudioError> {
        let live = parse_annotations(live_json)?;
        self.inner
            .navigate(direction, &live)
            .map(|restored| serialize_annotations(&restored))
            .transpose()
    }

    pub fn drop_page_internal(
        &mut self,
        dragged: usize,
        target: usize,
    ) -> Result<Option<DropPlacement>, PdfStudioError> {
        self.inner.drop_page(dragged, target)
    }

    pub fn commit_reorder_internal(&mut self) -> Result<CommitOutput, PdfStudioError> {
        let output = self.inner.commit_reorder()?;
        self.last_output_name = Some(output.file_name.clone());
        Ok(output)
    }

    pub fn commit_edits_internal(&mut self, live_json: &str) -> Result<CommitOutput, PdfStudioError> {
        let live = parse_annotations(live_json)?;
        let output = self.inner.commit_edits(&live)?;
        self.last_output_name = Some(output.file_name.clone());
        Ok(output)
    }
}

/// An empty string stands for an empty overlay
fn parse_annotations(json: &str) -> Result<Vec<Annotation>, PdfStudioError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json)
        .map_err(|e| PdfStudioError::InvalidInput(format!("Invalid annotations JSON: {}", e)))
}

fn serialize_annotations(annotations: &[Annotation]) -> Result<String, PdfStudioError> {
    serde_json::to_string(annotations)
        .map_err(|e| PdfStudioError::InvalidInput(format!("Serialization error: {}", e)))
}

pub(crate) fn to_js(e: PdfStudioError) -> JsValue {
    JsValue::from_str(&e.to_string())
}
