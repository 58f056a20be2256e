//! Stateful multi-page editing session
//!
//! One session backs one open organize or edit panel. It owns the raw bytes
//! of the loaded document, the page order the user is building and the
//! annotations typed on each page, and turns them into a new PDF on commit.
//!
//! A session is either unloaded or loaded. `load` enters the loaded state;
//! a successful commit or `reset` leaves it.

use crate::annotations::{Annotation, AnnotationStore};
use crate::config::EditorConfig;
use crate::coords::OverlayMapping;
use crate::engine::{PdfDocument, TextPlacement};
use crate::error::PdfStudioError;
use crate::page_order::{DropPlacement, PageOrderModel};
use tracing::{debug, info};

pub const ORGANIZED_FILE_NAME: &str = "Organized_Document.pdf";
pub const EDITED_FILE_NAME: &str = "Edited_Document.pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Rasterizes a page for display behind the overlay
pub trait PageRenderer {
    type Output;

    /// `document` is an independent copy; the renderer may consume it
    fn render(
        &mut self,
        document: Vec<u8>,
        page_index: usize,
        scale: f64,
    ) -> Result<Self::Output, PdfStudioError>;
}

/// A finished document ready for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutput {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
struct LoadedDocument {
    raw: Vec<u8>,
    page_count: usize,
    /// 1-based
    current_page: usize,
    order: PageOrderModel,
    annotations: AnnotationStore,
}

#[derive(Debug)]
pub struct EditSession {
    loaded: Option<LoadedDocument>,
    mapping: OverlayMapping,
    font_size: f64,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl EditSession {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            loaded: None,
            mapping: config.overlay_mapping(),
            font_size: config.font_size,
        }
    }

    /// Parse `bytes` and start a fresh session on page 1.
    ///
    /// Any previous session is discarded, even when loading fails.
    pub fn load(&mut self, bytes: Vec<u8>) -> Result<usize, PdfStudioError> {
        self.loaded = None;

        let page_count = PdfDocument::load(&bytes)?.page_count();
        if page_count == 0 {
            return Err(PdfStudioError::DocumentLoad("Document has no pages".into()));
        }

        info!(pages = page_count, bytes = bytes.len(), "Document loaded into edit session");
        self.loaded = Some(LoadedDocument {
            raw: bytes,
            page_count,
            current_page: 1,
            order: PageOrderModel::new(page_count),
            annotations: AnnotationStore::new(),
        });
        Ok(page_count)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn page_count(&self) -> Option<usize> {
        self.loaded.as_ref().map(|l| l.page_count)
    }

    /// 1-based page currently shown
    pub fn current_page(&self) -> Option<usize> {
        self.loaded.as_ref().map(|l| l.current_page)
    }

    /// The unmodified bytes the session was loaded from
    pub fn document_bytes(&self) -> Option<&[u8]> {
        self.loaded.as_ref().map(|l| l.raw.as_slice())
    }

    pub fn page_order(&self) -> Option<&PageOrderModel> {
        self.loaded.as_ref().map(|l| &l.order)
    }

    pub fn annotations(&self) -> Option<&AnnotationStore> {
        self.loaded.as_ref().map(|l| &l.annotations)
    }

    pub fn mapping(&self) -> OverlayMapping {
        self.mapping
    }

    /// Drag-and-drop of one page thumbnail onto another
    pub fn drop_page(
        &mut self,
        dragged: usize,
        target: usize,
    ) -> Result<Option<DropPlacement>, PdfStudioError> {
        let placement = self.require_loaded_mut()?.order.drop_onto(dragged, target)?;
        debug!(dragged, target, ?placement, "Page dropped");
        Ok(placement)
    }

    pub fn move_page_before(&mut self, moved: usize, target: usize) -> Result<(), PdfStudioError> {
        self.require_loaded_mut()?.order.move_before(moved, target)
    }

    pub fn move_page_after(&mut self, moved: usize, target: usize) -> Result<(), PdfStudioError> {
        self.require_loaded_mut()?.order.move_after(moved, target)
    }

    /// Leave the current page for its neighbour.
    ///
    /// `live` is what the overlay holds for the page being left. Returns the
    /// annotations to show on the new page, or `None` when there is no page in
    /// that direction (nothing is saved in that case).
    pub fn navigate(&mut self, direction: Direction, live: &[Annotation]) -> Option<Vec<Annotation>> {
        let loaded = self.loaded.as_mut()?;
        let from = loaded.current_page;
        let to = match direction {
            Direction::Previous if from > 1 => from - 1,
            Direction::Next if from < loaded.page_count => from + 1,
            _ => return None,
        };

        loaded.annotations.save_page(from, live);
        loaded.current_page = to;
        let restored = loaded.annotations.restore_page(to);
        debug!(from, to, restored = restored.len(), "Navigated");
        Some(restored)
    }

    /// Write the pages out in the dragged order and end the session
    pub fn commit_reorder(&mut self) -> Result<CommitOutput, PdfStudioError> {
        let loaded = self.require_loaded()?;
        let mut doc = fresh_copy(&loaded.raw)?;
        doc.copy_pages(loaded.order.final_order())?;
        let bytes = doc.save()?;

        info!(
            pages = loaded.page_count,
            identity = loaded.order.is_identity(),
            bytes = bytes.len(),
            "Reorder committed"
        );
        self.loaded = None;
        Ok(CommitOutput {
            file_name: ORGANIZED_FILE_NAME.to_string(),
            bytes,
        })
    }

    /// Burn every stored annotation into its page and end the session.
    ///
    /// `live` is the overlay content of the page in view, which has not been
    /// saved by a navigation yet.
    pub fn commit_edits(&mut self, live: &[Annotation]) -> Result<CommitOutput, PdfStudioError> {
        let loaded = self.require_loaded_mut()?;
        let current = loaded.current_page;
        loaded.annotations.save_page(current, live);

        let loaded = self.require_loaded()?;
        let mut doc = fresh_copy(&loaded.raw)?;
        for (page_number, annotations) in loaded.annotations.entries() {
            let index = page_number - 1;
            let page_height = doc.page_size(index)?.height;
            for annotation in annotations {
                let (x, y) = self.mapping.to_document_space(
                    annotation.overlay_left,
                    annotation.overlay_top,
                    page_height,
                );
                let placement = TextPlacement::new(annotation.text.clone(), x, y, self.font_size);
                doc.draw_text(index, &placement)?;
            }
        }
        let bytes = doc.save()?;

        info!(
            annotations = loaded.annotations.annotation_count(),
            pages = loaded.annotations.annotated_pages().len(),
            "Edits committed"
        );
        self.loaded = None;
        Ok(CommitOutput {
            file_name: EDITED_FILE_NAME.to_string(),
            bytes,
        })
    }

    /// Discard the session without producing output
    pub fn reset(&mut self) {
        if self.loaded.take().is_some() {
            debug!("Edit session reset");
        }
    }

    /// Render the 1-based `page_number` at the configured scale
    pub fn render_page<R: PageRenderer>(
        &self,
        renderer: &mut R,
        page_number: usize,
    ) -> Result<R::Output, PdfStudioError> {
        let loaded = self.require_loaded()?;
        if page_number == 0 || page_number > loaded.page_count {
            return Err(PdfStudioError::InvalidPage(format!(
                "Page {} does not exist (document has {} pages)",
                page_number, loaded.page_count
            )));
        }
        renderer.render(loaded.raw.clone(), page_number - 1, self.mapping.render_scale)
    }

    fn require_loaded(&self) -> Result<&LoadedDocument, PdfStudioError> {
        self.loaded.as_ref().ok_or_else(not_loaded)
    }

    fn require_loaded_mut(&mut self) -> Result<&mut LoadedDocument, PdfStudioError> {
        self.loaded.as_mut().ok_or_else(not_loaded)
    }
}

fn not_loaded() -> PdfStudioError {
    PdfStudioError::InvalidInput("No document is loaded".into())
}

/// Each commit starts from the original bytes so a failed attempt leaves no trace
fn fresh_copy(raw: &[u8]) -> Result<PdfDocument, PdfStudioError> {
    PdfDocument::load(raw).map_err(|e| PdfStudioError::Commit(e.to_string()))
}
