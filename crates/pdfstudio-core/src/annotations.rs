//! Per-page free-text annotations for the edit tool
//!
//! The overlay only ever shows the page in view. Its text boxes are saved
//! into the store when the user leaves the page and handed back when they
//! return; nothing touches the document until the edit commit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A text box placed on the overlay surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// 1-based page the text belongs to
    pub page_number: usize,
    pub text: String,
    /// Overlay pixels from the left edge of the rendered page
    pub overlay_left: f64,
    /// Overlay pixels from the top edge of the rendered page
    pub overlay_top: f64,
}

impl Annotation {
    pub fn new(page_number: usize, text: impl Into<String>, overlay_left: f64, overlay_top: f64) -> Self {
        Self {
            page_number,
            text: text.into(),
            overlay_left: overlay_left.max(0.0),
            overlay_top: overlay_top.max(0.0),
        }
    }

    /// Blank text boxes are dropped instead of stored
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    fn has_finite_position(&self) -> bool {
        self.overlay_left.is_finite() && self.overlay_top.is_finite()
    }
}

/// Saved annotations keyed by 1-based page number
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationStore {
    pages: BTreeMap<usize, Vec<Annotation>>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace what is stored for `page_number` with the live overlay contents.
    ///
    /// Blank annotations are discarded and every kept annotation is re-keyed
    /// to `page_number`. Positions are clamped to the overlay origin, since
    /// deserialized annotations never went through [`Annotation::new`].
    /// Saving nothing removes the page's entry.
    pub fn save_page(&mut self, page_number: usize, live: &[Annotation]) {
        let kept: Vec<Annotation> = live
            .iter()
            .filter(|a| !a.is_blank() && a.has_finite_position())
            .map(|a| Annotation::new(page_number, a.text.clone(), a.overlay_left, a.overlay_top))
            .collect();

        if kept.is_empty() {
            self.pages.remove(&page_number);
        } else {
            self.pages.insert(page_number, kept);
        }
    }

    /// Annotations to put back on the overlay when `page_number` is shown again
    pub fn restore_page(&self, page_number: usize) -> Vec<Annotation> {
        self.pages.get(&page_number).cloned().unwrap_or_default()
    }

    /// Every annotated page in ascending page order
    pub fn entries(&self) -> impl Iterator<Item = (usize, &[Annotation])> {
        self.pages
            .iter()
            .map(|(&page, annotations)| (page, annotations.as_slice()))
    }

    pub fn annotated_pages(&self) -> Vec<usize> {
        self.pages.keys().copied().collect()
    }

    pub fn annotation_count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }
}
