//! Coordinate transformation between the overlay surface and PDF space
//!
//! The overlay is the rendered page canvas: top-left origin, y down, every
//! unit scaled by the render scale. PDF text is placed in page space:
//! bottom-left origin, y up, unscaled, anchored at the text baseline.

use serde::{Deserialize, Serialize};

/// Default canvas pixels per PDF point when rendering a page for editing
pub const DEFAULT_RENDER_SCALE: f64 = 1.5;

/// Overlay pixels between a text box's top edge and its baseline
pub const DEFAULT_BASELINE_OFFSET: f64 = 18.0;

/// Convert an overlay position to PDF coordinates on a page of `page_height` points
pub fn to_document_space(
    overlay_left: f64,
    overlay_top: f64,
    page_height: f64,
    render_scale: f64,
    baseline_offset: f64,
) -> (f64, f64) {
    let pdf_x = overlay_left / render_scale;
    let pdf_y = page_height - ((overlay_top + baseline_offset) / render_scale);
    (pdf_x, pdf_y)
}

/// Convert PDF coordinates back to the overlay position they came from
pub fn to_overlay_space(
    pdf_x: f64,
    pdf_y: f64,
    page_height: f64,
    render_scale: f64,
    baseline_offset: f64,
) -> (f64, f64) {
    let overlay_left = pdf_x * render_scale;
    let overlay_top = (page_height - pdf_y) * render_scale - baseline_offset;
    (overlay_left, overlay_top)
}

/// Fixed parameters of one editing surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayMapping {
    pub render_scale: f64,
    pub baseline_offset: f64,
}

impl Default for OverlayMapping {
    fn default() -> Self {
        Self {
            render_scale: DEFAULT_RENDER_SCALE,
            baseline_offset: DEFAULT_BASELINE_OFFSET,
        }
    }
}

impl OverlayMapping {
    pub fn new(render_scale: f64, baseline_offset: f64) -> Self {
        Self {
            render_scale,
            baseline_offset,
        }
    }

    pub fn to_document_space(&self, overlay_left: f64, overlay_top: f64, page_height: f64) -> (f64, f64) {
        to_document_space(
            overlay_left,
            overlay_top,
            page_height,
            self.render_scale,
            self.baseline_offset,
        )
    }

    pub fn to_overlay_space(&self, pdf_x: f64, pdf_y: f64, page_height: f64) -> (f64, f64) {
        to_overlay_space(
            pdf_x,
            pdf_y,
            page_height,
            self.render_scale,
            self.baseline_offset,
        )
    }

    /// Canvas size in overlay pixels for a page of the given point size
    pub fn surface_size(&self, page_width: f64, page_height: f64) -> (f64, f64) {
        (page_width * self.render_scale, page_height * self.render_scale)
    }
}
