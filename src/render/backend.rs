//! Rendering backend contract
//!
//! The engine behind this trait is opaque: given a page index and target
//! pixel dimensions it returns raw RGBA of exactly that size, and it can
//! report per-page geometry. It processes one job at a time by contract;
//! the worker enforces that structurally by owning the only handle.

use crate::geometry::PageInfo;

use super::request::DocId;

/// Raw pixel data returned by the backend (4 bytes per pixel, RGBA).
#[derive(Clone, Debug)]
pub struct RawPixels {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RawPixels {
    /// Whether the buffer length matches the claimed dimensions.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.rgba.len() == self.width as usize * self.height as usize * 4
    }
}

/// Failure reported by the rendering engine
#[derive(Debug, thiserror::Error)]
#[error("{detail}")]
pub struct BackendError {
    detail: String,
}

impl BackendError {
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// The serialized rendering engine.
///
/// Methods take `&mut self`: the worker owns the backend exclusively and
/// never runs two jobs at once.
pub trait RenderBackend: Send {
    /// Number of pages in the document.
    fn page_count(&mut self, doc: &DocId) -> Result<u32, BackendError>;

    /// Geometry for a 0-based page index, in document points.
    fn page_info(&mut self, doc: &DocId, page_index: u32) -> Result<PageInfo, BackendError>;

    /// Rasterize a 0-based page index to exactly `width_px` x `height_px`.
    fn render_page(
        &mut self,
        doc: &DocId,
        page_index: u32,
        width_px: u32,
        height_px: u32,
    ) -> Result<RawPixels, BackendError>;
}
