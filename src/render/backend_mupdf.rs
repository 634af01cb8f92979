//! MuPDF-backed rendering backend (feature `mupdf-backend`)
//!
//! Adapter that treats document ids as filesystem paths and rasterizes
//! through MuPDF. Documents open lazily on the worker thread and stay open
//! for the lifetime of the backend.

use std::collections::HashMap;

use mupdf::{Colorspace, Document, Matrix};

use crate::geometry::PageInfo;

use super::backend::{BackendError, RawPixels, RenderBackend};
use super::request::DocId;

impl From<mupdf::error::Error> for BackendError {
    fn from(e: mupdf::error::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// MuPDF adapter for the render worker.
#[derive(Default)]
pub struct MupdfBackend {
    documents: HashMap<DocId, Document>,
}

impl MupdfBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn document(&mut self, doc: &DocId) -> Result<&Document, BackendError> {
        if !self.documents.contains_key(doc) {
            let opened = Document::open(doc.as_str())?;
            self.documents.insert(doc.clone(), opened);
        }
        Ok(&self.documents[doc])
    }

    /// Drop the open handle for a document (after unload).
    pub fn close_document(&mut self, doc: &DocId) {
        self.documents.remove(doc);
    }
}

impl RenderBackend for MupdfBackend {
    fn page_count(&mut self, doc: &DocId) -> Result<u32, BackendError> {
        let count = self.document(doc)?.page_count()?;
        Ok(count.max(0) as u32)
    }

    fn page_info(&mut self, doc: &DocId, page_index: u32) -> Result<PageInfo, BackendError> {
        let page = self.document(doc)?.load_page(page_index as i32)?;
        let bounds = page.bounds()?;
        // MuPDF bounds already account for the page's /Rotate entry.
        Ok(PageInfo::new(
            bounds.x1 - bounds.x0,
            bounds.y1 - bounds.y0,
            0,
        ))
    }

    fn render_page(
        &mut self,
        doc: &DocId,
        page_index: u32,
        width_px: u32,
        height_px: u32,
    ) -> Result<RawPixels, BackendError> {
        let page = self.document(doc)?.load_page(page_index as i32)?;
        let bounds = page.bounds()?;
        let page_w = (bounds.x1 - bounds.x0).max(1.0);
        let page_h = (bounds.y1 - bounds.y0).max(1.0);

        let matrix = Matrix::new_scale(width_px as f32 / page_w, height_px as f32 / page_h);
        let pixmap = page.to_pixmap(&matrix, &Colorspace::device_rgb(), false, false)?;

        let width = pixmap.width();
        let height = pixmap.height();
        let n = pixmap.n() as usize;
        let stride = pixmap.stride() as usize;
        let samples = pixmap.samples();
        if n < 3 || samples.len() < stride.saturating_mul(height as usize) {
            return Err(BackendError::new(format!(
                "unsupported pixmap layout: {n} channels"
            )));
        }

        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height as usize {
            let row = &samples[y * stride..y * stride + width as usize * n];
            for px in row.chunks_exact(n) {
                rgba.extend_from_slice(&px[..3]);
                rgba.push(if n >= 4 { px[3] } else { 0xFF });
            }
        }

        Ok(RawPixels {
            rgba,
            width,
            height,
        })
    }
}
