//! Bitmap resources
//!
//! Rendered pixels are modeled as a disposable native resource: a container
//! dropping its reference without calling [`Bitmap::release`] leaks by this
//! crate's accounting. The cache and the in-flight slot release at every
//! removal site (eviction, invalidation, teardown).

use std::sync::{Arc, Mutex, PoisonError};

/// An owned RGBA pixel buffer with an explicit release lifecycle.
///
/// Shared between the cache and callers through `Arc`; pixel access is
/// scoped so nothing holds onto the buffer across a suspension point.
#[derive(Debug)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Mutex<Option<Vec<u8>>>,
}

impl Bitmap {
    /// Wrap raw RGBA pixel data (4 bytes per pixel).
    #[must_use]
    pub fn from_rgba(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            pixels: Mutex::new(Some(pixels)),
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Free the pixel buffer. Idempotent.
    pub fn release(&self) {
        self.pixels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.pixels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Scoped access to the pixel data; `None` after release.
    ///
    /// Draw calls must happen inside the closure, synchronously with
    /// receipt, and must not stash the slice.
    pub fn with_pixels<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        let guard = self.pixels.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_deref().map(f)
    }

    /// Size of the live pixel buffer in bytes; 0 after release.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.pixels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, Vec::len)
    }
}

/// A completed render handed to callers; the cache keeps its own reference
/// to the same bitmap for reuse.
#[derive(Clone, Debug)]
pub struct RenderOutput {
    pub bitmap: Arc<Bitmap>,
    pub width: u32,
    pub height: u32,
}

impl RenderOutput {
    #[must_use]
    pub fn new(bitmap: Bitmap) -> Self {
        let (width, height) = (bitmap.width(), bitmap.height());
        Self {
            bitmap: Arc::new(bitmap),
            width,
            height,
        }
    }
}
