//! Test helpers (feature `test-utils`)
//!
//! A scripted render backend plus logging setup for tests and harnesses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once, PoisonError};
use std::time::Duration;

use crate::geometry::PageInfo;
use crate::render::{BackendError, DocId, RawPixels, RenderBackend};

/// One backend render invocation, as observed by the mock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderCall {
    pub doc: String,
    /// 0-based page index as handed to the backend
    pub page_index: u32,
    pub width_px: u32,
    pub height_px: u32,
}

/// Shared observation handles for a [`MockBackend`].
#[derive(Clone, Default)]
pub struct BackendProbe {
    calls: Arc<Mutex<Vec<RenderCall>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl BackendProbe {
    /// Every render call so far, in execution order.
    #[must_use]
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Pages rendered so far (0-based), in execution order.
    #[must_use]
    pub fn rendered_pages(&self) -> Vec<u32> {
        self.calls().iter().map(|c| c.page_index).collect()
    }

    /// Highest number of renders that were ever executing at once. The
    /// scheduler must keep this at 1.
    #[must_use]
    pub fn max_concurrent_renders(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

/// Scripted rendering backend: fixed page geometry per document, optional
/// per-page failures, optional per-render delay, full call recording.
pub struct MockBackend {
    documents: HashMap<String, Vec<PageInfo>>,
    fail_pages: Vec<u32>,
    render_delay: Option<Duration>,
    probe: BackendProbe,
}

impl MockBackend {
    /// A document where every page shares the same geometry.
    #[must_use]
    pub fn uniform(doc: &str, page_count: u32, width: f32, height: f32) -> Self {
        let pages = vec![PageInfo::new(width, height, 0); page_count as usize];
        let mut documents = HashMap::new();
        documents.insert(doc.to_string(), pages);
        Self {
            documents,
            fail_pages: Vec::new(),
            render_delay: None,
            probe: BackendProbe::default(),
        }
    }

    /// Add another document to the script.
    #[must_use]
    pub fn with_document(mut self, doc: &str, pages: Vec<PageInfo>) -> Self {
        self.documents.insert(doc.to_string(), pages);
        self
    }

    /// Make renders of these 0-based page indices fail.
    #[must_use]
    pub fn failing_pages(mut self, pages: &[u32]) -> Self {
        self.fail_pages = pages.to_vec();
        self
    }

    /// Slow every render down (for exercising queue buildup).
    #[must_use]
    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = Some(delay);
        self
    }

    /// Observation handles, cloneable before the backend moves into the
    /// scheduler's worker thread.
    #[must_use]
    pub fn probe(&self) -> BackendProbe {
        self.probe.clone()
    }

    fn pages(&self, doc: &DocId) -> Result<&Vec<PageInfo>, BackendError> {
        self.documents
            .get(doc.as_str())
            .ok_or_else(|| BackendError::new(format!("unknown document: {doc}")))
    }
}

impl RenderBackend for MockBackend {
    fn page_count(&mut self, doc: &DocId) -> Result<u32, BackendError> {
        Ok(self.pages(doc)?.len() as u32)
    }

    fn page_info(&mut self, doc: &DocId, page_index: u32) -> Result<PageInfo, BackendError> {
        self.pages(doc)?
            .get(page_index as usize)
            .copied()
            .ok_or_else(|| BackendError::new(format!("page {page_index} out of range")))
    }

    fn render_page(
        &mut self,
        doc: &DocId,
        page_index: u32,
        width_px: u32,
        height_px: u32,
    ) -> Result<RawPixels, BackendError> {
        let active = self.probe.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_active.fetch_max(active, Ordering::SeqCst);

        let result = self.render_inner(doc, page_index, width_px, height_px);

        self.probe.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl MockBackend {
    fn render_inner(
        &mut self,
        doc: &DocId,
        page_index: u32,
        width_px: u32,
        height_px: u32,
    ) -> Result<RawPixels, BackendError> {
        self.pages(doc)?
            .get(page_index as usize)
            .ok_or_else(|| BackendError::new(format!("page {page_index} out of range")))?;

        if let Some(delay) = self.render_delay {
            std::thread::sleep(delay);
        }

        self.probe
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RenderCall {
                doc: doc.as_str().to_string(),
                page_index,
                width_px,
                height_px,
            });

        if self.fail_pages.contains(&page_index) {
            return Err(BackendError::new(format!(
                "scripted failure on page {page_index}"
            )));
        }

        // Fill with the page index so tests can tell bitmaps apart.
        let fill = (page_index % 251) as u8;
        Ok(RawPixels {
            rgba: vec![fill; width_px as usize * height_px as usize * 4],
            width: width_px,
            height: height_px,
        })
    }
}

static INIT_LOGGING: Once = Once::new();

/// Initialize terminal logging once for a test binary.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = simplelog::TermLogger::init(
            simplelog::LevelFilter::Debug,
            simplelog::Config::default(),
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        );
    });
}
