//! Render request, key and error types

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::bitmap::RenderOutput;

/// Cheap-to-clone document identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocId(Arc<str>);

impl DocId {
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Which cache space and priority band a render belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderType {
    /// Full-resolution page bitmap, latency sensitive
    Page,
    /// Small thumbnail bitmap, numerous and cheap
    Thumbnail,
}

impl RenderType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Thumbnail => "thumb",
        }
    }
}

/// One logical unit of render work
#[derive(Clone, Debug, PartialEq)]
pub struct RenderRequest {
    pub doc: DocId,
    /// 1-based page number
    pub page: u32,
    pub kind: RenderType,
    pub scale: f32,
}

impl RenderRequest {
    #[must_use]
    pub fn new(doc: DocId, page: u32, kind: RenderType, scale: f32) -> Self {
        Self {
            doc,
            page,
            kind,
            scale,
        }
    }

    /// Deterministic key for caching and de-duplication. Two requests with
    /// the same key are the same unit of work no matter how many callers
    /// asked.
    #[must_use]
    pub fn key(&self) -> RenderKey {
        RenderKey(format!(
            "{}/{}/{}/{:.4}",
            self.doc,
            self.page,
            self.kind.as_str(),
            self.scale
        ))
    }

    /// Whether `other` targets the same page and render type, at any scale.
    /// Used for supersession: a newer request for a page makes older queued
    /// scales for that page stale.
    #[must_use]
    pub fn same_page_and_kind(&self, other: &Self) -> bool {
        self.doc == other.doc && self.page == other.page && self.kind == other.kind
    }
}

/// Cache/queue identity of a render request (scale at 4-decimal precision)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RenderKey(String);

impl RenderKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RenderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors surfaced through render tickets
#[derive(Clone, Debug, thiserror::Error)]
pub enum RenderError {
    /// The request was superseded or cancelled before it ran. Expected and
    /// frequent; callers must treat it as benign.
    #[error("render cancelled")]
    Cancelled,

    /// The scheduler was torn down with this request outstanding
    #[error("render scheduler shut down")]
    ShutDown,

    /// The rendering backend rejected or failed the job
    #[error("render backend: {0}")]
    Backend(String),

    /// Page geometry could not be fetched
    #[error("page geometry: {0}")]
    Geometry(String),
}

impl RenderError {
    /// Cancellation is not a failure; callers use this to avoid logging it
    /// as one.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::ShutDown)
    }
}

pub(crate) type RenderResult = Result<RenderOutput, RenderError>;

/// The caller's handle to a pending (or already resolved) render.
///
/// N callers asking for the same key each hold their own ticket; all are
/// notified when the single underlying unit of work completes.
#[derive(Debug)]
pub struct RenderTicket {
    rx: flume::Receiver<RenderResult>,
}

impl RenderTicket {
    pub(crate) fn channel() -> (flume::Sender<RenderResult>, Self) {
        let (tx, rx) = flume::bounded(1);
        (tx, Self { rx })
    }

    /// A ticket resolved on the spot (cache hits).
    pub(crate) fn resolved(result: RenderResult) -> Self {
        let (tx, ticket) = Self::channel();
        let _ = tx.send(result);
        ticket
    }

    /// Non-blocking poll; `None` while the render is still pending.
    #[must_use]
    pub fn try_result(&self) -> Option<RenderResult> {
        self.rx.try_recv().ok()
    }

    /// Block until the render settles. The owning scheduler must be pumped
    /// from another context (or already have resolved this ticket).
    pub fn wait(&self) -> RenderResult {
        self.rx.recv().unwrap_or(Err(RenderError::ShutDown))
    }

    /// Bounded wait; `None` on timeout.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> Option<RenderResult> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(flume::RecvTimeoutError::Disconnected) => Some(Err(RenderError::ShutDown)),
            Err(flume::RecvTimeoutError::Timeout) => None,
        }
    }
}
