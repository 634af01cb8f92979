//! pageflow - render scheduling and virtualized spread layout for paginated
//! document viewers.
//!
//! The crate sits between a viewer's chrome and a serialized rendering
//! backend: it partitions pages into spreads, positions them on a
//! device-snapped virtual scroll axis, tracks what is visible, and fetches,
//! caches, prioritizes and releases the bitmaps the visible range needs.

pub mod config;
pub mod geometry;
pub mod render;
pub mod viewport;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use config::ViewerConfig;
pub use geometry::{LayoutMode, PageInfo, ZoomMode};
pub use render::{
    DocId, RenderBackend, RenderError, RenderOutput, RenderRequest, RenderScheduler, RenderTicket,
    RenderType,
};
pub use viewport::{Action, ScrollMode, ViewerState, ViewportController, ViewportEvent};
