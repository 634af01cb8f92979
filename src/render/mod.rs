//! Render scheduling infrastructure
//!
//! Everything between "a component wants pixels for a page" and "the
//! serialized backend produced them": request keys, the promise-style
//! tickets, bounded bitmap caches, the priority queue and the scheduler
//! that drives the worker thread.

pub mod backend;
mod bitmap;
mod cache;
mod queue;
mod request;
mod scheduler;
mod worker;

#[cfg(feature = "mupdf-backend")]
pub mod backend_mupdf;

pub use backend::{BackendError, RawPixels, RenderBackend};
pub use bitmap::{Bitmap, RenderOutput};
pub use request::{DocId, RenderError, RenderKey, RenderRequest, RenderTicket, RenderType};
pub use scheduler::{RenderScheduler, SchedulerStats};

#[cfg(feature = "mupdf-backend")]
pub use backend_mupdf::MupdfBackend;
