//! Viewport state, controller and spread components

mod controller;
mod spread_view;
mod state;

pub use controller::{ViewportController, ViewportEvent};
pub use spread_view::{PendingPaint, SlotRect, SlotView, SpreadView};
pub use state::{Action, ScrollMode, StateEffect, ViewerState, ViewportSize};
