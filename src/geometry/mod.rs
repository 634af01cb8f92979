//! Virtualized spread geometry
//!
//! Pure layout math: spread partitioning, pixel-snapped positioning along
//! the virtual scroll axis, visible-range queries and fit-mode zoom scales.

pub mod layout;
pub mod pixels;
pub mod spread;
pub mod zoom;

pub use layout::{
    calculate_spread_layouts, composed_rotation, find_visible_spread_range, rotated_page_size,
    LayoutParams, LayoutPlan, SpreadLayout, POINTS_PER_INCH,
};
pub use pixels::{snap_to_device, snap_to_device_ceil, to_css_pixels, to_device_pixels};
pub use spread::{calculate_spreads, spread_index_for_page, LayoutMode, PageSlot, Spread};
pub use zoom::{clamp_scale, compute_scale, FitContext, ZoomMode, MAX_SCALE, MIN_SCALE};

/// Page geometry in document points (72 DPI), immutable once loaded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageInfo {
    pub width: f32,
    pub height: f32,
    /// Intrinsic page rotation in degrees: 0, 90, 180 or 270
    pub rotation: u16,
}

impl PageInfo {
    #[must_use]
    pub fn new(width: f32, height: f32, rotation: u16) -> Self {
        Self {
            width,
            height,
            rotation: rotation % 360,
        }
    }
}
