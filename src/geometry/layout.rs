//! Spread layout positioning
//!
//! Turns a spread list plus per-page geometry into pixel-space layouts on a
//! single virtual scroll axis. Every position and size is snapped to the
//! device-pixel grid as it is accumulated, so adjacent spreads stay
//! gap-free no matter how many of them precede.

use super::pixels::snap_to_device;
use super::spread::Spread;
use super::PageInfo;

/// Points per inch in document space
pub const POINTS_PER_INCH: f32 = 72.0;

/// Inputs shared by all per-spread layout math
#[derive(Clone, Copy, Debug)]
pub struct LayoutParams {
    /// Zoom scale applied on top of the DPI conversion
    pub scale: f32,
    /// Gap between the two slots of a spread, CSS px
    pub page_spacing: f32,
    /// Gap between consecutive spreads, CSS px
    pub spread_spacing: f32,
    /// Render DPI used for the point-to-pixel conversion
    pub dpi: f32,
    /// Device pixel ratio for snapping
    pub dpr: f32,
    /// User rotation in degrees, composed with each page's own rotation
    pub user_rotation: u16,
}

/// A spread's resolved position in the virtual scroll space, CSS px
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpreadLayout {
    /// Index into the spread list this layout belongs to
    pub spread_index: usize,
    /// Distance from the top of the scroll space
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl SpreadLayout {
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

/// All spread layouts plus the total content bounds
#[derive(Clone, Debug, Default)]
pub struct LayoutPlan {
    pub layouts: Vec<SpreadLayout>,
    pub content_width: f32,
    pub content_height: f32,
}

/// Compose the document's intrinsic page rotation with the user rotation,
/// normalized to the nearest quadrant.
#[must_use]
pub fn composed_rotation(intrinsic: u16, user: u16) -> u16 {
    let summed = (u32::from(intrinsic) + u32::from(user)) % 360;
    let quadrant = ((summed as f32 / 90.0).round() as u32) % 4;
    (quadrant * 90) as u16
}

/// Page size in points after rotation composition (90/270 swap the axes).
#[must_use]
pub fn rotated_page_size(info: &PageInfo, user_rotation: u16) -> (f32, f32) {
    match composed_rotation(info.rotation, user_rotation) {
        90 | 270 => (info.height, info.width),
        _ => (info.width, info.height),
    }
}

/// Pixel size of a single slot at the given params, snapped.
fn slot_size(info: &PageInfo, params: &LayoutParams) -> (f32, f32) {
    let (w_pt, h_pt) = rotated_page_size(info, params.user_rotation);
    let px_per_pt = params.dpi / POINTS_PER_INCH * params.scale;
    (
        snap_to_device(w_pt * px_per_pt, params.dpr),
        snap_to_device(h_pt * px_per_pt, params.dpr),
    )
}

/// Geometry for a spread's slots. Empty slots borrow the size of the first
/// non-empty sibling so the spread's bounding box stays sensible.
fn spread_slot_infos<'a>(spread: &Spread, page_infos: &'a [PageInfo]) -> Vec<Option<&'a PageInfo>> {
    let lookup = |page: u32| page_infos.get(page as usize - 1);
    let fallback = spread.pages().find_map(lookup);

    spread
        .slots
        .iter()
        .map(|slot| slot.page().and_then(lookup).or(fallback))
        .collect()
}

/// Per-slot pixel sizes for a spread, empty slots included.
pub(crate) fn spread_slot_sizes(
    spread: &Spread,
    page_infos: &[PageInfo],
    params: &LayoutParams,
) -> Vec<(f32, f32)> {
    spread_slot_infos(spread, page_infos)
        .into_iter()
        .map(|info| info.map_or((0.0, 0.0), |i| slot_size(i, params)))
        .collect()
}

/// Outer pixel size of a spread: slot widths plus one inter-page gap for
/// two-slot spreads; height is the tallest slot.
pub(crate) fn spread_size(
    spread: &Spread,
    page_infos: &[PageInfo],
    params: &LayoutParams,
) -> (f32, f32) {
    let sizes = spread_slot_sizes(spread, page_infos, params);
    let mut width: f32 = sizes.iter().map(|(w, _)| w).sum();
    if sizes.len() > 1 {
        width += snap_to_device(params.page_spacing, params.dpr);
    }
    let height = sizes.iter().map(|(_, h)| *h).fold(0.0, f32::max);
    (snap_to_device(width, params.dpr), height)
}

/// Position every spread along the vertical scroll axis.
///
/// The accumulation discipline is the load-bearing invariant here: each top
/// equals `snap(previous.top + previous.height + spacing)`, with one spacing
/// unit before the first spread, so repeated snapping can never drift.
#[must_use]
pub fn calculate_spread_layouts(
    spreads: &[Spread],
    page_infos: &[PageInfo],
    params: &LayoutParams,
) -> LayoutPlan {
    let spacing = snap_to_device(params.spread_spacing, params.dpr);
    let mut layouts = Vec::with_capacity(spreads.len());
    let mut content_width: f32 = 0.0;
    let mut cursor = spacing;

    for spread in spreads {
        let (width, height) = spread_size(spread, page_infos, params);
        layouts.push(SpreadLayout {
            spread_index: spread.index,
            top: cursor,
            width,
            height,
        });
        content_width = content_width.max(width);
        cursor = snap_to_device(cursor + height + spacing, params.dpr);
    }

    LayoutPlan {
        layouts,
        content_width,
        content_height: cursor,
    }
}

/// Inclusive range of spreads intersecting the viewport, expanded by
/// `buffer` spreads on each side so neighbors are ready before they scroll
/// into view. Returns `None` for an empty layout.
#[must_use]
pub fn find_visible_spread_range(
    layouts: &[SpreadLayout],
    scroll_top: f32,
    viewport_height: f32,
    buffer: usize,
) -> Option<(usize, usize)> {
    if layouts.is_empty() {
        return None;
    }

    let view_bottom = scroll_top + viewport_height;
    let start = layouts
        .iter()
        .position(|l| l.bottom() >= scroll_top)
        .unwrap_or(layouts.len() - 1);
    let end = layouts
        .iter()
        .rposition(|l| l.top <= view_bottom)
        .unwrap_or(0)
        .max(start);

    Some((
        start.saturating_sub(buffer),
        (end + buffer).min(layouts.len() - 1),
    ))
}
