//! Viewer state and its action reducer
//!
//! All externally driven changes flow through [`ViewerState::apply`]: an
//! exhaustive match over the action union where each arm updates the state
//! and reports which layout reaction it requires. No-op actions produce no
//! effects, so callers can dispatch freely.

use crate::geometry::{LayoutMode, ZoomMode};
use crate::render::DocId;

/// Scroll presentation mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScrollMode {
    /// All spreads on one continuous vertical axis
    #[default]
    Continuous,
    /// One spread shown at a time
    Paged,
}

/// Viewport dimensions in CSS pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewportSize {
    pub width: f32,
    pub height: f32,
}

impl ViewportSize {
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Snapshot of everything that determines viewer geometry
#[derive(Clone, Debug)]
pub struct ViewerState {
    pub doc: Option<DocId>,
    pub page_count: u32,
    /// Current 1-based page
    pub current_page: u32,
    pub zoom_mode: ZoomMode,
    /// User scale factor, effective in [`ZoomMode::Custom`]
    pub zoom: f32,
    pub layout_mode: LayoutMode,
    pub scroll_mode: ScrollMode,
    /// User rotation in degrees, one of 0/90/180/270
    pub rotation: u16,
    /// Gap between the two pages of a spread, CSS px
    pub page_spacing: f32,
    /// Gap between consecutive spreads, CSS px
    pub spread_spacing: f32,
    pub viewport: ViewportSize,
    pub device_pixel_ratio: f32,
}

impl ViewerState {
    #[must_use]
    pub fn new(page_spacing: f32, spread_spacing: f32) -> Self {
        Self {
            doc: None,
            page_count: 0,
            current_page: 1,
            zoom_mode: ZoomMode::Custom,
            zoom: 1.0,
            layout_mode: LayoutMode::Single,
            scroll_mode: ScrollMode::Continuous,
            rotation: 0,
            page_spacing,
            spread_spacing,
            viewport: ViewportSize::default(),
            device_pixel_ratio: 1.0,
        }
    }

    /// Apply an action and report the required layout reaction.
    #[must_use]
    pub fn apply(&mut self, action: Action) -> Vec<StateEffect> {
        match action {
            Action::OpenDocument { doc, page_count } => {
                self.doc = Some(doc);
                self.page_count = page_count;
                self.current_page = 1;
                vec![StateEffect::RebuildLayout, StateEffect::JumpToPage(1)]
            }

            Action::CloseDocument => {
                if self.doc.is_none() {
                    return vec![];
                }
                self.doc = None;
                self.page_count = 0;
                self.current_page = 1;
                vec![StateEffect::RebuildLayout]
            }

            Action::SetZoom(zoom) => {
                let clamped = crate::geometry::clamp_scale(zoom);
                if (self.zoom - clamped).abs() <= f32::EPSILON {
                    return vec![];
                }
                self.zoom = clamped;
                vec![StateEffect::RestoreScroll]
            }

            Action::SetZoomMode(mode) => {
                if self.zoom_mode == mode {
                    return vec![];
                }
                self.zoom_mode = mode;
                vec![StateEffect::RestoreScroll]
            }

            Action::SetLayoutMode(mode) => {
                if self.layout_mode == mode {
                    return vec![];
                }
                self.layout_mode = mode;
                vec![StateEffect::RebuildLayout]
            }

            Action::SetScrollMode(mode) => {
                if self.scroll_mode == mode {
                    return vec![];
                }
                self.scroll_mode = mode;
                vec![StateEffect::RebuildLayout]
            }

            Action::SetRotation(rotation) => {
                let normalized = (rotation / 90 % 4) * 90;
                if self.rotation == normalized {
                    return vec![];
                }
                self.rotation = normalized;
                vec![StateEffect::RestoreScroll]
            }

            Action::GoToPage(page) => {
                if self.page_count == 0 {
                    return vec![];
                }
                let clamped = page.clamp(1, self.page_count);
                self.current_page = clamped;
                vec![StateEffect::JumpToPage(clamped)]
            }

            Action::SetViewportSize(size) => {
                if self.viewport == size {
                    return vec![];
                }
                self.viewport = size;
                vec![StateEffect::RebuildLayout]
            }

            Action::SetDevicePixelRatio(dpr) => {
                if (self.device_pixel_ratio - dpr).abs() <= f32::EPSILON {
                    return vec![];
                }
                self.device_pixel_ratio = dpr;
                vec![StateEffect::RebuildLayout]
            }

            Action::SetSpacing { page, spread } => {
                if self.page_spacing == page && self.spread_spacing == spread {
                    return vec![];
                }
                self.page_spacing = page;
                self.spread_spacing = spread;
                vec![StateEffect::RestoreScroll]
            }
        }
    }
}

/// Externally driven state changes
#[derive(Clone, Debug)]
pub enum Action {
    /// A document finished loading
    OpenDocument { doc: DocId, page_count: u32 },
    /// The document was unloaded
    CloseDocument,
    /// Set the custom zoom factor
    SetZoom(f32),
    /// Switch how the scale is derived
    SetZoomMode(ZoomMode),
    /// Switch spread assembly
    SetLayoutMode(LayoutMode),
    /// Switch continuous/paged presentation
    SetScrollMode(ScrollMode),
    /// Set user rotation in degrees
    SetRotation(u16),
    /// Navigate to a 1-based page
    GoToPage(u32),
    /// The host resized the viewport
    SetViewportSize(ViewportSize),
    /// The window moved to a display with a different pixel ratio
    SetDevicePixelRatio(f32),
    /// Adjust inter-page and inter-spread gaps
    SetSpacing { page: f32, spread: f32 },
}

/// Layout reaction required after a state change
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StateEffect {
    /// Spread structure changed: recompute spreads and layouts
    RebuildLayout,
    /// Geometry changed but not structure: recompute layouts, keep the
    /// reading position
    RestoreScroll,
    /// Explicit navigation: scroll so the page's spread is at the top
    JumpToPage(u32),
}
