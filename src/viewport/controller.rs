//! Viewport controller
//!
//! Reconciles viewer state into a layout plan, decides which spread
//! components exist, keeps the reading position stable across zoom and
//! mode changes, and feeds the render scheduler for the visible range.

use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

use crate::config::ViewerConfig;
use crate::geometry::{
    calculate_spread_layouts, calculate_spreads, compute_scale, find_visible_spread_range,
    snap_to_device, spread_index_for_page, FitContext, LayoutParams, LayoutPlan, PageInfo, Spread,
};
use crate::render::{DocId, RenderScheduler};

use super::spread_view::{PendingPaint, SpreadView};
use super::state::{Action, ScrollMode, StateEffect, ViewerState};

/// Overflow decisions within this many CSS pixels of the viewport edge
/// keep their previous value, breaking resize-triggered layout loops.
const OVERFLOW_EPSILON: f32 = 1.0;

/// Notifications for the embedding chrome
#[derive(Clone, Debug, PartialEq)]
pub enum ViewportEvent {
    /// The page under the viewport top changed
    PageChanged(u32),
    /// Spreads and/or layouts were recomputed
    LayoutChanged,
    /// The controller moved the scroll position itself (jump or restore)
    ScrollChanged(f32),
    /// Annotation/text overlays for these pages may start loading now
    OverlayLoadDue(Vec<u32>),
}

/// The tracked document location at the viewport's top edge.
///
/// Spacing does not scale with zoom, so a top edge inside a spacing region
/// is recorded as absolute pixels; spread content does scale, so a top edge
/// inside a spread is recorded as a height ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
enum ViewportTop {
    InSpacing { spread: usize, offset: f32 },
    InSpread { spread: usize, ratio: f32 },
}

/// Drives layout and rendering for one viewer session.
pub struct ViewportController {
    config: ViewerConfig,
    state: ViewerState,
    page_infos: Vec<PageInfo>,
    spreads: Vec<Spread>,
    plan: LayoutPlan,
    scale: f32,
    views: BTreeMap<usize, SpreadView>,
    pending_paints: Vec<PendingPaint>,
    scroll_top: f32,
    viewport_top: Option<ViewportTop>,
    overflow_y: bool,
    resize_pending_since: Option<Instant>,
    render_suspended: bool,
    wheel_last: Option<Instant>,
    overlay_pending: Vec<(u32, Instant)>,
    overlay_done: HashSet<u32>,
}

impl ViewportController {
    #[must_use]
    pub fn new(config: ViewerConfig) -> Self {
        let state = ViewerState::new(config.page_spacing, config.spread_spacing);
        Self {
            config,
            state,
            page_infos: Vec::new(),
            spreads: Vec::new(),
            plan: LayoutPlan::default(),
            scale: 1.0,
            views: BTreeMap::new(),
            pending_paints: Vec::new(),
            scroll_top: 0.0,
            viewport_top: None,
            overflow_y: false,
            resize_pending_since: None,
            render_suspended: false,
            wheel_last: None,
            overlay_pending: Vec::new(),
            overlay_done: HashSet::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    #[must_use]
    pub fn layout_plan(&self) -> &LayoutPlan {
        &self.plan
    }

    #[must_use]
    pub fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    /// Whether vertical overflow (a scrollbar) is currently shown.
    #[must_use]
    pub fn overflow_y(&self) -> bool {
        self.overflow_y
    }

    /// Mounted spread components, keyed by spread index.
    #[must_use]
    pub fn views(&self) -> &BTreeMap<usize, SpreadView> {
        &self.views
    }

    /// Load a document's page geometry and make it current.
    pub fn open_document(
        &mut self,
        doc: DocId,
        page_infos: Vec<PageInfo>,
        scheduler: &mut RenderScheduler,
    ) -> Vec<ViewportEvent> {
        let page_count = page_infos.len() as u32;
        self.page_infos = page_infos;
        self.overlay_pending.clear();
        self.overlay_done.clear();
        self.dispatch(Action::OpenDocument { doc, page_count }, scheduler)
    }

    /// Unload the current document, dropping its queued work and cache.
    pub fn close_document(&mut self, scheduler: &mut RenderScheduler) -> Vec<ViewportEvent> {
        if let Some(doc) = self.state.doc.clone() {
            scheduler.cancel_renders(Some(&doc), None, None);
            scheduler.invalidate_cache(Some(&doc), None);
        }
        self.page_infos.clear();
        self.views.clear();
        self.pending_paints.clear();
        self.overlay_pending.clear();
        self.overlay_done.clear();
        self.dispatch(Action::CloseDocument, scheduler)
    }

    /// Apply a state action and react to its layout effects.
    pub fn dispatch(
        &mut self,
        action: Action,
        scheduler: &mut RenderScheduler,
    ) -> Vec<ViewportEvent> {
        let is_resize = matches!(action, Action::SetViewportSize(_));
        let effects = self.state.apply(action);
        if effects.is_empty() {
            return Vec::new();
        }

        if is_resize {
            // Layout keeps updating live; only render submission pauses
            // until the drag settles.
            self.resize_pending_since = Some(Instant::now());
            self.render_suspended = true;
        }

        let mut events = Vec::new();
        for effect in effects {
            match effect {
                StateEffect::RebuildLayout => {
                    self.record_viewport_top();
                    self.rebuild_spreads();
                    self.restore_viewport_top(&mut events);
                    events.push(ViewportEvent::LayoutChanged);
                    self.sync_views(scheduler);
                }
                StateEffect::RestoreScroll => {
                    self.record_viewport_top();
                    self.relayout();
                    self.restore_viewport_top(&mut events);
                    events.push(ViewportEvent::LayoutChanged);
                    self.sync_views(scheduler);
                }
                StateEffect::JumpToPage(page) => {
                    self.jump_to_page(page, scheduler, &mut events);
                }
            }
        }
        events
    }

    /// The host scrolled; track the new position and keep renders flowing.
    pub fn set_scroll_top(
        &mut self,
        top: f32,
        scheduler: &mut RenderScheduler,
    ) -> Vec<ViewportEvent> {
        let mut events = Vec::new();
        self.scroll_top = self.clamp_scroll(top);
        self.record_viewport_top();
        self.refresh_current_page(scheduler, &mut events);
        self.sync_views(scheduler);
        events
    }

    /// Mouse wheel input. Continuous mode scrolls; paged mode steps one
    /// spread per gesture with a cooldown against multi-spread skips.
    pub fn handle_wheel(
        &mut self,
        delta_y: f32,
        now: Instant,
        scheduler: &mut RenderScheduler,
    ) -> Vec<ViewportEvent> {
        match self.state.scroll_mode {
            ScrollMode::Continuous => self.set_scroll_top(self.scroll_top + delta_y, scheduler),
            ScrollMode::Paged => {
                let cooldown = Duration::from_millis(self.config.wheel_cooldown_ms);
                if self
                    .wheel_last
                    .is_some_and(|last| now.duration_since(last) < cooldown)
                {
                    return Vec::new();
                }

                let Some(current) = spread_index_for_page(&self.spreads, self.state.current_page)
                else {
                    return Vec::new();
                };
                let target = if delta_y > 0.0 {
                    (current + 1).min(self.spreads.len().saturating_sub(1))
                } else {
                    current.saturating_sub(1)
                };
                if target == current {
                    return Vec::new();
                }

                self.wheel_last = Some(now);
                let Some(page) = self.spreads[target].first_page() else {
                    return Vec::new();
                };
                self.dispatch(Action::GoToPage(page), scheduler)
            }
        }
    }

    /// Periodic pump: settle finished renders, run the deferred render pass
    /// after a resize quiet period, and surface due overlay loads.
    pub fn tick(&mut self, now: Instant, scheduler: &mut RenderScheduler) -> Vec<ViewportEvent> {
        let mut events = Vec::new();

        scheduler.pump();
        self.poll_pending_paints();

        if let Some(since) = self.resize_pending_since {
            let debounce = Duration::from_millis(self.config.resize_debounce_ms);
            if now.duration_since(since) >= debounce {
                self.resize_pending_since = None;
                self.render_suspended = false;
                self.sync_views(scheduler);
            }
        }

        let due: Vec<u32> = {
            let mut due = Vec::new();
            self.overlay_pending.retain(|(page, at)| {
                if *at <= now {
                    due.push(*page);
                    false
                } else {
                    true
                }
            });
            due
        };
        if !due.is_empty() {
            self.overlay_done.extend(due.iter().copied());
            events.push(ViewportEvent::OverlayLoadDue(due));
        }

        events
    }

    /// Buffered visible spread range at the current scroll position.
    #[must_use]
    pub fn visible_range(&self) -> Option<(usize, usize)> {
        match self.state.scroll_mode {
            ScrollMode::Continuous => find_visible_spread_range(
                &self.plan.layouts,
                self.scroll_top,
                self.state.viewport.height,
                self.config.visible_buffer_spreads,
            ),
            ScrollMode::Paged => {
                let current = spread_index_for_page(&self.spreads, self.state.current_page)?;
                Some((current, current))
            }
        }
    }

    fn layout_params(&self) -> LayoutParams {
        LayoutParams {
            scale: self.scale,
            page_spacing: self.state.page_spacing,
            spread_spacing: self.state.spread_spacing,
            dpi: self.config.render_dpi,
            dpr: self.state.device_pixel_ratio,
            user_rotation: self.state.rotation,
        }
    }

    fn recompute_scale(&mut self) {
        let ctx = FitContext {
            spreads: &self.spreads,
            page_infos: &self.page_infos,
            viewport_width: self.state.viewport.width,
            viewport_height: self.state.viewport.height,
            page_spacing: self.state.page_spacing,
            spread_spacing: self.state.spread_spacing,
            scrollbar_width: self.config.scrollbar_width,
            dpi: self.config.render_dpi,
            dpr: self.state.device_pixel_ratio,
            user_rotation: self.state.rotation,
        };
        self.scale = compute_scale(self.state.zoom_mode, self.state.zoom, &ctx);
    }

    /// Structure changed: new spreads, new layouts, remounted views.
    fn rebuild_spreads(&mut self) {
        self.spreads = calculate_spreads(self.state.page_count, self.state.layout_mode);
        self.relayout();
        // Spread indices may now mean different pages; drop every mounted
        // view rather than risk painting recycled slots.
        self.views.clear();
        self.pending_paints.clear();
    }

    /// Geometry changed but structure did not.
    fn relayout(&mut self) {
        self.recompute_scale();
        self.plan = calculate_spread_layouts(&self.spreads, &self.page_infos, &self.layout_params());
        self.update_overflow();
    }

    /// Sticky overflow decision: flips only when the content/viewport delta
    /// exceeds the epsilon in the flipping direction.
    fn update_overflow(&mut self) {
        let delta = self.plan.content_height - self.state.viewport.height;
        if self.overflow_y {
            if delta < -OVERFLOW_EPSILON {
                self.overflow_y = false;
            }
        } else if delta > OVERFLOW_EPSILON {
            self.overflow_y = true;
        }
    }

    fn clamp_scroll(&self, top: f32) -> f32 {
        let max = (self.plan.content_height - self.state.viewport.height).max(0.0);
        top.clamp(0.0, max)
    }

    /// Record which spread sits at the viewport's top edge and how far in.
    fn record_viewport_top(&mut self) {
        let layouts = &self.plan.layouts;
        self.viewport_top = layouts
            .iter()
            .position(|l| l.bottom() >= self.scroll_top)
            .map(|i| {
                let layout = &layouts[i];
                if layout.top > self.scroll_top {
                    ViewportTop::InSpacing {
                        spread: i,
                        offset: layout.top - self.scroll_top,
                    }
                } else {
                    ViewportTop::InSpread {
                        spread: i,
                        ratio: (self.scroll_top - layout.top) / layout.height.max(1.0),
                    }
                }
            });
    }

    /// Reproject the recorded viewport-top position onto the new layouts.
    fn restore_viewport_top(&mut self, events: &mut Vec<ViewportEvent>) {
        let Some(top) = self.viewport_top else {
            return;
        };
        let restored = match top {
            ViewportTop::InSpacing { spread, offset } => self
                .plan
                .layouts
                .get(spread)
                .map(|l| l.top - offset),
            ViewportTop::InSpread { spread, ratio } => self
                .plan
                .layouts
                .get(spread)
                .map(|l| l.top + ratio * l.height),
        };
        if let Some(top) = restored {
            let snapped = snap_to_device(self.clamp_scroll(top), self.state.device_pixel_ratio);
            if snapped != self.scroll_top {
                self.scroll_top = snapped;
                events.push(ViewportEvent::ScrollChanged(snapped));
            }
        }
    }

    fn jump_to_page(
        &mut self,
        page: u32,
        scheduler: &mut RenderScheduler,
        events: &mut Vec<ViewportEvent>,
    ) {
        // A jump can arrive before any layout exists (document open).
        if self.plan.layouts.is_empty() && !self.spreads.is_empty() {
            self.relayout();
        }
        let Some(index) = spread_index_for_page(&self.spreads, page) else {
            return;
        };
        if let Some(layout) = self.plan.layouts.get(index) {
            self.scroll_top = self.clamp_scroll(layout.top);
        }
        self.record_viewport_top();
        self.state.current_page = page;
        events.push(ViewportEvent::PageChanged(page));
        events.push(ViewportEvent::ScrollChanged(self.scroll_top));

        if let Some(doc) = self.state.doc.clone() {
            scheduler.boost_page_priority(doc.clone(), page);
            if self.state.scroll_mode == ScrollMode::Paged {
                scheduler.prerender_adjacent(doc, page, self.scale, self.state.page_count);
            }
        }
        self.sync_views(scheduler);
    }

    /// Update the current page from the spread under the viewport top.
    fn refresh_current_page(
        &mut self,
        scheduler: &mut RenderScheduler,
        events: &mut Vec<ViewportEvent>,
    ) {
        let spread = match self.viewport_top {
            Some(ViewportTop::InSpacing { spread, .. } | ViewportTop::InSpread { spread, .. }) => {
                spread
            }
            None => return,
        };
        let Some(page) = self.spreads.get(spread).and_then(Spread::first_page) else {
            return;
        };

        if let Some(doc) = self.state.doc.clone() {
            // Focus tracks attention continuously, not just page flips.
            scheduler.boost_page_priority(doc, page);
        }
        if page != self.state.current_page {
            self.state.current_page = page;
            events.push(ViewportEvent::PageChanged(page));
        }
    }

    /// Mount/unmount spread views over the buffered visible range and ask
    /// the scheduler for whatever bitmaps they are missing.
    fn sync_views(&mut self, scheduler: &mut RenderScheduler) {
        let Some((start, end)) = self.visible_range() else {
            self.views.clear();
            return;
        };

        self.views.retain(|index, _| *index >= start && *index <= end);

        let params = self.layout_params();
        let mut visible_pages = Vec::new();
        for index in start..=end {
            let Some(spread) = self.spreads.get(index) else {
                continue;
            };
            visible_pages.extend(spread.pages());

            let view = self
                .views
                .entry(index)
                .or_insert_with(|| SpreadView::new(spread.clone()));
            view.assign(spread.clone());
            view.update_layout(&self.page_infos, &params);
        }

        if !self.render_suspended {
            if let Some(doc) = self.state.doc.clone() {
                let scale = self.scale;
                for view in self.views.values_mut() {
                    self.pending_paints
                        .extend(view.request_renders(&doc, scale, scheduler));
                }
            }
        }

        self.schedule_overlays(&visible_pages);
    }

    /// Overlay (annotation/text) loads trail renders by a quiet period so
    /// they never starve the render queue.
    fn schedule_overlays(&mut self, pages: &[u32]) {
        let delay = Duration::from_millis(self.config.overlay_delay_ms);
        let due = Instant::now() + delay;
        for page in pages {
            let queued = self.overlay_pending.iter().any(|(p, _)| p == page);
            if !queued && !self.overlay_done.contains(page) {
                self.overlay_pending.push((*page, due));
            }
        }
    }

    /// Route settled renders to their slots, discarding paints for spreads
    /// that have since been unmounted.
    fn poll_pending_paints(&mut self) {
        let mut remaining = Vec::with_capacity(self.pending_paints.len());
        for paint in self.pending_paints.drain(..) {
            match paint.ticket.try_result() {
                Some(result) => {
                    if let Some(view) = self.views.get_mut(&paint.spread_index) {
                        view.complete(paint.slot, paint.token, result);
                    }
                }
                None => remaining.push(paint),
            }
        }
        self.pending_paints = remaining;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_decision_is_sticky_within_epsilon() {
        let mut controller = ViewportController::new(ViewerConfig::default());
        controller.state.viewport = super::super::state::ViewportSize::new(800.0, 600.0);

        controller.plan.content_height = 600.5;
        controller.update_overflow();
        assert!(!controller.overflow_y, "within epsilon keeps previous (off)");

        controller.plan.content_height = 602.0;
        controller.update_overflow();
        assert!(controller.overflow_y);

        controller.plan.content_height = 599.5;
        controller.update_overflow();
        assert!(controller.overflow_y, "within epsilon keeps previous (on)");

        controller.plan.content_height = 598.0;
        controller.update_overflow();
        assert!(!controller.overflow_y);
    }
}
