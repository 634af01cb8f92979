//! Spread component
//!
//! A renderable unit owning one or two page slots. Each slot asks the
//! scheduler for its own bitmap, remembers the key it last requested to
//! avoid redundant lookups, and carries a monotonically increasing render
//! token so stale completions (slot reassigned, spread recycled) are
//! discarded instead of painted.

use crate::geometry::layout::spread_slot_sizes;
use crate::geometry::{composed_rotation, snap_to_device, LayoutParams, PageInfo, PageSlot, Spread};
use crate::render::{
    DocId, RenderError, RenderKey, RenderOutput, RenderRequest, RenderScheduler, RenderTicket,
    RenderType,
};

/// Slot placement inside the spread's box, CSS px
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SlotRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One page position within a mounted spread
#[derive(Debug)]
pub struct SlotView {
    pub slot: PageSlot,
    pub rect: SlotRect,
    /// Composed document + user rotation for the display transform
    pub rotation: u16,
    requested_key: Option<RenderKey>,
    token: u64,
    painted: Option<RenderOutput>,
}

impl SlotView {
    fn new(slot: PageSlot) -> Self {
        Self {
            slot,
            rect: SlotRect::default(),
            rotation: 0,
            requested_key: None,
            token: 0,
            painted: None,
        }
    }

    #[must_use]
    pub fn painted(&self) -> Option<&RenderOutput> {
        self.painted.as_ref()
    }
}

/// A render issued by a slot, to be completed by the controller
#[derive(Debug)]
pub struct PendingPaint {
    pub spread_index: usize,
    pub slot: usize,
    pub token: u64,
    pub ticket: RenderTicket,
}

/// A mounted spread with its slot state
#[derive(Debug)]
pub struct SpreadView {
    spread: Spread,
    slots: Vec<SlotView>,
}

impl SpreadView {
    #[must_use]
    pub fn new(spread: Spread) -> Self {
        let slots = spread.slots.iter().map(|s| SlotView::new(*s)).collect();
        Self { spread, slots }
    }

    #[must_use]
    pub fn spread(&self) -> &Spread {
        &self.spread
    }

    #[must_use]
    pub fn slots(&self) -> &[SlotView] {
        &self.slots
    }

    /// Reuse this component for a different spread (virtualization
    /// recycling). Tokens advance so in-flight completions for the old
    /// assignment are discarded.
    pub fn assign(&mut self, spread: Spread) {
        if spread == self.spread {
            return;
        }
        let next_token = self.slots.iter().map(|s| s.token).max().unwrap_or(0) + 1;
        self.slots = spread
            .slots
            .iter()
            .map(|s| {
                let mut view = SlotView::new(*s);
                view.token = next_token;
                view
            })
            .collect();
        self.spread = spread;
    }

    /// Recompute slot rects for the current layout params. Positions are
    /// snapped so a slot's canvas never straddles a device pixel boundary
    /// relative to its sibling.
    pub fn update_layout(&mut self, page_infos: &[PageInfo], params: &LayoutParams) {
        let sizes = spread_slot_sizes(&self.spread, page_infos, params);
        let spread_height = sizes.iter().map(|(_, h)| *h).fold(0.0, f32::max);

        let mut x = 0.0;
        for (i, view) in self.slots.iter_mut().enumerate() {
            let (width, height) = sizes.get(i).copied().unwrap_or_default();
            let y = snap_to_device((spread_height - height) / 2.0, params.dpr);
            view.rect = SlotRect {
                x,
                y,
                width,
                height,
            };
            view.rotation = view
                .slot
                .page()
                .and_then(|p| page_infos.get(p as usize - 1))
                .map_or(params.user_rotation, |info| {
                    composed_rotation(info.rotation, params.user_rotation)
                });
            x = snap_to_device(x + width + params.page_spacing, params.dpr);
        }
    }

    /// Ask the scheduler for any slot bitmaps not already requested at the
    /// current scale. Returns the pending paints for the caller to poll.
    pub fn request_renders(
        &mut self,
        doc: &DocId,
        scale: f32,
        scheduler: &mut RenderScheduler,
    ) -> Vec<PendingPaint> {
        let mut pending = Vec::new();
        for (i, view) in self.slots.iter_mut().enumerate() {
            let Some(page) = view.slot.page() else {
                continue;
            };
            let request = RenderRequest::new(doc.clone(), page, RenderType::Page, scale);
            let key = request.key();
            if view.requested_key.as_ref() == Some(&key) {
                continue;
            }

            view.token += 1;
            view.requested_key = Some(key);
            pending.push(PendingPaint {
                spread_index: self.spread.index,
                slot: i,
                token: view.token,
                ticket: scheduler.request_render(request),
            });
        }
        pending
    }

    /// Apply a settled render to a slot. Stale tokens are discarded; a
    /// failure clears the requested key so the next pass re-requests.
    pub fn complete(&mut self, slot: usize, token: u64, result: Result<RenderOutput, RenderError>) {
        let Some(view) = self.slots.get_mut(slot) else {
            return;
        };
        if view.token != token {
            log::trace!(
                "discarding stale render for spread {} slot {slot}",
                self.spread.index
            );
            return;
        }

        match result {
            Ok(output) => {
                view.painted = Some(output);
            }
            Err(e) if e.is_cancelled() => {
                view.requested_key = None;
            }
            Err(e) => {
                log::error!(
                    "render failed for spread {} slot {slot}: {e}",
                    self.spread.index
                );
                view.requested_key = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{calculate_spreads, LayoutMode};
    use crate::render::Bitmap;

    fn params() -> LayoutParams {
        LayoutParams {
            scale: 1.0,
            page_spacing: 8.0,
            spread_spacing: 16.0,
            dpi: 96.0,
            dpr: 1.0,
            user_rotation: 0,
        }
    }

    fn output() -> RenderOutput {
        RenderOutput::new(Bitmap::from_rgba(vec![0u8; 4], 1, 1))
    }

    #[test]
    fn slots_are_placed_side_by_side() {
        let spreads = calculate_spreads(2, LayoutMode::Double);
        let infos = vec![PageInfo::new(612.0, 792.0, 0); 2];
        let mut view = SpreadView::new(spreads[0].clone());
        view.update_layout(&infos, &params());

        let slots = view.slots();
        assert_eq!(slots[0].rect.x, 0.0);
        assert_eq!(slots[1].rect.x, slots[0].rect.width + 8.0);
    }

    #[test]
    fn stale_token_is_discarded() {
        let spreads = calculate_spreads(1, LayoutMode::Single);
        let mut view = SpreadView::new(spreads[0].clone());

        view.slots[0].token = 2;
        view.complete(0, 1, Ok(output()));
        assert!(view.slots()[0].painted().is_none());

        view.complete(0, 2, Ok(output()));
        assert!(view.slots()[0].painted().is_some());
    }

    #[test]
    fn reassignment_invalidates_outstanding_tokens() {
        let spreads = calculate_spreads(2, LayoutMode::Single);
        let mut view = SpreadView::new(spreads[0].clone());
        view.slots[0].token = 3;

        view.assign(spreads[1].clone());
        // A completion from the old assignment no longer matches.
        view.complete(0, 3, Ok(output()));
        assert!(view.slots()[0].painted().is_none());
    }

    #[test]
    fn failure_clears_the_requested_key() {
        let spreads = calculate_spreads(1, LayoutMode::Single);
        let mut view = SpreadView::new(spreads[0].clone());
        view.slots[0].token = 1;
        view.slots[0].requested_key = Some(
            RenderRequest::new(DocId::new("doc"), 1, RenderType::Page, 1.0).key(),
        );

        view.complete(0, 1, Err(RenderError::Backend("boom".into())));
        assert!(view.slots()[0].painted().is_none());
        assert!(view.slots[0].requested_key.is_none());
    }
}
