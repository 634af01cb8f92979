//! Zoom modes and fit-scale computation
//!
//! Fit modes derive the scale from the largest spread and the viewport's
//! inner size. Fit-width additionally predicts whether the resulting content
//! will overflow vertically and pre-subtracts the scrollbar width, breaking
//! the scale / scrollbar / available-width feedback cycle.

use serde::{Deserialize, Serialize};

use super::layout::{spread_size, LayoutParams};
use super::spread::Spread;
use super::PageInfo;

/// How the zoom scale is derived
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomMode {
    /// User-controlled scale factor
    #[default]
    Custom,
    /// Scale so the widest spread fills the viewport width
    FitWidth,
    /// Scale so the tallest spread fills the viewport height
    FitHeight,
    /// Scale so the largest spread fits entirely
    FitPage,
}

/// Minimum allowed zoom scale
pub const MIN_SCALE: f32 = 0.1;
/// Maximum allowed zoom scale
pub const MAX_SCALE: f32 = 10.0;

/// Clamp a scale to the valid range, mapping NaN/Inf to 1.0.
#[must_use]
pub fn clamp_scale(scale: f32) -> f32 {
    if !scale.is_finite() {
        1.0
    } else {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    }
}

/// Everything fit-mode scale derivation needs to know
#[derive(Clone, Copy, Debug)]
pub struct FitContext<'a> {
    pub spreads: &'a [Spread],
    pub page_infos: &'a [PageInfo],
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub page_spacing: f32,
    pub spread_spacing: f32,
    /// Width reserved for a vertical scrollbar when one is predicted
    pub scrollbar_width: f32,
    pub dpi: f32,
    pub dpr: f32,
    pub user_rotation: u16,
}

impl FitContext<'_> {
    fn base_params(&self) -> LayoutParams {
        LayoutParams {
            scale: 1.0,
            page_spacing: self.page_spacing,
            spread_spacing: self.spread_spacing,
            dpi: self.dpi,
            dpr: self.dpr,
            user_rotation: self.user_rotation,
        }
    }

    /// Largest spread width/height at scale 1.0 plus the summed height of
    /// all spreads (used for the overflow prediction).
    fn measure(&self) -> (f32, f32, f32) {
        let params = self.base_params();
        let mut max_w: f32 = 0.0;
        let mut max_h: f32 = 0.0;
        let mut total_h: f32 = 0.0;
        for spread in self.spreads {
            let (w, h) = spread_size(spread, self.page_infos, &params);
            max_w = max_w.max(w);
            max_h = max_h.max(h);
            total_h += h;
        }
        (max_w, max_h, total_h)
    }

    fn inner_height(&self) -> f32 {
        (self.viewport_height - 2.0 * self.spread_spacing).max(1.0)
    }
}

/// Derive the effective scale for a zoom mode.
///
/// `custom_scale` is the user factor applied when `mode` is [`ZoomMode::Custom`].
#[must_use]
pub fn compute_scale(mode: ZoomMode, custom_scale: f32, ctx: &FitContext<'_>) -> f32 {
    if ctx.spreads.is_empty() {
        return clamp_scale(custom_scale);
    }

    let (max_w, max_h, total_h) = ctx.measure();
    if max_w <= 0.0 || max_h <= 0.0 {
        return clamp_scale(custom_scale);
    }

    let scale = match mode {
        ZoomMode::Custom => custom_scale,
        ZoomMode::FitHeight => ctx.inner_height() / max_h,
        ZoomMode::FitWidth => fit_width_scale(ctx, max_w, total_h),
        ZoomMode::FitPage => {
            let avail_w = (ctx.viewport_width - 2.0 * ctx.page_spacing).max(1.0);
            (avail_w / max_w).min(ctx.inner_height() / max_h)
        }
    };

    clamp_scale(scale)
}

/// Fit-width with scrollbar prediction: compute a candidate from the full
/// width, estimate total content height at that candidate, and if it would
/// overflow the viewport, recompute against a width reduced by the scrollbar.
fn fit_width_scale(ctx: &FitContext<'_>, max_w: f32, total_h: f32) -> f32 {
    let spacing_total = ctx.spread_spacing * (ctx.spreads.len() as f32 + 1.0);
    let avail_w = (ctx.viewport_width - 2.0 * ctx.page_spacing).max(1.0);

    let candidate = avail_w / max_w;
    let estimated_height = total_h * candidate + spacing_total;
    if estimated_height > ctx.viewport_height {
        ((avail_w - ctx.scrollbar_width).max(1.0)) / max_w
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::spread::{calculate_spreads, LayoutMode};

    fn ctx<'a>(spreads: &'a [Spread], infos: &'a [PageInfo]) -> FitContext<'a> {
        FitContext {
            spreads,
            page_infos: infos,
            viewport_width: 800.0,
            viewport_height: 600.0,
            page_spacing: 8.0,
            spread_spacing: 16.0,
            scrollbar_width: 15.0,
            dpi: 96.0,
            dpr: 1.0,
            user_rotation: 0,
        }
    }

    #[test]
    fn clamp_handles_nan_and_bounds() {
        assert_eq!(clamp_scale(f32::NAN), 1.0);
        assert_eq!(clamp_scale(0.0), MIN_SCALE);
        assert_eq!(clamp_scale(99.0), MAX_SCALE);
    }

    #[test]
    fn fit_width_reserves_scrollbar_for_tall_documents() {
        let spreads = calculate_spreads(50, LayoutMode::Single);
        let infos = vec![PageInfo::new(612.0, 792.0, 0); 50];
        let c = ctx(&spreads, &infos);

        let scale = compute_scale(ZoomMode::FitWidth, 1.0, &c);
        let page_w = 612.0 * c.dpi / 72.0;
        let naive = (c.viewport_width - 2.0 * c.page_spacing) / page_w;
        assert!(scale < naive, "50 letter pages always overflow vertically");
    }

    #[test]
    fn fit_width_uses_full_width_when_content_fits() {
        let spreads = calculate_spreads(1, LayoutMode::Single);
        // A short, wide page that will not overflow a 600px-tall viewport.
        let infos = vec![PageInfo::new(612.0, 200.0, 0)];
        let c = ctx(&spreads, &infos);

        let scale = compute_scale(ZoomMode::FitWidth, 1.0, &c);
        let page_w = 612.0 * c.dpi / 72.0;
        let naive = (c.viewport_width - 2.0 * c.page_spacing) / page_w;
        assert!((scale - naive).abs() < 1e-5);
    }

    #[test]
    fn fit_page_is_limited_by_the_tighter_axis() {
        let spreads = calculate_spreads(1, LayoutMode::Single);
        let infos = vec![PageInfo::new(612.0, 792.0, 0)];
        let c = ctx(&spreads, &infos);

        let scale = compute_scale(ZoomMode::FitPage, 1.0, &c);
        let fit_h = compute_scale(ZoomMode::FitHeight, 1.0, &c);
        // Letter portrait in a 800x600 viewport is height-limited.
        assert!((scale - fit_h).abs() < 1e-5);
    }

    #[test]
    fn custom_mode_passes_the_factor_through() {
        let spreads = calculate_spreads(1, LayoutMode::Single);
        let infos = vec![PageInfo::new(612.0, 792.0, 0)];
        assert_eq!(compute_scale(ZoomMode::Custom, 1.5, &ctx(&spreads, &infos)), 1.5);
    }
}
