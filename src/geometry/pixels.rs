//! Device-pixel alignment helpers
//!
//! All layout math that produces positions or sizes shared between adjacent
//! elements goes through [`snap_to_device`] so floating-point drift cannot
//! leave a one-device-pixel gap or overlap between neighbors.

/// Smallest device pixel ratio we accept; anything at or below zero is
/// treated as an unscaled display.
const MIN_DPR: f32 = 1.0;

fn sane_dpr(dpr: f32) -> f32 {
    if dpr.is_finite() && dpr > 0.0 {
        dpr
    } else {
        MIN_DPR
    }
}

/// Convert a CSS-pixel value to whole device pixels.
#[must_use]
pub fn to_device_pixels(css: f32, dpr: f32) -> f32 {
    (css * sane_dpr(dpr)).round()
}

/// Convert a device-pixel value back to CSS pixels.
#[must_use]
pub fn to_css_pixels(device: f32, dpr: f32) -> f32 {
    device / sane_dpr(dpr)
}

/// Quantize a CSS-pixel value to the device-pixel grid.
#[must_use]
pub fn snap_to_device(css: f32, dpr: f32) -> f32 {
    to_css_pixels(to_device_pixels(css, dpr), dpr)
}

/// Quantize upward to the device-pixel grid.
///
/// Used where rounding down would under-cover (e.g. a backdrop that must
/// span the whole viewport).
#[must_use]
pub fn snap_to_device_ceil(css: f32, dpr: f32) -> f32 {
    let dpr = sane_dpr(dpr);
    (css * dpr).ceil() / dpr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_is_idempotent() {
        for dpr in [1.0, 1.25, 1.5, 2.0, 3.0] {
            for css in [0.0, 0.3, 10.7, 333.333, 8191.9] {
                let once = snap_to_device(css, dpr);
                assert_eq!(once, snap_to_device(once, dpr), "dpr={dpr} css={css}");
            }
        }
    }

    #[test]
    fn snapped_values_land_on_device_grid() {
        let dpr = 1.25;
        let snapped = snap_to_device(10.3, dpr);
        let device = snapped * dpr;
        assert!((device - device.round()).abs() < 1e-4);
    }

    #[test]
    fn ceil_variant_never_under_covers() {
        for dpr in [1.0, 1.25, 2.0] {
            for css in [0.01, 5.3, 99.999] {
                assert!(snap_to_device_ceil(css, dpr) >= css - 1e-5);
            }
        }
    }

    #[test]
    fn degenerate_dpr_behaves_as_unscaled() {
        assert_eq!(to_device_pixels(7.4, 0.0), 7.0);
        assert_eq!(to_device_pixels(7.4, f32::NAN), 7.0);
        assert_eq!(snap_to_device(7.4, -2.0), 7.0);
    }
}
