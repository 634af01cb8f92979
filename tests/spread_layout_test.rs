//! Spread partitioning and layout positioning properties

use pageflow::geometry::{
    calculate_spread_layouts, calculate_spreads, composed_rotation, find_visible_spread_range,
    rotated_page_size, snap_to_device, LayoutMode, LayoutParams, PageSlot,
};
use pageflow::PageInfo;

fn letter_pages(count: usize) -> Vec<PageInfo> {
    vec![PageInfo::new(612.0, 792.0, 0); count]
}

fn params(scale: f32, dpr: f32) -> LayoutParams {
    LayoutParams {
        scale,
        page_spacing: 8.0,
        spread_spacing: 16.0,
        dpi: 96.0,
        dpr,
        user_rotation: 0,
    }
}

#[test]
fn spreads_partition_all_pages_exactly_once() {
    let modes = [
        LayoutMode::Single,
        LayoutMode::Double,
        LayoutMode::DoubleOddRight,
        LayoutMode::DoubleOddLeft,
    ];
    for mode in modes {
        for count in 0..=25 {
            let spreads = calculate_spreads(count, mode);
            let mut pages: Vec<u32> = spreads.iter().flat_map(|s| s.pages()).collect();
            pages.sort_unstable();
            pages.dedup();
            assert_eq!(
                pages,
                (1..=count).collect::<Vec<_>>(),
                "mode={mode:?} count={count}"
            );
        }
    }
}

#[test]
fn odd_right_cover_is_always_alone_on_the_right() {
    for count in 1..=12 {
        let spreads = calculate_spreads(count, LayoutMode::DoubleOddRight);
        assert_eq!(spreads[0].slots, vec![PageSlot::Empty, PageSlot::Page(1)]);
    }
}

#[test]
fn odd_left_cover_and_trailing_page() {
    for count in 1..=12 {
        let spreads = calculate_spreads(count, LayoutMode::DoubleOddLeft);
        assert_eq!(spreads[0].slots, vec![PageSlot::Page(1), PageSlot::Empty]);

        if count >= 2 && count % 2 == 0 {
            let last = spreads.last().expect("non-empty");
            assert_eq!(last.slots, vec![PageSlot::Empty, PageSlot::Page(count)]);
        }
    }
}

#[test]
fn layout_tops_never_drift_from_the_snap_formula() {
    for dpr in [1.0, 1.25, 1.5, 2.0] {
        for scale in [0.5, 1.0, 1.7321] {
            let spreads = calculate_spreads(200, LayoutMode::Double);
            let infos = letter_pages(200);
            let p = params(scale, dpr);
            let plan = calculate_spread_layouts(&spreads, &infos, &p);

            let spacing = snap_to_device(p.spread_spacing, dpr);
            for i in 1..plan.layouts.len() {
                let prev = &plan.layouts[i - 1];
                let expected = snap_to_device(prev.top + prev.height + spacing, dpr);
                assert_eq!(
                    plan.layouts[i].top, expected,
                    "dpr={dpr} scale={scale} spread={i}"
                );
            }
        }
    }
}

#[test]
fn first_spread_starts_one_spacing_unit_down() {
    let spreads = calculate_spreads(3, LayoutMode::Single);
    let infos = letter_pages(3);
    let p = params(1.0, 2.0);
    let plan = calculate_spread_layouts(&spreads, &infos, &p);
    assert_eq!(plan.layouts[0].top, snap_to_device(p.spread_spacing, p.dpr));
}

#[test]
fn content_height_covers_the_last_spread_plus_spacing() {
    let spreads = calculate_spreads(5, LayoutMode::Single);
    let infos = letter_pages(5);
    let p = params(1.0, 1.0);
    let plan = calculate_spread_layouts(&spreads, &infos, &p);

    let last = plan.layouts.last().expect("non-empty");
    assert!(plan.content_height >= last.bottom());
}

#[test]
fn intrinsic_and_user_rotation_compose() {
    // 90 document + 90 user = 180: dimensions match the unrotated page.
    let page = PageInfo::new(612.0, 792.0, 90);
    assert_eq!(composed_rotation(page.rotation, 90), 180);
    assert_eq!(rotated_page_size(&page, 90), (612.0, 792.0));

    // A single quarter turn swaps the axes.
    assert_eq!(rotated_page_size(&page, 0), (792.0, 612.0));
}

#[test]
fn mixed_page_sizes_produce_per_spread_heights() {
    let spreads = calculate_spreads(2, LayoutMode::Single);
    let infos = vec![
        PageInfo::new(612.0, 792.0, 0),
        PageInfo::new(612.0, 396.0, 0),
    ];
    let plan = calculate_spread_layouts(&spreads, &infos, &params(1.0, 1.0));
    assert!(plan.layouts[0].height > plan.layouts[1].height);
}

#[test]
fn visible_range_walks_with_the_scroll_position() {
    let spreads = calculate_spreads(100, LayoutMode::Single);
    let infos = letter_pages(100);
    let plan = calculate_spread_layouts(&spreads, &infos, &params(1.0, 1.0));

    let viewport_h = 900.0;
    let mut last_start = 0;
    for step in 0..20 {
        let scroll = step as f32 * 1000.0;
        let (start, end) =
            find_visible_spread_range(&plan.layouts, scroll, viewport_h, 1).expect("non-empty");
        assert!(start <= end);
        assert!(start >= last_start, "range never moves backwards");
        // Every spread in the returned range minus the buffer intersects
        // the viewport.
        for layout in &plan.layouts[start..=end] {
            let near = layout.bottom() >= scroll - 2.0 * layout.height
                && layout.top <= scroll + viewport_h + 2.0 * layout.height;
            assert!(near, "spread {} far outside viewport", layout.spread_index);
        }
        last_start = start;
    }
}
