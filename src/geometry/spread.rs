//! Spread partitioning
//!
//! A spread is the visual unit of one or two pages shown side by side. Every
//! page of the document lands in exactly one slot of exactly one spread; the
//! assignment depends only on the page count and the layout mode, so spreads
//! are recomputed only when either changes.

use serde::{Deserialize, Serialize};

/// Page layout mode for spread assembly
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// One page per spread
    #[default]
    Single,
    /// Pages paired (1,2), (3,4), ...
    Double,
    /// Lone cover on the right, then pairs starting at page 2
    DoubleOddRight,
    /// Lone cover on the left, pairs read right-to-left
    DoubleOddLeft,
}

/// A position within a spread
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageSlot {
    /// A 1-based page number
    Page(u32),
    /// No page (cover padding or trailing odd page)
    Empty,
}

impl PageSlot {
    #[must_use]
    pub fn page(self) -> Option<u32> {
        match self {
            Self::Page(p) => Some(p),
            Self::Empty => None,
        }
    }
}

/// One or two page slots displayed together
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spread {
    /// Position in the spread sequence
    pub index: usize,
    /// Ordered slots, one or two of them
    pub slots: Vec<PageSlot>,
}

impl Spread {
    fn new(index: usize, slots: Vec<PageSlot>) -> Self {
        debug_assert!(!slots.is_empty() && slots.len() <= 2);
        Self { index, slots }
    }

    /// Iterate the page numbers present in this spread
    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots.iter().filter_map(|s| s.page())
    }

    /// First non-empty page, if any
    #[must_use]
    pub fn first_page(&self) -> Option<u32> {
        self.pages().next()
    }

    /// Whether the given 1-based page lives in this spread
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.pages().any(|p| p == page)
    }
}

/// Partition `page_count` pages into spreads for the given layout mode.
///
/// Deterministic and pure: equal inputs always produce the same spreads.
#[must_use]
pub fn calculate_spreads(page_count: u32, mode: LayoutMode) -> Vec<Spread> {
    let mut spreads = Vec::new();
    if page_count == 0 {
        return spreads;
    }

    match mode {
        LayoutMode::Single => {
            for page in 1..=page_count {
                spreads.push(Spread::new(spreads.len(), vec![PageSlot::Page(page)]));
            }
        }

        LayoutMode::Double => {
            let mut page = 1;
            while page <= page_count {
                let second = if page + 1 <= page_count {
                    PageSlot::Page(page + 1)
                } else {
                    PageSlot::Empty
                };
                spreads.push(Spread::new(
                    spreads.len(),
                    vec![PageSlot::Page(page), second],
                ));
                page += 2;
            }
        }

        LayoutMode::DoubleOddRight => {
            spreads.push(Spread::new(0, vec![PageSlot::Empty, PageSlot::Page(1)]));
            let mut page = 2;
            while page <= page_count {
                let second = if page + 1 <= page_count {
                    PageSlot::Page(page + 1)
                } else {
                    PageSlot::Empty
                };
                spreads.push(Spread::new(
                    spreads.len(),
                    vec![PageSlot::Page(page), second],
                ));
                page += 2;
            }
        }

        LayoutMode::DoubleOddLeft => {
            spreads.push(Spread::new(0, vec![PageSlot::Page(1), PageSlot::Empty]));
            // Reading order is right-to-left within each pair: (3,2), (5,4), ...
            let mut odd = 3;
            while odd <= page_count {
                spreads.push(Spread::new(
                    spreads.len(),
                    vec![PageSlot::Page(odd), PageSlot::Page(odd - 1)],
                ));
                odd += 2;
            }
            if page_count >= 2 && page_count % 2 == 0 {
                spreads.push(Spread::new(
                    spreads.len(),
                    vec![PageSlot::Empty, PageSlot::Page(page_count)],
                ));
            }
        }
    }

    spreads
}

/// Find the spread containing the given 1-based page.
#[must_use]
pub fn spread_index_for_page(spreads: &[Spread], page: u32) -> Option<usize> {
    spreads.iter().position(|s| s.contains(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_pages(spreads: &[Spread]) -> Vec<u32> {
        spreads.iter().flat_map(|s| s.pages()).collect()
    }

    #[test]
    fn single_mode_one_page_per_spread() {
        let spreads = calculate_spreads(4, LayoutMode::Single);
        assert_eq!(spreads.len(), 4);
        assert_eq!(collect_pages(&spreads), vec![1, 2, 3, 4]);
    }

    #[test]
    fn double_mode_pairs_with_trailing_empty() {
        let spreads = calculate_spreads(5, LayoutMode::Double);
        assert_eq!(spreads.len(), 3);
        assert_eq!(spreads[0].slots, vec![PageSlot::Page(1), PageSlot::Page(2)]);
        assert_eq!(spreads[2].slots, vec![PageSlot::Page(5), PageSlot::Empty]);
    }

    #[test]
    fn odd_right_has_lone_cover_on_the_right() {
        let spreads = calculate_spreads(4, LayoutMode::DoubleOddRight);
        assert_eq!(spreads[0].slots, vec![PageSlot::Empty, PageSlot::Page(1)]);
        assert_eq!(spreads[1].slots, vec![PageSlot::Page(2), PageSlot::Page(3)]);
        assert_eq!(spreads[2].slots, vec![PageSlot::Page(4), PageSlot::Empty]);
    }

    #[test]
    fn odd_left_reads_right_to_left_with_trailing_last_page() {
        let spreads = calculate_spreads(4, LayoutMode::DoubleOddLeft);
        assert_eq!(spreads[0].slots, vec![PageSlot::Page(1), PageSlot::Empty]);
        assert_eq!(spreads[1].slots, vec![PageSlot::Page(3), PageSlot::Page(2)]);
        assert_eq!(spreads[2].slots, vec![PageSlot::Empty, PageSlot::Page(4)]);
    }

    #[test]
    fn every_page_appears_exactly_once_in_every_mode() {
        let modes = [
            LayoutMode::Single,
            LayoutMode::Double,
            LayoutMode::DoubleOddRight,
            LayoutMode::DoubleOddLeft,
        ];
        for mode in modes {
            for count in 0..=12 {
                let spreads = calculate_spreads(count, mode);
                let mut pages = collect_pages(&spreads);
                pages.sort_unstable();
                let expected: Vec<u32> = (1..=count).collect();
                assert_eq!(pages, expected, "mode={mode:?} count={count}");
            }
        }
    }

    #[test]
    fn empty_document_yields_no_spreads() {
        for mode in [LayoutMode::Single, LayoutMode::DoubleOddLeft] {
            assert!(calculate_spreads(0, mode).is_empty());
        }
    }

    #[test]
    fn spread_lookup_by_page() {
        let spreads = calculate_spreads(6, LayoutMode::Double);
        assert_eq!(spread_index_for_page(&spreads, 1), Some(0));
        assert_eq!(spread_index_for_page(&spreads, 4), Some(1));
        assert_eq!(spread_index_for_page(&spreads, 7), None);
    }
}
