//! Pending render queue with focus-distance priority
//!
//! A single mutable queue shared by both render types. Order is recomputed
//! on every enqueue and boost: boosted page requests first (nearest the
//! page focus), then boosted thumbnails, then remaining pages, then
//! remaining thumbnails, FIFO within each unboosted group.

use super::request::{DocId, RenderKey, RenderRequest, RenderResult, RenderType};

/// The "center of attention" for one render type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Focus {
    pub doc: DocId,
    pub page: u32,
}

/// A queued request plus everyone waiting on it.
pub(crate) struct QueuedRender {
    pub request: RenderRequest,
    pub key: RenderKey,
    pub seq: u64,
    pub waiters: Vec<flume::Sender<RenderResult>>,
}

impl QueuedRender {
    /// Settle every waiter with a clone of the result. Disconnected waiters
    /// (fire-and-forget callers) are silently skipped.
    pub fn settle(self, result: &RenderResult) {
        for waiter in self.waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

pub(crate) struct RenderQueue {
    items: Vec<QueuedRender>,
    page_focus: Option<Focus>,
    thumbnail_focus: Option<Focus>,
    boost_distance: u32,
    next_seq: u64,
}

impl RenderQueue {
    pub fn new(boost_distance: u32) -> Self {
        Self {
            items: Vec::new(),
            page_focus: None,
            thumbnail_focus: None,
            boost_distance,
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Attach a waiter to an already-queued identical request, if any.
    pub fn join(&mut self, key: &RenderKey, waiter: flume::Sender<RenderResult>) -> bool {
        if let Some(item) = self.items.iter_mut().find(|i| i.key == *key) {
            item.waiters.push(waiter);
            true
        } else {
            false
        }
    }

    /// Enqueue a new unit of work and re-sort.
    pub fn push(&mut self, request: RenderRequest, waiter: flume::Sender<RenderResult>) {
        let key = request.key();
        self.items.push(QueuedRender {
            request,
            key,
            seq: self.next_seq,
            waiters: vec![waiter],
        });
        self.next_seq += 1;
        self.sort();
    }

    /// Remove queued requests for the same page and render type at any
    /// other scale — a newer request supersedes them. Returns the removed
    /// entries for the caller to reject.
    pub fn supersede(&mut self, request: &RenderRequest) -> Vec<QueuedRender> {
        let key = request.key();
        self.drain_where(|item| item.key != key && item.request.same_page_and_kind(request))
    }

    /// Remove queued requests matching the given axes (`None` matches all).
    pub fn cancel_matching(
        &mut self,
        doc: Option<&DocId>,
        page: Option<u32>,
        kind: Option<RenderType>,
    ) -> Vec<QueuedRender> {
        self.drain_where(|item| {
            doc.is_none_or(|d| &item.request.doc == d)
                && page.is_none_or(|p| item.request.page == p)
                && kind.is_none_or(|k| item.request.kind == k)
        })
    }

    /// Take the highest-priority request off the queue.
    pub fn pop_head(&mut self) -> Option<QueuedRender> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }

    /// Remove everything (teardown).
    pub fn drain_all(&mut self) -> Vec<QueuedRender> {
        std::mem::take(&mut self.items)
    }

    pub fn set_page_focus(&mut self, doc: DocId, page: u32) {
        self.page_focus = Some(Focus { doc, page });
        self.sort();
    }

    pub fn set_thumbnail_focus(&mut self, doc: DocId, page: u32) {
        self.thumbnail_focus = Some(Focus { doc, page });
        self.sort();
    }

    /// Distance to the matching focus, if this request qualifies for a
    /// boost. Requests for other documents (or with no focus set) never do.
    fn boost_distance_for(&self, request: &RenderRequest) -> Option<u32> {
        let focus = match request.kind {
            RenderType::Page => self.page_focus.as_ref(),
            RenderType::Thumbnail => self.thumbnail_focus.as_ref(),
        }?;
        if focus.doc != request.doc {
            return None;
        }
        let distance = focus.page.abs_diff(request.page);
        (distance <= self.boost_distance).then_some(distance)
    }

    /// Re-rank the queue into the four priority groups.
    fn sort(&mut self) {
        let mut items = std::mem::take(&mut self.items);
        let rank = |item: &QueuedRender| -> (u8, u32, u64) {
            let boosted = self.boost_distance_for(&item.request);
            let group = match (item.request.kind, boosted.is_some()) {
                (RenderType::Page, true) => 0,
                (RenderType::Thumbnail, true) => 1,
                (RenderType::Page, false) => 2,
                (RenderType::Thumbnail, false) => 3,
            };
            (group, boosted.unwrap_or(0), item.seq)
        };
        items.sort_by_key(rank);
        self.items = items;
    }

    fn drain_where(&mut self, mut pred: impl FnMut(&QueuedRender) -> bool) -> Vec<QueuedRender> {
        let mut removed = Vec::new();
        let mut i = 0;
        while i < self.items.len() {
            if pred(&self.items[i]) {
                removed.push(self.items.remove(i));
            } else {
                i += 1;
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::request::RenderError;

    fn doc() -> DocId {
        DocId::new("doc")
    }

    fn queue_with(requests: &[(u32, RenderType)]) -> RenderQueue {
        let mut queue = RenderQueue::new(5);
        for (page, kind) in requests {
            let (tx, _rx) = flume::bounded(1);
            queue.push(RenderRequest::new(doc(), *page, *kind, 1.0), tx);
        }
        queue
    }

    fn order(queue: &mut RenderQueue) -> Vec<(u32, RenderType)> {
        let mut pages = Vec::new();
        while let Some(item) = queue.pop_head() {
            pages.push((item.request.page, item.request.kind));
        }
        pages
    }

    #[test]
    fn boosted_pages_lead_sorted_by_distance() {
        let mut queue = queue_with(&[
            (20, RenderType::Page),
            (13, RenderType::Page),
            (11, RenderType::Thumbnail),
            (10, RenderType::Page),
        ]);
        queue.set_page_focus(doc(), 10);
        queue.set_thumbnail_focus(doc(), 10);

        let order = order(&mut queue);
        assert_eq!(
            order,
            vec![
                (10, RenderType::Page),
                (13, RenderType::Page),
                (11, RenderType::Thumbnail),
                (20, RenderType::Page),
            ]
        );
    }

    #[test]
    fn other_documents_are_never_boosted() {
        let mut queue = RenderQueue::new(5);
        let (tx, _rx) = flume::bounded(1);
        queue.push(RenderRequest::new(DocId::new("other"), 1, RenderType::Page, 1.0), tx);
        let (tx, _rx) = flume::bounded(1);
        queue.push(RenderRequest::new(doc(), 9, RenderType::Page, 1.0), tx);
        queue.set_page_focus(doc(), 10);

        let head = queue.pop_head().expect("non-empty");
        assert_eq!(head.request.page, 9);
        assert_eq!(head.request.doc, doc());
    }

    #[test]
    fn unboosted_groups_stay_fifo() {
        let mut queue = queue_with(&[
            (5, RenderType::Thumbnail),
            (3, RenderType::Page),
            (7, RenderType::Thumbnail),
            (1, RenderType::Page),
        ]);

        let order = order(&mut queue);
        assert_eq!(
            order,
            vec![
                (3, RenderType::Page),
                (1, RenderType::Page),
                (5, RenderType::Thumbnail),
                (7, RenderType::Thumbnail),
            ]
        );
    }

    #[test]
    fn supersede_removes_other_scales_only() {
        let mut queue = RenderQueue::new(5);
        let (tx, rx_old) = flume::bounded(1);
        queue.push(RenderRequest::new(doc(), 3, RenderType::Page, 1.0), tx);
        let (tx, _rx) = flume::bounded(1);
        queue.push(RenderRequest::new(doc(), 3, RenderType::Thumbnail, 1.0), tx);

        let newer = RenderRequest::new(doc(), 3, RenderType::Page, 2.0);
        let removed = queue.supersede(&newer);
        assert_eq!(removed.len(), 1);
        for item in removed {
            item.settle(&Err(RenderError::Cancelled));
        }

        assert!(matches!(rx_old.try_recv(), Ok(Err(RenderError::Cancelled))));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn join_attaches_to_existing_entry() {
        let mut queue = RenderQueue::new(5);
        let request = RenderRequest::new(doc(), 1, RenderType::Page, 1.0);
        let (tx, _rx) = flume::bounded(1);
        queue.push(request.clone(), tx);

        let (tx2, _rx2) = flume::bounded(1);
        assert!(queue.join(&request.key(), tx2));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop_head().expect("one entry").waiters.len(), 2);
    }
}
