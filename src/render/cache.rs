//! Bounded LRU cache for completed renders
//!
//! One cache space per render type; evictions, invalidations and clears all
//! release the bitmap explicitly before dropping the entry.

use std::num::NonZeroUsize;
use std::time::Instant;

use lru::LruCache;

use super::bitmap::RenderOutput;
use super::request::{DocId, RenderKey, RenderRequest, RenderType};

struct CacheEntry {
    request: RenderRequest,
    output: RenderOutput,
    last_access: Instant,
}

impl CacheEntry {
    fn release(self) {
        self.output.bitmap.release();
    }
}

/// A bounded cache of rendered bitmaps keyed by render key.
pub struct BitmapCache {
    entries: LruCache<RenderKey, CacheEntry>,
}

impl BitmapCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).expect("1 is non-zero")),
            ),
        }
    }

    /// Cache hit: refresh recency and return a shared handle.
    pub fn touch(&mut self, key: &RenderKey) -> Option<RenderOutput> {
        let entry = self.entries.get_mut(key)?;
        entry.last_access = Instant::now();
        Some(entry.output.clone())
    }

    /// Non-promoting lookup for [`peek`-style] consumers.
    #[must_use]
    pub fn peek(&self, key: &RenderKey) -> Option<RenderOutput> {
        self.entries.peek(key).map(|e| e.output.clone())
    }

    #[must_use]
    pub fn contains(&self, key: &RenderKey) -> bool {
        self.entries.contains(key)
    }

    /// Insert a completed render, releasing whatever the capacity limit
    /// pushes out (or an older entry under the same key).
    pub fn insert(&mut self, request: RenderRequest, output: RenderOutput) {
        let key = request.key();
        let entry = CacheEntry {
            request,
            output,
            last_access: Instant::now(),
        };
        if let Some((evicted_key, evicted)) = self.entries.push(key, entry) {
            log::trace!(
                "render cache evicting {evicted_key} (idle {:?})",
                evicted.last_access.elapsed()
            );
            evicted.release();
        }
    }

    /// Drop entries matching the given document and/or render type,
    /// releasing each. `None` axes match everything.
    pub fn invalidate(&mut self, doc: Option<&DocId>, kind: Option<RenderType>) {
        let matching: Vec<RenderKey> = self
            .entries
            .iter()
            .filter(|(_, e)| {
                doc.is_none_or(|d| &e.request.doc == d)
                    && kind.is_none_or(|k| e.request.kind == k)
            })
            .map(|(k, _)| k.clone())
            .collect();

        for key in matching {
            if let Some(entry) = self.entries.pop(&key) {
                entry.release();
            }
        }
    }

    /// Release and drop every entry.
    pub fn clear(&mut self) {
        while let Some((_, entry)) = self.entries.pop_lru() {
            entry.release();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::render::bitmap::Bitmap;

    fn request(page: u32) -> RenderRequest {
        RenderRequest::new(DocId::new("doc"), page, RenderType::Page, 1.0)
    }

    fn output() -> RenderOutput {
        RenderOutput::new(Bitmap::from_rgba(vec![0u8; 4], 1, 1))
    }

    #[test]
    fn insert_and_lookup() {
        let mut cache = BitmapCache::new(10);
        let req = request(1);
        cache.insert(req.clone(), output());

        assert!(cache.contains(&req.key()));
        assert!(cache.touch(&req.key()).is_some());
        assert!(cache.peek(&req.key()).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn eviction_releases_the_oldest_entry() {
        let mut cache = BitmapCache::new(2);
        let first = output();
        let first_bitmap = Arc::clone(&first.bitmap);
        cache.insert(request(1), first);
        cache.insert(request(2), output());

        // Touch page 1 so page 2 becomes the LRU victim.
        let _ = cache.touch(&request(1).key());
        cache.insert(request(3), output());

        assert!(cache.contains(&request(1).key()));
        assert!(!cache.contains(&request(2).key()));
        assert!(!first_bitmap.is_released());
    }

    #[test]
    fn evicted_bitmap_is_released() {
        let mut cache = BitmapCache::new(1);
        let first = output();
        let first_bitmap = Arc::clone(&first.bitmap);
        cache.insert(request(1), first);
        cache.insert(request(2), output());

        assert!(first_bitmap.is_released());
    }

    #[test]
    fn replacing_a_key_releases_the_old_bitmap() {
        let mut cache = BitmapCache::new(4);
        let first = output();
        let first_bitmap = Arc::clone(&first.bitmap);
        cache.insert(request(1), first);
        cache.insert(request(1), output());

        assert_eq!(cache.len(), 1);
        assert!(first_bitmap.is_released());
    }

    #[test]
    fn scoped_invalidation_releases_only_matches() {
        let mut cache = BitmapCache::new(10);
        let kept = output();
        let kept_bitmap = Arc::clone(&kept.bitmap);
        let dropped = output();
        let dropped_bitmap = Arc::clone(&dropped.bitmap);

        cache.insert(request(1), kept);
        cache.insert(
            RenderRequest::new(DocId::new("other"), 1, RenderType::Page, 1.0),
            dropped,
        );

        cache.invalidate(Some(&DocId::new("other")), None);
        assert_eq!(cache.len(), 1);
        assert!(dropped_bitmap.is_released());
        assert!(!kept_bitmap.is_released());
    }

    #[test]
    fn clear_releases_everything() {
        let mut cache = BitmapCache::new(10);
        let bitmaps: Vec<_> = (1..=3)
            .map(|p| {
                let out = output();
                let handle = Arc::clone(&out.bitmap);
                cache.insert(request(p), out);
                handle
            })
            .collect();

        cache.clear();
        assert!(cache.is_empty());
        assert!(bitmaps.iter().all(|b| b.is_released()));
    }
}
