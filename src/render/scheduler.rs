//! Render scheduler - cache, priority queue and the single in-flight slot
//!
//! Owns all render state for a viewer session: two bounded bitmap caches,
//! the pending queue, the focus pointers and the one in-flight job. All
//! mutation happens inside the public calls and [`RenderScheduler::pump`];
//! the worker thread touches nothing but its backend and the channels.

use std::time::{Duration, Instant};

use flume::{Receiver, Sender};

use crate::config::ViewerConfig;

use super::backend::RenderBackend;
use super::bitmap::RenderOutput;
use super::cache::BitmapCache;
use super::queue::RenderQueue;
use super::request::{
    DocId, RenderError, RenderKey, RenderRequest, RenderResult, RenderTicket, RenderType,
};
use super::worker::{render_worker, JobSpec, WorkerRequest, WorkerResponse};

/// The one render the backend is currently executing.
struct InFlight {
    key: RenderKey,
    waiters: Vec<Sender<RenderResult>>,
}

/// Counters for debug overlays
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub page_cache_entries: usize,
    pub thumbnail_cache_entries: usize,
    pub queued: usize,
    pub in_flight: bool,
}

/// Render cache and priority queue for one viewer session.
pub struct RenderScheduler {
    page_cache: BitmapCache,
    thumbnail_cache: BitmapCache,
    queue: RenderQueue,
    in_flight: Option<InFlight>,
    request_tx: Sender<WorkerRequest>,
    response_rx: Receiver<WorkerResponse>,
    dpi: f32,
    prerender_radius: u32,
    shut_down: bool,
}

impl RenderScheduler {
    /// Spawn the worker thread around `backend` and set up empty caches.
    #[must_use]
    pub fn new(backend: Box<dyn RenderBackend>, config: &ViewerConfig) -> Self {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        std::thread::spawn(move || {
            render_worker(backend, request_rx, response_tx);
        });

        Self {
            page_cache: BitmapCache::new(config.page_cache_capacity),
            thumbnail_cache: BitmapCache::new(config.thumbnail_cache_capacity),
            queue: RenderQueue::new(config.boost_distance),
            in_flight: None,
            request_tx,
            response_rx,
            dpi: config.render_dpi,
            prerender_radius: config.prerender_radius,
            shut_down: false,
        }
    }

    /// Request a render, reusing cached, in-flight or queued work when the
    /// key matches. A fresh request supersedes queued requests for the same
    /// page and render type at other scales.
    pub fn request_render(&mut self, request: RenderRequest) -> RenderTicket {
        if self.shut_down {
            return RenderTicket::resolved(Err(RenderError::ShutDown));
        }

        let key = request.key();

        if let Some(output) = self.cache_mut(request.kind).touch(&key) {
            log::trace!("render cache hit: {key}");
            return RenderTicket::resolved(Ok(output));
        }

        let (tx, ticket) = RenderTicket::channel();

        if let Some(in_flight) = &mut self.in_flight {
            if in_flight.key == key {
                in_flight.waiters.push(tx);
                return ticket;
            }
        }

        if self.queue.join(&key, tx.clone()) {
            return ticket;
        }

        let superseded = self.queue.supersede(&request);
        for stale in superseded {
            log::trace!("superseding queued render {} with {key}", stale.key);
            stale.settle(&Err(RenderError::Cancelled));
        }

        log::trace!("queueing render {key}");
        self.queue.push(request, tx);
        self.submit_next();
        ticket
    }

    /// Non-blocking cache peek. Does not refresh LRU recency.
    #[must_use]
    pub fn cached_render(
        &self,
        doc: &DocId,
        page: u32,
        kind: RenderType,
        scale: f32,
    ) -> Option<RenderOutput> {
        let key = RenderRequest::new(doc.clone(), page, kind, scale).key();
        self.cache(kind).peek(&key)
    }

    /// Cancel queued (never in-flight) requests matching the given axes;
    /// `None` matches everything on that axis.
    pub fn cancel_renders(
        &mut self,
        doc: Option<&DocId>,
        page: Option<u32>,
        kind: Option<RenderType>,
    ) {
        let removed = self.queue.cancel_matching(doc, page, kind);
        if !removed.is_empty() {
            log::trace!("cancelled {} queued renders", removed.len());
        }
        for item in removed {
            item.settle(&Err(RenderError::Cancelled));
        }
    }

    /// Drop cached bitmaps for a document and/or render type, releasing
    /// each one. Scale is part of the key and never invalidated on its own.
    pub fn invalidate_cache(&mut self, doc: Option<&DocId>, kind: Option<RenderType>) {
        if kind.is_none_or(|k| k == RenderType::Page) {
            self.page_cache.invalidate(doc, None);
        }
        if kind.is_none_or(|k| k == RenderType::Thumbnail) {
            self.thumbnail_cache.invalidate(doc, None);
        }
    }

    /// Move the page-render focus; queued page renders near it jump the
    /// queue. Called continuously as the user scrolls.
    pub fn boost_page_priority(&mut self, doc: DocId, page: u32) {
        self.queue.set_page_focus(doc, page);
        self.submit_next();
    }

    /// Move the thumbnail-render focus.
    pub fn boost_thumbnail_priority(&mut self, doc: DocId, page: u32) {
        self.queue.set_thumbnail_focus(doc, page);
        self.submit_next();
    }

    /// Fire-and-forget renders for the pages around `current_page` at the
    /// same scale, anticipating page flips. Failures and cancellations are
    /// swallowed with the dropped tickets.
    pub fn prerender_adjacent(
        &mut self,
        doc: DocId,
        current_page: u32,
        scale: f32,
        total_pages: u32,
    ) {
        self.boost_page_priority(doc.clone(), current_page);

        let mut pages = vec![current_page];
        for offset in 1..=self.prerender_radius {
            if current_page + offset <= total_pages {
                pages.push(current_page + offset);
            }
            if current_page > offset {
                pages.push(current_page - offset);
            }
        }

        for page in pages {
            let request = RenderRequest::new(doc.clone(), page, RenderType::Page, scale);
            drop(self.request_render(request));
        }
    }

    /// Drain completed worker responses, settle their waiters and submit
    /// the next queued job. Returns the number of responses handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(response) = self.response_rx.try_recv() {
            self.handle_response(response);
            self.submit_next();
            handled += 1;
        }
        handled
    }

    /// Pump, blocking between responses, until no work is queued or in
    /// flight. Returns false if the timeout elapsed first.
    pub fn pump_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if self.in_flight.is_none() && self.queue.is_empty() {
                return true;
            }
            match self.response_rx.recv_deadline(deadline) {
                Ok(response) => {
                    self.handle_response(response);
                    self.submit_next();
                }
                Err(_) => {
                    self.pump();
                    return self.in_flight.is_none() && self.queue.is_empty();
                }
            }
        }
    }

    /// Reject all pending work, release every cached bitmap and stop the
    /// worker. The scheduler is unusable afterwards.
    pub fn destroy(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        for item in self.queue.drain_all() {
            item.settle(&Err(RenderError::ShutDown));
        }
        if let Some(in_flight) = self.in_flight.take() {
            for waiter in in_flight.waiters {
                let _ = waiter.send(Err(RenderError::ShutDown));
            }
        }

        self.page_cache.clear();
        self.thumbnail_cache.clear();
        let _ = self.request_tx.send(WorkerRequest::Shutdown);
        log::debug!("render scheduler destroyed");
    }

    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            page_cache_entries: self.page_cache.len(),
            thumbnail_cache_entries: self.thumbnail_cache.len(),
            queued: self.queue.len(),
            in_flight: self.in_flight.is_some(),
        }
    }

    fn cache(&self, kind: RenderType) -> &BitmapCache {
        match kind {
            RenderType::Page => &self.page_cache,
            RenderType::Thumbnail => &self.thumbnail_cache,
        }
    }

    fn cache_mut(&mut self, kind: RenderType) -> &mut BitmapCache {
        match kind {
            RenderType::Page => &mut self.page_cache,
            RenderType::Thumbnail => &mut self.thumbnail_cache,
        }
    }

    /// Hand the head of the queue to the worker if the slot is free. The
    /// cache is double-checked first: it may have been filled while the
    /// request sat queued.
    fn submit_next(&mut self) {
        if self.in_flight.is_some() || self.shut_down {
            return;
        }

        while let Some(item) = self.queue.pop_head() {
            if let Some(output) = self.cache_mut(item.request.kind).touch(&item.key) {
                item.settle(&Ok(output));
                continue;
            }

            let job = JobSpec {
                key: item.key.clone(),
                request: item.request.clone(),
                dpi: self.dpi,
            };
            if self.request_tx.send(WorkerRequest::Render(job)).is_err() {
                log::error!("render worker disconnected; rejecting {}", item.key);
                item.settle(&Err(RenderError::ShutDown));
                continue;
            }

            log::trace!("render in flight: {}", item.key);
            self.in_flight = Some(InFlight {
                key: item.key,
                waiters: item.waiters,
            });
            return;
        }
    }

    fn handle_response(&mut self, response: WorkerResponse) {
        match response {
            WorkerResponse::Completed {
                key,
                request,
                output,
            } => {
                let waiters = self.take_in_flight_waiters(&key);
                if self.shut_down {
                    output.bitmap.release();
                    for waiter in waiters {
                        let _ = waiter.send(Err(RenderError::ShutDown));
                    }
                    return;
                }

                log::trace!("render completed: {key}");
                self.cache_mut(request.kind).insert(request, output.clone());
                let result = Ok(output);
                for waiter in waiters {
                    let _ = waiter.send(result.clone());
                }
            }

            WorkerResponse::Failed { key, error } => {
                log::debug!("render failed: {key}: {error}");
                let waiters = self.take_in_flight_waiters(&key);
                for waiter in waiters {
                    let _ = waiter.send(Err(error.clone()));
                }
            }
        }
    }

    fn take_in_flight_waiters(&mut self, key: &RenderKey) -> Vec<Sender<RenderResult>> {
        match self.in_flight.take() {
            Some(in_flight) if &in_flight.key == key => in_flight.waiters,
            other => {
                // A response with no matching slot can only follow teardown.
                self.in_flight = other;
                Vec::new()
            }
        }
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        self.destroy();
    }
}
