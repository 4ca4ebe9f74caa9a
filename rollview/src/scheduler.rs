//! # Render scheduler
//!
//! Runs viewport renders on a fixed pool of worker threads and hands the images back to the UI
//! thread. Documents travel as `Arc<SceneDocument>`, which cannot be mutated, so a job always
//! renders the scene exactly as it was submitted.
//!
//! There is no cancellation. Every job's result is delivered exactly once, in completion order,
//! tagged with the epoch it was submitted at. Consumers use the epoch to drop results that a newer
//! scene has made obsolete, see [`crate::compositor::Compositor`].

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use rollview_core::{scene::SceneDocument, RollID};

use crate::renderer::{RasterImage, RenderError, RenderParams, Renderer};
use crate::settings::RenderSettings;

pub struct JobMarker;
pub type JobID = RollID<JobMarker>;

/// Identifies a submitted render.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub id: JobID,
    pub epoch: u64,
    pub page_index: usize,
}

/// A finished render, successful or not.
#[derive(Debug)]
pub struct RenderResult {
    pub outcome: Result<RasterImage, RenderError>,
    pub page_index: usize,
    pub epoch: u64,
    pub job: JobHandle,
}

/// Scene version counter. Starts at zero, only ever grows.
#[derive(Debug, Default)]
pub struct EpochClock(AtomicU64);
impl EpochClock {
    #[must_use]
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
    /// Start a new epoch, returning it.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SchedulerError {
    #[error("failed to start render workers: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

type ResultCallback = Box<dyn FnMut(RenderResult)>;

/// Owned by the UI thread. Results come back through [`Self::dispatch_results`] or
/// [`Self::wait_dispatch`], which call the registered callback on the calling thread.
pub struct RenderScheduler {
    pool: rayon::ThreadPool,
    renderer: Renderer,
    epoch: EpochClock,
    results_send: crossbeam::channel::Sender<RenderResult>,
    results_recv: crossbeam::channel::Receiver<RenderResult>,
    on_result: Option<ResultCallback>,
    /// Submitted but not yet dispatched.
    pending: usize,
}
impl RenderScheduler {
    /// Start `worker_threads` workers, at least one.
    pub fn new(renderer: Renderer, worker_threads: usize) -> Result<Self, SchedulerError> {
        let workers = worker_threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|idx| format!("rollview-render-{idx}"))
            .build()?;
        let (results_send, results_recv) = crossbeam::channel::unbounded();
        log::debug!("Render scheduler started with {workers} workers");
        Ok(Self {
            pool,
            renderer,
            epoch: EpochClock::default(),
            results_send,
            results_recv,
            on_result: None,
            pending: 0,
        })
    }
    pub fn from_settings(settings: &RenderSettings) -> Result<Self, SchedulerError> {
        Self::new(settings.renderer(), settings.worker_threads)
    }
    #[must_use]
    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
    #[must_use]
    pub fn epoch(&self) -> &EpochClock {
        &self.epoch
    }
    /// Mark the scene as changed. Jobs submitted from now on carry the new epoch.
    pub fn advance_epoch(&self) -> u64 {
        self.epoch.advance()
    }
    /// Register the consumer of results, replacing any previous one.
    /// Results are only dispatched while a consumer is registered.
    pub fn on_result(&mut self, callback: impl FnMut(RenderResult) + 'static) {
        self.on_result = Some(Box::new(callback));
    }
    /// Jobs whose results have not been dispatched yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending
    }
    /// Queue a render at the current epoch.
    pub fn submit(&mut self, document: Arc<SceneDocument>, params: RenderParams) -> JobHandle {
        let epoch = self.epoch.current();
        self.submit_at_epoch(document, params, epoch)
    }
    /// Queue a render tagged with an explicit epoch, for hosts that version scenes themselves.
    pub fn submit_at_epoch(
        &mut self,
        document: Arc<SceneDocument>,
        params: RenderParams,
        epoch: u64,
    ) -> JobHandle {
        let job = JobHandle {
            id: JobID::next(),
            epoch,
            page_index: params.page_index,
        };
        log::trace!(
            "Submitting {} for {} page {} at epoch {epoch}",
            job.id,
            document.id(),
            params.page_index
        );
        let renderer = self.renderer;
        let send = self.results_send.clone();
        self.pending += 1;
        self.pool.spawn(move || {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                renderer.render(&document, &params)
            }))
            .unwrap_or(Err(RenderError::WorkerPanicked));
            if let Err(err) = &outcome {
                log::error!("Render {} failed: {err}", job.id);
            }
            // The receiver lives in the scheduler. If that's gone, so is anyone who cared.
            let _ = send.send(RenderResult {
                outcome,
                page_index: job.page_index,
                epoch: job.epoch,
                job,
            });
        });
        job
    }
    fn deliver(&mut self, result: RenderResult) {
        self.pending = self.pending.saturating_sub(1);
        if let Some(callback) = self.on_result.as_mut() {
            callback(result);
        }
    }
    /// Deliver every finished result to the consumer without blocking. Returns how many were
    /// delivered.
    pub fn dispatch_results(&mut self) -> usize {
        if self.on_result.is_none() {
            return 0;
        }
        let mut delivered = 0;
        while let Ok(result) = self.results_recv.try_recv() {
            self.deliver(result);
            delivered += 1;
        }
        delivered
    }
    /// Like [`Self::dispatch_results`], but waits up to `timeout` for at least one result if
    /// there are jobs in flight.
    pub fn wait_dispatch(&mut self, timeout: Duration) -> usize {
        if self.on_result.is_none() || self.pending == 0 {
            return 0;
        }
        match self.results_recv.recv_timeout(timeout) {
            Ok(first) => {
                self.deliver(first);
                1 + self.dispatch_results()
            }
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compositor::Compositor;
    use rollview_core::{
        color::Color,
        fonts::FontCatalog,
        geom::{PointMm, RectMm},
        scene::{ItemOptions, Stroke},
    };
    use std::{cell::RefCell, rc::Rc};

    fn document() -> Arc<SceneDocument> {
        let mut doc = SceneDocument::new(Arc::new(FontCatalog::empty()));
        doc.new_page(50.0, 50.0);
        doc.add_line(
            PointMm::new(0.0, 25.0),
            PointMm::new(50.0, 25.0),
            Stroke::solid(Color::BLACK, 1.0),
            ItemOptions::new(),
        )
        .unwrap();
        doc.into_shared()
    }
    fn drain(scheduler: &mut RenderScheduler) {
        for _ in 0..100 {
            if scheduler.pending() == 0 {
                return;
            }
            scheduler.wait_dispatch(Duration::from_millis(100));
        }
        panic!("renders never finished");
    }

    #[test]
    fn epochs() {
        let clock = EpochClock::default();
        assert_eq!(clock.current(), 0);
        assert_eq!(clock.advance(), 1);
        assert_eq!(clock.advance(), 2);
        assert_eq!(clock.current(), 2);
    }
    #[test]
    fn delivers_each_once() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut scheduler = RenderScheduler::new(Renderer::default(), 2).unwrap();
        assert_eq!(scheduler.worker_threads(), 2);
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();
        scheduler.on_result(move |result: RenderResult| sink.borrow_mut().push(result));

        let doc = document();
        let params = RenderParams::new(0, 2.0, RectMm::from_xywh(0.0, 0.0, 50.0, 50.0));
        let mut handles: Vec<JobHandle> = (0..6)
            .map(|_| scheduler.submit(doc.clone(), params))
            .collect();
        // Out of range page still gets exactly one (failed) result.
        handles.push(scheduler.submit(doc.clone(), RenderParams { page_index: 9, ..params }));
        assert_eq!(scheduler.pending(), 7);
        drain(&mut scheduler);

        let received = received.borrow();
        let mut ids: Vec<u64> = received.iter().map(|r| r.job.id.id()).collect();
        ids.sort_unstable();
        let mut expected: Vec<u64> = handles.iter().map(|h| h.id.id()).collect();
        expected.sort_unstable();
        assert_eq!(ids, expected);
        assert_eq!(
            received.iter().filter(|r| r.outcome.is_err()).count(),
            1
        );
        assert!(received
            .iter()
            .filter_map(|r| r.outcome.as_ref().ok())
            .all(|image| image.width() == 100));
        assert_eq!(scheduler.dispatch_results(), 0);
    }
    #[test]
    fn newest_epoch_displayed() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut scheduler = RenderScheduler::new(Renderer::default(), 3).unwrap();
        let compositor = Rc::new(RefCell::new(Compositor::new()));
        let target = compositor.clone();
        scheduler.on_result(move |result: RenderResult| {
            target.borrow_mut().apply(result);
        });

        let doc = document();
        let params = RenderParams::new(0, 1.0, RectMm::from_xywh(0.0, 0.0, 50.0, 50.0));
        scheduler.submit(doc.clone(), params);
        let newest = scheduler.advance_epoch();
        scheduler.submit(doc.clone(), params);
        scheduler.submit_at_epoch(doc, params, 0);
        drain(&mut scheduler);

        // Whatever order they finished in, the newest epoch is what's shown.
        assert_eq!(compositor.borrow().epoch(0), Some(newest));
        assert!(compositor.borrow().image(0).is_some());
    }
    #[test]
    fn no_consumer_no_dispatch() {
        let mut scheduler = RenderScheduler::new(Renderer::default(), 0).unwrap();
        assert_eq!(scheduler.worker_threads(), 1);
        scheduler.submit(
            document(),
            RenderParams::new(0, 1.0, RectMm::from_xywh(0.0, 0.0, 10.0, 10.0)),
        );
        assert_eq!(scheduler.wait_dispatch(Duration::from_millis(10)), 0);
        assert_eq!(scheduler.pending(), 1);
        let count = Rc::new(RefCell::new(0));
        let counter = count.clone();
        scheduler.on_result(move |result: RenderResult| {
            assert_eq!(result.outcome.map(|i| i.width()), Ok(10));
            *counter.borrow_mut() += 1;
        });
        drain(&mut scheduler);
        assert_eq!(*count.borrow(), 1);
    }
}
