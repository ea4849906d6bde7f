use std::cell::Cell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::Outcome;
use crate::data::{FetchRequest, FetchStats, LoaderResponse, ResponseMeta};
use crate::error::LoaderError;

/// The streaming engine's view of a load.
///
/// Exactly one of `on_success`, `on_error` or `on_timeout` is called per load,
/// and it is always the last call. `on_progress` may be called any number of
/// times before it. Nothing is called once the load has been aborted.
///
/// Callbacks run on the fetcher's task while it holds the load's statistics,
/// so they must not block for long. Calling [`crate::SegmentFetcher::abort`]
/// from inside a callback is allowed.
pub trait LoaderCallbacks: Send + Sync {
    fn on_success(&self, response: &LoaderResponse, stats: &FetchStats, request: &FetchRequest);

    fn on_error(
        &self,
        error: &LoaderError,
        stats: &FetchStats,
        request: &FetchRequest,
        meta: Option<&ResponseMeta>,
    );

    fn on_timeout(&self, stats: &FetchStats, request: &FetchRequest);

    /// Called after each body chunk with the updated statistics.
    fn on_progress(&self, _stats: &FetchStats, _request: &FetchRequest, _chunk: Option<&Bytes>) {}
}

/// How a load ended, before it is reported.
#[derive(Debug)]
pub(crate) enum Terminal {
    Success(LoaderResponse),
    Timeout,
    Error(LoaderError, Option<ResponseMeta>),
}

/// State shared between a running load and the fetcher that owns it.
///
/// The mutex guards the statistics and doubles as the dispatch gate: callbacks
/// are invoked while it is held, and `abort` takes it before returning.
#[derive(Debug)]
pub(crate) struct Shared {
    stats: Mutex<FetchStats>,
    cancel: CancellationToken,
}

thread_local! {
    // Address of the `Shared` whose callback is running on this thread.
    static DISPATCHING: Cell<usize> = const { Cell::new(0) };
}

struct DispatchScope {
    prev: usize,
}

impl DispatchScope {
    fn enter(shared: &Shared) -> Self {
        let id = shared as *const Shared as usize;
        Self {
            prev: DISPATCHING.with(|current| current.replace(id)),
        }
    }
}

impl Drop for DispatchScope {
    fn drop(&mut self) {
        DISPATCHING.with(|current| current.set(self.prev));
    }
}

impl Shared {
    pub(crate) fn new(started_at: Instant) -> Arc<Self> {
        Arc::new(Self {
            stats: Mutex::new(FetchStats::new(started_at)),
            cancel: CancellationToken::new(),
        })
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn lock(&self) -> MutexGuard<'_, FetchStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_own_callback(&self) -> bool {
        DISPATCHING.with(|current| current.get()) == self as *const Shared as usize
    }

    /// Cancel the load and wait out any callback running on another thread.
    pub(crate) fn abort(&self) {
        self.cancel.cancel();
        // From inside one of our own callbacks the lock is already held; the
        // dispatcher marks the stats once the callback returns.
        if !self.in_own_callback() {
            self.lock().aborted = true;
        }
    }

    /// A copy of the statistics, or `None` when called from one of this load's
    /// callbacks (which already receive them).
    pub(crate) fn snapshot(&self) -> Option<FetchStats> {
        if self.in_own_callback() {
            return None;
        }
        Some(self.lock().clone())
    }
}

/// Routes one load's events to its callbacks through the shared gate.
pub(crate) struct Dispatcher {
    shared: Arc<Shared>,
    callbacks: Arc<dyn LoaderCallbacks>,
}

impl Dispatcher {
    pub(crate) fn new(shared: Arc<Shared>, callbacks: Arc<dyn LoaderCallbacks>) -> Self {
        Self { shared, callbacks }
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        self.shared.token()
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut FetchStats) -> R) -> R {
        f(&mut *self.shared.lock())
    }

    /// Run `emit` with the live statistics unless the load was aborted.
    ///
    /// Returns `false` if the load was aborted before or during the call.
    fn dispatch(&self, emit: impl FnOnce(&dyn LoaderCallbacks, &mut FetchStats)) -> bool {
        let mut stats = self.shared.lock();
        if self.is_aborted() {
            stats.aborted = true;
            return false;
        }
        {
            let _scope = DispatchScope::enter(&self.shared);
            emit(self.callbacks.as_ref(), &mut *stats);
        }
        if self.is_aborted() {
            stats.aborted = true;
            return false;
        }
        true
    }

    /// Account for a body chunk and report progress.
    pub(crate) fn progress(&self, request: &FetchRequest, chunk: &Bytes, total: Option<u64>) -> bool {
        self.dispatch(|callbacks, stats| {
            stats.add_chunk(chunk.len() as u64, total);
            callbacks.on_progress(stats, request, Some(chunk));
        })
    }

    /// Report the terminal outcome. Returns `None` if the load was aborted
    /// first, in which case no callback ran.
    pub(crate) fn finish(&self, request: &FetchRequest, now: Instant, terminal: Terminal) -> Option<Outcome> {
        let mut outcome = None;
        self.dispatch(|callbacks, stats| {
            outcome = Some(match terminal {
                Terminal::Success(response) => {
                    stats.mark_completed(now, response.data.len() as u64);
                    callbacks.on_success(&response, stats, request);
                    Outcome::Success {
                        response,
                        stats: stats.clone(),
                    }
                }
                Terminal::Timeout => {
                    callbacks.on_timeout(stats, request);
                    Outcome::Timeout { stats: stats.clone() }
                }
                Terminal::Error(error, meta) => {
                    callbacks.on_error(&error, stats, request, meta.as_ref());
                    Outcome::Error {
                        error,
                        stats: stats.clone(),
                        meta,
                    }
                }
            });
        });
        outcome
    }
}
