use tokio::time::Instant;

/// Source of timestamps for [`crate::FetchStats`].
///
/// Timers always run on tokio's clock; this only decides what "now" is when a
/// timestamp is recorded.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Reads tokio's clock, which follows `tokio::time::pause` in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
