use std::time::Duration;

/// Calculate the delay before a retry attempt using capped exponential backoff.
///
/// The delay formula is: `min(base * 2^retry_count, cap)`
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use peerseg_fetch::core::retry_delay;
///
/// let base = Duration::from_millis(50);
/// let cap = Duration::from_millis(200);
///
/// assert_eq!(retry_delay(0, base, cap), Duration::from_millis(50));
/// assert_eq!(retry_delay(1, base, cap), Duration::from_millis(100));
/// assert_eq!(retry_delay(2, base, cap), Duration::from_millis(200));
/// assert_eq!(retry_delay(3, base, cap), Duration::from_millis(200));
/// ```
pub fn retry_delay(retry_count: u32, base: Duration, cap: Duration) -> Duration {
    let multiplier = 2_u32.saturating_pow(retry_count);
    base.saturating_mul(multiplier).min(cap)
}

/// Backoff state for one load.
///
/// Starts at the configured initial delay; every call to [`Backoff::next_delay`]
/// hands out the current delay and doubles it for next time, never exceeding the
/// cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    current: Duration,
    cap: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, cap: Duration) -> Self {
        Self {
            current: initial.min(cap),
            cap,
        }
    }

    /// The delay the next retry will wait.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Take the delay for this retry and advance the state.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.cap);
        delay
    }
}
