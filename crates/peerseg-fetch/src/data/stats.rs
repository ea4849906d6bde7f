use tokio::time::Instant;

/// Timing and byte counters for one load.
///
/// Created when `load` starts and updated throughout the attempt loop. Every
/// callback receives the live record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchStats {
    /// When `load` was called.
    pub request_started_at: Instant,

    /// When the first response headers (or the first peer-store chunk) arrived.
    ///
    /// Never earlier than `request_started_at`.
    pub first_byte_at: Option<Instant>,

    /// When the payload was complete. Never earlier than `first_byte_at`.
    pub load_completed_at: Option<Instant>,

    /// Bytes received by the current attempt.
    pub bytes_loaded: u64,

    /// Expected payload size, if known.
    ///
    /// This may be `None` if the gateway does not send a Content-Length.
    pub bytes_total: Option<u64>,

    /// Retried failures so far (0 = first attempt).
    pub retry_count: u32,

    pub aborted: bool,
}

impl FetchStats {
    pub fn new(now: Instant) -> Self {
        Self {
            request_started_at: now,
            first_byte_at: None,
            load_completed_at: None,
            bytes_loaded: 0,
            bytes_total: None,
            retry_count: 0,
            aborted: false,
        }
    }

    /// Record the first byte, clamped to the request start.
    pub fn mark_first_byte(&mut self, now: Instant) {
        if self.first_byte_at.is_none() {
            self.first_byte_at = Some(now.max(self.request_started_at));
        }
    }

    /// Record a complete payload of `len` bytes.
    pub fn mark_completed(&mut self, now: Instant, len: u64) {
        self.mark_first_byte(now);
        let first = self.first_byte_at.unwrap_or(self.request_started_at);
        self.load_completed_at = Some(now.max(first));
        self.bytes_loaded = len;
        self.bytes_total = Some(len);
    }

    /// Account for a received chunk. `total` is the advertised length, if any.
    pub fn add_chunk(&mut self, len: u64, total: Option<u64>) {
        self.bytes_loaded += len;
        if let Some(total) = total {
            self.bytes_total = Some(total.max(self.bytes_loaded));
        }
    }

    /// Reset per-attempt counters before a retry.
    pub fn reset_attempt(&mut self) {
        self.bytes_loaded = 0;
        self.bytes_total = None;
    }

    /// Calculate the percentage of completion.
    ///
    /// Returns `None` if `bytes_total` is unknown.
    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        self.bytes_total.map(|total| {
            if total == 0 {
                if self.load_completed_at.is_some() {
                    100.0
                } else {
                    0.0
                }
            } else {
                (self.bytes_loaded as f64 / total as f64) * 100.0
            }
        })
    }

    /// Returns `true` if a retry is in progress or has happened.
    #[must_use]
    pub fn is_retrying(&self) -> bool {
        self.retry_count > 0
    }
}
