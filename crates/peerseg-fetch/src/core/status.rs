/// What to do with a completed HTTP attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The payload is good.
    Success,

    /// Transient failure with retries left.
    Retry,

    /// Report the failure to the caller.
    Fail,
}

/// Returns `true` for the 2xx range.
///
/// # Examples
///
/// ```
/// use peerseg_fetch::core::is_success;
///
/// assert!(is_success(200));
/// assert!(is_success(206));
/// assert!(!is_success(304));
/// ```
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Returns `true` for the 4xx range. Such requests cannot succeed on retry.
pub fn is_client_error(status: u16) -> bool {
    (400..=499).contains(&status)
}

/// Classify an attempt that finished with `status`.
///
/// Status `0` stands for a network-level failure with no HTTP response and is
/// treated like a server error.
pub fn classify(status: u16, retry_count: u32, max_retries: u32) -> Verdict {
    if is_success(status) {
        Verdict::Success
    } else if retry_count >= max_retries || is_client_error(status) {
        Verdict::Fail
    } else {
        Verdict::Retry
    }
}
