use bytes::Bytes;
use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressStyle};
use once_cell::sync::Lazy;
use peerseg_fetch::{
    FetchRequest, FetchStats, LoaderCallbacks, LoaderError, LoaderResponse, ResponseMeta,
};

const PB_STYLE: &str = "{spinner:.blue} {prefix:>12.cyan.bold} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {wide_msg}";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

static PB_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    let pb_style = match ProgressStyle::with_template(PB_STYLE) {
        Ok(pb_style) => pb_style.tick_chars(TICK).progress_chars(PB_CHARS),
        Err(_) => return None,
    };

    Some(pb_style)
});

/// Progress bar on stderr that follows one load's callbacks.
pub struct SegmentProgress {
    pb: ProgressBar,
}

impl SegmentProgress {
    pub fn new(prefix: &str) -> Self {
        let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        let pb = match PB_TEMPLATE.as_ref() {
            Some(style) => pb.with_style(style.clone()),
            None => pb,
        };
        pb.set_prefix(prefix.to_string());
        Self { pb }
    }

    fn sync(&self, stats: &FetchStats) {
        if let Some(total) = stats.bytes_total {
            self.pb.set_length(total);
        }
        self.pb.set_position(stats.bytes_loaded);
        if stats.is_retrying() {
            self.pb.set_message(format!("retry {}", stats.retry_count));
        }
    }
}

impl LoaderCallbacks for SegmentProgress {
    fn on_success(&self, _response: &LoaderResponse, stats: &FetchStats, _request: &FetchRequest) {
        self.sync(stats);
        self.pb.finish_with_message(format!("done, {}", HumanBytes(stats.bytes_loaded)));
    }

    fn on_error(
        &self,
        error: &LoaderError,
        stats: &FetchStats,
        _request: &FetchRequest,
        _meta: Option<&ResponseMeta>,
    ) {
        self.sync(stats);
        self.pb.abandon_with_message(format!("failed: {error}"));
    }

    fn on_timeout(&self, stats: &FetchStats, _request: &FetchRequest) {
        self.sync(stats);
        self.pb.abandon_with_message("timed out");
    }

    fn on_progress(&self, stats: &FetchStats, _request: &FetchRequest, _chunk: Option<&Bytes>) {
        self.sync(stats);
    }
}
