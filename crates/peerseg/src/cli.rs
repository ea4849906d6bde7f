use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use peerseg_fetch::FetchRequest;

use crate::settings::Overrides;

#[derive(Clone, Debug, Parser)]
#[command(name = "peerseg", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// Layered configuration file.
    #[arg(long, short, global = true, default_value = "peerseg.toml")]
    pub config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "f", name = "fetch", about = "Fetch one segment")]
    Fetch(FetchArg),
    #[command(alias = "cfg", name = "config", about = "Print the effective configuration")]
    Config(TuneArg),
}

#[derive(Clone, Debug, Args)]
pub struct FetchArg {
    /// Segment URL or path; only its last path component is used.
    pub url: String,

    /// Write the payload here instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Decode the payload as text.
    #[arg(long)]
    pub text: bool,

    /// First byte of the requested range.
    #[arg(long, requires = "range_end")]
    pub range_start: Option<u64>,

    /// One past the last byte of the requested range.
    #[arg(long)]
    pub range_end: Option<u64>,

    #[command(flatten)]
    pub tune: TuneArg,
}

impl FetchArg {
    /// The load described by the arguments. A range without a start begins at 0.
    pub fn request(&self) -> FetchRequest {
        let mut request = FetchRequest::new(self.url.clone());
        if self.text {
            request = request.text();
        }
        if let Some(end) = self.range_end {
            request = request.range(self.range_start.unwrap_or(0), end);
        }
        request
    }
}

/// Command-line overrides for the layered configuration.
#[derive(Clone, Debug, Default, Args)]
pub struct TuneArg {
    /// HTTP gateway base URL.
    #[arg(long)]
    pub gateway: Option<String>,

    /// Content hash of the segment directory.
    #[arg(long)]
    pub root: Option<String>,

    /// Peer store RPC endpoint.
    #[arg(long)]
    pub peer_api: Option<String>,

    /// Always use the HTTP gateway.
    #[arg(long)]
    pub no_peer: bool,

    #[arg(long)]
    pub timeout_ms: Option<u64>,

    #[arg(long)]
    pub retries: Option<u32>,

    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    #[arg(long)]
    pub max_retry_delay_ms: Option<u64>,
}

impl From<&TuneArg> for Overrides {
    fn from(arg: &TuneArg) -> Self {
        let mut overrides = Overrides::default();
        overrides.gateway.url = arg.gateway.clone();
        overrides.gateway.root = arg.root.clone();
        overrides.peer.api = arg.peer_api.clone();
        overrides.peer.enabled = arg.no_peer.then_some(false);
        overrides.fetch.timeout_ms = arg.timeout_ms;
        overrides.fetch.max_retries = arg.retries;
        overrides.fetch.retry_delay_ms = arg.retry_delay_ms;
        overrides.fetch.max_retry_delay_ms = arg.max_retry_delay_ms;
        overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fetch_with_overrides() {
        let app = App::try_parse_from([
            "peerseg",
            "fetch",
            "live/seg-3.ts",
            "--root",
            "QmRoot",
            "--no-peer",
            "--retries",
            "5",
            "--range-start",
            "100",
            "--range-end",
            "200",
        ])
        .unwrap();

        let Commands::Fetch(arg) = app.cmd else {
            panic!("expected fetch");
        };
        assert_eq!(arg.url, "live/seg-3.ts");
        assert_eq!(arg.range_start, Some(100));

        let overrides = Overrides::from(&arg.tune);
        assert_eq!(overrides.gateway.root.as_deref(), Some("QmRoot"));
        assert_eq!(overrides.peer.enabled, Some(false));
        assert_eq!(overrides.fetch.max_retries, Some(5));
        assert_eq!(overrides.fetch.timeout_ms, None);
    }

    #[test]
    fn range_end_alone_starts_at_zero() {
        let app = App::try_parse_from(["peerseg", "fetch", "seg.ts", "--range-end", "512", "--text"])
            .unwrap();
        let Commands::Fetch(arg) = app.cmd else {
            panic!("expected fetch");
        };

        let request = arg.request();
        assert_eq!(request.range_start, Some(0));
        assert_eq!(request.range_end, Some(512));
        assert_eq!(request.response_kind, peerseg_fetch::ResponseKind::Text);
    }

    #[test]
    fn no_range_flags_request_the_whole_segment() {
        let app = App::try_parse_from(["peerseg", "fetch", "seg.ts"]).unwrap();
        let Commands::Fetch(arg) = app.cmd else {
            panic!("expected fetch");
        };

        let request = arg.request();
        assert_eq!(request.range_start, None);
        assert_eq!(request.range_end, None);
    }

    #[test]
    fn range_start_needs_an_end() {
        assert!(App::try_parse_from(["peerseg", "fetch", "seg.ts", "--range-start", "1"]).is_err());
    }

    #[test]
    fn config_flags_are_global() {
        let app = App::try_parse_from(["peerseg", "config", "-v", "--config", "alt.toml"]).unwrap();
        assert!(app.verbose);
        assert_eq!(app.config, PathBuf::from("alt.toml"));
    }
}
