use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use peerseg_fetch::{
    FetchRequest, KuboPeerStore, Outcome, PeerStore, ReqwestTransport, ResponseData,
    SegmentFetcher,
};
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{App, Commands, FetchArg};
use crate::progress::SegmentProgress;
use crate::settings::{Overrides, Settings};

mod cli;
mod progress;
mod settings;

#[tokio::main]
async fn main() -> Result<()> {
    let app = App::parse();

    let level = if app.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    match &app.cmd {
        Commands::Fetch(arg) => {
            let settings = Settings::load(&app.config, &Overrides::from(&arg.tune))
                .with_context(|| format!("loading configuration from {}", app.config.display()))?;
            fetch(settings, arg).await
        }
        Commands::Config(tune) => {
            let settings = Settings::load(&app.config, &Overrides::from(tune))
                .with_context(|| format!("loading configuration from {}", app.config.display()))?;
            print!("{}", toml::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

async fn fetch(settings: Settings, arg: &FetchArg) -> Result<()> {
    settings.fetch.validate().context("invalid fetch configuration")?;
    if settings.gateway.root.is_empty() {
        bail!("no root hash configured; pass --root or set gateway.root");
    }

    let request = arg.request();
    let filename = request
        .filename()
        .with_context(|| format!("no filename in {}", arg.url))?
        .to_string();
    info!(
        url = %request.url,
        gateway = %settings.gateway.url,
        root = %settings.gateway.root,
        "fetching segment"
    );

    let progress = Arc::new(SegmentProgress::new(&filename));
    let fetcher = SegmentFetcher::new(ReqwestTransport::new(), settings.gateway.clone());

    let outcome = if settings.peer.enabled {
        let peer = KuboPeerStore::new(settings.peer.api.clone()).probe_timeout(settings.peer.probe_timeout());
        run(fetcher.with_peer_store(peer), request, &settings, progress).await
    } else {
        run(fetcher, request, &settings, progress).await
    };

    match outcome {
        Some(Outcome::Success { response, stats }) => {
            info!(
                bytes = stats.bytes_loaded,
                retries = stats.retry_count,
                url = %response.url,
                "segment loaded"
            );
            write_payload(arg, &response.data).await
        }
        Some(Outcome::Timeout { stats }) => {
            bail!("timed out after {} retries", stats.retry_count)
        }
        Some(Outcome::Error { error, .. }) => bail!("load failed: {error}"),
        None => bail!("load was aborted"),
    }
}

async fn run<P: PeerStore>(
    mut fetcher: SegmentFetcher<ReqwestTransport, P>,
    request: FetchRequest,
    settings: &Settings,
    progress: Arc<SegmentProgress>,
) -> Option<Outcome> {
    fetcher.load(request, settings.fetch.clone(), progress);
    fetcher.finished().await
}

async fn write_payload(arg: &FetchArg, data: &ResponseData) -> Result<()> {
    match &arg.output {
        Some(path) => tokio::fs::write(path, data.as_bytes())
            .await
            .with_context(|| format!("writing {}", path.display())),
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(data.as_bytes()).await?;
            stdout.flush().await?;
            Ok(())
        }
    }
}
