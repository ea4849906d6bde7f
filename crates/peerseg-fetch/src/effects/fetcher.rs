use std::fmt::Display;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::core::{Backoff, Outcome, Verdict, classify, gateway_url, is_success, range_header};
use crate::data::{
    FetchConfig, FetchRequest, FetchStats, GatewayConfig, LoaderResponse, ResponseData, ResponseMeta,
};
use crate::effects::clock::{Clock, TokioClock};
use crate::effects::dispatch::{Dispatcher, LoaderCallbacks, Shared, Terminal};
use crate::effects::http::{HttpResponse, HttpTransport};
use crate::effects::peer::{NoPeerStore, PeerStore};
use crate::error::{FetchError, LoaderError};

/// Upper bound for buffer preallocation from an advertised Content-Length.
const PREALLOC_LIMIT: u64 = 16 * 1024 * 1024;

/// Loads segments for a streaming engine, one load at a time.
///
/// Each [`load`](Self::load) picks a backend once: the peer store if one is
/// attached and reports itself available, the HTTP gateway otherwise. Gateway
/// failures other than 4xx are retried with capped exponential backoff; peer
/// store failures are reported immediately.
///
/// `load` spawns the load onto the current tokio runtime, so it must be called
/// from within one.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use peerseg_fetch::{
///     FetchConfig, FetchRequest, GatewayConfig, KuboPeerStore, LoaderCallbacks, ReqwestTransport,
///     SegmentFetcher,
/// };
///
/// # async fn run(callbacks: Arc<dyn LoaderCallbacks>) {
/// let gateway = GatewayConfig::new("http://localhost:9090", "QmRootHash");
/// let mut fetcher = SegmentFetcher::new(ReqwestTransport::new(), gateway)
///     .with_peer_store(KuboPeerStore::new("http://127.0.0.1:5001"));
///
/// fetcher.load(FetchRequest::new("seg-0.ts"), FetchConfig::default(), callbacks);
/// let outcome = fetcher.finished().await;
/// # }
/// ```
pub struct SegmentFetcher<H: HttpTransport, P: PeerStore = NoPeerStore, C: Clock = TokioClock> {
    transport: Arc<H>,
    peer: Option<Arc<P>>,
    clock: Arc<C>,
    gateway: GatewayConfig,
    current: Option<Running>,
}

struct Running {
    shared: Arc<Shared>,
    task: Option<JoinHandle<Option<Outcome>>>,
}

impl<H: HttpTransport> SegmentFetcher<H> {
    /// Create a gateway-only fetcher.
    pub fn new(transport: H, gateway: GatewayConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            peer: None,
            clock: Arc::new(TokioClock),
            gateway,
            current: None,
        }
    }
}

impl<H: HttpTransport, P: PeerStore, C: Clock> SegmentFetcher<H, P, C> {
    /// Prefer `peer` whenever it reports itself available.
    pub fn with_peer_store<Q: PeerStore>(mut self, peer: Q) -> SegmentFetcher<H, Q, C> {
        SegmentFetcher {
            transport: Arc::clone(&self.transport),
            peer: Some(Arc::new(peer)),
            clock: Arc::clone(&self.clock),
            gateway: self.gateway.clone(),
            current: self.current.take(),
        }
    }

    /// Use `clock` for the timestamps recorded in [`FetchStats`].
    pub fn with_clock<D: Clock>(mut self, clock: D) -> SegmentFetcher<H, P, D> {
        SegmentFetcher {
            transport: Arc::clone(&self.transport),
            peer: self.peer.clone(),
            clock: Arc::new(clock),
            gateway: self.gateway.clone(),
            current: self.current.take(),
        }
    }

    pub fn gateway(&self) -> &GatewayConfig {
        &self.gateway
    }

    /// Start loading `request`, reporting through `callbacks`.
    ///
    /// A load still outstanding on this fetcher is aborted first and reports
    /// nothing further.
    pub fn load(
        &mut self,
        request: FetchRequest,
        config: FetchConfig,
        callbacks: Arc<dyn LoaderCallbacks>,
    ) {
        self.destroy();

        let shared = Shared::new(self.clock.now());
        let load = Load {
            transport: Arc::clone(&self.transport),
            peer: self.peer.clone(),
            clock: Arc::clone(&self.clock),
            gateway: self.gateway.clone(),
            request,
            config,
            dispatch: Dispatcher::new(Arc::clone(&shared), callbacks),
        };

        self.current = Some(Running {
            shared,
            task: Some(tokio::spawn(load.run())),
        });
    }

    /// Cancel the current load. No callback starts after this returns.
    pub fn abort(&self) {
        if let Some(running) = &self.current {
            running.shared.abort();
        }
    }

    /// Abort and drop the current load along with its in-flight request.
    pub fn destroy(&mut self) {
        if let Some(mut running) = self.current.take() {
            running.shared.abort();
            if let Some(task) = running.task.take() {
                task.abort();
            }
        }
    }

    /// Statistics of the current or last load.
    ///
    /// Returns `None` if nothing was loaded yet, or when called from one of the
    /// load's own callbacks, which receive the statistics directly.
    pub fn stats(&self) -> Option<FetchStats> {
        self.current.as_ref()?.shared.snapshot()
    }

    /// Wait for the current load to end.
    ///
    /// Returns the reported outcome, or `None` if the load was aborted or has
    /// already been awaited.
    pub async fn finished(&mut self) -> Option<Outcome> {
        let task = self.current.as_mut()?.task.take()?;
        task.await.ok().flatten()
    }
}

impl<H: HttpTransport, P: PeerStore, C: Clock> Drop for SegmentFetcher<H, P, C> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// One load, owned by its task.
struct Load<H: HttpTransport, P: PeerStore, C: Clock> {
    transport: Arc<H>,
    peer: Option<Arc<P>>,
    clock: Arc<C>,
    gateway: GatewayConfig,
    request: FetchRequest,
    config: FetchConfig,
    dispatch: Dispatcher,
}

enum Attempt {
    TimedOut,
    Finished(Finished),
}

struct Finished {
    status: u16,
    status_text: String,
    url: String,
    body: Bytes,
}

impl Finished {
    /// A failure without any HTTP response, reported as status 0.
    fn network(url: &str, message: String) -> Self {
        Self {
            status: 0,
            status_text: message,
            url: url.to_string(),
            body: Bytes::new(),
        }
    }
}

impl<H: HttpTransport, P: PeerStore, C: Clock> Load<H, P, C> {
    async fn run(self) -> Option<Outcome> {
        let terminal = self.drive().await?;
        self.dispatch.finish(&self.request, self.clock.now(), terminal)
    }

    async fn drive(&self) -> Option<Terminal> {
        if let Err(err) = self.config.validate() {
            return Some(self.fail_early(err));
        }
        let Some(filename) = self.request.filename() else {
            return Some(self.fail_early(FetchError::InvalidUrl(format!(
                "no filename in {}",
                self.request.url
            ))));
        };

        if let Some(peer) = &self.peer {
            let available = tokio::select! {
                biased;
                _ = self.dispatch.token().cancelled() => return None,
                available = peer.is_available() => available,
            };
            if available {
                return self.load_from_peer(peer, filename).await;
            }
        }
        self.load_from_gateway(filename).await
    }

    fn fail_early(&self, err: impl Display) -> Terminal {
        error!(url = %self.request.url, %err, "cannot load");
        Terminal::Error(LoaderError::from_status(0, err.to_string()), None)
    }

    async fn load_from_peer(&self, peer: &P, filename: &str) -> Option<Terminal> {
        let token = self.dispatch.token();
        let root = self.gateway.root.as_str();
        debug!(root, filename, "fetching from peer store");

        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => return None,
            opened = peer.fetch_by_path(root, filename) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(err) => return Some(self.peer_failure(err)),
        };

        let mut buffer = BytesMut::new();
        loop {
            let chunk = tokio::select! {
                biased;
                _ = token.cancelled() => return None,
                chunk = stream.next() => chunk,
            };
            match chunk {
                Some(Ok(bytes)) => {
                    let now = self.clock.now();
                    self.dispatch.update(|stats| {
                        stats.mark_first_byte(now);
                        stats.bytes_loaded += bytes.len() as u64;
                    });
                    buffer.extend_from_slice(&bytes);
                }
                Some(Err(err)) => return Some(self.peer_failure(err)),
                None => break,
            }
        }

        Some(Terminal::Success(LoaderResponse {
            url: self.request.url.clone(),
            data: ResponseData::from_bytes(self.request.response_kind, buffer.freeze()),
        }))
    }

    fn peer_failure(&self, err: impl Display) -> Terminal {
        error!(url = %self.request.url, %err, "peer-store load failed");
        Terminal::Error(LoaderError::from_status(0, err.to_string()), None)
    }

    async fn load_from_gateway(&self, filename: &str) -> Option<Terminal> {
        let url = match gateway_url(&self.gateway.url, &self.gateway.root, filename) {
            Ok(url) => url,
            Err(err) => return Some(self.fail_early(err)),
        };
        let headers: Vec<_> = range_header(self.request.range_start, self.request.range_end)
            .into_iter()
            .collect();
        let mut backoff = Backoff::new(self.config.retry_delay, self.config.max_retry_delay);

        loop {
            let retry_count = self.dispatch.update(|stats| {
                stats.reset_attempt();
                stats.retry_count
            });
            debug!(url = %url, retry = retry_count, "requesting from gateway");

            let finished = match self.attempt(url.as_str(), &headers).await? {
                Attempt::Finished(finished) => finished,
                Attempt::TimedOut => {
                    warn!(url = %self.request.url, "timeout while loading");
                    return Some(Terminal::Timeout);
                }
            };

            match classify(finished.status, retry_count, self.config.max_retries) {
                Verdict::Success => {
                    return Some(Terminal::Success(LoaderResponse {
                        url: finished.url,
                        data: ResponseData::from_bytes(self.request.response_kind, finished.body),
                    }));
                }
                Verdict::Fail => {
                    error!(
                        status = finished.status,
                        url = %self.request.url,
                        "{} while loading",
                        finished.status
                    );
                    let meta = (finished.status != 0).then(|| ResponseMeta {
                        status: finished.status,
                        status_text: finished.status_text.clone(),
                        url: finished.url,
                    });
                    let error = LoaderError::from_status(finished.status, finished.status_text);
                    return Some(Terminal::Error(error, meta));
                }
                Verdict::Retry => {
                    let delay = backoff.next_delay();
                    warn!(
                        status = finished.status,
                        url = %self.request.url,
                        delay_ms = delay.as_millis() as u64,
                        "{} while loading, retrying",
                        finished.status
                    );
                    self.dispatch.update(|stats| stats.retry_count += 1);
                    tokio::select! {
                        biased;
                        _ = self.dispatch.token().cancelled() => return None,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// One HTTP attempt. `None` means the load was aborted.
    async fn attempt(&self, url: &str, headers: &[(String, String)]) -> Option<Attempt> {
        let token = self.dispatch.token();

        let sent = tokio::select! {
            biased;
            _ = token.cancelled() => return None,
            _ = tokio::time::sleep(self.config.timeout) => return Some(Attempt::TimedOut),
            sent = self.transport.send(url, headers) => sent,
        };
        let response = match sent {
            Ok(response) => response,
            Err(err) => return Some(Attempt::Finished(Finished::network(url, err.to_string()))),
        };

        let now = self.clock.now();
        self.dispatch.update(|stats| stats.mark_first_byte(now));

        let HttpResponse {
            status,
            status_text,
            url: final_url,
            content_length,
            mut body,
        } = response;

        if !is_success(status) {
            return Some(Attempt::Finished(Finished {
                status,
                status_text,
                url: final_url,
                body: Bytes::new(),
            }));
        }

        // Headers are in; a fresh timeout bounds the rest of the transfer.
        let deadline = tokio::time::sleep(self.config.timeout);
        tokio::pin!(deadline);

        let mut buffer = BytesMut::with_capacity(content_length.unwrap_or(0).min(PREALLOC_LIMIT) as usize);
        loop {
            let chunk = tokio::select! {
                biased;
                _ = token.cancelled() => return None,
                _ = &mut deadline => return Some(Attempt::TimedOut),
                chunk = body.next() => chunk,
            };
            match chunk {
                Some(Ok(bytes)) => {
                    buffer.extend_from_slice(&bytes);
                    if !self.dispatch.progress(&self.request, &bytes, content_length) {
                        return None;
                    }
                }
                Some(Err(err)) => {
                    let err = FetchError::Stream {
                        received: buffer.len() as u64,
                        message: err.to_string(),
                    };
                    return Some(Attempt::Finished(Finished::network(url, err.to_string())));
                }
                None => break,
            }
        }

        Some(Attempt::Finished(Finished {
            status,
            status_text,
            url: final_url,
            body: buffer.freeze(),
        }))
    }
}
