use std::convert::Infallible;
use std::future::Future;

use bytes::Bytes;

use super::http::BoxStream;

/// Content-addressed peer-to-peer store.
///
/// Exactly the two capabilities the fetcher uses: an availability probe and a
/// path lookup that streams the object's bytes.
pub trait PeerStore: Send + Sync + 'static {
    type Error: std::error::Error + Send + 'static;

    /// Whether the store is online and should be preferred over the gateway.
    fn is_available(&self) -> impl Future<Output = bool> + Send;

    /// Resolve `path` inside the directory `root` and stream its content.
    fn fetch_by_path(
        &self,
        root: &str,
        path: &str,
    ) -> impl Future<Output = Result<BoxStream<'static, Result<Bytes, Self::Error>>, Self::Error>> + Send;
}

/// A peer store that is never available, for gateway-only fetchers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPeerStore;

impl PeerStore for NoPeerStore {
    type Error = Infallible;

    async fn is_available(&self) -> bool {
        false
    }

    async fn fetch_by_path(
        &self,
        _root: &str,
        _path: &str,
    ) -> Result<BoxStream<'static, Result<Bytes, Self::Error>>, Self::Error> {
        Ok(Box::pin(futures_util::stream::empty()))
    }
}

#[cfg(feature = "reqwest")]
mod kubo {
    use std::time::Duration;

    use futures_util::StreamExt;
    use serde::Deserialize;
    use tracing::debug;

    use super::*;
    use crate::error::FetchError;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    pub(crate) struct Listing {
        #[serde(default)]
        pub objects: Vec<ListedObject>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    pub(crate) struct ListedObject {
        #[serde(default)]
        pub links: Vec<Link>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    pub(crate) struct Link {
        pub name: String,
        pub hash: String,
        #[serde(default)]
        pub size: u64,
    }

    impl Listing {
        pub(crate) fn find(&self, name: &str) -> Option<&Link> {
            self.objects
                .iter()
                .flat_map(|object| object.links.iter())
                .find(|link| link.name == name)
        }
    }

    /// Peer store backed by a Kubo-compatible RPC endpoint.
    ///
    /// Availability is probed with `/api/v0/id`, directory entries are resolved
    /// with `/api/v0/ls` and content is streamed from `/api/v0/cat`.
    #[derive(Debug, Clone)]
    pub struct KuboPeerStore {
        client: reqwest::Client,
        api: String,
        probe_timeout: Duration,
    }

    impl KuboPeerStore {
        pub fn new(api: impl Into<String>) -> Self {
            Self {
                client: reqwest::Client::new(),
                api: api.into().trim_end_matches('/').to_string(),
                probe_timeout: Duration::from_secs(2),
            }
        }

        #[must_use]
        pub fn probe_timeout(mut self, timeout: Duration) -> Self {
            self.probe_timeout = timeout;
            self
        }

        fn endpoint(&self, command: &str) -> String {
            format!("{}/api/v0/{}", self.api, command)
        }

        async fn call(&self, command: &str, arg: &str) -> Result<reqwest::Response, FetchError> {
            let response = self
                .client
                .post(self.endpoint(command))
                .query(&[("arg", arg)])
                .send()
                .await
                .map_err(|e| FetchError::PeerStore(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::PeerStore(format!("{command} {arg}: {status}")));
            }
            Ok(response)
        }
    }

    impl PeerStore for KuboPeerStore {
        type Error = FetchError;

        async fn is_available(&self) -> bool {
            let probe = self
                .client
                .post(self.endpoint("id"))
                .timeout(self.probe_timeout)
                .send()
                .await;
            matches!(probe, Ok(response) if response.status().is_success())
        }

        async fn fetch_by_path(
            &self,
            root: &str,
            path: &str,
        ) -> Result<BoxStream<'static, Result<Bytes, Self::Error>>, Self::Error> {
            let listing: Listing = self
                .call("ls", root)
                .await?
                .json()
                .await
                .map_err(|e| FetchError::PeerStore(e.to_string()))?;

            let link = listing.find(path).ok_or_else(|| FetchError::NotInListing {
                root: root.to_string(),
                name: path.to_string(),
            })?;
            debug!(root, path, hash = %link.hash, size = link.size, "resolved peer-store entry");

            let body = self.call("cat", &link.hash).await?.bytes_stream();
            Ok(Box::pin(body.map(|chunk| {
                chunk.map_err(|e| FetchError::PeerStore(e.to_string()))
            })))
        }
    }

}

#[cfg(feature = "reqwest")]
pub use kubo::KuboPeerStore;
