use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

/// A boxed stream type for response bodies.
///
/// The stream yields `Result<Bytes, E>` where E is the backend's error type.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// A response whose headers have arrived and whose body is still streaming.
pub struct HttpResponse<E> {
    pub status: u16,
    pub status_text: String,

    /// Final URL after any redirects the transport followed.
    pub url: String,

    /// Advertised body length, if the server sent one.
    pub content_length: Option<u64>,

    pub body: BoxStream<'static, Result<Bytes, E>>,
}

impl<E> std::fmt::Debug for HttpResponse<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("url", &self.url)
            .field("content_length", &self.content_length)
            .field("body", &"{ ... }")
            .finish()
    }
}

/// Asynchronous HTTP transport abstraction.
///
/// The fetcher needs headers as soon as they arrive and the body as a stream so
/// it can supervise each phase with its own timeout. Dropping the returned
/// future or the body stream cancels the request.
///
/// # Implementations
///
/// - [`ReqwestTransport`]: Production implementation using `reqwest`
/// - Mock implementations for testing
pub trait HttpTransport: Send + Sync + 'static {
    /// Error type for transport operations.
    type Error: std::error::Error + Send + 'static;

    /// Send a GET request and resolve once the response headers are in.
    ///
    /// # Errors
    ///
    /// Network-level failures only (DNS, connection reset, TLS). An HTTP error
    /// status is a successful response as far as the transport is concerned.
    fn send(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = Result<HttpResponse<Self::Error>, Self::Error>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use futures_util::StreamExt;

    use super::*;

    /// Production transport implementation using reqwest.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl HttpTransport for ReqwestTransport {
        type Error = reqwest::Error;

        async fn send(
            &self,
            url: &str,
            headers: &[(String, String)],
        ) -> Result<HttpResponse<Self::Error>, Self::Error> {
            let mut request = self.client.get(url);

            for (key, value) in headers {
                request = request.header(key, value);
            }

            let response = request.send().await?;
            let status = response.status();

            Ok(HttpResponse {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                url: response.url().to_string(),
                content_length: response.content_length(),
                body: Box::pin(response.bytes_stream().map(|chunk| chunk.map(Bytes::from))),
            })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestTransport;
