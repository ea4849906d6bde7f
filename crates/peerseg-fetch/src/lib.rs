//! Segment loading for adaptive streaming clients, backed by a peer-to-peer
//! content store with an HTTP gateway fallback.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Requests, configuration and live statistics
//! - [`core`] - Pure decisions: backoff, status classification, URL shaping
//! - [`effects`] - Backend traits, the fetch state machine and callback dispatch
//!
//! # Key Features
//!
//! - **Dual Backend**: Peer-store when it reports itself available, HTTP gateway otherwise
//! - **Retry With Backoff**: Transient gateway failures back off exponentially up to a cap
//! - **Two-Phase Timeout**: One timer for the response headers, a fresh one for the body
//! - **Single Terminal Outcome**: Exactly one of success, timeout or error per load

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use self::core::{Backoff, Outcome};
pub use data::{
    FetchConfig, FetchRequest, FetchStats, GatewayConfig, LoaderResponse, ResponseData,
    ResponseKind, ResponseMeta,
};
pub use effects::{
    BoxStream, Clock, HttpResponse, HttpTransport, LoaderCallbacks, NoPeerStore, PeerStore,
    SegmentFetcher, TokioClock,
};

#[cfg(feature = "reqwest")]
pub use effects::{KuboPeerStore, ReqwestTransport};

pub use error::{ConfigError, FetchError, LoaderError, Result};
