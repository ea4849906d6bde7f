//! Request, configuration and statistics types shared by every layer.
//!
//! Requests and configuration are immutable for the lifetime of one load.
//! [`FetchStats`] is the single mutable record, owned by the fetcher and lent
//! to callbacks by reference.

pub mod config;
pub mod request;
pub mod stats;

pub use config::{FetchConfig, GatewayConfig};
pub use request::{FetchRequest, LoaderResponse, ResponseData, ResponseKind, ResponseMeta};
pub use stats::FetchStats;
