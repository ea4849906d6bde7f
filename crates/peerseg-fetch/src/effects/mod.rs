//! Backend traits and the effectful fetch state machine.
//!
//! Everything that touches the network, timers or the host's callbacks lives
//! here. The decisions it acts on come from [`crate::core`].

mod clock;
mod dispatch;
mod fetcher;
mod http;
mod peer;

pub use clock::{Clock, TokioClock};
pub use dispatch::LoaderCallbacks;
pub use fetcher::SegmentFetcher;
pub use http::{BoxStream, HttpResponse, HttpTransport};
pub use peer::{NoPeerStore, PeerStore};

#[cfg(feature = "reqwest")]
pub use http::ReqwestTransport;
#[cfg(feature = "reqwest")]
pub use peer::KuboPeerStore;
