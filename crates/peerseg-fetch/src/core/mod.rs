//! Pure decisions for the fetch state machine.
//!
//! Nothing in this module performs I/O or reads the clock; the effects layer
//! feeds it observations and acts on the answers.

mod backoff;
mod outcome;
mod status;
mod locate;

pub use backoff::{Backoff, retry_delay};
pub use outcome::Outcome;
pub use status::{Verdict, classify, is_client_error, is_success};
pub use locate::{filename_of, gateway_url, range_header};
