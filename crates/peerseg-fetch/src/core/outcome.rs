use crate::data::{FetchStats, LoaderResponse, ResponseMeta};
use crate::error::LoaderError;

/// The single terminal result of a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        response: LoaderResponse,
        stats: FetchStats,
    },
    Timeout {
        stats: FetchStats,
    },
    Error {
        error: LoaderError,
        stats: FetchStats,
        meta: Option<ResponseMeta>,
    },
}

impl Outcome {
    pub fn stats(&self) -> &FetchStats {
        match self {
            Outcome::Success { stats, .. } | Outcome::Timeout { stats } | Outcome::Error { stats, .. } => {
                stats
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}
