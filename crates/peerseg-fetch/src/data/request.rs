use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// How the payload should be handed back to the streaming engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Decoded as text, as used for playlists.
    Text,

    /// Raw bytes, as used for media segments and keys.
    #[default]
    Binary,
}

/// A single resource to load.
///
/// # Examples
///
/// ```
/// use peerseg_fetch::FetchRequest;
///
/// let request = FetchRequest::new("https://cdn.example/live/seg-42.ts").range(100, 200);
/// assert_eq!(request.filename(), Some("seg-42.ts"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub response_kind: ResponseKind,

    /// First byte of the requested range. Only meaningful with `range_end`.
    pub range_start: Option<u64>,

    /// Exclusive end of the requested range.
    pub range_end: Option<u64>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            response_kind: ResponseKind::Binary,
            range_start: None,
            range_end: None,
        }
    }

    #[must_use]
    pub fn text(mut self) -> Self {
        self.response_kind = ResponseKind::Text;
        self
    }

    #[must_use]
    pub fn response_kind(mut self, kind: ResponseKind) -> Self {
        self.response_kind = kind;
        self
    }

    /// Request bytes `start..end` (end exclusive).
    #[must_use]
    pub fn range(mut self, start: u64, end: u64) -> Self {
        self.range_start = Some(start);
        self.range_end = Some(end);
        self
    }

    /// The final path segment of the request URL, ignoring query and fragment.
    pub fn filename(&self) -> Option<&str> {
        crate::core::filename_of(&self.url)
    }
}

/// Payload of a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseData {
    Text(String),
    Binary(Bytes),
}

impl ResponseData {
    /// Shape raw bytes according to the requested kind.
    ///
    /// Text is decoded lossily; the resulting length is that of the decoded
    /// string.
    pub fn from_bytes(kind: ResponseKind, bytes: Bytes) -> Self {
        match kind {
            ResponseKind::Binary => ResponseData::Binary(bytes),
            ResponseKind::Text => ResponseData::Text(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ResponseData::Text(text) => text.len(),
            ResponseData::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ResponseData::Text(text) => text.as_bytes(),
            ResponseData::Binary(bytes) => bytes,
        }
    }
}

/// Status line and final URL of an HTTP response, handed to `on_error` for
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    pub status_text: String,
    pub url: String,
}

/// What `on_success` receives: the URL the payload came from and the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderResponse {
    pub url: String,
    pub data: ResponseData,
}
