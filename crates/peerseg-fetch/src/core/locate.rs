use url::Url;

use crate::error::{FetchError, Result};

/// The final path segment of `url`, ignoring any query or fragment.
///
/// Works for absolute and relative URLs alike, since playlists commonly list
/// segments by bare filename.
///
/// # Examples
///
/// ```
/// use peerseg_fetch::core::filename_of;
///
/// assert_eq!(filename_of("http://h/live/seg-1.ts?token=x"), Some("seg-1.ts"));
/// assert_eq!(filename_of("seg-2.ts"), Some("seg-2.ts"));
/// assert_eq!(filename_of("http://h/live/"), None);
/// ```
pub fn filename_of(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

/// Build `<gateway>/ipfs/<root>/<filename>`.
pub fn gateway_url(gateway: &str, root: &str, filename: &str) -> Result<Url> {
    if root.is_empty() {
        return Err(FetchError::InvalidUrl("gateway root hash is empty".to_string()));
    }
    let mut url =
        Url::parse(gateway).map_err(|e| FetchError::InvalidUrl(format!("{gateway}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| FetchError::InvalidUrl(format!("{gateway}: cannot be a base URL")))?
        .pop_if_empty()
        .extend(["ipfs", root, filename]);
    Ok(url)
}

/// The `Range` header for a request, if it asks for a byte range.
///
/// `range_end` is exclusive; an absent or zero end means the whole resource.
pub fn range_header(range_start: Option<u64>, range_end: Option<u64>) -> Option<(String, String)> {
    let end = range_end.filter(|&end| end > 0)?;
    let start = range_start.unwrap_or(0);
    Some(("Range".to_string(), format!("bytes={}-{}", start, end - 1)))
}
