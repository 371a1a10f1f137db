//! Header filtering for image requests replayed upstream.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Headers never forwarded to an image host.
///
/// Hop-by-hop headers the HTTP stack manages itself, plus the ones that
/// would tell a third-party host which application asked.
pub const DENIED_HEADERS: [&str; 10] = [
    "content-length",
    "host",
    "trailer",
    "te",
    "upgrade",
    "cookie2",
    "keep-alive",
    "transfer-encoding",
    "origin",
    "referrer",
];

pub fn is_denied(name: &str) -> bool {
    DENIED_HEADERS.iter().any(|denied| denied.eq_ignore_ascii_case(name))
}

/// Build the upstream header map from the caller's headers.
///
/// Denied names are dropped, as are pairs that are not valid HTTP headers.
pub fn forwardable_headers<'a>(headers: impl IntoIterator<Item = (&'a str, &'a str)>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        if is_denied(name) {
            continue;
        }
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                map.append(name, value);
            }
            _ => tracing::debug!(header = name, "skipping malformed request header"),
        }
    }
    map
}
