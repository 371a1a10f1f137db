//! Rewriting of outbound image requests into cache-scheme requests.
//!
//! ### Cache-scheme URL
//! `cache://<percent-encoded original URL>#<window handle>`, the fragment
//! present only when the originating window is known. The original URL is
//! encoded the way `encodeURIComponent` does, so it never contains `#`.
//!
//! ### Loop prevention
//! Only image requests are rewritten. The cache handler's own upstream
//! fetches carry [`ResourceType::Other`] and pass through untouched.

use backplane_core::{Error, WindowHandle};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use url::Url;

pub const CACHE_SCHEME: &str = "cache";

const CACHE_PREFIX: &str = "cache://";

/// Characters left unescaped by `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Resource class of an outbound request, as reported by the UI shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Image,
    Xhr,
    Media,
    Other,
}

/// Decoded target of a cache-scheme request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheTarget {
    /// Normalized upstream URL, also the cache key.
    pub url: Url,
    pub window: Option<WindowHandle>,
}

/// Normalize an upstream URL for use as a cache key.
///
/// Trims whitespace, lowercases the host and drops the fragment. Only
/// `http` and `https` are accepted; the query string is kept as is.
pub fn canonicalize(input: &str) -> Result<Url, Error> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("empty URL".into()));
    }

    let mut parsed = Url::parse(trimmed).map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(Error::InvalidUrl(format!("unsupported scheme: {scheme}"))),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;
    }
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Build the cache-scheme URL for `url`.
pub fn encode_cache_url(url: &str, window: Option<WindowHandle>) -> String {
    let mut out = format!("{CACHE_PREFIX}{}", utf8_percent_encode(url, COMPONENT));
    if let Some(window) = window {
        out.push('#');
        out.push_str(&window.to_string());
    }
    out
}

/// Recover the upstream URL and originating window from a cache-scheme URL.
///
/// A fragment that is not a window handle is ignored.
pub fn decode_cache_url(cache_url: &str) -> Result<CacheTarget, Error> {
    let rest = cache_url
        .strip_prefix(CACHE_PREFIX)
        .ok_or_else(|| Error::InvalidUrl(format!("not a {CACHE_SCHEME} URL: {cache_url}")))?;

    let (encoded, fragment) = match rest.split_once('#') {
        Some((encoded, fragment)) => (encoded, Some(fragment)),
        None => (rest, None),
    };

    let decoded = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|e| Error::InvalidUrl(format!("bad encoding: {e}")))?;
    let url = canonicalize(&decoded)?;

    let window = fragment.and_then(|raw| match raw.parse::<WindowHandle>() {
        Ok(handle) => Some(handle),
        Err(_) => {
            tracing::debug!(fragment = raw, "ignoring non-numeric window fragment");
            None
        }
    });

    Ok(CacheTarget { url, window })
}

/// Decides which outbound requests are served through the image cache.
#[derive(Debug, Clone, Copy)]
pub struct Redirector {
    enabled: bool,
}

impl Redirector {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// The cache-scheme URL an outbound request should be sent to instead,
    /// or `None` to let it through unchanged.
    pub fn redirect(&self, url: &str, resource_type: ResourceType, window: Option<WindowHandle>) -> Option<String> {
        if !self.enabled || resource_type != ResourceType::Image {
            return None;
        }
        let scheme = url.split_once("://").map(|(scheme, _)| scheme)?;
        if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
            return None;
        }
        Some(encode_cache_url(url, window))
    }
}
