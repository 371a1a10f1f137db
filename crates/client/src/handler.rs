//! Serving cache-scheme requests.
//!
//! A hit returns stored bytes without touching the network. A miss replays
//! the caller's request upstream (denied headers stripped, the window's
//! credential attached when its scope matches), stores the response for as
//! long as its headers allow, and returns it. A failed fetch leaves the
//! cache untouched.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backplane_core::{Error, WindowHandle};
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::Deserialize;
use tokio::time::Instant;

use crate::expiry::{Freshness, freshness};
use crate::fetch::{Upstream, UpstreamRequest};
use crate::headers::forwardable_headers;
use crate::image_cache::ImageCache;
use crate::redirect::decode_cache_url;

/// Looks up the credential a window attaches to requests for `url`.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn credential_for(&self, window: WindowHandle, url: &str) -> Option<String>;
}

/// A request addressed to the cache scheme.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheRequest {
    /// `cache://...` URL produced by the redirector.
    pub url: String,
    #[serde(default)]
    pub method: Option<String>,
    /// Headers the page sent with the original request.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

/// Bytes served for a cache-scheme request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedImage {
    pub mime_type: Option<String>,
    pub bytes: Bytes,
    pub from_cache: bool,
}

pub struct ImageCacheHandler {
    cache: Arc<ImageCache>,
    upstream: Arc<dyn Upstream>,
    credentials: Arc<dyn CredentialSource>,
    default_ttl: Duration,
}

impl ImageCacheHandler {
    pub fn new(
        cache: Arc<ImageCache>, upstream: Arc<dyn Upstream>, credentials: Arc<dyn CredentialSource>,
        default_ttl: Duration,
    ) -> Self {
        Self { cache, upstream, credentials, default_ttl }
    }

    pub fn cache(&self) -> &Arc<ImageCache> {
        &self.cache
    }

    pub async fn handle(&self, request: CacheRequest) -> Result<ServedImage, Error> {
        let target = decode_cache_url(&request.url)?;
        let key = target.url.as_str().to_string();

        if let Some(entry) = self.cache.get(&key) {
            tracing::debug!(url = %key, "image cache hit");
            return Ok(ServedImage { mime_type: entry.mime_type, bytes: entry.bytes, from_cache: true });
        }
        tracing::debug!(url = %key, "image cache miss");

        let method = match request.method.as_deref() {
            Some(raw) => Method::from_bytes(raw.as_bytes()).map_err(|e| Error::UpstreamFetch(e.to_string()))?,
            None => Method::GET,
        };

        let mut headers = forwardable_headers(request.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(window) = target.window
            && let Some(credential) = self.credentials.credential_for(window, &key).await
        {
            match HeaderValue::from_str(&credential) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!(window = %window, "credential is not a valid header value"),
            }
        }

        let fetched_at = Instant::now();
        let response = self
            .upstream
            .fetch(UpstreamRequest { method, url: target.url, headers })
            .await
            .inspect_err(|e| tracing::error!(url = %key, error = %e, "image fetch failed"))?;

        let mime_type = response.content_type();
        match freshness(&response.headers, self.default_ttl) {
            Freshness::Fresh(lifetime) => match fetched_at.checked_add(lifetime) {
                Some(expires_at) => self.cache.add(&key, mime_type.clone(), response.body.clone(), expires_at),
                None => tracing::debug!(url = %key, "lifetime out of clock range, not cached"),
            },
            Freshness::DoNotStore => tracing::debug!(url = %key, "response not cacheable"),
        }

        Ok(ServedImage { mime_type, bytes: response.body, from_cache: false })
    }
}
