//! Network side of backplane.
//!
//! This crate provides the image request redirector, the bounded TTL image
//! cache, expiry derivation from response headers, and the upstream fetcher
//! that fills the cache on a miss.

pub mod expiry;
pub mod fetch;
pub mod handler;
pub mod headers;
pub mod image_cache;
pub mod redirect;

pub use expiry::{Freshness, freshness};
pub use fetch::{FetchClient, FetchConfig, Upstream, UpstreamRequest, UpstreamResponse};
pub use handler::{CacheRequest, CredentialSource, ImageCacheHandler, ServedImage};
pub use image_cache::{CacheEntry, ImageCache};
pub use redirect::{CacheTarget, Redirector, ResourceType, canonicalize, decode_cache_url, encode_cache_url};
