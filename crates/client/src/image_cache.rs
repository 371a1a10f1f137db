//! In-memory TTL cache for image responses.
//!
//! Entries are keyed by normalized URL and carry an absolute expiry instant.
//! Freshness is checked on every lookup; stale entries are dropped lazily
//! when touched or on an explicit [`ImageCache::purge_expired`]. Memory is
//! bounded by an entry count and a byte budget, evicting least recently
//! used entries first.

use std::num::NonZeroUsize;

use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;

/// A cached upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub url: String,
    pub mime_type: Option<String>,
    pub bytes: Bytes,
    pub expires_at: Instant,
}

impl CacheEntry {
    /// Expiry is exclusive: an entry expiring exactly now is stale.
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

struct Inner {
    entries: LruCache<String, CacheEntry>,
    total_bytes: usize,
    max_bytes: usize,
}

impl Inner {
    fn remove(&mut self, url: &str) -> Option<CacheEntry> {
        let entry = self.entries.pop(url)?;
        self.total_bytes -= entry.bytes.len();
        Some(entry)
    }

    fn evict_lru(&mut self) -> bool {
        match self.entries.pop_lru() {
            Some((url, entry)) => {
                self.total_bytes -= entry.bytes.len();
                tracing::debug!(url = %url, bytes = entry.bytes.len(), "evicted image cache entry");
                true
            }
            None => false,
        }
    }
}

/// Bounded, thread-safe TTL cache shared by every in-flight image fetch.
pub struct ImageCache {
    inner: Mutex<Inner>,
}

impl ImageCache {
    /// Create a cache holding at most `max_entries` entries and `max_bytes` of image data.
    pub fn new(max_entries: NonZeroUsize, max_bytes: usize) -> Self {
        Self { inner: Mutex::new(Inner { entries: LruCache::new(max_entries), total_bytes: 0, max_bytes }) }
    }

    /// True iff a fresh entry exists for `url`.
    pub fn has(&self, url: &str) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        match inner.entries.peek(url).map(|entry| entry.is_fresh(now)) {
            Some(true) => true,
            Some(false) => {
                inner.remove(url);
                false
            }
            None => false,
        }
    }

    /// The fresh entry for `url`, marking it recently used.
    ///
    /// Stale entries are removed and reported as absent.
    pub fn get(&self, url: &str) -> Option<CacheEntry> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let entry = inner.entries.get(url).cloned()?;
        if entry.is_fresh(now) {
            Some(entry)
        } else {
            inner.remove(url);
            None
        }
    }

    /// Insert or replace the entry for `url`.
    ///
    /// An entry larger than the whole byte budget is not stored.
    pub fn add(&self, url: &str, mime_type: Option<String>, bytes: Bytes, expires_at: Instant) {
        let mut inner = self.inner.lock();
        inner.remove(url);

        let size = bytes.len();
        if size > inner.max_bytes {
            tracing::debug!(url, bytes = size, "image exceeds cache budget, not stored");
            return;
        }
        while inner.total_bytes + size > inner.max_bytes && inner.evict_lru() {}

        let entry = CacheEntry { url: url.to_string(), mime_type, bytes, expires_at };
        if let Some((evicted, old)) = inner.entries.push(url.to_string(), entry) {
            inner.total_bytes -= old.bytes.len();
            tracing::debug!(url = %evicted, "evicted image cache entry");
        }
        inner.total_bytes += size;
    }

    /// Drop every stale entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let stale: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(now))
            .map(|(url, _)| url.clone())
            .collect();
        for url in &stale {
            inner.remove(url);
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes of image data currently held.
    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn cache(max_entries: usize, max_bytes: usize) -> ImageCache {
        ImageCache::new(NonZeroUsize::new(max_entries).unwrap(), max_bytes)
    }

    fn later(secs: u64) -> Instant {
        Instant::now() + Duration::from_secs(secs)
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_then_get() {
        let cache = cache(8, 1024);
        let bytes = Bytes::from_static(b"\x89PNG");
        cache.add("https://i.example/a.png", Some("image/png".into()), bytes.clone(), later(60));
        cache.add("https://i.example/a.png", Some("image/png".into()), bytes.clone(), later(60));

        assert!(cache.has("https://i.example/a.png"));
        let entry = cache.get("https://i.example/a.png").unwrap();
        assert_eq!(entry.bytes, bytes);
        assert_eq!(entry.mime_type.as_deref(), Some("image/png"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_boundary_is_exclusive() {
        let cache = cache(8, 1024);
        cache.add("u", None, Bytes::from_static(b"x"), later(10));

        tokio::time::advance(Duration::from_millis(9_999)).await;
        assert!(cache.has("u"));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!cache.has("u"));
        assert!(cache.get("u").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_now_is_absent() {
        let cache = cache(8, 1024);
        cache.add("u", None, Bytes::from_static(b"x"), Instant::now());
        assert!(!cache.has("u"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_cap_evicts_least_recent() {
        let cache = cache(2, 1024);
        cache.add("a", None, Bytes::from_static(b"a"), later(60));
        cache.add("b", None, Bytes::from_static(b"b"), later(60));
        assert!(cache.get("a").is_some());
        cache.add("c", None, Bytes::from_static(b"c"), later(60));

        assert!(cache.has("a"));
        assert!(!cache.has("b"));
        assert!(cache.has("c"));
        assert_eq!(cache.total_bytes(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_byte_budget_evicts_until_fit() {
        let cache = cache(16, 10);
        cache.add("a", None, Bytes::from(vec![0; 4]), later(60));
        cache.add("b", None, Bytes::from(vec![0; 4]), later(60));
        cache.add("c", None, Bytes::from(vec![0; 6]), later(60));

        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert!(cache.has("c"));
        assert_eq!(cache.total_bytes(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_entry_not_stored() {
        let cache = cache(16, 4);
        cache.add("small", None, Bytes::from(vec![0; 2]), later(60));
        cache.add("huge", None, Bytes::from(vec![0; 5]), later(60));

        assert!(!cache.has("huge"));
        assert!(cache.has("small"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_adjusts_bytes() {
        let cache = cache(16, 100);
        cache.add("u", None, Bytes::from(vec![0; 40]), later(60));
        cache.add("u", None, Bytes::from(vec![1; 10]), later(120));

        assert_eq!(cache.total_bytes(), 10);
        assert_eq!(cache.get("u").unwrap().bytes, Bytes::from(vec![1; 10]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = cache(16, 100);
        cache.add("short", None, Bytes::from_static(b"s"), later(5));
        cache.add("long", None, Bytes::from_static(b"l"), later(500));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), 1);
    }
}
