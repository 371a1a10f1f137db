//! Freshness lifetime of an upstream image response.
//!
//! ### Precedence
//! - `Cache-Control: no-store` means the response is never cached
//! - `max-age`, reduced by the `Age` header, wins over `Expires`
//! - `Expires` is measured from the response `Date` (or now, without one);
//!   an unparseable `Expires` counts as already expired
//! - no freshness headers at all falls back to a default lifetime

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::header::{AGE, CACHE_CONTROL, DATE, EXPIRES, HeaderMap};

static MAX_AGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(?:^|[,\s])max-age\s*=\s*"?(\d+)"?"#).expect("max-age pattern is valid"));

static NO_STORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|[,\s])no-store(?:$|[,\s])").expect("no-store pattern is valid"));

/// How long a response may be served from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Store for this long.
    Fresh(Duration),
    /// Return to the caller without storing.
    DoNotStore,
}

fn header_str<'a>(headers: &'a HeaderMap, name: reqwest::header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim()).ok().map(|d| d.with_timezone(&Utc))
}

/// Longest lifetime honored, the delta-seconds ceiling of RFC 9111 §1.2.2.
pub const MAX_LIFETIME_SECS: i64 = 1 << 31;

fn from_seconds(seconds: i64) -> Freshness {
    if seconds > 0 {
        Freshness::Fresh(Duration::from_secs(seconds.min(MAX_LIFETIME_SECS) as u64))
    } else {
        Freshness::DoNotStore
    }
}

/// Derive the freshness of a response from its headers.
pub fn freshness(headers: &HeaderMap, default_ttl: Duration) -> Freshness {
    freshness_at(headers, default_ttl, Utc::now())
}

pub(crate) fn freshness_at(headers: &HeaderMap, default_ttl: Duration, now: DateTime<Utc>) -> Freshness {
    if let Some(cache_control) = header_str(headers, CACHE_CONTROL) {
        if NO_STORE.is_match(cache_control) {
            return Freshness::DoNotStore;
        }
        if let Some(max_age) = MAX_AGE.captures(cache_control).and_then(|c| c[1].parse::<i64>().ok()) {
            let age = header_str(headers, AGE)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(0)
                .max(0);
            return from_seconds(max_age.saturating_sub(age));
        }
    }

    if let Some(expires) = header_str(headers, EXPIRES) {
        let Some(expires) = http_date(expires) else {
            return Freshness::DoNotStore;
        };
        let base = header_str(headers, DATE).and_then(http_date).unwrap_or(now);
        return from_seconds((expires - base).num_seconds());
    }

    if default_ttl.is_zero() { Freshness::DoNotStore } else { Freshness::Fresh(default_ttl) }
}
