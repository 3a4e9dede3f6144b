//! Recency and source-reputation ranking.

use crate::models::ArticleRecord;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::cmp::Reverse;

/// Outlets ordered from most to least reputable, matched as substrings of
/// the lower-cased source name.
pub const REPUTABLE_SOURCES: &[&str] = &[
    "reuters",
    "bloomberg",
    "wall street journal",
    "financial times",
    "business wire",
    "pr newswire",
    "globe newswire",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse a publication timestamp as reported by the news API.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` with or without a `T` and with an
/// optional `+HH:MM` offset, and bare `YYYY-MM-DD`. Timestamps without an
/// offset are taken as UTC. Anything else is `None`.
pub fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Reputation of a source name: `len - i` for the first matching entry at
/// position `i` of [`REPUTABLE_SOURCES`], `0` when nothing matches.
pub fn source_priority(source_name: &str) -> usize {
    let name = source_name.to_lowercase();
    REPUTABLE_SOURCES
        .iter()
        .position(|source| name.contains(source))
        .map_or(0, |i| REPUTABLE_SOURCES.len() - i)
}

/// Order records newest first, then most reputable first.
///
/// Missing or unparseable dates rank after every dated record. Records that
/// tie on both keys keep their input order.
pub fn sort_by_quality(mut records: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    records.sort_by_cached_key(|record| {
        let published = record
            .published_at
            .as_deref()
            .and_then(parse_published_at);
        (Reverse(published), Reverse(source_priority(&record.source_name)))
    });
    records
}
