//! Data models for fetched articles, account configuration and run output.
//!
//! This module defines the core data structures used throughout the application:
//! - [`ArticleRecord`]: A raw article from the fetch layer, enriched by the filter pipeline
//! - [`AccountConfig`]: One tracked company, as listed in the accounts file
//! - [`ArticleLink`]: The link reference handed to the notification sink
//! - [`AccountDigest`] / [`RunReport`]: Per-account and per-run results
//!
//! Article field names follow the fetch layer's JSON (`pubDate`, `source_name`,
//! `source_url`), so raw API results deserialize without a translation step.

use serde::{Deserialize, Serialize};

/// A news article as produced by the fetch layer.
///
/// Every field is optional on the wire. Missing values deserialize to empty
/// strings or `None`, and each pipeline stage decides how to treat them
/// (usually by rejecting the record or ranking it last).
///
/// `canonical_url` and `url_hash` are derived by the pipeline; they are empty
/// until [`crate::filter::ArticleFilterPipeline::enrich`] has run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ArticleRecord {
    /// The article headline.
    #[serde(default)]
    pub title: String,
    /// Display name of the publishing outlet (e.g. "Reuters").
    #[serde(default)]
    pub source_name: String,
    /// Publication timestamp as reported by the news API.
    #[serde(rename = "pubDate", default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    /// The raw article URL.
    #[serde(default)]
    pub link: String,
    /// Short description or lede.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Homepage of the publishing outlet, when the API reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// `link` with tracking parameters and fragment removed.
    #[serde(default)]
    pub canonical_url: String,
    /// SHA-256 of `canonical_url`, lowercase hex.
    #[serde(default)]
    pub url_hash: String,
}

impl ArticleRecord {
    /// Convenience constructor used by the driver and tests.
    pub fn new(title: &str, source_name: &str, link: &str, published_at: Option<&str>) -> Self {
        Self {
            title: title.to_string(),
            source_name: source_name.to_string(),
            published_at: published_at.map(str::to_string),
            link: link.to_string(),
            ..Default::default()
        }
    }
}

/// Configuration for a single tracked account.
///
/// The filter pipeline only needs `company`. `keywords` and `newsroom` are
/// read by the fetch layer when it gathers articles, and `website` is carried
/// into the [`AccountDigest`] for the summarizer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AccountConfig {
    /// Company name; also the key used in the seen-URL store.
    pub company: String,
    /// Company website domain.
    pub website: String,
    /// Keywords used by the press-wire fetch strategy.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Optional newsroom URL.
    #[serde(default)]
    pub newsroom: Option<String>,
}

/// Top-level shape of the accounts file.
#[derive(Debug, Default, Deserialize)]
pub struct AccountsFile {
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

/// A link reference for one kept article.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArticleLink {
    pub title: String,
    pub source: String,
    pub url: String,
}

impl ArticleLink {
    /// Build link references for the records that actually carry a link.
    ///
    /// Missing titles and source names fall back to `"No title"` and
    /// `"Unknown source"`.
    pub fn from_records(records: &[ArticleRecord]) -> Vec<ArticleLink> {
        records
            .iter()
            .filter(|r| !r.link.is_empty())
            .map(|r| ArticleLink {
                title: non_empty_or(&r.title, "No title"),
                source: non_empty_or(&r.source_name, "Unknown source"),
                url: r.link.clone(),
            })
            .collect()
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// The filtered result for one account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountDigest {
    pub company: String,
    /// Company website domain, copied from the account config.
    #[serde(default)]
    pub website: String,
    /// Raw records handed in by the fetch layer.
    pub articles_fetched: usize,
    /// Records left after the seen-URL check.
    pub articles_unseen: usize,
    /// Records kept by the pipeline.
    pub article_count: usize,
    pub articles: Vec<ArticleRecord>,
    pub links: Vec<ArticleLink>,
}

/// Aggregate counters for one run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RunStats {
    pub accounts_processed: usize,
    pub total_articles_fetched: usize,
    pub total_articles_kept: usize,
    pub errors: Vec<String>,
}

/// Everything a run produced; archived once per ISO week.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunReport {
    /// ISO week identifier, e.g. `2024-W12`.
    pub run_key: String,
    pub dry_run: bool,
    /// RFC 3339 UTC timestamp.
    pub generated_at: String,
    pub digests: Vec<AccountDigest>,
    pub stats: RunStats,
}
