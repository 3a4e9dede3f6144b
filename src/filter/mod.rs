//! The article filter pipeline.
//!
//! Reduces one account's raw articles to a short, non-redundant, ranked list:
//!
//! 1. **Canonicalize**: strip tracking parameters and fragments, hash the result
//! 2. **Domain policy**: drop blocked or non-allowed hosts
//! 3. **Exact dedup**: first record per URL hash wins
//! 4. **Title dedup**: first record per near-identical headline wins
//! 5. **Rank**: newest first, reputable sources first on ties
//! 6. **Cap**: keep at most `max_results`
//!
//! The pipeline is pure. It clones the caller's records, never fails, and
//! shares no state between calls, so one instance can serve many accounts
//! concurrently.
//!
//! # Submodules
//!
//! - [`canonical`]: URL canonicalization and hashing
//! - [`domain`]: [`DomainPolicy`]
//! - [`similarity`]: title normalization and near-duplicate detection
//! - [`quality`]: date parsing and ranking

pub mod canonical;
pub mod domain;
pub mod quality;
pub mod similarity;

use crate::models::ArticleRecord;
use itertools::Itertools;
use tracing::{debug, instrument};

pub use canonical::{canonicalize_url, hash_url};
pub use domain::DomainPolicy;
pub use quality::sort_by_quality;
pub use similarity::{DEFAULT_SIMILARITY_THRESHOLD, SimilarityIndex, dedupe_by_title};

/// Keep the first record for each non-empty `url_hash`.
///
/// Records without a hash are dropped.
pub fn dedupe_by_hash(records: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    records
        .into_iter()
        .filter(|r| !r.url_hash.is_empty())
        .unique_by(|r| r.url_hash.clone())
        .collect()
}

/// Domain policy plus similarity threshold, applied per batch.
#[derive(Debug, Clone)]
pub struct ArticleFilterPipeline {
    policy: DomainPolicy,
    similarity_threshold: f64,
}

impl ArticleFilterPipeline {
    pub fn new(policy: DomainPolicy, similarity_threshold: f64) -> Self {
        Self {
            policy,
            similarity_threshold,
        }
    }

    pub fn policy(&self) -> &DomainPolicy {
        &self.policy
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    /// Fill in `canonical_url` and `url_hash`.
    ///
    /// A record without a link gets an empty canonical URL and an empty hash,
    /// which later stages treat as "no identity".
    pub fn enrich(record: &mut ArticleRecord) {
        if record.link.is_empty() {
            record.canonical_url.clear();
            record.url_hash.clear();
            return;
        }
        record.canonical_url = canonicalize_url(&record.link);
        record.url_hash = hash_url(&record.canonical_url);
    }

    /// Clone and enrich every record, leaving the input untouched.
    pub fn enriched(records: &[ArticleRecord]) -> Vec<ArticleRecord> {
        records
            .iter()
            .cloned()
            .map(|mut record| {
                Self::enrich(&mut record);
                record
            })
            .collect()
    }

    /// Run the full pipeline over one batch.
    ///
    /// An empty result is a valid outcome ("nothing material"), not an error.
    ///
    /// # Arguments
    ///
    /// * `records` - Raw records from the fetch layer; left untouched
    /// * `max_results` - Upper bound on the number of records returned
    ///
    /// # Returns
    ///
    /// Enriched clones of the surviving records, newest first, at most
    /// `max_results` long.
    #[instrument(level = "debug", skip_all, fields(input = records.len(), max_results = max_results))]
    pub fn filter_and_dedupe(
        &self,
        records: &[ArticleRecord],
        max_results: usize,
    ) -> Vec<ArticleRecord> {
        let enriched = Self::enriched(records);

        let allowed: Vec<ArticleRecord> = enriched
            .into_iter()
            .filter(|r| self.policy.is_allowed(r))
            .collect();
        debug!(count = allowed.len(), "After domain filtering");

        let url_unique = dedupe_by_hash(allowed);
        debug!(count = url_unique.len(), "After URL deduplication");

        let title_unique = dedupe_by_title(url_unique, self.similarity_threshold);
        debug!(count = title_unique.len(), "After title deduplication");

        let mut ranked = sort_by_quality(title_unique);
        ranked.truncate(max_results);
        debug!(count = ranked.len(), "After ranking and cap");
        ranked
    }
}

impl Default for ArticleFilterPipeline {
    fn default() -> Self {
        Self::new(DomainPolicy::default(), DEFAULT_SIMILARITY_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, link: &str, date: Option<&str>) -> ArticleRecord {
        ArticleRecord::new(title, "Source", link, date)
    }

    fn pipeline() -> ArticleFilterPipeline {
        ArticleFilterPipeline::new(
            DomainPolicy::new(
                ["reuters.com", "businesswire.com", "techsite.com"],
                ["seekingalpha.com"],
            ),
            DEFAULT_SIMILARITY_THRESHOLD,
        )
    }

    #[test]
    fn test_enrich_sets_canonical_and_hash() {
        let mut r = record("t", "https://reuters.com/a?utm_source=x#f", None);
        ArticleFilterPipeline::enrich(&mut r);
        assert_eq!(r.canonical_url, "https://reuters.com/a");
        assert_eq!(r.url_hash, hash_url("https://reuters.com/a"));

        let mut empty = record("t", "", None);
        empty.url_hash = "stale".to_string();
        ArticleFilterPipeline::enrich(&mut empty);
        assert!(empty.canonical_url.is_empty());
        assert!(empty.url_hash.is_empty());
    }

    #[test]
    fn test_dedupe_by_hash_keeps_first() {
        let records = ArticleFilterPipeline::enriched(&[
            record("first", "https://reuters.com/a", None),
            record("second", "https://reuters.com/a?utm_medium=email", None),
            record("third", "https://reuters.com/b", None),
            record("no link", "", None),
        ]);
        let unique = dedupe_by_hash(records);
        let titles: Vec<_> = unique.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["first", "third"]);
    }

    #[test]
    fn test_input_not_mutated() {
        let input = vec![record("Acme", "https://reuters.com/a?ref=x", None)];
        let before = input.clone();
        let out = pipeline().filter_and_dedupe(&input, 10);
        assert_eq!(input, before);
        assert_eq!(out[0].canonical_url, "https://reuters.com/a");
    }

    #[test]
    fn test_end_to_end_scenario() {
        let input = vec![
            record(
                "Acme raises $50M",
                "https://www.reuters.com/acme-50m?utm_source=feed",
                Some("2024-01-10"),
            ),
            record(
                "Acme funding round closes",
                "https://www.reuters.com/acme-50m#comments",
                Some("2024-01-11"),
            ),
            record(
                "Breaking: Acme names new CEO",
                "https://www.businesswire.com/acme-ceo",
                Some("2024-01-09"),
            ),
            record(
                "Acme names new CEO - TechSite",
                "https://techsite.com/acme-ceo",
                Some("2024-01-12"),
            ),
            record(
                "Acme stock: buy or sell?",
                "https://seekingalpha.com/acme",
                Some("2024-01-13"),
            ),
        ];

        let out = pipeline().filter_and_dedupe(&input, 3);
        let titles: Vec<_> = out.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Acme raises $50M", "Breaking: Acme names new CEO"]);
        assert!(out.iter().all(|r| r.url_hash.len() == 64));
    }

    #[test]
    fn test_cap_and_short_input() {
        let headlines = [
            "Acme raises $50M",
            "Globex opens Ohio plant",
            "Initech cuts 200 jobs",
            "Umbrella Corp recalls vaccine",
            "Hooli acquires Pied Piper",
            "Stark Industries wins defense contract",
            "Wayne Enterprises reports record profit",
            "Cyberdyne unveils new robotics line",
            "Soylent shares tumble after audit",
            "Vandelay Industries expands imports",
        ];
        let input: Vec<_> = headlines
            .iter()
            .enumerate()
            .map(|(i, title)| {
                record(
                    title,
                    &format!("https://reuters.com/story/{}", i),
                    Some(&format!("2024-01-{:02}", i + 1)),
                )
            })
            .collect();
        let p = pipeline();
        let capped = p.filter_and_dedupe(&input, 4);
        assert_eq!(capped.len(), 4);
        assert_eq!(capped[0].link, "https://reuters.com/story/9");
        assert_eq!(p.filter_and_dedupe(&input[..2], 4).len(), 2);
        assert!(p.filter_and_dedupe(&input, 0).is_empty());
    }

    #[test]
    fn test_tolerates_missing_fields() {
        let input = vec![
            ArticleRecord::default(),
            record("", "https://reuters.com/untitled", Some("2024-01-01")),
            record("No link at all", "", Some("2024-01-01")),
            record("No date", "https://reuters.com/nodate", None),
            record("Bad date", "https://reuters.com/baddate", Some("soon")),
        ];
        let out = pipeline().filter_and_dedupe(&input, 10);
        let titles: Vec<_> = out.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["No date", "Bad date"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(pipeline().filter_and_dedupe(&[], 5).is_empty());
    }
}
