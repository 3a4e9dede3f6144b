//! Seen-URL tracking across runs.
//!
//! Articles that were already delivered for an account are filtered out of
//! the next run. Entries are keyed by account (`ACCOUNT#{company}`) and URL
//! hash (`URL#{hash}`) and expire after [`SEEN_TTL_DAYS`].
//!
//! [`MemorySeenStore`] is safe to share between concurrently processed
//! accounts: lookups take a read lock and marking takes a write lock. It can
//! be loaded from and saved to a JSON snapshot between runs.

use crate::models::ArticleRecord;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use tokio::fs;
use tracing::{debug, info, instrument};

/// How long a delivered URL stays suppressed.
pub const SEEN_TTL_DAYS: i64 = 90;

/// Membership store for delivered article hashes.
pub trait SeenStore: Send + Sync {
    /// Records whose `url_hash` has not been marked for `account`.
    ///
    /// Records without a hash are never returned.
    fn filter_unseen(&self, account: &str, records: &[ArticleRecord]) -> Vec<ArticleRecord>;

    /// Mark hashes as delivered. Re-marking refreshes the expiry.
    ///
    /// `published_dates` pairs positionally with `url_hashes`; missing dates
    /// are stored as empty strings.
    fn mark_seen(&self, account: &str, url_hashes: &[String], published_dates: &[String]);
}

/// One delivered URL, as stored in the snapshot file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SeenEntry {
    pub pk: String,
    pub sk: String,
    pub account: String,
    pub url_hash: String,
    pub pub_date: String,
    pub seen_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

fn account_key(account: &str) -> String {
    format!("ACCOUNT#{}", account)
}

fn url_key(url_hash: &str) -> String {
    format!("URL#{}", url_hash)
}

/// In-process [`SeenStore`] backed by a JSON snapshot.
#[derive(Debug, Default)]
pub struct MemorySeenStore {
    entries: RwLock<HashMap<String, HashMap<String, SeenEntry>>>,
}

impl MemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `url_hash` is marked for `account` and unexpired at `now`.
    pub fn contains_at(&self, account: &str, url_hash: &str, now: DateTime<Utc>) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&account_key(account))
            .and_then(|by_url| by_url.get(&url_key(url_hash)))
            .is_some_and(|entry| entry.expires_at > now)
    }

    pub fn filter_unseen_at(
        &self,
        account: &str,
        records: &[ArticleRecord],
        now: DateTime<Utc>,
    ) -> Vec<ArticleRecord> {
        records
            .iter()
            .filter(|r| !r.url_hash.is_empty() && !self.contains_at(account, &r.url_hash, now))
            .cloned()
            .collect()
    }

    /// Mark hashes as delivered at `now`. Empty hashes are skipped.
    ///
    /// Returns how many entries were written.
    pub fn mark_seen_at(
        &self,
        account: &str,
        url_hashes: &[String],
        published_dates: &[String],
        now: DateTime<Utc>,
    ) -> usize {
        if url_hashes.iter().all(String::is_empty) {
            return 0;
        }
        let expires_at = now + Duration::days(SEEN_TTL_DAYS);
        let pk = account_key(account);

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let by_url = entries.entry(pk.clone()).or_default();
        let mut marked = 0;
        for (i, url_hash) in url_hashes.iter().enumerate() {
            if url_hash.is_empty() {
                continue;
            }
            let sk = url_key(url_hash);
            by_url.insert(
                sk.clone(),
                SeenEntry {
                    pk: pk.clone(),
                    sk,
                    account: account.to_string(),
                    url_hash: url_hash.clone(),
                    pub_date: published_dates.get(i).cloned().unwrap_or_default(),
                    seen_at: now,
                    expires_at,
                },
            );
            marked += 1;
        }
        debug!(account, marked, "Marked URLs as seen");
        marked
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries that expired at or before `now`. Returns how many were removed.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before: usize = entries.values().map(HashMap::len).sum();
        for by_url in entries.values_mut() {
            by_url.retain(|_, entry| entry.expires_at > now);
        }
        entries.retain(|_, by_url| !by_url.is_empty());
        let after: usize = entries.values().map(HashMap::len).sum();
        before - after
    }

    fn from_entries(list: Vec<SeenEntry>) -> Self {
        let mut entries: HashMap<String, HashMap<String, SeenEntry>> = HashMap::new();
        for entry in list {
            entries
                .entry(entry.pk.clone())
                .or_default()
                .insert(entry.sk.clone(), entry);
        }
        Self {
            entries: RwLock::new(entries),
        }
    }

    fn to_entries(&self) -> Vec<SeenEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<SeenEntry> = entries
            .values()
            .flat_map(|by_url| by_url.values().cloned())
            .collect();
        list.sort_by(|a, b| (&a.pk, &a.sk).cmp(&(&b.pk, &b.sk)));
        list
    }

    /// Load a snapshot; a missing file yields an empty store.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let path = path.as_ref();
        if !fs::try_exists(path).await? {
            info!("No seen-URL snapshot yet; starting empty");
            return Ok(Self::new());
        }
        let raw = fs::read_to_string(path).await?;
        let list: Vec<SeenEntry> = serde_json::from_str(&raw)?;
        info!(entries = list.len(), "Loaded seen-URL snapshot");
        Ok(Self::from_entries(list))
    }

    /// Prune expired entries and write the snapshot.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn Error>> {
        let pruned = self.prune_expired(Utc::now());
        let list = self.to_entries();
        let json = serde_json::to_string_pretty(&list)?;
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path.as_ref(), json).await?;
        info!(entries = list.len(), pruned, "Saved seen-URL snapshot");
        Ok(())
    }
}

impl SeenStore for MemorySeenStore {
    fn filter_unseen(&self, account: &str, records: &[ArticleRecord]) -> Vec<ArticleRecord> {
        self.filter_unseen_at(account, records, Utc::now())
    }

    fn mark_seen(&self, account: &str, url_hashes: &[String], published_dates: &[String]) {
        self.mark_seen_at(account, url_hashes, published_dates, Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ArticleFilterPipeline;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn hashed(link: &str) -> ArticleRecord {
        let mut r = ArticleRecord::new("t", "s", link, None);
        ArticleFilterPipeline::enrich(&mut r);
        r
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_filter_unseen_removes_marked() {
        let store = MemorySeenStore::new();
        let records = vec![hashed("https://a.com/1"), hashed("https://a.com/2")];
        store.mark_seen_at("Acme", &[records[0].url_hash.clone()], &[], t0());

        let unseen = store.filter_unseen_at("Acme", &records, t0());
        assert_eq!(unseen.len(), 1);
        assert_eq!(unseen[0].link, "https://a.com/2");
    }

    #[test]
    fn test_accounts_are_independent() {
        let store = MemorySeenStore::new();
        let records = vec![hashed("https://a.com/1")];
        store.mark_seen_at("Acme", &[records[0].url_hash.clone()], &[], t0());
        assert_eq!(store.filter_unseen_at("Globex", &records, t0()).len(), 1);
    }

    #[test]
    fn test_records_without_hash_are_dropped() {
        let store = MemorySeenStore::new();
        let records = vec![ArticleRecord::new("t", "s", "https://a.com/1", None)];
        assert!(store.filter_unseen_at("Acme", &records, t0()).is_empty());
    }

    #[test]
    fn test_mark_is_idempotent() {
        let store = MemorySeenStore::new();
        let hashes = vec!["abc".to_string(), "def".to_string(), String::new()];
        let dates = vec!["2024-02-28".to_string()];
        assert_eq!(store.mark_seen_at("Acme", &hashes, &dates, t0()), 2);
        assert_eq!(store.mark_seen_at("Acme", &hashes, &dates, t0()), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.mark_seen_at("Acme", &[String::new()], &[], t0()), 0);

        let entries = store.to_entries();
        assert_eq!(entries[0].sk, "URL#abc");
        assert_eq!(entries[0].pk, "ACCOUNT#Acme");
        assert_eq!(entries[0].pub_date, "2024-02-28");
        assert_eq!(entries[1].pub_date, "");
    }

    #[test]
    fn test_entries_expire() {
        let store = MemorySeenStore::new();
        store.mark_seen_at("Acme", &["abc".to_string()], &[], t0());
        assert!(store.contains_at("Acme", "abc", t0() + Duration::days(89)));
        assert!(!store.contains_at("Acme", "abc", t0() + Duration::days(SEEN_TTL_DAYS)));
        assert_eq!(store.prune_expired(t0() + Duration::days(91)), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_mark_and_lookup() {
        let store = Arc::new(MemorySeenStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let hash = format!("hash-{}", i);
                    store.mark_seen("Acme", &[hash.clone()], &[]);
                    assert!(store.contains_at("Acme", &hash, Utc::now()));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 8);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("seen.json");

        let missing = MemorySeenStore::load(&path).await.unwrap();
        assert!(missing.is_empty());

        let store = MemorySeenStore::new();
        store.mark_seen("Acme", &["abc".to_string()], &["2024-01-10".to_string()]);
        store.mark_seen_at("Acme", &["old".to_string()], &[], t0() - Duration::days(365));
        store.save(&path).await.unwrap();

        let loaded = MemorySeenStore::load(&path).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_at("Acme", "abc", Utc::now()));
    }
}
