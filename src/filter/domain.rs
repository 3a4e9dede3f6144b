//! Allow/block policy over article source hosts.

use crate::models::ArticleRecord;
use crate::utils::{LOG_FIELD_MAX, truncate_for_log};
use tracing::debug;
use url::Url;

/// Allow-set and block-set of domain substrings.
///
/// Entries are matched as substrings of the article host, case-insensitively.
/// The block-set always wins. An empty allow-set admits every host that is
/// not blocked.
#[derive(Debug, Clone, Default)]
pub struct DomainPolicy {
    allowed: Vec<String>,
    blocked: Vec<String>,
}

impl DomainPolicy {
    pub fn new<A, B>(allowed: A, blocked: B) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        B: IntoIterator,
        B::Item: AsRef<str>,
    {
        Self {
            allowed: normalize_entries(allowed),
            blocked: normalize_entries(blocked),
        }
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    pub fn blocked(&self) -> &[String] {
        &self.blocked
    }

    /// Decide whether a record's source host passes the policy.
    ///
    /// Records without a parseable host in `link` are rejected. When the link
    /// host is not on the allow-list, the record's `source_url` host gets a
    /// second chance against the allow-list (never against the block-list).
    pub fn is_allowed(&self, record: &ArticleRecord) -> bool {
        let Some(host) = host_of(&record.link) else {
            debug!(
                link = %truncate_for_log(&record.link, LOG_FIELD_MAX),
                "No host in article link; rejecting"
            );
            return false;
        };

        if self.blocked.iter().any(|b| host.contains(b.as_str())) {
            debug!(%host, "Host is blocked");
            return false;
        }

        if self.allowed.is_empty() || self.allows_host(&host) {
            return true;
        }

        let source_allowed = record
            .source_url
            .as_deref()
            .and_then(host_of)
            .is_some_and(|source_host| self.allows_host(&source_host));
        if !source_allowed {
            debug!(%host, "Host not on allow-list");
        }
        source_allowed
    }

    fn allows_host(&self, host: &str) -> bool {
        self.allowed.iter().any(|a| host.contains(a.as_str()))
    }
}

fn normalize_entries<I>(entries: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    entries
        .into_iter()
        .map(|e| e.as_ref().trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Lower-cased host of `url` with a leading `www.` removed.
///
/// `None` for empty, unparseable or host-less URLs.
pub fn host_of(url: &str) -> Option<String> {
    if url.trim().is_empty() {
        return None;
    }
    let parsed = match Url::parse(url.trim()) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(
                url = %truncate_for_log(url, LOG_FIELD_MAX),
                error = %e,
                "Failed to parse URL host"
            );
            return None;
        }
    };
    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if host.is_empty() { None } else { Some(host) }
}
