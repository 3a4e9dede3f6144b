//! Near-duplicate detection on article titles.
//!
//! Titles are normalized (case, whitespace, wire-style labels, trailing source
//! attribution) and compared with the Ratcliff/Obershelp ratio: the number of
//! characters covered by recursively found longest common substrings, doubled,
//! over the combined length of both titles.
//!
//! Every new title is compared against every title accepted so far, which is
//! quadratic in the batch size. Batches are capped upstream to a few dozen
//! records so the full scan is kept; a length bound skips pairs that cannot
//! reach the threshold without changing any decision.

use crate::models::ArticleRecord;
use crate::utils::{LOG_FIELD_MAX, truncate_for_log};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Default ratio at or above which two titles are the same story.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.92;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static LEADING_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:breaking|exclusive|update):\s*").unwrap());

const SOURCE_SEPARATOR: &str = " - ";

/// Normalize a title for comparison.
///
/// Lower-cases, collapses whitespace, strips leading `breaking:`,
/// `exclusive:` and `update:` labels, and drops a trailing ` - Source`
/// attribution (everything after the last ` - `).
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let collapsed = WHITESPACE.replace_all(&lowered, " ");
    let mut normalized = collapsed.trim();

    while let Some(label) = LEADING_LABEL.find(normalized) {
        normalized = &normalized[label.end()..];
    }

    if let Some(idx) = normalized.rfind(SOURCE_SEPARATOR) {
        normalized = &normalized[..idx];
    }

    normalized.trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Match {
    a: usize,
    b: usize,
    size: usize,
}

/// Longest common substring of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Ties resolve to the earliest start in `a`, then in `b`.
fn find_longest_match(
    a: &[char],
    b: &[char],
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> Match {
    let mut best = Match {
        a: alo,
        b: blo,
        size: 0,
    };
    let width = bhi - blo + 1;
    let mut prev = vec![0usize; width];
    let mut curr = vec![0usize; width];

    for i in alo..ahi {
        for j in blo..bhi {
            let k = if a[i] == b[j] { prev[j - blo] + 1 } else { 0 };
            curr[j - blo + 1] = k;
            if k > best.size {
                best = Match {
                    a: i + 1 - k,
                    b: j + 1 - k,
                    size: k,
                };
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    best
}

/// Total characters in the matching blocks of `a` and `b`.
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![((0, a.len()), (0, b.len()))];

    while let Some(((alo, ahi), (blo, bhi))) = pending.pop() {
        if alo >= ahi || blo >= bhi {
            continue;
        }
        let m = find_longest_match(a, b, (alo, ahi), (blo, bhi));
        if m.size == 0 {
            continue;
        }
        total += m.size;
        pending.push(((alo, m.a), (blo, m.b)));
        pending.push(((m.a + m.size, ahi), (m.b + m.size, bhi)));
    }
    total
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(a, b) as f64 / total as f64
}

/// Similarity ratio of two strings in `[0, 1]`; identical strings score 1.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Upper bound on the ratio given only the two lengths.
fn ratio_upper_bound(a_len: usize, b_len: usize) -> f64 {
    let total = a_len + b_len;
    if total == 0 {
        return 1.0;
    }
    2.0 * a_len.min(b_len) as f64 / total as f64
}

/// Normalized titles accepted so far during one deduplication pass.
#[derive(Debug)]
pub struct SimilarityIndex {
    threshold: f64,
    accepted: Vec<Vec<char>>,
}

impl SimilarityIndex {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            accepted: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// Whether `normalized` is at or above the threshold against any accepted title.
    pub fn is_duplicate(&self, normalized: &str) -> bool {
        let candidate: Vec<char> = normalized.chars().collect();
        self.find_duplicate(&candidate).is_some()
    }

    fn find_duplicate(&self, candidate: &[char]) -> Option<usize> {
        self.accepted.iter().position(|seen| {
            ratio_upper_bound(candidate.len(), seen.len()) >= self.threshold
                && ratio_chars(candidate, seen) >= self.threshold
        })
    }

    /// Accept `normalized` unless it duplicates an earlier title.
    ///
    /// Returns `true` when the title was new and has been recorded.
    pub fn try_insert(&mut self, normalized: &str) -> bool {
        let candidate: Vec<char> = normalized.chars().collect();
        match self.find_duplicate(&candidate) {
            Some(_) => false,
            None => {
                self.accepted.push(candidate);
                true
            }
        }
    }
}

/// Drop records whose normalized title duplicates an earlier one.
///
/// Input order is kept and the first title of a story wins. Records whose
/// title normalizes to nothing are dropped as well.
pub fn dedupe_by_title(records: Vec<ArticleRecord>, threshold: f64) -> Vec<ArticleRecord> {
    let mut index = SimilarityIndex::new(threshold);
    let mut unique = Vec::with_capacity(records.len());

    for record in records {
        let normalized = normalize_title(&record.title);
        if normalized.is_empty() {
            debug!(
                link = %truncate_for_log(&record.link, LOG_FIELD_MAX),
                "Dropping article with empty title"
            );
            continue;
        }
        if index.try_insert(&normalized) {
            unique.push(record);
        } else {
            debug!(
                title = %truncate_for_log(&record.title, LOG_FIELD_MAX),
                "Dropping near-duplicate title"
            );
        }
    }
    unique
}
