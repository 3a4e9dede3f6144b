//! URL canonicalization and hashing.
//!
//! A canonical URL is the article link with its fragment and any tracking
//! query parameters removed. Its SHA-256 digest is the identity used for
//! exact deduplication and for the seen-URL store.
//!
//! Canonicalization never reports an error. The URL is split textually into
//! scheme, authority, path, query and fragment (the same shape a generic URI
//! splitter produces) so that malformed input still yields a best-effort
//! result, and so that letter case in the scheme, host and path is left
//! exactly as the publisher wrote it.

use sha2::{Digest, Sha256};
use url::form_urlencoded;

/// Query keys stripped during canonicalization, compared case-insensitively.
pub const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "msclkid",
    "ref",
    "source",
    "campaign",
    "_ga",
    "_gl",
    "mc_cid",
    "mc_eid",
];

/// Borrowed view of the pieces of a URL, fragment already discarded.
#[derive(Debug, PartialEq)]
struct UrlParts<'a> {
    scheme: Option<&'a str>,
    authority: Option<&'a str>,
    /// Path including any `;params` on the last segment.
    path: &'a str,
    query: Option<&'a str>,
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

fn split_url(url: &str) -> UrlParts<'_> {
    let rest = match url.find('#') {
        Some(i) => &url[..i],
        None => url,
    };

    let (scheme, rest) = match rest.find(':') {
        Some(i) if is_scheme(&rest[..i]) => (Some(&rest[..i]), &rest[i + 1..]),
        _ => (None, rest),
    };

    let (authority, rest) = match rest.strip_prefix("//") {
        Some(after) => {
            let end = after.find(['/', '?']).unwrap_or(after.len());
            (Some(&after[..end]), &after[end..])
        }
        None => (None, rest),
    };

    let (path, query) = match rest.find('?') {
        Some(i) => (&rest[..i], Some(&rest[i + 1..])),
        None => (rest, None),
    };

    UrlParts {
        scheme,
        authority,
        path,
        query,
    }
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS
        .iter()
        .any(|param| param.eq_ignore_ascii_case(key))
}

/// Rebuild a query string without tracking pairs, keeping the rest in order.
///
/// Duplicate keys and blank values survive. Returns an empty string when
/// nothing is left.
fn strip_tracking(query: &str) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut kept = 0usize;
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if is_tracking_param(&key) {
            continue;
        }
        serializer.append_pair(&key, &value);
        kept += 1;
    }
    if kept == 0 {
        String::new()
    } else {
        serializer.finish()
    }
}

/// Canonicalize an article URL by removing tracking parameters and the fragment.
///
/// Empty input is returned unchanged. The result is stable under repeated
/// application: `canonicalize_url(&canonicalize_url(u)) == canonicalize_url(u)`.
///
/// # Arguments
///
/// * `url` - The raw article link, well-formed or not
///
/// # Returns
///
/// The link without its fragment and without tracking query pairs. Letter
/// case and the order of the remaining pairs are preserved.
///
/// # Examples
///
/// ```
/// use awful_account_news::filter::canonical::canonicalize_url;
///
/// assert_eq!(
///     canonicalize_url("https://www.reuters.com/a?id=7&utm_source=x#top"),
///     "https://www.reuters.com/a?id=7"
/// );
/// ```
pub fn canonicalize_url(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }

    let parts = split_url(url);
    let query = parts.query.map(strip_tracking).unwrap_or_default();

    let mut canonical = String::with_capacity(url.len());
    if let Some(scheme) = parts.scheme {
        canonical.push_str(scheme);
        canonical.push(':');
    }
    if let Some(authority) = parts.authority {
        canonical.push_str("//");
        canonical.push_str(authority);
    }
    canonical.push_str(parts.path);
    if !query.is_empty() {
        canonical.push('?');
        canonical.push_str(&query);
    }
    canonical
}

/// SHA-256 of a canonical URL as 64 lowercase hex characters.
pub fn hash_url(canonical_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_url.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_url_unchanged() {
        assert_eq!(canonicalize_url(""), "");
    }

    #[test]
    fn test_strips_every_tracking_param() {
        for param in TRACKING_PARAMS {
            let url = format!("https://example.com/story?id=1&{}=abc&page=2", param);
            assert_eq!(
                canonicalize_url(&url),
                "https://example.com/story?id=1&page=2",
                "param {} survived",
                param
            );
        }
    }

    #[test]
    fn test_tracking_keys_case_insensitive() {
        let url = "https://example.com/a?UTM_Source=x&FbClid=y&keep=1";
        assert_eq!(canonicalize_url(url), "https://example.com/a?keep=1");
    }

    #[test]
    fn test_preserves_order_duplicates_and_blanks() {
        let url = "https://example.com/a?b=2&a=1&b=3&empty=&ref=home";
        assert_eq!(
            canonicalize_url(url),
            "https://example.com/a?b=2&a=1&b=3&empty="
        );
    }

    #[test]
    fn test_drops_query_when_only_tracking() {
        let url = "https://example.com/a?utm_source=x&utm_medium=y";
        assert_eq!(canonicalize_url(url), "https://example.com/a");
    }

    #[test]
    fn test_drops_fragment() {
        assert_eq!(
            canonicalize_url("https://example.com/a#section-2"),
            "https://example.com/a"
        );
        assert_eq!(
            canonicalize_url("https://example.com/a?x=1#frag?y=2"),
            "https://example.com/a?x=1"
        );
    }

    #[test]
    fn test_keeps_letter_case_and_params() {
        let url = "HTTPS://News.Example.COM/Path;v=1/Story?Id=9";
        assert_eq!(canonicalize_url(url), url);
    }

    #[test]
    fn test_malformed_is_best_effort() {
        assert_eq!(canonicalize_url("not a url"), "not a url");
        assert_eq!(canonicalize_url("::::"), "::::");
        assert_eq!(
            canonicalize_url("example.com/story?gclid=1&q=x"),
            "example.com/story?q=x"
        );
        assert_eq!(canonicalize_url("?utm_source=x"), "");
    }

    #[test]
    fn test_idempotent() {
        let urls = [
            "https://example.com/a?q=a%20b&utm_source=x#f",
            "https://example.com/a?q=a+b&x",
            "https://example.com/a?&&=v&k",
            "mailto:someone@example.com",
            "//cdn.example.com/x?ref=1",
            "https://example.com/caf%C3%A9?name=%E2%9C%93",
            "weird ?? input # here",
        ];
        for url in urls {
            let once = canonicalize_url(url);
            assert_eq!(canonicalize_url(&once), once, "not idempotent for {}", url);
        }
    }

    #[test]
    fn test_split_url_parts() {
        let parts = split_url("https://user@host:8080/p;x?q=1#f");
        assert_eq!(
            parts,
            UrlParts {
                scheme: Some("https"),
                authority: Some("user@host:8080"),
                path: "/p;x",
                query: Some("q=1"),
            }
        );
        let parts = split_url("/relative/path");
        assert_eq!(parts.scheme, None);
        assert_eq!(parts.authority, None);
        assert_eq!(parts.path, "/relative/path");
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        let hash = hash_url("https://example.com/a");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hash, hash_url("https://example.com/a"));
        assert_ne!(hash, hash_url("https://example.com/b"));
        assert_eq!(
            hash_url(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_tracking_variants_hash_equal() {
        let a = hash_url(&canonicalize_url(
            "https://example.com/story?id=4&utm_campaign=spring#comments",
        ));
        let b = hash_url(&canonicalize_url("https://example.com/story?fbclid=zz&id=4"));
        let c = hash_url(&canonicalize_url("https://example.com/story?id=4"));
        assert_eq!(a, b);
        assert_eq!(b, c);
    }
}
