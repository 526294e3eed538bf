//! Deterministic identity for discovered items.
//!
//! The article id is derived from the canonical URL and the content
//! fingerprint from the normalized body text. Both are pure functions of
//! their input, so the same item hashes the same across runs and processes.

use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{Error, Result};

/// Length of the short article id cut from the canonical-URL digest.
const ID_LEN: usize = 16;

/// Query parameters that carry tracking state, never content identity.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_cid", "mc_eid", "ref"];

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"(?is)<[^>]+>").expect("tag regex");
    static ref WS_RE: Regex = Regex::new(r"\s+").expect("whitespace regex");
}

/// Reduce a URL to its canonical form: lowercase scheme and host, no
/// fragment, no tracking query parameters, no trailing slash on non-root
/// paths. Unparseable or host-less URLs are malformed items.
pub fn canonicalize_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::MalformedItem("empty URL".to_string()));
    }
    let mut url = Url::parse(trimmed)
        .map_err(|e| Error::MalformedItem(format!("unparseable URL {trimmed:?}: {e}")))?;
    if !url.has_host() {
        return Err(Error::MalformedItem(format!("URL without host: {trimmed:?}")));
    }
    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &kept {
            pairs.append_pair(key, value);
        }
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    Ok(url.into())
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

/// Short stable article id: first 16 hex chars of the SHA-256 of the
/// canonical URL.
pub fn article_id(canonical_url: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(canonical_url.as_bytes()));
    digest[..ID_LEN].to_string()
}

/// Normalize body text for fingerprinting: strip markup, lowercase, drop
/// noise punctuation, collapse whitespace runs.
pub fn normalize_text(text: &str) -> String {
    let stripped = TAG_RE.replace_all(text, " ");
    let lowered = stripped.to_lowercase();
    let cleaned: String = lowered.chars().filter(|c| !is_noise_punct(*c)).collect();
    WS_RE.replace_all(&cleaned, " ").trim().to_string()
}

fn is_noise_punct(c: char) -> bool {
    matches!(
        c,
        '.' | ',' | '!' | '?' | ';' | ':' | '"' | '(' | ')' | '[' | ']' | '{' | '}'
    )
}

/// Full SHA-256 hex of the normalized body. An item whose body normalizes
/// to nothing falls back to hashing the canonical URL, so empty items from
/// different URLs do not collide with each other.
pub fn content_fingerprint(canonical_url: &str, body: &str) -> String {
    let normalized = normalize_text(body);
    let subject = if normalized.is_empty() {
        canonical_url
    } else {
        normalized.as_str()
    };
    format!("{:x}", Sha256::digest(subject.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_ignores_tracking_noise() {
        let variants = [
            "https://example.com/post/123",
            "https://example.com/post/123/",
            "https://example.com/post/123?utm_source=rss&utm_medium=feed",
            "https://example.com/post/123#comments",
            "HTTPS://EXAMPLE.COM/post/123?fbclid=abc",
        ];
        let canonical: Vec<String> = variants
            .iter()
            .map(|v| canonicalize_url(v).expect("canonicalize"))
            .collect();
        for form in &canonical {
            assert_eq!(form, &canonical[0]);
        }
        let ids: Vec<String> = canonical.iter().map(|c| article_id(c)).collect();
        for id in &ids {
            assert_eq!(id, &ids[0]);
        }
    }

    #[test]
    fn canonical_form_keeps_meaningful_query() {
        let canonical =
            canonicalize_url("https://example.com/item?id=42&utm_campaign=x").expect("ok");
        assert_eq!(canonical, "https://example.com/item?id=42");
    }

    #[test]
    fn root_path_keeps_single_slash() {
        let with = canonicalize_url("https://example.com/").expect("ok");
        let without = canonicalize_url("https://example.com").expect("ok");
        assert_eq!(with, without);
        assert_eq!(with, "https://example.com/");
    }

    #[test]
    fn garbage_urls_are_malformed() {
        assert!(matches!(
            canonicalize_url("not a url"),
            Err(Error::MalformedItem(_))
        ));
        assert!(matches!(
            canonicalize_url("   "),
            Err(Error::MalformedItem(_))
        ));
        assert!(matches!(
            canonicalize_url("mailto:dev@example.com"),
            Err(Error::MalformedItem(_))
        ));
    }

    #[test]
    fn article_id_is_short_stable_hex() {
        let id = article_id("https://example.com/post/123");
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, article_id("https://example.com/post/123"));
        assert_ne!(id, article_id("https://example.com/post/124"));
    }

    #[test]
    fn normalize_strips_markup_case_and_punctuation() {
        let a = normalize_text("<p>Rust 1.76  brings   <b>faster</b> builds.</p>");
        let b = normalize_text("rust 176 brings faster builds");
        assert_eq!(a, b);
    }

    #[test]
    fn content_fingerprint_survives_reserialization() {
        let url = "https://example.com/post";
        let original = "Async Rust,\nexplained   simply.";
        let reflowed = "async rust explained simply";
        assert_eq!(
            content_fingerprint(url, original),
            content_fingerprint(url, reflowed)
        );
    }

    #[test]
    fn empty_body_falls_back_to_url() {
        let a = content_fingerprint("https://example.com/a", "");
        let b = content_fingerprint("https://example.com/b", "  \n ");
        assert_ne!(a, b);
        assert_eq!(a, content_fingerprint("https://example.com/a", "<br/>"));
    }
}
