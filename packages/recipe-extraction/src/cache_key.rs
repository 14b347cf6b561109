//! Deterministic cache-key derivation.
//!
//! URL inputs use their canonical form verbatim; text inputs use a SHA-256
//! hash of the trimmed text. Pure functions, no I/O.

use sha2::{Digest, Sha256};
use url::Url;

use crate::types::input::{InputKind, RawInput};

/// Prefix that keeps text keys disjoint from URL keys.
const TEXT_KEY_PREFIX: &str = "text:";

/// Exact query parameter names dropped during canonicalization.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "dclid",
    "msclkid",
    "mc_cid",
    "mc_eid",
    "igshid",
    "igsh",
    "si",
    "ref",
    "ref_src",
    "_ga",
    "_gl",
    "yclid",
    "spm",
    "share_id",
    "is_from_webapp",
    "sender_device",
];

/// Query parameter prefixes dropped during canonicalization.
const TRACKING_PREFIXES: &[&str] = &["utm_"];

/// Derive the cache key for a request.
///
/// `force_refresh` has no effect on the key. URL payloads that fail to parse
/// fall back to the text hash so the function stays total.
pub fn derive_cache_key(input: &RawInput) -> String {
    match input.kind {
        InputKind::Url | InputKind::Video => {
            canonicalize_url(&input.payload).unwrap_or_else(|| text_key(&input.payload))
        }
        InputKind::Text => text_key(&input.payload),
    }
}

/// Key for a text or dish-name payload.
pub fn text_key(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().as_bytes());
    format!("{}{:x}", TEXT_KEY_PREFIX, hasher.finalize())
}

/// Canonicalize a URL for use as a cache key.
///
/// Lowercases scheme and host (the `url` crate does this on parse), drops
/// tracking parameters, the fragment and default ports, and removes the
/// trailing slash. Remaining query parameters keep their order.
pub fn canonicalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }

    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !is_tracking_param(name))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let path = url.path().to_string();
    let trimmed = path.trim_end_matches('/');
    if trimmed.len() != path.len() {
        url.set_path(trimmed);
    }

    let mut canonical = url.to_string();
    // The url crate always renders a root path as "/"
    if url.path() == "/" && url.query().is_none() {
        canonical.truncate(canonical.trim_end_matches('/').len());
    }
    Some(canonical)
}

fn is_tracking_param(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    TRACKING_PARAMS.contains(&lower.as_str())
        || TRACKING_PREFIXES.iter().any(|p| lower.starts_with(p))
}
