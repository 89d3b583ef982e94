//! Hub URL construction
//!
//! Blob retrieval URLs follow the hub's resolve scheme:
//! `{root}/{repo}/resolve/{rev}/{path}?download=1`.

use crate::manifest::{TokenizerRef, VariantEntry};

/// Build a resolve URL for a file in a hub repo
#[must_use]
pub fn resolve_url(root: &str, repo: &str, rev: &str, path: &str) -> String {
    format!(
        "{}/{repo}/resolve/{rev}/{path}?download=1",
        root.trim_end_matches('/')
    )
}

/// Resolve URL for a variant's model blob
#[must_use]
pub fn variant_url(root: &str, variant: &VariantEntry) -> String {
    resolve_url(root, &variant.repo, &variant.rev, &variant.path)
}

/// Resolve URL for a base's tokenizer.json
#[must_use]
pub fn tokenizer_url(root: &str, tokenizer: &TokenizerRef) -> String {
    resolve_url(root, &tokenizer.repo, &tokenizer.rev, "tokenizer.json")
}

/// Adapters may carry absolute URLs or hub-relative `repo/resolve/...` paths
#[must_use]
pub fn absolute_url(root: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!(
            "{}/{}",
            root.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}
