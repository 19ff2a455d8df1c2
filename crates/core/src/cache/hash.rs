//! Cache key generation.
//!
//! The key is a digest of the URL exactly as the caller sent it. Nothing
//! is normalized: `?a=1&b=2` and `?b=2&a=1` are different entries.

use sha2::{Digest, Sha256};

/// Content type stored alongside every artifact.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Suffix appended to the digest to form the object key.
pub const PDF_EXTENSION: &str = ".pdf";

/// Compute the cache key (lower-case hex SHA-256) of a raw URL string.
pub fn compute_cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Object key under which the rendered PDF for `url` is stored: `<hex-digest>.pdf`.
pub fn object_key(url: &str) -> String {
    format!("{}{PDF_EXTENSION}", compute_cache_key(url))
}
