//! Request-identity cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a canonical absolute URL.
///
/// Cache generations match by URL only; the method is filtered out before a
/// key is ever computed (only GET requests are stored or matched).
pub fn compute_cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
