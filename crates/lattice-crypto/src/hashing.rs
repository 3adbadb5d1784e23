//! # Invocation Hashing
//!
//! SHA-256 over `origin_url || target_url || operation || payload`,
//! rendered as uppercase hex.

use sha2::{Digest, Sha256};

/// Integrity hash bound into an invocation's claims.
pub fn invocation_hash(origin_url: &str, target_url: &str, operation: &str, msg: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(origin_url.as_bytes());
    hasher.update(target_url.as_bytes());
    hasher.update(operation.as_bytes());
    hasher.update(msg);
    hex::encode_upper(hasher.finalize())
}
