//! Hashing helpers shared by the cache, change ids and backup checksums.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// Short prefix of a digest, for log lines and file names.
pub fn short_digest(hex: &str) -> &str {
    let end = hex.len().min(12);
    hex.get(..end).unwrap_or(hex)
}
