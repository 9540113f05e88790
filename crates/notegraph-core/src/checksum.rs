//! Content checksums.
//!
//! A checksum is the lowercase hex SHA-256 of a file's bytes. It is stored on
//! every entity record and is how re-imports detect that a file changed.

use sha2::{Digest, Sha256};

/// Compute the checksum of `bytes`.
pub fn compute_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
