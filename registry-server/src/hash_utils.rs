//! Digests for stored package payloads

/// Calculate SHA256 hash of data as a lowercase hex string.
///
/// # Examples
///
/// ```
/// # use registry_server::hash_utils::sha256_hash;
/// let hash = sha256_hash(b"hello world");
/// assert_eq!(hash.len(), 64);
/// ```
pub fn sha256_hash(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
