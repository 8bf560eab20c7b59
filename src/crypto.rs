//! Hashing and identity helpers.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// SHA-256 of `bytes` as a lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Random 128-bit node identifier rendered as 32 hex characters.
pub fn generate_node_id() -> String {
    let mut raw = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut raw);
    hex::encode(raw)
}
