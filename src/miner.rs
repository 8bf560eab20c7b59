//! Proof-of-work search and verification.
//!
//! A proof `p` is valid for the previous block's proof `last` when
//! `sha256(format!("{last}{p}"))` starts with `difficulty` hex `'0'`
//! characters. The search walks candidates upward from zero, so the proof it
//! returns is always the smallest valid one.

use crate::crypto::sha256_hex;

/// Leading zero hex digits required of a proof hash.
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Upper bound for the difficulty: a SHA-256 hex digest has 64 characters.
pub const MAX_DIFFICULTY: u32 = 64;

/// Number of candidates tried between two polls of the stop condition.
pub const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Check whether `proof` solves the puzzle posed by `last_proof`.
pub fn valid_proof(last_proof: u64, proof: u64, difficulty: u32) -> bool {
    let guess = format!("{}{}", last_proof, proof);
    let digest = sha256_hex(guess.as_bytes());
    let zeros = difficulty as usize;
    digest.len() >= zeros && digest[..zeros].bytes().all(|b| b == b'0')
}

/// Unbounded search for the smallest valid proof.
pub fn find_proof(last_proof: u64, difficulty: u32) -> u64 {
    let mut proof = 0;
    while !valid_proof(last_proof, proof, difficulty) {
        proof += 1;
    }
    proof
}

/// Like [`find_proof`], but gives up and returns `None` as soon as
/// `should_stop` reports true. The condition is polled every
/// [`CANCEL_CHECK_INTERVAL`] candidates.
pub fn find_proof_until<F>(last_proof: u64, difficulty: u32, mut should_stop: F) -> Option<u64>
where
    F: FnMut() -> bool,
{
    let mut proof = 0u64;
    loop {
        if proof % CANCEL_CHECK_INTERVAL == 0 && should_stop() {
            return None;
        }
        if valid_proof(last_proof, proof, difficulty) {
            return Some(proof);
        }
        proof = proof.checked_add(1)?;
    }
}
