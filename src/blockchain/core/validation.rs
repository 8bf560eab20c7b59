use crate::error::ChainError;
use crate::miner::valid_proof;

use super::chain::Block;

/// Check that every block links to, and solves the puzzle posed by, the
/// block right before it. The genesis block is taken as given.
pub fn validate_chain(chain: &[Block], difficulty: u32) -> Result<(), ChainError> {
    if chain.is_empty() {
        return Err(ChainError::EmptyChain);
    }

    for pair in chain.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);

        if current.previous_hash != previous.hash() {
            return Err(ChainError::InvalidBlockLinkage { index: current.index });
        }

        if !valid_proof(previous.proof, current.proof, difficulty) {
            return Err(ChainError::InvalidProofOfWork { index: current.index });
        }
    }

    Ok(())
}

pub fn is_valid_chain(chain: &[Block], difficulty: u32) -> bool {
    validate_chain(chain, difficulty).is_ok()
}
