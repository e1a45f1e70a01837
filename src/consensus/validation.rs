// Chain validation

use crate::core::Block;
use thiserror::Error;

/// Why a chain failed validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Chain has no genesis block
    #[error("chain is empty")]
    EmptyChain,
    /// Block's previous hash is not its predecessor's hash
    #[error("block {index} does not link to its predecessor")]
    BrokenLink { index: usize },
    /// Stored hash differs from the hash recomputed from the block's fields
    #[error("block {index} hash does not match its contents")]
    HashMismatch { index: usize },
    /// Hash lacks the required leading zeros
    #[error("block {index} does not meet the proof-of-work difficulty")]
    InsufficientWork { index: usize },
    /// A transaction's stored id does not match its contents
    #[error("block {index} holds a transaction whose id does not match its contents")]
    TxIdMismatch { index: usize },
    /// Stored index differs from the chain position
    #[error("block at position {index} claims index {found}")]
    IndexMismatch { index: usize, found: u64 },
}

/// Checks linkage and proof-of-work of a whole chain
pub struct ChainValidator {
    difficulty: usize,
}

impl ChainValidator {
    pub fn new(difficulty: usize) -> Self {
        Self { difficulty }
    }

    /// Validate every block after genesis against its predecessor.
    /// Genesis has no predecessor and is not required to carry work, but its
    /// transactions must still match their ids.
    pub fn validate_chain(&self, chain: &[Block]) -> Result<(), ValidationError> {
        let genesis = chain.first().ok_or(ValidationError::EmptyChain)?;
        Self::validate_transactions(0, genesis)?;

        for (position, pair) in chain.windows(2).enumerate() {
            self.validate_link(position + 1, &pair[0], &pair[1])?;
        }

        Ok(())
    }

    /// Validate `curr`, found at chain position `position`, against `prev`
    pub fn validate_link(
        &self,
        position: usize,
        prev: &Block,
        curr: &Block,
    ) -> Result<(), ValidationError> {
        if curr.previous_hash != prev.hash {
            return Err(ValidationError::BrokenLink { index: position });
        }
        if curr.calculate_hash() != curr.hash {
            return Err(ValidationError::HashMismatch { index: position });
        }
        Self::validate_transactions(position, curr)?;
        if !curr.meets_difficulty(self.difficulty) {
            return Err(ValidationError::InsufficientWork { index: position });
        }
        if curr.index != position as u64 {
            return Err(ValidationError::IndexMismatch {
                index: position,
                found: curr.index,
            });
        }
        Ok(())
    }

    // The block hash commits to transaction ids only, so bodies are checked here
    fn validate_transactions(position: usize, block: &Block) -> Result<(), ValidationError> {
        if block.transactions.iter().all(|tx| tx.has_valid_id()) {
            Ok(())
        } else {
            Err(ValidationError::TxIdMismatch { index: position })
        }
    }
}
