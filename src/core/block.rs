// Block data structures

use crate::core::{sha256, Account, Amount, Hash256, Transaction};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Block - ordered transactions linked to a predecessor by hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain (genesis is 0)
    pub index: u64,
    /// Creation time, unix milliseconds. Hashed, never validated.
    pub timestamp: u64,
    /// Transactions, coinbase first
    pub transactions: Vec<Transaction>,
    /// Hash of the previous block (zero for genesis)
    pub previous_hash: Hash256,
    /// Hash over all other fields
    pub hash: Hash256,
    /// Nonce for proof-of-work
    pub nonce: u64,
}

impl Block {
    /// Create a new unmined block stamped with the current time
    pub fn new(index: u64, transactions: Vec<Transaction>, previous_hash: Hash256) -> Self {
        Self::with_timestamp(index, now_millis(), transactions, previous_hash)
    }

    /// Create a new unmined block with an explicit timestamp
    pub fn with_timestamp(
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        previous_hash: Hash256,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            hash: Hash256::zero(),
            nonce: 0,
        };
        block.hash = block.calculate_hash();
        block
    }

    /// Create the genesis block: one coinbase seeding `account`
    pub fn genesis(account: impl Into<Account>, amount: Amount) -> Result<Self> {
        let coinbase = Transaction::coinbase(account, amount)?;
        Ok(Self::new(0, vec![coinbase], Hash256::zero()))
    }

    /// Hash of the stored fields at the stored nonce
    pub fn calculate_hash(&self) -> Hash256 {
        self.hash_with_nonce(self.nonce)
    }

    /// Hash of the stored fields at an arbitrary nonce (no side effects)
    pub fn hash_with_nonce(&self, nonce: u64) -> Hash256 {
        pow_hash(&self.pow_prefix(), nonce)
    }

    /// Everything hashed except the nonce:
    /// index, timestamp, transaction count and IDs, previous hash
    pub fn pow_prefix(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + 8 + 8 + 32 * self.transactions.len() + 32);
        buf.extend_from_slice(&self.index.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&(self.transactions.len() as u64).to_le_bytes());
        for tx in &self.transactions {
            buf.extend_from_slice(tx.id().as_bytes());
        }
        buf.extend_from_slice(self.previous_hash.as_bytes());
        buf
    }

    /// Store a proof-of-work solution found for this block
    pub fn seal(&mut self, nonce: u64, hash: Hash256) {
        self.nonce = nonce;
        self.hash = hash;
        log::info!("Block {} mined: {}", self.index, self.hash);
    }

    /// First `difficulty` hex characters of the stored hash are '0'
    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        self.hash.has_leading_zeros(difficulty)
    }

    /// Check if this is the genesis block
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash.is_zero()
    }
}

/// Hash a prefix from `Block::pow_prefix` together with a nonce
pub fn pow_hash(prefix: &[u8], nonce: u64) -> Hash256 {
    let mut buf = Vec::with_capacity(prefix.len() + 8);
    buf.extend_from_slice(prefix);
    buf.extend_from_slice(&nonce.to_le_bytes());
    sha256(&buf)
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        let tx = Transaction::coinbase("miner", Amount::from_whole(10)).unwrap();
        Block::with_timestamp(1, 1_700_000_000_000, vec![tx], Hash256::new([3; 32]))
    }

    #[test]
    fn test_new_block_hash_is_consistent() {
        let block = sample_block();
        assert_eq!(block.nonce, 0);
        assert_eq!(block.hash, block.calculate_hash());
    }

    #[test]
    fn test_hash_depends_on_nonce() {
        let block = sample_block();
        assert_ne!(block.hash_with_nonce(0), block.hash_with_nonce(1));
        // Recomputing at other nonces leaves the block untouched
        assert_eq!(block.hash, block.calculate_hash());
    }

    #[test]
    fn test_hash_depends_on_content() {
        let a = sample_block();
        let mut b = sample_block();
        b.timestamp += 1;
        assert_ne!(a.calculate_hash(), b.calculate_hash());

        let mut c = sample_block();
        c.previous_hash = Hash256::zero();
        assert_ne!(a.calculate_hash(), c.calculate_hash());
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis("genesis", Amount::from_whole(1000)).unwrap();
        assert!(genesis.is_genesis());
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.transactions.len(), 1);
        assert!(genesis.transactions[0].is_coinbase());
    }

    #[test]
    fn test_seal() {
        let mut block = sample_block();
        let hash = block.hash_with_nonce(42);
        block.seal(42, hash);
        assert_eq!(block.nonce, 42);
        assert_eq!(block.calculate_hash(), block.hash);
    }

    #[test]
    fn test_meets_difficulty() {
        let mut block = sample_block();
        block.hash = Hash256::zero();
        assert!(block.meets_difficulty(5));
        block.hash = Hash256::new([0xff; 32]);
        assert!(block.meets_difficulty(0));
        assert!(!block.meets_difficulty(1));
    }

    #[test]
    fn test_json_round_trip_preserves_hash() {
        let block = sample_block();
        let json = serde_json::to_string(&block).unwrap();
        let decoded: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.calculate_hash(), decoded.hash);
    }
}
