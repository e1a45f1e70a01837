// Ledger configuration

use crate::core::{Account, Amount};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Largest difficulty a 64-hex-char digest can satisfy
pub const MAX_DIFFICULTY: usize = 64;

/// Ledger parameters, fixed for the lifetime of a `Ledger`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Leading '0' hex characters required in mined block hashes
    pub difficulty: usize,
    /// Coinbase amount paid per mined block
    pub mining_reward: Amount,
    /// Account seeded by the genesis block
    pub genesis_account: Account,
    /// Amount minted by the genesis block
    pub genesis_amount: Amount,
    /// Proof-of-work worker threads
    pub mining_threads: usize,
    /// Where the chain is saved
    pub chain_file: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: 3,
            mining_reward: Amount::from_whole(10),
            genesis_account: Account::from("genesis"),
            genesis_amount: Amount::from_whole(1000),
            mining_threads: 1,
            chain_file: PathBuf::from("blockchain.json"),
        }
    }
}

impl LedgerConfig {
    /// Read a JSON config file; missing fields and a missing file fall back to defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => {
                let config: LedgerConfig = serde_json::from_str(&content)?;
                log::info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::Config(format!(
                "difficulty {} exceeds maximum {}",
                self.difficulty, MAX_DIFFICULTY
            )));
        }
        if !self.mining_reward.is_positive() {
            return Err(LedgerError::Config("mining reward must be positive".to_string()));
        }
        if !self.genesis_amount.is_positive() {
            return Err(LedgerError::Config("genesis amount must be positive".to_string()));
        }
        if self.mining_threads == 0 {
            return Err(LedgerError::Config("mining threads must be at least 1".to_string()));
        }
        Ok(())
    }
}
