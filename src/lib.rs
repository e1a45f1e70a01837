// Educational UTXO ledger
// Single process, proof-of-work chain with JSON persistence

pub mod core;
pub mod consensus;
pub mod storage;
pub mod ledger;
pub mod wallet;
pub mod config;
pub mod error;
pub mod cli;

// Re-exports for convenience
pub use crate::core::{Account, Amount, Block, Hash256, Transaction, TxInput, TxKind, TxOutput};
pub use crate::consensus::{ChainValidator, Miner, MiningResult, ValidationError};
pub use crate::storage::{ChainStore, OutPoint, UtxoSet};
pub use crate::ledger::{Ledger, Mempool, SpendReceipt};
pub use crate::config::LedgerConfig;
pub use crate::error::{LedgerError, Result, TxRejection};
pub use crate::cli::{Cli, CliHandler};
