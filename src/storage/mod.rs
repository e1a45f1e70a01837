// Storage layer: derived UTXO state and chain persistence

mod chain_store;
mod utxo_set;

pub use chain_store::{to_json, ChainStore};
pub use utxo_set::{OutPoint, UtxoSet};
