// Ledger: chain, mempool and live UTXO set behind one owner

mod mempool;

pub use mempool::Mempool;

use crate::config::LedgerConfig;
use crate::consensus::{ChainValidator, Miner, ValidationError};
use crate::core::{Account, Amount, Block, Hash256, Transaction};
use crate::error::{LedgerError, Result, TxRejection};
use crate::storage::{self, ChainStore, UtxoSet};
use crate::wallet::TransactionBuilder;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Outcome of `Ledger::submit_spend`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendReceipt {
    /// Whether the transaction entered the mempool
    pub accepted: bool,
    pub txid: Hash256,
    /// Why it was refused, when not accepted
    pub rejection: Option<TxRejection>,
}

/// The whole ledger state.
///
/// Mutating operations take `&mut self`, so one owner drives the ledger at a
/// time. Validation followed by reservation (in `submit`) and validation
/// followed by application (in `mine`) are therefore never interleaved with
/// other writers. Share a ledger between threads by wrapping it in a single
/// lock.
pub struct Ledger {
    chain: Vec<Block>,
    mempool: Mempool,
    /// Applied chain state plus mempool reservations
    utxo: UtxoSet,
    config: LedgerConfig,
    miner: Miner,
}

impl Ledger {
    /// Fresh ledger holding only the genesis block
    pub fn new(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let genesis = Block::genesis(config.genesis_account.clone(), config.genesis_amount)?;
        log::info!("Created genesis block {}", genesis.hash);
        Ok(Self::assemble(config, vec![genesis]))
    }

    /// Ledger over an existing chain. The mempool starts empty and the UTXO
    /// set is rebuilt from the chain. An empty chain gives a fresh genesis.
    pub fn from_chain(config: LedgerConfig, chain: Vec<Block>) -> Result<Self> {
        config.validate()?;
        if chain.is_empty() {
            return Self::new(config);
        }

        let ledger = Self::assemble(config, chain);
        if let Err(e) = ledger.verify() {
            log::warn!("Loaded chain does not validate: {}", e);
        }
        Ok(ledger)
    }

    /// Load the chain from `config.chain_file`, or start fresh if none is saved
    pub fn open(config: LedgerConfig) -> Result<Self> {
        let store = ChainStore::new(&config.chain_file);
        match store.load()? {
            Some(chain) => Self::from_chain(config, chain),
            None => {
                log::info!("No saved blockchain found, starting new one");
                Self::new(config)
            }
        }
    }

    /// Save the chain to `config.chain_file`
    pub fn save(&self) -> Result<()> {
        ChainStore::new(&self.config.chain_file).save(&self.chain)
    }

    fn assemble(config: LedgerConfig, chain: Vec<Block>) -> Self {
        let utxo = UtxoSet::from_chain(&chain);
        let miner = Miner::new(config.difficulty).with_threads(config.mining_threads);
        Self {
            chain,
            mempool: Mempool::new(),
            utxo,
            config,
            miner,
        }
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Most recent block. The chain always holds at least genesis.
    pub fn latest_block(&self) -> &Block {
        &self.chain[self.chain.len() - 1]
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    /// Live UTXO set, including mempool reservations
    pub fn utxo_set(&self) -> &UtxoSet {
        &self.utxo
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Set to `true` to abort a running `mine`
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.miner.cancel_handle()
    }

    // Disposable UTXO set rebuilt from the chain, without reservations
    fn snapshot(&self) -> UtxoSet {
        UtxoSet::from_chain(&self.chain)
    }

    /// Admit a transaction to the mempool and reserve its inputs.
    /// A rejected transaction leaves the ledger unchanged. A coinbase with
    /// positive outputs passes the UTXO rules and is admitted like any other
    /// transaction; it reserves nothing.
    pub fn submit(&mut self, tx: Transaction) -> std::result::Result<Hash256, TxRejection> {
        if let Err(rejection) = self.utxo.validate(&tx) {
            log::warn!("Rejected transaction {}: {}", tx.id(), rejection);
            return Err(rejection);
        }

        let txid = tx.id();
        self.utxo.reserve(&tx);
        self.mempool.push(tx);
        log::debug!("Admitted transaction {} ({} pending)", txid, self.mempool.len());
        Ok(txid)
    }

    /// Build a spend from confirmed outputs only; pending reservations are not
    /// considered.
    pub fn build_spend(&self, sender: &Account, receiver: &Account, amount: Amount) -> Result<Transaction> {
        let snapshot = self.snapshot();
        TransactionBuilder::new(&snapshot).build(sender, receiver, amount)
    }

    /// Build a spend and submit it.
    ///
    /// Insufficient funds is an error; a built transaction refused by the UTXO
    /// rules (for example because its inputs are reserved by a pending spend)
    /// is reported in the receipt.
    pub fn submit_spend(
        &mut self,
        sender: &Account,
        receiver: &Account,
        amount: Amount,
    ) -> Result<SpendReceipt> {
        let tx = self.build_spend(sender, receiver, amount)?;
        let txid = tx.id();
        let receipt = match self.submit(tx) {
            Ok(_) => SpendReceipt {
                accepted: true,
                txid,
                rejection: None,
            },
            Err(rejection) => SpendReceipt {
                accepted: false,
                txid,
                rejection: Some(rejection),
            },
        };
        Ok(receipt)
    }

    /// Mine a block rewarding `miner` and append it.
    ///
    /// Pending transactions are replayed in mempool order against a snapshot
    /// rebuilt from the chain; those still valid go into the block after the
    /// coinbase, the rest stay pending. Chain, mempool and live UTXO set are
    /// only touched once proof-of-work succeeds, so a cancelled search leaves
    /// the ledger exactly as it was.
    pub fn mine(&mut self, miner: &Account) -> Result<&Block> {
        let index = self.chain.len() as u64;
        let coinbase = Transaction::block_reward(index, miner.clone(), self.config.mining_reward)?;

        let mut snapshot = self.snapshot();
        if let Err(rejection) = snapshot.validate(&coinbase) {
            log::error!("Freshly minted coinbase {} is invalid: {}", coinbase.id(), rejection);
            return Err(LedgerError::InvariantViolation(format!(
                "freshly minted coinbase is invalid: {}",
                rejection
            )));
        }
        snapshot.apply(&coinbase);

        let mut transactions = vec![coinbase];
        let mut included = HashSet::new();
        for tx in self.mempool.iter() {
            match snapshot.validate(tx) {
                Ok(()) => {
                    snapshot.apply(tx);
                    included.insert(tx.id());
                    transactions.push(tx.clone());
                }
                Err(rejection) => {
                    log::debug!("Leaving {} in mempool: {}", tx.id(), rejection);
                }
            }
        }

        let mut block = Block::new(index, transactions, self.latest_block().hash);
        let result = self.miner.mine(&block)?;
        block.seal(result.nonce, result.hash);

        for tx in self.mempool.remove_ids(&included) {
            self.utxo.release(&tx);
        }
        for tx in &block.transactions {
            self.utxo.apply(tx);
        }
        log::info!(
            "Appended block {} with {} transactions ({} attempts, {:.0} H/s)",
            block.index,
            block.transactions.len(),
            result.attempts,
            result.hash_rate()
        );
        self.chain.push(block);

        Ok(self.latest_block())
    }

    /// Confirmed balance of `account`; pending transactions are not counted
    pub fn balance(&self, account: &Account) -> Amount {
        self.snapshot().balance(account)
    }

    /// Check linkage and proof-of-work of the whole chain
    pub fn verify(&self) -> std::result::Result<(), ValidationError> {
        ChainValidator::new(self.config.difficulty).validate_chain(&self.chain)
    }

    pub fn is_chain_valid(&self) -> bool {
        self.verify().is_ok()
    }

    /// Pretty JSON of the chain, the same document `save` writes
    pub fn dump_chain(&self) -> Result<String> {
        storage::to_json(&self.chain)
    }
}
