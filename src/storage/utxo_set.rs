// UTXO (Unspent Transaction Output) set management

use crate::core::{Account, Amount, Block, Hash256, Transaction, TxInput, TxOutput};
use crate::error::TxRejection;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// UTXO identifier - transaction hash + output index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutPoint {
    pub txid: Hash256,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl From<&TxInput> for OutPoint {
    fn from(input: &TxInput) -> Self {
        Self::new(input.prev_tx_id, input.output_index)
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// Spendable outputs plus the reservations held by pending transactions.
///
/// The set is always derivable from the chain (`rebuild_from_chain`); it is
/// never persisted. Iteration follows `OutPoint` order, so two sets rebuilt
/// from the same chain list outputs identically.
#[derive(Debug, Clone, Default)]
pub struct UtxoSet {
    utxos: BTreeMap<OutPoint, TxOutput>,
    reserved: HashSet<OutPoint>,
}

impl UtxoSet {
    /// Create an empty UTXO set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an independent snapshot by replaying `chain`
    pub fn from_chain(chain: &[Block]) -> Self {
        let mut set = Self::new();
        set.rebuild_from_chain(chain);
        set
    }

    /// Add a UTXO
    pub fn add_output(&mut self, outpoint: OutPoint, output: TxOutput) {
        self.utxos.insert(outpoint, output);
    }

    /// Remove a UTXO (spent), clearing any reservation on it
    pub fn remove_output(&mut self, outpoint: &OutPoint) -> Option<TxOutput> {
        self.reserved.remove(outpoint);
        self.utxos.remove(outpoint)
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&TxOutput> {
        self.utxos.get(outpoint)
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.utxos.contains_key(outpoint)
    }

    pub fn is_reserved(&self, outpoint: &OutPoint) -> bool {
        self.reserved.contains(outpoint)
    }

    /// Count total UTXOs
    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    pub fn reserved_count(&self) -> usize {
        self.reserved.len()
    }

    /// All UTXOs in deterministic order
    pub fn iter(&self) -> impl Iterator<Item = (&OutPoint, &TxOutput)> {
        self.utxos.iter()
    }

    /// Check a transaction against the current outputs and reservations.
    ///
    /// Coinbase: outputs must be non-empty and positive. Regular: every input
    /// must reference an existing, unreserved output at most once, outputs must
    /// be non-empty and positive, and must not exceed the inputs. Any excess of
    /// inputs over outputs is simply not carried forward.
    pub fn validate(&self, tx: &Transaction) -> Result<(), TxRejection> {
        if tx.is_coinbase() {
            Self::output_sum(tx)?;
            return Ok(());
        }

        let mut seen = HashSet::with_capacity(tx.inputs().len());
        let mut input_sum = Amount::ZERO;
        for input in tx.inputs() {
            let outpoint = OutPoint::from(input);
            if !seen.insert(outpoint) {
                return Err(TxRejection::DuplicateInput(outpoint));
            }
            let referenced = self
                .utxos
                .get(&outpoint)
                .ok_or(TxRejection::MissingInput(outpoint))?;
            if self.reserved.contains(&outpoint) {
                return Err(TxRejection::ReservedInput(outpoint));
            }
            input_sum = input_sum
                .checked_add(referenced.amount)
                .ok_or(TxRejection::Overflow)?;
        }

        let output_sum = Self::output_sum(tx)?;
        if output_sum > input_sum {
            return Err(TxRejection::OutputsExceedInputs {
                inputs: input_sum,
                outputs: output_sum,
            });
        }

        Ok(())
    }

    // Non-empty, all positive, no overflow
    fn output_sum(tx: &Transaction) -> Result<Amount, TxRejection> {
        let outputs = tx.outputs();
        if outputs.is_empty() {
            return Err(TxRejection::EmptyOutputs);
        }
        if let Some(index) = outputs.iter().position(|out| !out.amount.is_positive()) {
            return Err(TxRejection::NonPositiveOutput { index });
        }
        tx.total_output_value().ok_or(TxRejection::Overflow)
    }

    /// Reserve inputs when a transaction enters the mempool
    pub fn reserve(&mut self, tx: &Transaction) {
        for input in tx.inputs() {
            self.reserved.insert(OutPoint::from(input));
        }
    }

    /// Release reservations when a transaction leaves the mempool
    pub fn release(&mut self, tx: &Transaction) {
        for input in tx.inputs() {
            self.reserved.remove(&OutPoint::from(input));
        }
    }

    /// Spend the inputs and add the outputs of an already validated transaction
    pub fn apply(&mut self, tx: &Transaction) {
        for input in tx.inputs() {
            self.remove_output(&OutPoint::from(input));
        }
        let txid = tx.id();
        for (vout, output) in tx.outputs().iter().enumerate() {
            self.add_output(OutPoint::new(txid, vout as u32), output.clone());
        }
    }

    /// Apply every transaction of a block in order
    pub fn apply_block(&mut self, block: &Block) {
        for tx in &block.transactions {
            self.apply(tx);
        }
    }

    /// Clear everything and replay the chain from genesis
    pub fn rebuild_from_chain(&mut self, chain: &[Block]) {
        self.utxos.clear();
        self.reserved.clear();
        for block in chain {
            self.apply_block(block);
        }
        log::debug!("UTXO set rebuilt from {} blocks: {} outputs", chain.len(), self.len());
    }

    /// Sum of all UTXOs paying `account`
    pub fn balance(&self, account: &Account) -> Amount {
        self.utxos
            .values()
            .filter(|out| &out.receiver == account)
            .fold(Amount::ZERO, |acc, out| acc.saturating_add(out.amount))
    }

    /// All UTXOs paying `account`, in deterministic order
    pub fn utxos_for(&self, account: &Account) -> Vec<(OutPoint, &TxOutput)> {
        self.utxos
            .iter()
            .filter(|(_, out)| &out.receiver == account)
            .map(|(outpoint, out)| (*outpoint, out))
            .collect()
    }
}
