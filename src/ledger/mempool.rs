// Pending transactions awaiting a block

use crate::core::{Hash256, Transaction};
use std::collections::HashSet;

/// Insertion-ordered pending transactions.
/// Order is the priority used when mining.
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    transactions: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub fn contains(&self, txid: &Hash256) -> bool {
        self.transactions.iter().any(|tx| tx.id() == *txid)
    }

    /// Remove the listed transactions, returning them in mempool order
    pub fn remove_ids(&mut self, ids: &HashSet<Hash256>) -> Vec<Transaction> {
        let (removed, kept): (Vec<Transaction>, Vec<Transaction>) = self
            .transactions
            .drain(..)
            .partition(|tx| ids.contains(&tx.id()));
        self.transactions = kept;
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Amount, TxInput, TxOutput};

    fn tx(byte: u8) -> Transaction {
        Transaction::regular(
            vec![TxInput::new(Hash256::new([byte; 32]), 0, "sig")],
            vec![TxOutput::new("bob", Amount::from_whole(1))],
        )
    }

    #[test]
    fn test_push_and_contains() {
        let mut pool = Mempool::new();
        assert!(pool.is_empty());

        let t = tx(1);
        pool.push(t.clone());
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&t.id()));
        assert!(!pool.contains(&tx(2).id()));
    }

    #[test]
    fn test_remove_ids_preserves_order() {
        let mut pool = Mempool::new();
        let all: Vec<Transaction> = (1..=4).map(tx).collect();
        for t in &all {
            pool.push(t.clone());
        }

        let ids: HashSet<Hash256> = [all[3].id(), all[1].id()].into_iter().collect();
        let removed = pool.remove_ids(&ids);

        assert_eq!(removed, vec![all[1].clone(), all[3].clone()]);
        let remaining: Vec<Hash256> = pool.iter().map(|t| t.id()).collect();
        assert_eq!(remaining, vec![all[0].id(), all[2].id()]);
    }
}
