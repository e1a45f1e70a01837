// Transaction builder

use crate::core::{Account, Amount, Transaction, TxInput, TxOutput, PLACEHOLDER_AUTH};
use crate::error::{LedgerError, Result};
use crate::storage::{OutPoint, UtxoSet};

/// Builds spends from a UTXO snapshot.
///
/// Reservations in the snapshot are ignored: selection looks only at which
/// outputs exist, so a ledger hands this builder a set rebuilt from the chain.
pub struct TransactionBuilder<'a> {
    utxo_set: &'a UtxoSet,
}

impl<'a> TransactionBuilder<'a> {
    /// Create a new transaction builder
    pub fn new(utxo_set: &'a UtxoSet) -> Self {
        Self { utxo_set }
    }

    /// Build a transaction paying `amount` from `sender` to `receiver`.
    ///
    /// Outputs: the payment first, then change back to the sender when the
    /// selected inputs exceed `amount`.
    pub fn build(&self, sender: &Account, receiver: &Account, amount: Amount) -> Result<Transaction> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "spend amount must be positive, got {}",
                amount
            )));
        }

        let utxos = self.utxo_set.utxos_for(sender);
        let (selected, total_input) = self.select_utxos(&utxos, amount)?;

        let inputs: Vec<TxInput> = selected
            .iter()
            .map(|outpoint| TxInput::new(outpoint.txid, outpoint.vout, PLACEHOLDER_AUTH))
            .collect();

        let mut outputs = vec![TxOutput::new(receiver.clone(), amount)];
        let change = total_input.checked_sub(amount).unwrap_or(Amount::ZERO);
        if change.is_positive() {
            outputs.push(TxOutput::new(sender.clone(), change));
        }

        Ok(Transaction::regular(inputs, outputs))
    }

    /// Select UTXOs in order until their sum covers `target`
    fn select_utxos(
        &self,
        utxos: &[(OutPoint, &TxOutput)],
        target: Amount,
    ) -> Result<(Vec<OutPoint>, Amount)> {
        let mut selected = Vec::new();
        let mut total = Amount::ZERO;

        for (outpoint, output) in utxos {
            selected.push(*outpoint);
            total = total.saturating_add(output.amount);

            if total >= target {
                return Ok((selected, total));
            }
        }

        Err(LedgerError::InsufficientFunds {
            required: target,
            available: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Hash256;

    fn coins(n: u64) -> Amount {
        Amount::from_whole(n)
    }

    fn set_with(outputs: &[(u8, &str, u64)]) -> UtxoSet {
        let mut set = UtxoSet::new();
        for (byte, owner, value) in outputs {
            set.add_output(
                OutPoint::new(Hash256::new([*byte; 32]), 0),
                TxOutput::new(*owner, coins(*value)),
            );
        }
        set
    }

    #[test]
    fn test_transaction_builder() {
        let set = set_with(&[(1, "alice", 100)]);
        let builder = TransactionBuilder::new(&set);

        let tx = builder
            .build(&Account::from("alice"), &Account::from("bob"), coins(30))
            .unwrap();

        assert!(!tx.is_coinbase());
        assert_eq!(tx.inputs().len(), 1);
        assert_eq!(tx.inputs()[0].auth_token, PLACEHOLDER_AUTH);
        assert_eq!(tx.outputs().len(), 2); // Payment + change
        assert_eq!(tx.outputs()[0], TxOutput::new("bob", coins(30)));
        assert_eq!(tx.outputs()[1], TxOutput::new("alice", coins(70)));
        assert!(set.validate(&tx).is_ok());
    }

    #[test]
    fn test_exact_amount_has_no_change() {
        let set = set_with(&[(1, "alice", 100)]);
        let tx = TransactionBuilder::new(&set)
            .build(&Account::from("alice"), &Account::from("bob"), coins(100))
            .unwrap();
        assert_eq!(tx.outputs().len(), 1);
    }

    #[test]
    fn test_greedy_selection_in_outpoint_order() {
        let set = set_with(&[(3, "alice", 50), (1, "alice", 20), (2, "bob", 500)]);
        let builder = TransactionBuilder::new(&set);

        let tx = builder
            .build(&Account::from("alice"), &Account::from("carol"), coins(60))
            .unwrap();

        // Outpoint [1;32] (20) then [3;32] (50); bob's output is skipped
        let selected: Vec<u8> = tx.inputs().iter().map(|i| i.prev_tx_id.as_bytes()[0]).collect();
        assert_eq!(selected, vec![1, 3]);
        assert_eq!(tx.outputs()[1], TxOutput::new("alice", coins(10)));
    }

    #[test]
    fn test_selection_is_deterministic() {
        let set = set_with(&[(4, "alice", 5), (8, "alice", 5), (6, "alice", 5)]);
        let builder = TransactionBuilder::new(&set);
        let sender = Account::from("alice");
        let receiver = Account::from("bob");

        let a = builder.build(&sender, &receiver, coins(12)).unwrap();
        let b = builder.build(&sender, &receiver, coins(12)).unwrap();
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_insufficient_funds() {
        let set = set_with(&[(1, "alice", 10), (2, "alice", 5)]);
        let builder = TransactionBuilder::new(&set);

        let result = builder.build(&Account::from("alice"), &Account::from("bob"), coins(50));
        match result {
            Err(LedgerError::InsufficientFunds { required, available }) => {
                assert_eq!(required, coins(50));
                assert_eq!(available, coins(15));
            }
            other => panic!("expected insufficient funds, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_sender_has_nothing() {
        let set = set_with(&[(1, "alice", 10)]);
        let builder = TransactionBuilder::new(&set);
        let result = builder.build(&Account::from("nobody"), &Account::from("bob"), coins(1));
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let set = set_with(&[(1, "alice", 10)]);
        let builder = TransactionBuilder::new(&set);
        let result = builder.build(&Account::from("alice"), &Account::from("bob"), Amount::ZERO);
        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
    }
}
