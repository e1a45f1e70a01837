// Transaction data structures

use crate::core::{sha256, Account, Amount, Hash256};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// Placeholder authorization carried by inputs built by the ledger
pub const PLACEHOLDER_AUTH: &str = "sig";

/// Transaction input - references a previous transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// ID of the transaction that created the output
    pub prev_tx_id: Hash256,
    /// Index of the output in that transaction
    pub output_index: u32,
    /// Opaque authorization token (not verified)
    pub auth_token: String,
}

impl TxInput {
    /// Create a new transaction input
    pub fn new(prev_tx_id: Hash256, output_index: u32, auth_token: impl Into<String>) -> Self {
        Self {
            prev_tx_id,
            output_index,
            auth_token: auth_token.into(),
        }
    }
}

/// Transaction output - pays an amount to an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub receiver: Account,
    pub amount: Amount,
}

impl TxOutput {
    /// Create a new transaction output
    pub fn new(receiver: impl Into<Account>, amount: Amount) -> Self {
        Self {
            receiver: receiver.into(),
            amount,
        }
    }
}

/// Transaction body: minting or spending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TxKind {
    /// Mints new value; has no inputs
    Coinbase {
        output: TxOutput,
        /// Height of the block paying this reward, when bound to one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<u64>,
    },
    /// Spends existing outputs
    Regular {
        inputs: Vec<TxInput>,
        outputs: Vec<TxOutput>,
    },
}

/// Transaction with a content-derived identifier.
///
/// The id is computed once at construction and the body is never mutated
/// afterwards, so `id()` always equals `compute_id()` for transactions built
/// through the constructors. Deserialized transactions can be checked with
/// `has_valid_id()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: Hash256,
    #[serde(flatten)]
    kind: TxKind,
}

impl Transaction {
    /// Create a coinbase transaction (genesis seed)
    pub fn coinbase(receiver: impl Into<Account>, amount: Amount) -> Result<Self> {
        Self::minted(receiver.into(), amount, None)
    }

    /// Create a mining reward bound to the block at `height`.
    /// The height is part of the ID, so repeated rewards to the same account
    /// create distinct outputs instead of overwriting one another.
    pub fn block_reward(height: u64, receiver: impl Into<Account>, amount: Amount) -> Result<Self> {
        Self::minted(receiver.into(), amount, Some(height))
    }

    fn minted(receiver: Account, amount: Amount, height: Option<u64>) -> Result<Self> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "coinbase amount must be positive, got {}",
                amount
            )));
        }
        Ok(Self::from_kind(TxKind::Coinbase {
            output: TxOutput::new(receiver, amount),
            height,
        }))
    }

    /// Create a regular transaction.
    /// No checks here: the UTXO set decides whether it is spendable.
    pub fn regular(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self::from_kind(TxKind::Regular { inputs, outputs })
    }

    fn from_kind(kind: TxKind) -> Self {
        let id = Self::id_of(&kind);
        Self { id, kind }
    }

    /// Transaction ID
    pub fn id(&self) -> Hash256 {
        self.id
    }

    pub fn kind(&self) -> &TxKind {
        &self.kind
    }

    /// Check if this is a coinbase transaction
    pub fn is_coinbase(&self) -> bool {
        matches!(self.kind, TxKind::Coinbase { .. })
    }

    /// Inputs in order; always empty for coinbase
    pub fn inputs(&self) -> &[TxInput] {
        match &self.kind {
            TxKind::Coinbase { .. } => &[],
            TxKind::Regular { inputs, .. } => inputs,
        }
    }

    /// Outputs in order
    pub fn outputs(&self) -> &[TxOutput] {
        match &self.kind {
            TxKind::Coinbase { output, .. } => std::slice::from_ref(output),
            TxKind::Regular { outputs, .. } => outputs,
        }
    }

    /// Total output value, `None` on overflow
    pub fn total_output_value(&self) -> Option<Amount> {
        Amount::checked_sum(self.outputs().iter().map(|out| out.amount))
    }

    /// Recompute the ID from the current content
    pub fn compute_id(&self) -> Hash256 {
        Self::id_of(&self.kind)
    }

    /// Whether the stored ID matches the content
    pub fn has_valid_id(&self) -> bool {
        self.id == self.compute_id()
    }

    /// SHA256 over the tagged, '|'-delimited input and output list.
    /// Order-sensitive: reordering inputs or outputs changes the ID.
    fn id_of(kind: &TxKind) -> Hash256 {
        let mut preimage = String::new();
        match kind {
            TxKind::Coinbase { output, height } => {
                preimage.push_str("coinbase|");
                if let Some(height) = height {
                    preimage.push_str(&format!("height:{}|", height));
                }
                push_output(&mut preimage, output);
            }
            TxKind::Regular { inputs, outputs } => {
                preimage.push_str("tx|");
                for input in inputs {
                    preimage.push_str(&format!("{}:{}|", input.prev_tx_id, input.output_index));
                }
                for output in outputs {
                    push_output(&mut preimage, output);
                }
            }
        }
        sha256(preimage.as_bytes())
    }
}

fn push_output(preimage: &mut String, output: &TxOutput) {
    preimage.push_str(&format!("{}:{}|", output.receiver, output.amount));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coins(n: u64) -> Amount {
        Amount::from_whole(n)
    }

    #[test]
    fn test_coinbase_transaction() {
        let tx = Transaction::coinbase("miner", coins(10)).unwrap();

        assert!(tx.is_coinbase());
        assert!(tx.inputs().is_empty());
        assert_eq!(tx.outputs().len(), 1);
        assert_eq!(tx.outputs()[0].receiver, Account::from("miner"));
        assert_eq!(tx.total_output_value(), Some(coins(10)));
    }

    #[test]
    fn test_coinbase_requires_positive_amount() {
        let result = Transaction::coinbase("miner", Amount::ZERO);
        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
    }

    #[test]
    fn test_coinbase_id_is_tagged_digest() {
        let tx = Transaction::coinbase("genesis", coins(1000)).unwrap();
        assert_eq!(tx.id(), sha256(b"coinbase|genesis:1000|"));
    }

    #[test]
    fn test_block_rewards_differ_by_height() {
        let first = Transaction::block_reward(1, "bob", coins(10)).unwrap();
        let second = Transaction::block_reward(2, "bob", coins(10)).unwrap();

        assert!(first.is_coinbase());
        assert!(first.has_valid_id());
        assert_ne!(first.id(), second.id());
        assert_eq!(first.id(), sha256(b"coinbase|height:1|bob:10|"));
        assert!(Transaction::block_reward(3, "bob", Amount::ZERO).is_err());
    }

    #[test]
    fn test_txid_deterministic() {
        let build = || {
            Transaction::regular(
                vec![TxInput::new(Hash256::new([1; 32]), 0, "sig")],
                vec![TxOutput::new("alice", coins(3)), TxOutput::new("bob", coins(2))],
            )
        };

        assert_eq!(build().id(), build().id());
        assert!(build().has_valid_id());
    }

    #[test]
    fn test_txid_ignores_auth_token() {
        let a = Transaction::regular(
            vec![TxInput::new(Hash256::new([1; 32]), 0, "sig")],
            vec![TxOutput::new("alice", coins(3))],
        );
        let b = Transaction::regular(
            vec![TxInput::new(Hash256::new([1; 32]), 0, "other")],
            vec![TxOutput::new("alice", coins(3))],
        );
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_txid_order_sensitive() {
        let a = TxOutput::new("alice", coins(3));
        let b = TxOutput::new("bob", coins(2));
        let input = TxInput::new(Hash256::new([1; 32]), 0, "sig");

        let tx1 = Transaction::regular(vec![input.clone()], vec![a.clone(), b.clone()]);
        let tx2 = Transaction::regular(vec![input], vec![b, a]);
        assert_ne!(tx1.id(), tx2.id());
    }

    #[test]
    fn test_coinbase_and_regular_ids_differ() {
        let coinbase = Transaction::coinbase("alice", coins(3)).unwrap();
        let regular = Transaction::regular(vec![], vec![TxOutput::new("alice", coins(3))]);
        assert_ne!(coinbase.id(), regular.id());
    }

    #[test]
    fn test_json_keeps_id_and_detects_tampering() {
        let tx = Transaction::regular(
            vec![TxInput::new(Hash256::new([9; 32]), 1, "sig")],
            vec![TxOutput::new("alice", coins(5))],
        );
        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("\"type\":\"regular\""));

        let decoded: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, tx);
        assert!(decoded.has_valid_id());

        let tampered: Transaction =
            serde_json::from_str(&json.replace("\"5\"", "\"50\"")).unwrap();
        assert!(!tampered.has_valid_id());
    }
}
