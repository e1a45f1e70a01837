use crate::core::{Amount, AmountParseError};
use crate::storage::OutPoint;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Reasons a transaction is refused by the UTXO rules.
///
/// Rejection is an ordinary outcome: the transaction is not admitted and no
/// ledger state changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxRejection {
    #[error("transaction has no outputs")]
    EmptyOutputs,

    #[error("output {index} has a non-positive amount")]
    NonPositiveOutput { index: usize },

    #[error("input {0} does not reference an unspent output")]
    MissingInput(OutPoint),

    #[error("input {0} is referenced more than once")]
    DuplicateInput(OutPoint),

    #[error("input {0} is already reserved by a pending transaction")]
    ReservedInput(OutPoint),

    #[error("outputs ({outputs}) exceed inputs ({inputs})")]
    OutputsExceedInputs { inputs: Amount, outputs: Amount },

    #[error("amount overflow")]
    Overflow,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Amount, available: Amount },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Transaction rejected: {0}")]
    Rejected(#[from] TxRejection),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Mining cancelled")]
    MiningCancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AmountParseError> for LedgerError {
    fn from(err: AmountParseError) -> Self {
        LedgerError::InvalidAmount(err.to_string())
    }
}
