// Spend construction

mod tx_builder;

pub use tx_builder::TransactionBuilder;
