use fundme_transaction::Outpoint;

use crate::broadcaster::BroadcastFailure;

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger error: {0}")]
    General(String),
    #[error("transaction rejected: {0}")]
    Rejected(#[from] BroadcastFailure),
    #[error("unknown outpoint {0}")]
    UnknownOutpoint(Outpoint),
    #[error("transaction error: {0}")]
    Transaction(#[from] fundme_transaction::TransactionError),
}
