//! Transaction broadcasting interface.

use fundme_transaction::Transaction;

use crate::error::LedgerError;

/// Result of a successful broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastSuccess {
    /// The transaction id, display-order hex.
    pub txid: String,
    /// Human-readable status message from the ledger.
    pub message: String,
}

/// Result of a failed broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastFailure {
    /// Machine-readable reject reason, e.g. `missing-inputs`.
    pub code: String,
    /// Human-readable description of the failure.
    pub description: String,
}

impl BroadcastFailure {
    /// A failure with reject `code`.
    pub fn new(code: &str, description: impl Into<String>) -> Self {
        BroadcastFailure {
            code: code.to_string(),
            description: description.into(),
        }
    }
}

impl std::fmt::Display for BroadcastFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

impl std::error::Error for BroadcastFailure {}

/// Trait for submitting transactions to the ledger.
pub trait Broadcaster {
    /// Broadcast a fully signed transaction.
    ///
    /// # Returns
    /// `Ok(BroadcastSuccess)` once the ledger accepted the transaction, or
    /// `Err(LedgerError::Rejected)` carrying the reject reason.
    fn broadcast(&self, tx: &Transaction) -> Result<BroadcastSuccess, LedgerError>;
}
