//! Chain state queries.

use fundme_transaction::{Outpoint, TransactionOutput};

use crate::error::LedgerError;

/// Read access to the current chain state.
pub trait ChainTracker {
    /// Look up an unspent output.
    ///
    /// # Arguments
    /// * `outpoint` - The output to look up.
    ///
    /// # Returns
    /// `Ok(Some(output))` if the output exists and is unspent, `Ok(None)`
    /// if it is unknown or already spent.
    fn source_output(&self, outpoint: &Outpoint) -> Result<Option<TransactionOutput>, LedgerError>;

    /// Median time past of the chain tip, the clock time-locks are checked
    /// against.
    fn median_time_past(&self) -> Result<u32, LedgerError>;

    /// Get the current chain tip height.
    fn current_height(&self) -> Result<u32, LedgerError>;
}
