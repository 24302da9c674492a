//! Signing and broadcasting engine transactions.

use fundme_ledger::{Ledger, LedgerError};
use fundme_transaction::template::{sign_all, UnlockingScriptTemplate};
use fundme_transaction::Transaction;

use crate::error::ContractError;

/// Sign every input of `tx`, broadcast it and check the ledger accepted the
/// transaction that was built.
///
/// # Arguments
/// * `ledger` - Where to broadcast.
/// * `tx` - The unsigned transaction, signed in place.
/// * `templates` - One unlocker per input.
/// * `operation` - Name of the engine operation, for errors and logs.
///
/// # Returns
/// The display-order txid, `BroadcastFailure` if the ledger rejected the
/// transaction or `MissingOutput` if it reported a different txid.
pub(crate) fn sign_and_broadcast(
    ledger: &dyn Ledger,
    tx: &mut Transaction,
    templates: &[&dyn UnlockingScriptTemplate],
    operation: &'static str,
) -> Result<String, ContractError> {
    sign_all(tx, templates)?;
    let txid = tx.tx_id_hex();
    let success = ledger.broadcast(tx).map_err(|err| match err {
        LedgerError::Rejected(failure) => ContractError::BroadcastFailure {
            operation,
            reason: failure.to_string(),
        },
        other => ContractError::Ledger(other),
    })?;
    if success.txid != txid {
        return Err(ContractError::MissingOutput(format!(
            "{} broadcast {} but the ledger reported {}",
            operation, txid, success.txid
        )));
    }
    tracing::info!(
        operation,
        txid = %txid,
        inputs = tx.inputs.len(),
        outputs = tx.outputs.len(),
        fee = tx.total_input_satoshis().unwrap_or(0).saturating_sub(tx.total_output_satoshis()),
        "broadcast contract transaction"
    );
    Ok(txid)
}
