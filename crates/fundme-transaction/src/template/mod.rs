//! Unlocking-script templates.
//!
//! Provides the `UnlockingScriptTemplate` trait, implemented here for P2PKH
//! and by the contract crate for every contract function call.

pub mod p2pkh;

use fundme_script::Script;

use crate::transaction::Transaction;
use crate::TransactionError;

/// Trait for templates that produce unlocking scripts.
///
/// The `sign` method receives the full transaction and the input index,
/// computes whatever signature hashes it needs, and returns the unlocking
/// script. Templates that need no signature simply ignore the transaction.
pub trait UnlockingScriptTemplate {
    /// Produce an unlocking script for the given input.
    ///
    /// # Arguments
    /// * `tx` - The transaction being signed.
    /// * `input_index` - The index of the input to sign.
    ///
    /// # Returns
    /// `Ok(Script)` containing the unlocking script, or an error on failure.
    fn sign(&self, tx: &Transaction, input_index: u32) -> Result<Script, TransactionError>;

    /// Estimate the byte length of the unlocking script.
    fn estimate_length(&self, tx: &Transaction, input_index: u32) -> u32;
}

/// Sign every input of `tx` with its template, in order.
///
/// Unlocking scripts are not part of the signing serialization, so each
/// input can be signed against the same unsigned transaction.
///
/// # Arguments
/// * `tx` - The transaction; its unlocking scripts are overwritten.
/// * `templates` - One template per input.
pub fn sign_all(
    tx: &mut Transaction,
    templates: &[&dyn UnlockingScriptTemplate],
) -> Result<(), TransactionError> {
    if templates.len() != tx.inputs.len() {
        return Err(TransactionError::SigningError(format!(
            "{} templates for {} inputs",
            templates.len(),
            tx.inputs.len()
        )));
    }
    let scripts = templates
        .iter()
        .enumerate()
        .map(|(i, template)| template.sign(tx, i as u32))
        .collect::<Result<Vec<_>, _>>()?;
    for (input, script) in tx.inputs.iter_mut().zip(scripts) {
        input.unlocking_script = Some(script);
    }
    Ok(())
}
