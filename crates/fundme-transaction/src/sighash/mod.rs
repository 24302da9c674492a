//! Signature hash computation for transaction signing.
//!
//! The ledger uses the BIP-143-style digest with FORKID for replay
//! protection, extended by CashTokens: when the spent output carries tokens
//! their prefix is committed to just before the scriptCode, and outputs are
//! hashed in their full serialization, token prefixes included.

use fundme_primitives::hash::sha256d;
use fundme_primitives::util::ByteWriter;

use crate::output::TransactionOutput;
use crate::transaction::Transaction;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs (the default).
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs but no outputs.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and only the output with the same index as the signed input.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Only sign the current input, allowing other inputs to be added later.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Replay-protection flag required on every signature.
pub const SIGHASH_FORKID: u32 = 0x40;

/// ALL | FORKID (`0x41`), used by the engine's own signatures.
pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;

/// ANYONECANPAY | ALL | FORKID (`0xc1`), used by non-interactive pledges.
pub const SIGHASH_ANYONECANPAY_ALL_FORKID: u32 =
    SIGHASH_ANYONECANPAY | SIGHASH_ALL | SIGHASH_FORKID;

/// Mask applied to extract the base sighash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

// -----------------------------------------------------------------------
// FORKID signature hash
// -----------------------------------------------------------------------

/// Compute the signature hash for a given input.
///
/// # Arguments
/// * `tx`           - The transaction being signed.
/// * `input_index`  - Index of the input being signed.
/// * `script_code`  - The script being satisfied: the locking script for
///   P2PKH, the redeem script for P2SH contracts.
/// * `spent`        - The output being spent (value and tokens).
/// * `sighash_type` - The combined sighash flags (e.g. `SIGHASH_ALL_FORKID`).
///
/// # Returns
/// A 32-byte double-SHA256 digest.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    spent: &TransactionOutput,
    sighash_type: u32,
) -> Result<[u8; 32], TransactionError> {
    let preimage = calc_preimage(tx, input_index, script_code, spent, sighash_type)?;
    Ok(sha256d(&preimage))
}

/// Compute the pre-image bytes before double-hashing.
///
/// The preimage consists of:
/// 1. nVersion (4 bytes LE)
/// 2. hashPrevouts (32 bytes) - zero under ANYONECANPAY
/// 3. hashSequence (32 bytes) - zero under ANYONECANPAY/SINGLE/NONE
/// 4. outpoint (32+4 bytes)
/// 5. token prefix of the spent output, if it carries tokens
/// 6. scriptCode (compact size + script)
/// 7. value (8 bytes LE)
/// 8. nSequence (4 bytes LE)
/// 9. hashOutputs (32 bytes)
/// 10. nLocktime (4 bytes LE)
/// 11. sighashType (4 bytes LE)
pub fn calc_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    spent: &TransactionOutput,
    sighash_type: u32,
) -> Result<Vec<u8>, TransactionError> {
    let input = tx.inputs.get(input_index).ok_or_else(|| {
        TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        ))
    })?;
    if sighash_type & SIGHASH_FORKID == 0 {
        return Err(TransactionError::SigningError(format!(
            "sighash type {:#04x} lacks FORKID",
            sighash_type
        )));
    }

    let base_type = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    let hash_prevouts = if anyone_can_pay {
        [0u8; 32]
    } else {
        prevouts_hash(tx)
    };

    let hash_sequence =
        if anyone_can_pay || base_type == SIGHASH_SINGLE || base_type == SIGHASH_NONE {
            [0u8; 32]
        } else {
            sequence_hash(tx)
        };

    let hash_outputs = match base_type {
        SIGHASH_SINGLE => match tx.outputs.get(input_index) {
            Some(output) => sha256d(&output.to_bytes()),
            None => [0u8; 32],
        },
        SIGHASH_NONE => [0u8; 32],
        _ => outputs_hash(tx),
    };

    let mut writer = ByteWriter::with_capacity(256);
    writer.write_u32_le(tx.version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);
    writer.write_bytes(&input.outpoint_bytes());
    if let Some(token) = &spent.token {
        token.write_to(&mut writer);
    }
    writer.write_var_bytes(script_code);
    writer.write_u64_le(spent.satoshis);
    writer.write_u32_le(input.sequence_number);
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);

    Ok(writer.into_bytes())
}

// -----------------------------------------------------------------------
// Internal helper functions
// -----------------------------------------------------------------------

/// sha256d of every outpoint, in input order.
fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        writer.write_bytes(&input.outpoint_bytes());
    }
    sha256d(writer.as_bytes())
}

/// sha256d of every input sequence number.
fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence_number);
    }
    sha256d(writer.as_bytes())
}

/// sha256d of every serialized output.
fn outputs_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::new();
    for output in &tx.outputs {
        output.write_to(&mut writer);
    }
    sha256d(writer.as_bytes())
}
