//! Non-interactive pledges.
//!
//! A pledger who cannot take part in building the campaign transaction
//! signs their own input with `SIGHASH_ANYONECANPAY | SIGHASH_ALL |
//! SIGHASH_FORKID` over the outputs the campaign will create. The signed
//! input travels as a base64 JSON envelope:
//!
//! ```json
//! {
//!   "previous_output_transaction_hash": "<display-order txid>",
//!   "previous_output_index": 0,
//!   "sequence_number": 4294967295,
//!   "unlocking_script": "<hex: <sig> <pubkey>>"
//! }
//! ```
//!
//! Validation rebuilds the one-input signing digest from the ledger's copy
//! of the spent output and checks the signature against it. A signature
//! that does not verify yields `false`, not an error.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use fundme_ledger::ChainTracker;
use fundme_primitives::ec::{PrivateKey, PublicKey};
use fundme_script::Script;
use fundme_transaction::sighash::SIGHASH_ANYONECANPAY_ALL_FORKID;
use fundme_transaction::signature::{split_sighash_type, transaction_signature, verify_signature};
use fundme_transaction::{
    Outpoint, SigningScheme, Transaction, TransactionInput, TransactionOutput,
};

use crate::error::ContractError;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    previous_output_transaction_hash: String,
    previous_output_index: u32,
    sequence_number: u32,
    unlocking_script: String,
}

/// A signed pledge input received from a pledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnyonecanpayCommitment {
    /// The output the pledger spends.
    pub outpoint: Outpoint,
    /// Sequence number of the signed input.
    pub sequence_number: u32,
    /// The full unlocking script.
    pub unlocking_script: Script,
    /// First push of the unlocking script: signature plus sighash byte.
    pub signature: Vec<u8>,
    /// Second push of the unlocking script.
    pub public_key: Vec<u8>,
}

fn malformed(what: impl std::fmt::Display) -> ContractError {
    ContractError::MalformedCommitment(what.to_string())
}

impl AnyonecanpayCommitment {
    /// Parse a base64 JSON envelope.
    ///
    /// # Returns
    /// The commitment, or `MalformedCommitment` if the payload does not
    /// decode or the unlocking script lacks its signature and public key
    /// pushes.
    pub fn parse(payload: &str) -> Result<Self, ContractError> {
        let json = BASE64
            .decode(payload.trim())
            .map_err(|e| malformed(format!("payload is not base64: {}", e)))?;
        let envelope: Envelope = serde_json::from_slice(&json)
            .map_err(|e| malformed(format!("payload is not a pledge envelope: {}", e)))?;
        let outpoint = Outpoint::from_hex(
            &envelope.previous_output_transaction_hash,
            envelope.previous_output_index,
        )
        .map_err(|e| malformed(format!("previous output: {}", e)))?;
        let unlocking_script = Script::from_hex(&envelope.unlocking_script)
            .map_err(|e| malformed(format!("unlocking script: {}", e)))?;
        Self::from_unlocking_script(outpoint, envelope.sequence_number, unlocking_script)
    }

    fn from_unlocking_script(
        outpoint: Outpoint,
        sequence_number: u32,
        unlocking_script: Script,
    ) -> Result<Self, ContractError> {
        let chunks = unlocking_script
            .chunks()
            .map_err(|e| malformed(format!("unlocking script: {}", e)))?;
        let mut pushes = chunks.iter().filter_map(|chunk| chunk.push_data());
        let (signature, public_key) = match (pushes.next(), pushes.next()) {
            (Some(sig), Some(key)) if !sig.is_empty() && !key.is_empty() => {
                (sig.to_vec(), key.to_vec())
            }
            _ => {
                return Err(malformed(
                    "unlocking script needs a signature and a public key push",
                ))
            }
        };
        Ok(AnyonecanpayCommitment {
            outpoint,
            sequence_number,
            unlocking_script,
            signature,
            public_key,
        })
    }

    /// Encode as a base64 JSON envelope.
    pub fn to_payload(&self) -> Result<String, ContractError> {
        let envelope = Envelope {
            previous_output_transaction_hash: self.outpoint.txid.to_string(),
            previous_output_index: self.outpoint.vout,
            sequence_number: self.sequence_number,
            unlocking_script: self.unlocking_script.to_hex(),
        };
        Ok(BASE64.encode(serde_json::to_vec(&envelope)?))
    }

    /// Sign a pledge input from the pledger's side.
    ///
    /// # Arguments
    /// * `key` - The key controlling `source`, a P2PKH output.
    /// * `scheme` - ECDSA or Schnorr.
    /// * `outpoint` - The output being pledged.
    /// * `source` - That output.
    /// * `sequence_number` - Sequence of the signed input.
    /// * `recipients` - The outputs the pledge pays for.
    pub fn sign(
        key: &PrivateKey,
        scheme: SigningScheme,
        outpoint: Outpoint,
        source: TransactionOutput,
        sequence_number: u32,
        recipients: &[TransactionOutput],
    ) -> Result<Self, ContractError> {
        let tx = signing_transaction(outpoint, source, sequence_number, recipients);
        let digest = tx.calc_input_signature_hash(0, None, SIGHASH_ANYONECANPAY_ALL_FORKID)?;
        let signature = transaction_signature(key, &digest, scheme, SIGHASH_ANYONECANPAY_ALL_FORKID)?;

        let mut unlocking_script = Script::new();
        unlocking_script.append_push_data(&signature)?;
        unlocking_script.append_push_data(&key.pub_key().to_compressed())?;
        Self::from_unlocking_script(outpoint, sequence_number, unlocking_script)
    }
}

fn signing_transaction(
    outpoint: Outpoint,
    source: TransactionOutput,
    sequence_number: u32,
    recipients: &[TransactionOutput],
) -> Transaction {
    let mut input = TransactionInput::spending(outpoint, source);
    input.sequence_number = sequence_number;
    let mut tx = Transaction::new();
    tx.add_input(input);
    tx.outputs = recipients.to_vec();
    tx
}

/// Check an anyonecanpay pledge signature.
///
/// # Arguments
/// * `ledger` - Supplies the value and locking bytecode of the spent output.
/// * `commitment` - The parsed pledge.
/// * `recipients` - The outputs the signature must cover, in order.
///
/// # Returns
/// `Ok(true)` if the signature covers exactly this outpoint, sequence
/// number and output list. `Ok(false)` for a signature that does not
/// verify. An error for an empty recipient list or an outpoint the ledger
/// does not know.
pub fn validate(
    ledger: &dyn ChainTracker,
    commitment: &AnyonecanpayCommitment,
    recipients: &[TransactionOutput],
) -> Result<bool, ContractError> {
    if recipients.is_empty() {
        return Err(malformed("an anyonecanpay pledge needs at least one recipient"));
    }
    let outpoint = &commitment.outpoint;
    let source = ledger.source_output(outpoint)?.ok_or_else(|| {
        ContractError::UnknownOutpoint(outpoint.to_string())
    })?;

    let (body, flag) = match split_sighash_type(&commitment.signature) {
        Some((body, flag)) if u32::from(flag) == SIGHASH_ANYONECANPAY_ALL_FORKID => (body, flag),
        other => {
            tracing::warn!(
                txid = %outpoint.txid,
                vout = outpoint.vout,
                flag = ?other.map(|(_, flag)| flag),
                "anyonecanpay signature has the wrong sighash type"
            );
            return Ok(false);
        }
    };
    let public_key = match PublicKey::from_bytes(&commitment.public_key) {
        Ok(key) => key,
        Err(e) => {
            tracing::warn!(txid = %outpoint.txid, vout = outpoint.vout, "anyonecanpay public key: {}", e);
            return Ok(false);
        }
    };

    let tx = signing_transaction(
        *outpoint,
        source,
        commitment.sequence_number,
        recipients,
    );
    let digest = tx.calc_input_signature_hash(0, None, u32::from(flag))?;
    let valid = verify_signature(&public_key, &digest, body);
    if !valid {
        tracing::warn!(
            txid = %outpoint.txid,
            vout = outpoint.vout,
            recipients = recipients.len(),
            "anyonecanpay signature does not verify"
        );
    }
    Ok(valid)
}
