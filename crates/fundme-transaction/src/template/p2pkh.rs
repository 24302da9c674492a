//! Pay-to-Public-Key-Hash (P2PKH) script template.
//!
//! Creates standard P2PKH locking scripts (`OP_DUP OP_HASH160 <hash>
//! OP_EQUALVERIFY OP_CHECKSIG`) and unlocking scripts (`<sig> <pubkey>`).

use fundme_primitives::ec::PrivateKey;
use fundme_script::{Address, AddressType, Script};

use crate::sighash::SIGHASH_ALL_FORKID;
use crate::signature::{transaction_signature, SigningScheme};
use crate::template::UnlockingScriptTemplate;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Create a P2PKH locking script from an address.
///
/// # Arguments
/// * `address` - A P2PKH address (plain or token-aware).
///
/// # Returns
/// The 25-byte locking script, or an error for script-hash addresses.
pub fn lock(address: &Address) -> Result<Script, TransactionError> {
    if address.kind != AddressType::P2pkh {
        return Err(TransactionError::SigningError(format!(
            "{} is not a P2PKH address",
            address
        )));
    }
    Ok(address.to_locking_bytecode()?)
}

/// Create a P2PKH unlocker.
///
/// # Arguments
/// * `private_key` - The private key used to sign.
/// * `scheme` - ECDSA or Schnorr.
/// * `sighash_flag` - Optional sighash flag. Defaults to `SIGHASH_ALL_FORKID` (0x41).
pub fn unlock(private_key: PrivateKey, scheme: SigningScheme, sighash_flag: Option<u32>) -> P2PKH {
    P2PKH {
        private_key,
        scheme,
        sighash_flag: sighash_flag.unwrap_or(SIGHASH_ALL_FORKID),
    }
}

/// P2PKH signing template holding a private key, scheme and sighash flag.
pub struct P2PKH {
    private_key: PrivateKey,
    scheme: SigningScheme,
    sighash_flag: u32,
}

impl UnlockingScriptTemplate for P2PKH {
    /// Sign the input and produce `<sig || sighash_byte> <compressed_pubkey>`.
    fn sign(&self, tx: &Transaction, input_index: u32) -> Result<Script, TransactionError> {
        let sig_hash = tx.calc_input_signature_hash(input_index as usize, None, self.sighash_flag)?;
        let sig = transaction_signature(&self.private_key, &sig_hash, self.scheme, self.sighash_flag)?;

        let mut script = Script::new();
        script.append_push_data(&sig)?;
        script.append_push_data(&self.private_key.pub_key().to_compressed())?;
        Ok(script)
    }

    /// 1 + 73 (DER sig + sighash) + 1 + 33 (compressed pubkey); Schnorr is 65.
    fn estimate_length(&self, _tx: &Transaction, _input_index: u32) -> u32 {
        match self.scheme {
            SigningScheme::Ecdsa => 108,
            SigningScheme::Schnorr => 100,
        }
    }
}
