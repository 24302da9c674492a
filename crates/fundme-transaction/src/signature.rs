//! Transaction signatures as they appear in unlocking scripts.
//!
//! A transaction signature is a DER-ECDSA or 64-byte Schnorr signature
//! followed by one sighash-type byte. Verification picks the scheme from
//! the length of the signature body.

use fundme_primitives::ec::{PrivateKey, PublicKey, SchnorrSignature, Signature};

use crate::TransactionError;

/// Length of a Schnorr signature body.
pub const SCHNORR_SIGNATURE_LEN: usize = 64;

/// Which signature algorithm to produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningScheme {
    /// DER-encoded ECDSA, low-S.
    #[default]
    Ecdsa,
    /// BCH Schnorr.
    Schnorr,
}

/// Sign a digest and append the sighash-type byte.
///
/// # Arguments
/// * `key` - The signing key.
/// * `digest` - The signature hash.
/// * `scheme` - ECDSA or Schnorr.
/// * `sighash_type` - Flags whose low byte is appended.
///
/// # Returns
/// The signature bytes ready to push into an unlocking script.
pub fn transaction_signature(
    key: &PrivateKey,
    digest: &[u8; 32],
    scheme: SigningScheme,
    sighash_type: u32,
) -> Result<Vec<u8>, TransactionError> {
    let mut sig = match scheme {
        SigningScheme::Ecdsa => key.sign(digest)?.to_der(),
        SigningScheme::Schnorr => key.sign_schnorr(digest)?.to_bytes().to_vec(),
    };
    sig.push((sighash_type & 0xff) as u8);
    Ok(sig)
}

/// Split a transaction signature into its body and sighash-type byte.
pub fn split_sighash_type(sig: &[u8]) -> Option<(&[u8], u8)> {
    let (&flag, body) = sig.split_last()?;
    Some((body, flag))
}

/// Verify a signature body (without the sighash-type byte).
///
/// A 64-byte body is checked as Schnorr, anything else as DER-ECDSA.
/// Malformed signatures verify as `false`.
pub fn verify_signature(pub_key: &PublicKey, digest: &[u8; 32], body: &[u8]) -> bool {
    if body.len() == SCHNORR_SIGNATURE_LEN {
        SchnorrSignature::from_bytes(body)
            .map(|sig| pub_key.verify_schnorr(digest, &sig))
            .unwrap_or(false)
    } else {
        Signature::from_der(body)
            .map(|sig| pub_key.verify(digest, &sig))
            .unwrap_or(false)
    }
}
