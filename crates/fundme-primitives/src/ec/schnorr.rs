//! BCH Schnorr signatures.
//!
//! A signature is the 64 bytes `r ‖ s`. Verification computes
//! `e = SHA256(r ‖ compressed(P) ‖ m)` and `R = sG − eP`, and accepts iff
//! `R` is not the point at infinity, `y(R)` is a quadratic residue modulo
//! the field prime, and `x(R) = r`.
//!
//! Signing uses a deterministic nonce derived from the key and message and
//! negates it when the nonce point's y coordinate is not a quadratic residue.

use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, ProjectivePoint, Scalar, U256};
use num_bigint::BigUint;

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::hash::sha256_concat;
use crate::PrimitivesError;

/// Serialized length of a Schnorr signature.
pub const SCHNORR_SIGNATURE_LEN: usize = 64;

/// Additional data mixed into the nonce so it never collides with an
/// ECDSA nonce for the same key and digest.
const NONCE_TAG: &[u8] = b"Schnorr+SHA256  ";

/// The secp256k1 field prime p.
const FIELD_PRIME: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe, 0xff, 0xff, 0xfc, 0x2f,
];

/// A 64-byte Schnorr signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchnorrSignature {
    r: [u8; 32],
    s: [u8; 32],
}

impl SchnorrSignature {
    /// Parse a 64-byte `r ‖ s` signature.
    ///
    /// Range checks on `r` and `s` are deferred to verification, where an
    /// out-of-range value simply fails.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != SCHNORR_SIGNATURE_LEN {
            return Err(PrimitivesError::InvalidSignature(format!(
                "schnorr signature must be {} bytes, got {}",
                SCHNORR_SIGNATURE_LEN,
                bytes.len()
            )));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(SchnorrSignature { r, s })
    }

    /// Serialize as `r ‖ s`.
    pub fn to_bytes(&self) -> [u8; SCHNORR_SIGNATURE_LEN] {
        let mut out = [0u8; SCHNORR_SIGNATURE_LEN];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }

    /// Sign a 32-byte digest.
    ///
    /// # Arguments
    /// * `digest` - The signing digest.
    /// * `priv_key` - The signer's key.
    ///
    /// # Returns
    /// The signature, or an error in the negligible case of a zero nonce.
    pub fn sign(digest: &[u8; 32], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        let d = priv_key.to_scalar();
        let mut k = reduce(&sha256_concat(&[&priv_key.to_bytes()[..], &digest[..], NONCE_TAG]));
        if bool::from(k.is_zero()) {
            return Err(PrimitivesError::InvalidSignature(
                "derived schnorr nonce is zero".to_string(),
            ));
        }

        let nonce_point = (ProjectivePoint::GENERATOR * k).to_affine().to_encoded_point(false);
        let (x, y) = match (nonce_point.x(), nonce_point.y()) {
            (Some(x), Some(y)) => (*x, *y),
            _ => {
                return Err(PrimitivesError::InvalidSignature(
                    "schnorr nonce point at infinity".to_string(),
                ))
            }
        };
        if !is_quadratic_residue(&y) {
            k = -k;
        }

        let r: [u8; 32] = x.into();
        let e = challenge(&r, &priv_key.pub_key(), digest);
        let s = k + e * d;
        Ok(SchnorrSignature {
            r,
            s: s.to_repr().into(),
        })
    }

    /// Verify this signature against a digest and public key.
    pub fn verify(&self, digest: &[u8; 32], pub_key: &PublicKey) -> bool {
        let prime = BigUint::from_bytes_be(&FIELD_PRIME);
        if BigUint::from_bytes_be(&self.r) >= prime {
            return false;
        }
        let s = match Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(self.s))) {
            Some(s) => s,
            None => return false,
        };

        let e = challenge(&self.r, pub_key, digest);
        let point = ProjectivePoint::GENERATOR * s - pub_key.to_projective_point() * e;
        let encoded = point.to_affine().to_encoded_point(false);
        match (encoded.x(), encoded.y()) {
            (Some(x), Some(y)) => is_quadratic_residue(y) && x.as_slice() == &self.r[..],
            _ => false,
        }
    }
}

/// `e = SHA256(r ‖ compressed(P) ‖ m) mod n`.
fn challenge(r: &[u8; 32], pub_key: &PublicKey, digest: &[u8; 32]) -> Scalar {
    reduce(&sha256_concat(&[&r[..], &pub_key.to_compressed()[..], &digest[..]]))
}

fn reduce(bytes: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce(U256::from_be_slice(bytes))
}

/// Euler's criterion: `y^((p-1)/2) mod p == 1`.
fn is_quadratic_residue(y: &[u8]) -> bool {
    let prime = BigUint::from_bytes_be(&FIELD_PRIME);
    let exponent = (&prime - 1u32) >> 1usize;
    BigUint::from_bytes_be(y).modpow(&exponent, &prime) == BigUint::from(1u32)
}
