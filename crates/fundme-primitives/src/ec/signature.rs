//! DER-encoded ECDSA signatures with RFC6979 deterministic nonces.
//!
//! Signatures are always produced and serialized in low-S form, the only
//! form the ledger's consensus rules accept.

use k256::ecdsa;
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

/// An ECDSA signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    inner: ecdsa::Signature,
}

impl Signature {
    /// Parse a strict DER-encoded signature.
    ///
    /// # Arguments
    /// * `bytes` - DER bytes, without a trailing sighash-type byte.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or an error if the encoding is malformed
    /// or either scalar is out of range.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let inner = ecdsa::Signature::from_der(bytes)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(Signature { inner })
    }

    /// Build a signature from its big-endian R and S scalars.
    pub fn from_scalars(r: [u8; 32], s: [u8; 32]) -> Result<Self, PrimitivesError> {
        let inner = ecdsa::Signature::from_scalars(r, s)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(Signature { inner })
    }

    /// Serialize in DER format, normalizing S to the lower half order.
    pub fn to_der(&self) -> Vec<u8> {
        let normalized = self.inner.normalize_s().unwrap_or(self.inner);
        normalized.to_der().as_bytes().to_vec()
    }

    /// Sign a 32-byte digest with RFC6979 nonces.
    ///
    /// # Arguments
    /// * `digest` - The signing digest.
    /// * `priv_key` - The private key to sign with.
    ///
    /// # Returns
    /// A low-S signature, or an error if signing fails.
    pub fn sign(digest: &[u8; 32], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        let sig: ecdsa::Signature = priv_key
            .signing_key()
            .sign_prehash(digest)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(Signature {
            inner: sig.normalize_s().unwrap_or(sig),
        })
    }

    /// Verify this signature against a digest and public key.
    ///
    /// High-S signatures are rejected.
    pub fn verify(&self, digest: &[u8; 32], pub_key: &PublicKey) -> bool {
        pub_key
            .verifying_key()
            .verify_prehash(digest, &self.inner)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256;

    const VALID_DER: &str = "304402204e45e16932b8af514961a1d3a1a25fdf3f4f7732e9d624c6c61548ab5fb8cd41\
                             0220181522ec8eca07de4860a4acdd12909d831cc56cbbac4622082221a8768d1d09";

    #[test]
    fn test_der_parsing() {
        let valid = hex::decode(VALID_DER).expect("hex");
        let sig = Signature::from_der(&valid).expect("valid DER");
        assert_eq!(sig.to_der(), valid);

        assert!(Signature::from_der(&[]).is_err());

        let mut bad_magic = valid.clone();
        bad_magic[0] = 0x31;
        assert!(Signature::from_der(&bad_magic).is_err());

        let mut bad_marker = valid.clone();
        bad_marker[2] = 0x03;
        assert!(Signature::from_der(&bad_marker).is_err());
    }

    /// S above half order serializes as N - S.
    #[test]
    fn test_low_s_normalization() {
        let r: [u8; 32] = hex::decode("a196ed0e7ebcbe7b63fe1d8eecbdbde03a67ceba4fc8f6482bdcb9606a911404")
            .expect("hex")
            .try_into()
            .expect("32 bytes");
        let s: [u8; 32] = hex::decode("971729c7fa944b465b35250c6570a2f31acbb14b13d1565fab7330dcb2b3dfb1")
            .expect("hex")
            .try_into()
            .expect("32 bytes");
        let sig = Signature::from_scalars(r, s).expect("scalars in range");
        assert_eq!(
            hex::encode(sig.to_der()),
            "3045022100a196ed0e7ebcbe7b63fe1d8eecbdbde03a67ceba4fc8f6482bdcb9606a911404\
             022068e8d638056bb4b9a4cadaf39a8f5d0b9fe32b9b9b7749dc145f2db01d826190"
        );
    }

    /// RFC6979 vectors (Trezor / CoreBitcoin).
    #[test]
    fn test_rfc6979() {
        let tests = [
            (
                "cca9fbcc1b41e5a95d369eaa6ddcff73b61a4efaa279cfc6567e8daa39cbaf50",
                "sample",
                "3045022100af340daf02cc15c8d5d08d7735dfe6b98a474ed373bdb5fbecf7571be52b384202205009fb27f37034a9b24b707b7c6b79ca23ddef9e25f7282e8a797efe53a8f124",
            ),
            (
                "0000000000000000000000000000000000000000000000000000000000000001",
                "Satoshi Nakamoto",
                "3045022100934b1ea10a4b3c1757e2b0c017d0b6143ce3c9a7e6a4a49860d7a6ab210ee3d802202442ce9d2b916064108014783e923ec36b49743e2ffa1c4496f01a512aafd9e5",
            ),
            (
                "f8b8af8ce3c7cca5e300d33939540c10d45ce001b8f252bfbc57ba0342904181",
                "Alan Turing",
                "304402207063ae83e7f62bbb171798131b4a0564b956930092b33b07b395615d9ec7e15c022058dfcc1e00a35e1572f366ffe34ba0fc47db1e7189759b9fb233c5b05ab388ea",
            ),
        ];

        for (key_hex, msg, expected) in tests {
            let priv_key = PrivateKey::from_hex(key_hex).expect("valid key");
            let digest = sha256(msg.as_bytes());
            let sig = priv_key.sign(&digest).expect("sign");
            assert_eq!(hex::encode(sig.to_der()), expected, "message '{}'", msg);
            assert!(priv_key.pub_key().verify(&digest, &sig));
        }
    }

    #[test]
    fn test_verify_rejects_wrong_digest_and_key() {
        let key = PrivateKey::new();
        let other = PrivateKey::new();
        let digest = sha256(b"pledge");
        let sig = key.sign(&digest).expect("sign");

        assert!(key.pub_key().verify(&digest, &sig));
        assert!(!key.pub_key().verify(&sha256(b"pledge!"), &sig));
        assert!(!other.pub_key().verify(&digest, &sig));
    }
}
