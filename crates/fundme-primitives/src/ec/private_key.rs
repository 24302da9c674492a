//! secp256k1 private key with WIF encoding and both signing schemes.
//!
//! Wraps the k256 signing key. The platform key that co-signs campaign
//! spends is loaded from WIF; pledgers' keys only ever appear in tests.

use k256::ecdsa::SigningKey;
use k256::Scalar;
use rand::rngs::OsRng;

use crate::ec::public_key::PublicKey;
use crate::ec::schnorr::SchnorrSignature;
use crate::ec::signature::Signature;
use crate::hash::sha256d;
use crate::PrimitivesError;

/// Length of a serialized private key in bytes.
const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// Compression flag byte appended to WIF for compressed public keys.
const COMPRESS_MAGIC: u8 = 0x01;

/// The network a WIF string is encoded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifNetwork {
    /// Main network, WIF prefix `0x80`.
    Mainnet,
    /// Test and regression networks, WIF prefix `0xef`.
    Testnet,
}

impl WifNetwork {
    /// The WIF version byte for this network.
    pub fn wif_prefix(self) -> u8 {
        match self {
            WifNetwork::Mainnet => 0x80,
            WifNetwork::Testnet => 0xef,
        }
    }

    fn from_wif_prefix(prefix: u8) -> Option<Self> {
        match prefix {
            0x80 => Some(WifNetwork::Mainnet),
            0xef => Some(WifNetwork::Testnet),
            _ => None,
        }
    }
}

/// A secp256k1 private key.
#[derive(Clone, Debug)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a new random private key using the OS random number generator.
    pub fn new() -> Self {
        PrivateKey {
            inner: SigningKey::random(&mut OsRng),
        }
    }

    /// Create a private key from a raw 32-byte scalar.
    ///
    /// # Arguments
    /// * `bytes` - A 32-byte big-endian scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` if the bytes represent a valid non-zero scalar.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_BYTES_LEN,
                bytes.len()
            )));
        }
        let inner = SigningKey::from_bytes(bytes.into())
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey { inner })
    }

    /// Create a private key from a 64-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".to_string(),
            ));
        }
        Self::from_bytes(&hex::decode(hex_str)?)
    }

    /// Decode a WIF (Wallet Import Format) string.
    ///
    /// Accepts compressed and uncompressed encodings for both the main
    /// and test network prefixes.
    ///
    /// # Arguments
    /// * `wif` - A Base58Check-encoded WIF string.
    ///
    /// # Returns
    /// The key and the network its prefix names, or an error if the string
    /// is malformed or the checksum fails.
    pub fn from_wif_with_network(wif: &str) -> Result<(Self, WifNetwork), PrimitivesError> {
        let decoded = bs58::decode(wif)
            .into_vec()
            .map_err(|e| PrimitivesError::InvalidWif(e.to_string()))?;

        // prefix + key [+ compress flag] + 4-byte checksum
        let payload_end = match decoded.len() {
            38 if decoded[33] == COMPRESS_MAGIC => 34,
            38 => {
                return Err(PrimitivesError::InvalidWif(
                    "invalid compression flag".to_string(),
                ))
            }
            37 => 33,
            n => {
                return Err(PrimitivesError::InvalidWif(format!("invalid length {}", n)));
            }
        };

        let checksum = sha256d(&decoded[..payload_end]);
        if checksum[..4] != decoded[payload_end..] {
            return Err(PrimitivesError::ChecksumMismatch);
        }

        let network = WifNetwork::from_wif_prefix(decoded[0]).ok_or_else(|| {
            PrimitivesError::InvalidWif(format!("unknown prefix 0x{:02x}", decoded[0]))
        })?;
        let key = Self::from_bytes(&decoded[1..1 + PRIVATE_KEY_BYTES_LEN])?;
        Ok((key, network))
    }

    /// Decode a WIF string, ignoring which network it was encoded for.
    pub fn from_wif(wif: &str) -> Result<Self, PrimitivesError> {
        Self::from_wif_with_network(wif).map(|(key, _)| key)
    }

    /// Encode the key as a compressed WIF string for the given network.
    pub fn to_wif(&self, network: WifNetwork) -> String {
        let mut payload = Vec::with_capacity(1 + PRIVATE_KEY_BYTES_LEN + 1 + 4);
        payload.push(network.wif_prefix());
        payload.extend_from_slice(&self.to_bytes());
        payload.push(COMPRESS_MAGIC);

        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);
        bs58::encode(payload).into_string()
    }

    /// Serialize the private key as a 32-byte big-endian array.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes().into()
    }

    /// Serialize the private key as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Derive the corresponding public key.
    pub fn pub_key(&self) -> PublicKey {
        PublicKey::from_k256_verifying_key(self.inner.verifying_key())
    }

    /// Produce a low-S DER-ECDSA signature over a 32-byte digest.
    ///
    /// Nonces are deterministic (RFC6979).
    pub fn sign(&self, digest: &[u8; 32]) -> Result<Signature, PrimitivesError> {
        Signature::sign(digest, self)
    }

    /// Produce a 64-byte Schnorr signature over a 32-byte digest.
    pub fn sign_schnorr(&self, digest: &[u8; 32]) -> Result<SchnorrSignature, PrimitivesError> {
        SchnorrSignature::sign(digest, self)
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }

    pub(crate) fn to_scalar(&self) -> Scalar {
        *self.inner.as_nonzero_scalar().as_ref()
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        let mut bytes = self.inner.to_bytes();
        bytes.zeroize();
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PrivateKey {}
