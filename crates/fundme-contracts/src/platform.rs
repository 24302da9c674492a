//! The platform keypair that co-signs campaign spends.

use fundme_primitives::ec::PrivateKey;
use fundme_transaction::SigningScheme;

use crate::error::ContractError;
use crate::factory::FunctionArg;

/// The platform's signing key and the scheme it signs with.
#[derive(Clone)]
pub struct PlatformKey {
    key: PrivateKey,
    scheme: SigningScheme,
}

impl PlatformKey {
    /// Wrap a private key.
    pub fn new(key: PrivateKey, scheme: SigningScheme) -> Self {
        PlatformKey { key, scheme }
    }

    /// Parse a WIF-encoded private key.
    pub fn from_wif(wif: &str, scheme: SigningScheme) -> Result<Self, ContractError> {
        let key = PrivateKey::from_wif(wif)
            .map_err(|e| ContractError::Config(format!("platform key: {}", e)))?;
        Ok(Self::new(key, scheme))
    }

    /// Hash160 of the compressed public key, as frozen into the Main and
    /// Exit contracts.
    pub fn key_hash(&self) -> [u8; 20] {
        self.key.pub_key().hash160()
    }

    /// The signing scheme.
    pub fn scheme(&self) -> SigningScheme {
        self.scheme
    }

    /// Arguments for a `(pubkey, sig)` contract function.
    pub(crate) fn function_args(&self) -> Vec<FunctionArg> {
        vec![
            FunctionArg::Bytes(self.key.pub_key().to_compressed().to_vec()),
            FunctionArg::Signature {
                key: self.key.clone(),
                scheme: self.scheme,
            },
        ]
    }
}

impl std::fmt::Debug for PlatformKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformKey")
            .field("key_hash", &hex::encode(self.key_hash()))
            .field("scheme", &self.scheme)
            .finish()
    }
}
