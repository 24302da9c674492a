/// Elliptic curve cryptography on secp256k1.
///
/// Provides private keys, public keys, DER-encoded ECDSA signatures and
/// 64-byte BCH Schnorr signatures.

pub mod private_key;
pub mod public_key;
pub mod signature;
pub mod schnorr;

pub use private_key::{PrivateKey, WifNetwork};
pub use public_key::PublicKey;
pub use schnorr::SchnorrSignature;
pub use signature::Signature;
