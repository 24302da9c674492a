//! Cryptographic primitives for the fundme contract engine.
//!
//! This crate provides the foundational building blocks the higher layers
//! build transactions with:
//! - Hash functions (SHA-256, SHA-256d, RIPEMD-160, Hash160)
//! - Chain hash type for transaction ids and token categories
//! - Compact-size integers and a little-endian byte reader/writer
//! - secp256k1 keys with DER-ECDSA and BCH Schnorr signatures

pub mod hash;
pub mod chainhash;
pub mod util;
pub mod ec;

mod error;
pub use error::PrimitivesError;
