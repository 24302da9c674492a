/// Transaction model, CashTokens prefixes and signing for the fundme
/// contract engine.
///
/// Provides the Transaction type with token-aware outputs, the FORKID
/// signature hash, ECDSA/Schnorr transaction signatures and unlocking
/// templates.

pub mod transaction;
pub mod input;
pub mod output;
pub mod token;
pub mod sighash;
pub mod signature;
pub mod template;

mod error;
pub use error::TransactionError;
pub use transaction::Transaction;
pub use input::{Outpoint, TransactionInput};
pub use output::TransactionOutput;
pub use token::{NftCapability, NonFungibleToken, TokenData};
pub use signature::SigningScheme;

#[cfg(test)]
mod tests;
