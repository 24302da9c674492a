#![deny(missing_docs)]

//! Crowdfunding contract engine.
//!
//! Re-exports every component for single-crate usage.

pub use fundme_primitives as primitives;
pub use fundme_script as script;
pub use fundme_transaction as transaction;
pub use fundme_ledger as ledger;
pub use fundme_contracts as contracts;
