//! Ledger access for the fundme contract engine.
//!
//! The engine never talks to a network directly. Every operation receives a
//! [`Ledger`] handle that can broadcast a transaction, look up the output an
//! outpoint refers to and report the chain's median time past. The crate
//! ships [`MemoryLedger`], an in-process ledger that enforces the consensus
//! rules the contracts depend on.

pub mod error;
pub mod chain_tracker;
pub mod broadcaster;
pub mod memory;

pub use error::LedgerError;
pub use chain_tracker::ChainTracker;
pub use broadcaster::{Broadcaster, BroadcastSuccess, BroadcastFailure};
pub use memory::MemoryLedger;

/// A full ledger handle: broadcasting plus chain state queries.
///
/// Implemented automatically for every type that is both a
/// [`Broadcaster`] and a [`ChainTracker`].
pub trait Ledger: Broadcaster + ChainTracker {}

impl<T: Broadcaster + ChainTracker + ?Sized> Ledger for T {}
