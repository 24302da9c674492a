//! Protocol constants shared by every contract generation.

/// Fee taken by every merge into a campaign (covers the receipt output).
pub const MERGE_FEE: u64 = 2000;

/// Fee taken when a split pledge is normalized to vout 0.
pub const GENESIS_FEE: u64 = 1000;

/// Fee taken by a unilateral pledge cancel.
pub const CANCEL_FEE: u64 = 600;

/// Smallest output the ledger accepts.
pub const DUST_LIMIT: u64 = 546;

/// Value carried by every pledge receipt.
pub const RECEIPT_SATOSHIS: u64 = 783;

/// Fee taken by a campaign payout.
pub const PAYOUT_FEE: u64 = 1000;

/// A refund never leaves the campaign UTXO below this value.
pub const MIN_CAMPAIGN_SATOSHIS: u64 = 1000;

/// The refund path keeps this much of each refunded pledge.
pub const REFUND_FEE: u64 = 2000;
