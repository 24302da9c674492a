//! Contract engine error types.

use fundme_ledger::LedgerError;
use fundme_primitives::PrimitivesError;
use fundme_script::ScriptError;
use fundme_transaction::TransactionError;

use crate::types::PledgeUtxo;

/// Errors raised by the contract engines and the orchestrator.
///
/// A signature that fails anyonecanpay validation is not an error: the
/// validator returns `false` and logs a warning.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    /// The UTXO has the wrong output index for the requested step.
    #[error("invalid utxo: {0}")]
    InvalidUtxo(String),

    /// The campaign already holds its goal; the pledge is refused before a
    /// transaction is built.
    #[error("campaign already completable: holds {campaign_satoshis} of a {goal_satoshis} goal")]
    AlreadyCompletable {
        /// Current value of the campaign UTXO.
        campaign_satoshis: u64,
        /// The campaign goal.
        goal_satoshis: u64,
    },

    /// Commit, change and fee do not add up to the pledge value.
    #[error("change miscalculation: {commit} + {change} + {fee} != {pledge}")]
    ChangeMiscalculation {
        /// Committed amount.
        commit: u64,
        /// Change amount, zero when absent.
        change: u64,
        /// Fee charged.
        fee: u64,
        /// Pledge value.
        pledge: u64,
    },

    /// The contract would return change below the dust limit, which no
    /// ledger relays. The pledge cannot be forwarded into the campaign as
    /// it stands.
    #[error("change of {change} from a {pledge} pledge is below the dust limit")]
    DustChange {
        /// Change the contract requires.
        change: u64,
        /// Pledge value.
        pledge: u64,
    },

    /// The ledger rejected the transaction.
    #[error("broadcast failed during {operation}: {reason}")]
    BroadcastFailure {
        /// The engine operation that broadcast.
        operation: &'static str,
        /// The ledger's reject reason.
        reason: String,
    },

    /// The broadcast succeeded but the result did not have the expected shape.
    #[error("missing output: {0}")]
    MissingOutput(String),

    /// A commitment or anyonecanpay payload is structurally invalid.
    #[error("malformed commitment: {0}")]
    MalformedCommitment(String),

    /// The pledge does not cover the fee.
    #[error("insufficient funds: needed more than {needed}, available {available}")]
    InsufficientFunds {
        /// The minimum the operation consumes.
        needed: u64,
        /// The pledge value.
        available: u64,
    },

    /// A split pledge was normalized to vout 0 but creating the campaign
    /// from it failed. The original outpoint is spent; `pledge` is where
    /// the pledge now waits.
    #[error("pledge normalized to {}:0 but the campaign was not created: {source}", .pledge.txid)]
    Normalized {
        /// The vout-0 pledge to persist in place of the original.
        pledge: PledgeUtxo,
        /// Why creating the campaign failed.
        source: Box<ContractError>,
    },

    /// A pledge that requires an existing campaign has none.
    #[error("missing campaign: {0}")]
    MissingCampaign(String),

    /// The pledge may not be cancelled on this path.
    #[error("cancel not permitted: {0}")]
    CancelNotPermitted(String),

    /// A contract artifact failed to load or validate.
    #[error("artifact error: {0}")]
    Artifact(String),

    /// An outpoint could not be found on the ledger.
    #[error("unknown outpoint: {0}")]
    UnknownOutpoint(String),

    /// A record the orchestrator needs is missing from the store.
    #[error("not found: {0}")]
    NotFound(String),

    /// Engine configuration is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// Ledger access failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Transaction error.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Script error.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// Primitives error.
    #[error(transparent)]
    Primitives(#[from] PrimitivesError),

    /// JSON serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for ContractError {
    fn from(err: config::ConfigError) -> Self {
        ContractError::Config(err.to_string())
    }
}
