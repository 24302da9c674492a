//! Campaign and pledge records shared by the engines.
//!
//! Txids are display-order hex strings throughout, as the repository layer
//! stores them; they are converted to internal byte order only when a
//! transaction or token prefix is built.

use serde::{Deserialize, Serialize};

use fundme_primitives::chainhash::Hash;
use fundme_script::Network;
use fundme_transaction::Outpoint;

use crate::error::ContractError;

/// The contract generation a campaign was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractGeneration {
    /// Version 1: pledges are not capped and never produce change.
    Uncapped,
    /// Version 2 onwards: pledges are capped at the goal and the excess is
    /// returned as change.
    Capped,
}

impl ContractGeneration {
    /// The generation of a campaign created with contract `version`.
    pub fn from_version(version: u32) -> Result<Self, ContractError> {
        match version {
            0 => Err(ContractError::Config("contract version 0 does not exist".into())),
            1 => Ok(ContractGeneration::Uncapped),
            _ => Ok(ContractGeneration::Capped),
        }
    }

    /// The contract version new campaigns of this generation record.
    pub fn version(self) -> u32 {
        match self {
            ContractGeneration::Uncapped => 1,
            ContractGeneration::Capped => 2,
        }
    }

    /// Name of the artifact directory for this generation.
    pub fn dir_name(self) -> &'static str {
        match self {
            ContractGeneration::Uncapped => "v1",
            ContractGeneration::Capped => "v2",
        }
    }
}

/// How a pledge entered the system, which selects its contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PledgeType {
    /// A pledge towards a campaign that may not exist yet (Start contract).
    Starting,
    /// A pledge towards an existing campaign (Pledge contract).
    Started,
    /// A donation (Donation contract).
    Donation,
}

/// Immutable campaign parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignInfo {
    /// Address the campaign pays out to.
    pub payout_address: String,
    /// Funding goal.
    pub goal_satoshis: u64,
    /// Expiry, as a Unix timestamp.
    pub expires_at_unix: u32,
    /// Network the campaign lives on.
    pub network: Network,
    /// Contract version the campaign was created with.
    pub version: u32,
}

impl CampaignInfo {
    /// The contract generation of this campaign.
    pub fn generation(&self) -> Result<ContractGeneration, ContractError> {
        ContractGeneration::from_version(self.version)
    }
}

fn outpoint(txid: &str, vout: u32) -> Result<Outpoint, ContractError> {
    Ok(Outpoint::from_hex(txid, vout)?)
}

/// The live campaign UTXO, holding the minting token at vout 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignUtxo {
    /// Transaction id.
    pub txid: String,
    /// Output index.
    pub vout: u32,
    /// Value.
    pub satoshis: u64,
    /// Token category, the txid of the genesis pledge.
    pub category_id: String,
}

impl CampaignUtxo {
    /// The outpoint of this UTXO.
    pub fn outpoint(&self) -> Result<Outpoint, ContractError> {
        outpoint(&self.txid, self.vout)
    }

    /// The token category in internal byte order.
    pub fn category(&self) -> Result<Hash, ContractError> {
        Ok(Hash::from_hex(&self.category_id)?)
    }
}

/// A pledge waiting at its pledge contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PledgeUtxo {
    /// Transaction id.
    pub txid: String,
    /// Output index.
    pub vout: u32,
    /// Value.
    pub satoshis: u64,
}

impl PledgeUtxo {
    /// The outpoint of this UTXO.
    pub fn outpoint(&self) -> Result<Outpoint, ContractError> {
        outpoint(&self.txid, self.vout)
    }
}

/// A pledge receipt held at the Exit contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardedPledgeUtxo {
    /// Transaction id.
    pub txid: String,
    /// Output index.
    pub vout: u32,
    /// Value, always the receipt value.
    pub satoshis: u64,
    /// The amount the pledge committed to the campaign.
    pub pledged_amount: u64,
}

impl ForwardedPledgeUtxo {
    /// The outpoint of this UTXO.
    pub fn outpoint(&self) -> Result<Outpoint, ContractError> {
        outpoint(&self.txid, self.vout)
    }
}

/// Change returned to a pledger whose pledge exceeded the cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeUtxo {
    /// Transaction id.
    pub txid: String,
    /// Output index.
    pub vout: u32,
    /// Value.
    pub satoshis: u64,
}

// -----------------------------------------------------------------------
// Engine outcomes
// -----------------------------------------------------------------------

/// Result of forwarding a pledge into a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardOutcome {
    /// The forwarding transaction.
    pub txid: String,
    /// The new campaign UTXO.
    pub campaign: CampaignUtxo,
    /// The pledge receipt.
    pub receipt: ForwardedPledgeUtxo,
    /// Change returned to the pledger, if any.
    pub change: Option<ChangeUtxo>,
}

/// Result of cancelling a pledge before it was forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOutcome {
    /// The cancel transaction.
    pub txid: String,
    /// Value returned to the refund address.
    pub refunded_satoshis: u64,
}

/// Result of refunding a forwarded pledge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundOutcome {
    /// The refund transaction.
    pub txid: String,
    /// The reduced campaign UTXO.
    pub campaign: CampaignUtxo,
    /// Value returned to the refund address.
    pub returned_satoshis: u64,
}

/// Result of paying out a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionOutcome {
    /// The payout transaction.
    pub txid: String,
    /// Value sent to the payout address.
    pub payout_satoshis: u64,
}
