//! The contract variants and their frozen constructor parameters.

use fundme_primitives::chainhash::Hash;
use fundme_script::Script;

use crate::artifact::ContractKind;
use crate::commitment::CommitmentLayout;
use crate::factory::contract::ContractInstance;
use crate::types::{ContractGeneration, PledgeType};

/// Constructor parameters of the Main contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainParams {
    /// Hash160 of the platform public key.
    pub platform_key_hash: [u8; 20],
    /// Campaign goal.
    pub goal_satoshis: u64,
    /// Campaign expiry.
    pub expires_at_unix: u32,
    /// Where the payout goes.
    pub payout_bytecode: Script,
}

/// The Main contract: holds campaign funds and the minting token.
#[derive(Debug, Clone, PartialEq)]
pub struct MainContract {
    /// Frozen constructor parameters.
    pub params: MainParams,
    /// The applied contract.
    pub instance: ContractInstance,
}

/// Constructor parameters of the Exit contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitParams {
    /// Hash160 of the platform public key.
    pub platform_key_hash: [u8; 20],
    /// Campaign expiry.
    pub expires_at_unix: u32,
}

/// The Exit contract: holds pledge receipts until refund.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitContract {
    /// Frozen constructor parameters.
    pub params: ExitParams,
    /// The applied contract.
    pub instance: ContractInstance,
}

/// Constructor parameters shared by the Start and Donation contracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartParams {
    /// Locking bytecode of the campaign's Main contract.
    pub main_bytecode: Script,
    /// Locking bytecode of the campaign's Exit contract.
    pub exit_bytecode: Script,
    /// Where cancels, refunds and change go.
    pub refund_bytecode: Script,
    /// Campaign goal; only the capped generation takes it.
    pub goal_satoshis: Option<u64>,
}

/// Constructor parameters of the Pledge contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PledgeParams {
    /// Where cancels, refunds and change go.
    pub refund_bytecode: Script,
    /// The campaign's token category, internal byte order.
    pub category: Hash,
    /// Locking bytecode of the campaign's Exit contract.
    pub exit_bytecode: Script,
}

/// The contracts a pledge can wait at.
#[derive(Debug, Clone, PartialEq)]
pub enum PledgeContract {
    /// Pledges for a campaign that may not exist yet.
    Start {
        /// Frozen constructor parameters.
        params: StartParams,
        /// The applied contract.
        instance: ContractInstance,
    },
    /// Donations.
    Donation {
        /// Frozen constructor parameters.
        params: StartParams,
        /// The applied contract.
        instance: ContractInstance,
    },
    /// Pledges for a campaign that already has a category.
    Pledge {
        /// Frozen constructor parameters.
        params: PledgeParams,
        /// The applied contract.
        instance: ContractInstance,
    },
}

impl PledgeContract {
    /// The pledge type this contract serves.
    pub fn pledge_type(&self) -> PledgeType {
        match self {
            PledgeContract::Start { .. } => PledgeType::Starting,
            PledgeContract::Donation { .. } => PledgeType::Donation,
            PledgeContract::Pledge { .. } => PledgeType::Started,
        }
    }

    /// The contract kind.
    pub fn kind(&self) -> ContractKind {
        self.instance().kind()
    }

    /// The applied contract.
    pub fn instance(&self) -> &ContractInstance {
        match self {
            PledgeContract::Start { instance, .. }
            | PledgeContract::Donation { instance, .. }
            | PledgeContract::Pledge { instance, .. } => instance,
        }
    }

    /// The generation the contract was built from.
    pub fn generation(&self) -> ContractGeneration {
        self.instance().generation()
    }

    /// Where cancels, refunds and change go.
    pub fn refund_bytecode(&self) -> &Script {
        match self {
            PledgeContract::Start { params, .. } | PledgeContract::Donation { params, .. } => {
                &params.refund_bytecode
            }
            PledgeContract::Pledge { params, .. } => &params.refund_bytecode,
        }
    }

    /// Locking bytecode of the Exit contract receipts go to.
    pub fn exit_bytecode(&self) -> &Script {
        match self {
            PledgeContract::Start { params, .. } | PledgeContract::Donation { params, .. } => {
                &params.exit_bytecode
            }
            PledgeContract::Pledge { params, .. } => &params.exit_bytecode,
        }
    }

    /// Parameters of a contract that can create a campaign, `None` for the
    /// Pledge contract.
    pub fn start_params(&self) -> Option<&StartParams> {
        match self {
            PledgeContract::Start { params, .. } | PledgeContract::Donation { params, .. } => {
                Some(params)
            }
            PledgeContract::Pledge { .. } => None,
        }
    }

    /// The commitment layout of receipts this contract issues.
    pub fn commitment_layout(&self) -> CommitmentLayout {
        CommitmentLayout::for_pledge(self.pledge_type(), self.generation())
    }
}
