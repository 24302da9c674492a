#![deny(missing_docs)]
//! Crowdfunding campaign contracts.
//!
//! Campaign funds live in a chain of script contracts. A pledge is paid to
//! a Start, Donation or Pledge contract, forwarded into the campaign's Main
//! contract (which holds the campaign's minting token) and leaves a receipt
//! NFT at the Exit contract. Receipts are refunded through the Exit
//! contract; a funded campaign is paid out through Main.
//!
//! Every engine call takes the [`fundme_ledger::Ledger`] it broadcasts to.

pub mod error;
pub mod constants;
pub mod types;
pub mod commitment;
pub mod artifact;
pub mod factory;
pub mod platform;
pub mod amounts;
pub mod forwarding;
pub mod exit;
pub mod completion;
pub mod anyonecanpay;
pub mod orchestrator;
pub mod config;

mod submit;


pub use error::ContractError;
pub use types::{
    CampaignInfo, CampaignUtxo, CancelOutcome, ChangeUtxo, CompletionOutcome, ContractGeneration,
    ForwardOutcome, ForwardedPledgeUtxo, PledgeType, PledgeUtxo, RefundOutcome,
};
pub use commitment::{CommitmentLayout, PledgeCommitment};
pub use artifact::{Artifact, ArtifactSet, ContractKind};
pub use factory::{CampaignContracts, ContractAddressType, ContractFactory, PledgeContract};
pub use platform::PlatformKey;
pub use amounts::{CommitPlan, RefundPlan};
pub use forwarding::ForwardingEngine;
pub use exit::ExitRefundEngine;
pub use completion::CompletionEngine;
pub use anyonecanpay::AnyonecanpayCommitment;
pub use orchestrator::{
    CampaignOrchestrator, CampaignRecord, CampaignStore, MemoryStore, OrchestratorOutcome,
    PledgeRecord,
};
pub use config::EngineConfig;
