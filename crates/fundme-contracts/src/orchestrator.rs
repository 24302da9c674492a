//! Campaign orchestration.
//!
//! The orchestrator is what the job scheduler calls. Given a pledge or
//! campaign id it reads the records, rebuilds the campaign's contracts for
//! the campaign's generation and dispatches to the right engine:
//!
//! | pledge type | campaign UTXO | forward                                   |
//! |-------------|---------------|-------------------------------------------|
//! | Starting    | none          | normalize to vout 0, create the campaign  |
//! | Starting    | live          | merge through the Start contract          |
//! | Donation    | none          | normalize to vout 0, create the campaign  |
//! | Donation    | live          | merge through the Donation contract       |
//! | Started     | live          | merge through the Pledge contract         |
//! | Started     | none          | `MissingCampaign`                         |
//!
//! It never writes records; every entry point returns the new UTXO
//! references for the caller to persist. Callers serialize operations per
//! campaign.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fundme_ledger::Ledger;

use crate::amounts;
use crate::commitment::PledgeCommitment;
use crate::completion::CompletionEngine;
use crate::error::ContractError;
use crate::exit::ExitRefundEngine;
use crate::factory::{CampaignContracts, ContractFactory};
use crate::forwarding::ForwardingEngine;
use crate::platform::PlatformKey;
use crate::types::{
    CampaignInfo, CampaignUtxo, CancelOutcome, CompletionOutcome, ContractGeneration,
    ForwardOutcome, ForwardedPledgeUtxo, PledgeType, PledgeUtxo, RefundOutcome,
};

// -----------------------------------------------------------------------
// Store seam
// -----------------------------------------------------------------------

/// A campaign as the repository layer stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignRecord {
    /// Campaign id.
    pub id: String,
    /// Immutable campaign parameters.
    pub info: CampaignInfo,
    /// The live campaign UTXO, once the first pledge created it.
    pub utxo: Option<CampaignUtxo>,
}

/// A pledge as the repository layer stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PledgeRecord {
    /// Pledge id.
    pub id: String,
    /// The campaign pledged to.
    pub campaign_id: String,
    /// Which contract the pledge was paid into.
    pub pledge_type: PledgeType,
    /// Where cancels, refunds and change go.
    pub refund_address: String,
    /// The pledge UTXO while it waits at its contract.
    pub utxo: Option<PledgeUtxo>,
    /// The receipt once the pledge was forwarded.
    pub receipt: Option<ForwardedPledgeUtxo>,
}

/// Read access to campaign and pledge records.
pub trait CampaignStore {
    /// The campaign with `id`, if any.
    fn campaign(&self, id: &str) -> Result<Option<CampaignRecord>, ContractError>;

    /// The pledge with `id`, if any.
    fn pledge(&self, id: &str) -> Result<Option<PledgeRecord>, ContractError>;
}

/// An in-memory [`CampaignStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    campaigns: HashMap<String, CampaignRecord>,
    pledges: HashMap<String, PledgeRecord>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a campaign.
    pub fn put_campaign(&mut self, record: CampaignRecord) {
        self.campaigns.insert(record.id.clone(), record);
    }

    /// Insert or replace a pledge.
    pub fn put_pledge(&mut self, record: PledgeRecord) {
        self.pledges.insert(record.id.clone(), record);
    }
}

impl CampaignStore for MemoryStore {
    fn campaign(&self, id: &str) -> Result<Option<CampaignRecord>, ContractError> {
        Ok(self.campaigns.get(id).cloned())
    }

    fn pledge(&self, id: &str) -> Result<Option<PledgeRecord>, ContractError> {
        Ok(self.pledges.get(id).cloned())
    }
}

// -----------------------------------------------------------------------
// Outcomes
// -----------------------------------------------------------------------

/// What an orchestrator entry point did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrchestratorOutcome {
    /// The pledge was forwarded into its campaign.
    Forwarded {
        /// The vout-0 pledge a split pledge was first normalized to.
        normalized: Option<PledgeUtxo>,
        /// The forward.
        forward: ForwardOutcome,
    },
    /// An unforwarded pledge was returned.
    Cancelled(CancelOutcome),
    /// A forwarded pledge was refunded.
    Refunded(RefundOutcome),
    /// The campaign was paid out.
    Completed(CompletionOutcome),
}

// -----------------------------------------------------------------------
// Orchestrator
// -----------------------------------------------------------------------

/// Dispatches scheduler jobs to the contract engines.
pub struct CampaignOrchestrator<S: CampaignStore> {
    store: S,
    factories: HashMap<ContractGeneration, ContractFactory>,
    platform: PlatformKey,
}

struct Loaded {
    pledge: PledgeRecord,
    campaign: CampaignRecord,
    contracts: CampaignContracts,
}

impl<S: CampaignStore> CampaignOrchestrator<S> {
    /// An orchestrator with no factories registered.
    pub fn new(store: S, platform: PlatformKey) -> Self {
        CampaignOrchestrator {
            store,
            factories: HashMap::new(),
            platform,
        }
    }

    /// Register the factory for its generation, replacing any earlier one.
    pub fn with_factory(mut self, factory: ContractFactory) -> Self {
        self.factories.insert(factory.generation(), factory);
        self
    }

    /// The record store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the record store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn factory(&self, info: &CampaignInfo) -> Result<&ContractFactory, ContractError> {
        let generation = info.generation()?;
        self.factories.get(&generation).ok_or_else(|| {
            ContractError::Config(format!("no {:?} artifacts are loaded", generation))
        })
    }

    fn load_campaign(&self, id: &str) -> Result<CampaignRecord, ContractError> {
        self.store
            .campaign(id)?
            .ok_or_else(|| ContractError::NotFound(format!("campaign {}", id)))
    }

    fn load(&self, pledge_id: &str) -> Result<Loaded, ContractError> {
        let pledge = self
            .store
            .pledge(pledge_id)?
            .ok_or_else(|| ContractError::NotFound(format!("pledge {}", pledge_id)))?;
        let campaign = self.load_campaign(&pledge.campaign_id)?;
        let contracts = self
            .factory(&campaign.info)?
            .campaign(&campaign.info, self.platform.key_hash())?;
        Ok(Loaded {
            pledge,
            campaign,
            contracts,
        })
    }

    fn live_campaign<'c>(&self, campaign: &'c CampaignRecord) -> Result<&'c CampaignUtxo, ContractError> {
        campaign.utxo.as_ref().ok_or_else(|| {
            ContractError::MissingCampaign(format!("campaign {} has no live UTXO", campaign.id))
        })
    }

    /// Forward a pledge into its campaign.
    ///
    /// Creates the campaign when it has no UTXO yet, normalizing a split
    /// pledge to vout 0 first. A split pledge too small to create the
    /// campaign once normalized is refused before anything is broadcast.
    /// If creation still fails after normalizing, the error is
    /// [`ContractError::Normalized`] carrying the vout-0 pledge to persist.
    pub fn forward_pledge(
        &self,
        ledger: &dyn Ledger,
        pledge_id: &str,
    ) -> Result<OrchestratorOutcome, ContractError> {
        let Loaded {
            pledge,
            campaign,
            contracts,
        } = self.load(pledge_id)?;
        if pledge.receipt.is_some() {
            return Err(ContractError::InvalidUtxo(format!(
                "pledge {} was already forwarded",
                pledge.id
            )));
        }
        let utxo = pledge
            .utxo
            .as_ref()
            .ok_or_else(|| ContractError::NotFound(format!("utxo of pledge {}", pledge.id)))?;
        let factory = self.factory(&campaign.info)?;
        let category = campaign.utxo.as_ref().map(CampaignUtxo::category).transpose()?;
        let contract = factory.pledge_contract(
            pledge.pledge_type,
            &campaign.info,
            &contracts,
            &pledge.refund_address,
            category,
        )?;
        let engine = ForwardingEngine::new(&contracts, &contract)?;
        tracing::debug!(
            pledge = %pledge.id,
            campaign = %campaign.id,
            pledge_type = ?pledge.pledge_type,
            campaign_exists = campaign.utxo.is_some(),
            "forwarding pledge"
        );

        match &campaign.utxo {
            Some(live) => Ok(OrchestratorOutcome::Forwarded {
                normalized: None,
                forward: engine.forward_to_campaign(ledger, live, utxo, &self.platform)?,
            }),
            None if utxo.vout == 0 => Ok(OrchestratorOutcome::Forwarded {
                normalized: None,
                forward: engine.forward_to_new_campaign(ledger, utxo)?,
            }),
            None => {
                // the normalized pledge must be able to create the campaign
                engine.plan(None, amounts::plan_genesis(utxo.satoshis)?)?;
                let normalized = engine.forward_to_genesis(ledger, utxo)?;
                match engine.forward_to_new_campaign(ledger, &normalized) {
                    Ok(forward) => Ok(OrchestratorOutcome::Forwarded {
                        normalized: Some(normalized),
                        forward,
                    }),
                    Err(source) => {
                        tracing::warn!(
                            pledge = %pledge.id,
                            normalized = %normalized.txid,
                            error = %source,
                            "pledge normalized but the campaign was not created"
                        );
                        Err(ContractError::Normalized {
                            pledge: normalized,
                            source: Box::new(source),
                        })
                    }
                }
            }
        }
    }

    /// Cancel or refund a pledge as of now.
    pub fn cancel_pledge(
        &self,
        ledger: &dyn Ledger,
        pledge_id: &str,
    ) -> Result<OrchestratorOutcome, ContractError> {
        self.cancel_pledge_at(ledger, pledge_id, Utc::now())
    }

    /// Cancel or refund a pledge as of `now`.
    ///
    /// A forwarded pledge is refunded through the Exit contract: with the
    /// platform's signature before the campaign expires, unilaterally
    /// after. An unforwarded pledge is cancelled through its own contract.
    /// Unforwarded donations cannot be cancelled.
    pub fn cancel_pledge_at(
        &self,
        ledger: &dyn Ledger,
        pledge_id: &str,
        now: DateTime<Utc>,
    ) -> Result<OrchestratorOutcome, ContractError> {
        let loaded = self.load(pledge_id)?;
        let Loaded {
            pledge,
            campaign,
            contracts,
        } = &loaded;

        if let Some(receipt) = &pledge.receipt {
            let live = self.live_campaign(campaign)?;
            let commitment = self.receipt_commitment(pledge, &campaign.info, receipt)?;
            let engine = ExitRefundEngine::new(contracts);
            let outcome = if now.timestamp() < i64::from(campaign.info.expires_at_unix) {
                engine.refund_before_expiration(ledger, live, receipt, &commitment, &self.platform)?
            } else {
                engine.refund_after_expiration(ledger, live, receipt, &commitment)?
            };
            return Ok(OrchestratorOutcome::Refunded(outcome));
        }

        let utxo = pledge
            .utxo
            .as_ref()
            .ok_or_else(|| ContractError::NotFound(format!("utxo of pledge {}", pledge.id)))?;
        let factory = self.factory(&campaign.info)?;
        let contract = match pledge.pledge_type {
            PledgeType::Donation => {
                tracing::warn!(pledge = %pledge.id, campaign = %campaign.id, "refusing to cancel an unforwarded donation");
                return Err(ContractError::CancelNotPermitted(format!(
                    "donation {} cannot be cancelled before it is forwarded",
                    pledge.id
                )));
            }
            PledgeType::Starting => {
                factory.start(&campaign.info, contracts, &pledge.refund_address)?
            }
            PledgeType::Started => {
                let live = self.live_campaign(campaign)?;
                factory.pledge(contracts, &pledge.refund_address, live.category()?)?
            }
        };
        let outcome = ForwardingEngine::new(contracts, &contract)?.cancel(ledger, utxo)?;
        Ok(OrchestratorOutcome::Cancelled(outcome))
    }

    /// Refund a forwarded pledge without the platform, after expiry.
    pub fn refund_after_expiration(
        &self,
        ledger: &dyn Ledger,
        pledge_id: &str,
    ) -> Result<OrchestratorOutcome, ContractError> {
        let Loaded {
            pledge,
            campaign,
            contracts,
        } = self.load(pledge_id)?;
        let receipt = pledge.receipt.as_ref().ok_or_else(|| {
            ContractError::CancelNotPermitted(format!("pledge {} has no receipt to refund", pledge.id))
        })?;
        let live = self.live_campaign(&campaign)?;
        let commitment = self.receipt_commitment(&pledge, &campaign.info, receipt)?;
        let outcome = ExitRefundEngine::new(&contracts)
            .refund_after_expiration(ledger, live, receipt, &commitment)?;
        Ok(OrchestratorOutcome::Refunded(outcome))
    }

    /// Pay a campaign out.
    pub fn complete(
        &self,
        ledger: &dyn Ledger,
        campaign_id: &str,
    ) -> Result<OrchestratorOutcome, ContractError> {
        let campaign = self.load_campaign(campaign_id)?;
        let live = self.live_campaign(&campaign)?;
        let contracts = self
            .factory(&campaign.info)?
            .campaign(&campaign.info, self.platform.key_hash())?;
        let outcome = CompletionEngine::new(&contracts).complete(ledger, live)?;
        Ok(OrchestratorOutcome::Completed(outcome))
    }

    fn receipt_commitment(
        &self,
        pledge: &PledgeRecord,
        info: &CampaignInfo,
        receipt: &ForwardedPledgeUtxo,
    ) -> Result<PledgeCommitment, ContractError> {
        let refund = self
            .factory(info)?
            .locking_bytecode(&pledge.refund_address, info.network)?;
        Ok(PledgeCommitment::new(
            pledge.pledge_type,
            info.generation()?,
            receipt.pledged_amount,
            refund.into_bytes(),
        ))
    }
}
