//! Pledge forwarding.
//!
//! Moves a pledge waiting at its Start, Donation or Pledge contract into
//! the campaign: normalizing split pledges to vout 0, creating the campaign
//! from a first pledge, merging later pledges into the live campaign UTXO,
//! or cancelling the pledge back to its refund address.

use fundme_ledger::Ledger;
use fundme_primitives::chainhash::Hash;
use fundme_transaction::token::TokenData;
use fundme_transaction::{Transaction, TransactionInput, TransactionOutput};

use crate::amounts::{self, CommitPlan};
use crate::commitment::PledgeCommitment;
use crate::constants::{CANCEL_FEE, DUST_LIMIT, RECEIPT_SATOSHIS};
use crate::error::ContractError;
use crate::factory::{CampaignContracts, PledgeContract};
use crate::platform::PlatformKey;
use crate::submit::sign_and_broadcast;
use crate::types::{
    CampaignUtxo, CancelOutcome, ChangeUtxo, ContractGeneration, ForwardOutcome,
    ForwardedPledgeUtxo, PledgeUtxo,
};

/// Forwards pledges held at one pledge contract into one campaign.
#[derive(Debug, Clone, Copy)]
pub struct ForwardingEngine<'a> {
    campaign: &'a CampaignContracts,
    contract: &'a PledgeContract,
}

impl<'a> ForwardingEngine<'a> {
    /// Pair a pledge contract with the campaign it forwards into.
    ///
    /// # Returns
    /// The engine, or a `Config` error if the pledge contract was built for
    /// different campaign contracts or another generation.
    pub fn new(
        campaign: &'a CampaignContracts,
        contract: &'a PledgeContract,
    ) -> Result<Self, ContractError> {
        let main = campaign.main.instance.locking_bytecode();
        let exit = campaign.exit.instance.locking_bytecode();
        let belongs = contract.generation() == campaign.main.instance.generation()
            && contract.exit_bytecode() == exit
            && contract
                .start_params()
                .map_or(true, |params| &params.main_bytecode == main);
        if !belongs {
            return Err(ContractError::Config(format!(
                "{} contract does not belong to this campaign",
                contract.kind()
            )));
        }
        Ok(ForwardingEngine { campaign, contract })
    }

    fn generation(&self) -> ContractGeneration {
        self.contract.generation()
    }

    fn pledge_input(&self, pledge: &PledgeUtxo) -> Result<TransactionInput, ContractError> {
        Ok(TransactionInput::spending(
            pledge.outpoint()?,
            TransactionOutput::new(
                pledge.satoshis,
                self.contract.instance().locking_bytecode().clone(),
            ),
        ))
    }

    /// Plan the split of a pledge into a campaign holding
    /// `campaign_satoshis` (`None` for a new campaign).
    pub fn plan(
        &self,
        campaign_satoshis: Option<u64>,
        pledge_satoshis: u64,
    ) -> Result<CommitPlan, ContractError> {
        amounts::plan_commit(
            self.generation(),
            self.campaign.main.params.goal_satoshis,
            campaign_satoshis,
            pledge_satoshis,
        )
    }

    /// Append the campaign, receipt and change outputs of a forward.
    fn push_forward_outputs(
        &self,
        tx: &mut Transaction,
        category: Hash,
        campaign_satoshis: u64,
        plan: &CommitPlan,
    ) -> Result<(), ContractError> {
        let commitment = PledgeCommitment::new(
            self.contract.pledge_type(),
            self.generation(),
            plan.commit,
            self.contract.refund_bytecode().to_bytes().to_vec(),
        )
        .encode()?;

        tx.add_output(TransactionOutput::with_token(
            campaign_satoshis,
            self.campaign.main.instance.locking_bytecode().clone(),
            TokenData::minting(category),
        ));
        tx.add_output(TransactionOutput::with_token(
            RECEIPT_SATOSHIS,
            self.contract.exit_bytecode().clone(),
            TokenData::immutable_nft(category, commitment),
        ));
        if let Some(change) = plan.change {
            tx.add_output(TransactionOutput::new(
                change,
                self.contract.refund_bytecode().clone(),
            ));
        }
        Ok(())
    }

    fn forward_outcome(
        txid: String,
        category: Hash,
        campaign_satoshis: u64,
        plan: &CommitPlan,
    ) -> ForwardOutcome {
        ForwardOutcome {
            campaign: CampaignUtxo {
                txid: txid.clone(),
                vout: 0,
                satoshis: campaign_satoshis,
                category_id: category.to_string(),
            },
            receipt: ForwardedPledgeUtxo {
                txid: txid.clone(),
                vout: 1,
                satoshis: RECEIPT_SATOSHIS,
                pledged_amount: plan.commit,
            },
            change: plan.change.map(|satoshis| ChangeUtxo {
                txid: txid.clone(),
                vout: 2,
                satoshis,
            }),
            txid,
        }
    }

    // -----------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------

    /// Normalize a pledge paid to an output other than vout 0.
    ///
    /// Spends the pledge back to the same contract at vout 0 less the
    /// genesis fee, so it can later create the campaign category.
    ///
    /// # Returns
    /// The new vout-0 pledge, or `InvalidUtxo` if the pledge already sits
    /// at vout 0.
    pub fn forward_to_genesis(
        &self,
        ledger: &dyn Ledger,
        pledge: &PledgeUtxo,
    ) -> Result<PledgeUtxo, ContractError> {
        self.require_start("forwardToGenesis")?;
        if pledge.vout == 0 {
            return Err(ContractError::InvalidUtxo(format!(
                "pledge {}:0 is already at vout 0",
                pledge.txid
            )));
        }
        let satoshis = amounts::plan_genesis(pledge.satoshis)?;

        let mut tx = Transaction::new();
        tx.add_input(self.pledge_input(pledge)?);
        tx.add_output(TransactionOutput::new(
            satoshis,
            self.contract.instance().locking_bytecode().clone(),
        ));
        let unlocker = self.contract.instance().unlocker("forwardToGenesis", vec![])?;
        let txid = sign_and_broadcast(ledger, &mut tx, &[&unlocker], "forwardToGenesis")?;
        Ok(PledgeUtxo {
            txid,
            vout: 0,
            satoshis,
        })
    }

    /// Create the campaign from a vout-0 pledge.
    ///
    /// The pledge's txid becomes the campaign category; the Main output
    /// carries the minting token and the Exit output the pledge receipt.
    pub fn forward_to_new_campaign(
        &self,
        ledger: &dyn Ledger,
        pledge: &PledgeUtxo,
    ) -> Result<ForwardOutcome, ContractError> {
        self.require_start("forwardToNewCampaign")?;
        if pledge.vout != 0 {
            return Err(ContractError::InvalidUtxo(format!(
                "a new campaign needs a vout 0 pledge, got {}:{}",
                pledge.txid, pledge.vout
            )));
        }
        let plan = self.plan(None, pledge.satoshis)?;
        let category = pledge.outpoint()?.txid;

        let mut tx = Transaction::new();
        tx.add_input(self.pledge_input(pledge)?);
        self.push_forward_outputs(&mut tx, category, plan.commit, &plan)?;
        let unlocker = self.contract.instance().unlocker("forwardToNewCampaign", vec![])?;
        let txid = sign_and_broadcast(ledger, &mut tx, &[&unlocker], "forwardToNewCampaign")?;
        Ok(Self::forward_outcome(txid, category, plan.commit, &plan))
    }

    /// Merge a pledge into the live campaign UTXO.
    ///
    /// # Arguments
    /// * `ledger` - Where to broadcast.
    /// * `campaign` - The live campaign UTXO.
    /// * `pledge` - The pledge to merge.
    /// * `platform` - Co-signs the campaign input through `Main.pledge`.
    pub fn forward_to_campaign(
        &self,
        ledger: &dyn Ledger,
        campaign: &CampaignUtxo,
        pledge: &PledgeUtxo,
        platform: &PlatformKey,
    ) -> Result<ForwardOutcome, ContractError> {
        let category = campaign.category()?;
        if let PledgeContract::Pledge { params, .. } = self.contract {
            if params.category != category {
                return Err(ContractError::InvalidUtxo(format!(
                    "pledge contract is bound to category {}, campaign has {}",
                    params.category, campaign.category_id
                )));
            }
        }
        let plan = self.plan(Some(campaign.satoshis), pledge.satoshis)?;
        let next_campaign = campaign.satoshis + plan.commit;

        let mut tx = Transaction::new();
        tx.add_input(campaign_input(self.campaign, campaign)?);
        tx.add_input(self.pledge_input(pledge)?);
        self.push_forward_outputs(&mut tx, category, next_campaign, &plan)?;

        let main = self
            .campaign
            .main
            .instance
            .unlocker("pledge", platform.function_args())?;
        let forward = self.contract.instance().unlocker("forwardToCampaign", vec![])?;
        let txid = sign_and_broadcast(ledger, &mut tx, &[&main, &forward], "forwardToCampaign")?;
        Ok(Self::forward_outcome(txid, category, next_campaign, &plan))
    }

    /// Return a pledge that was never forwarded to its refund address, less
    /// the cancel fee.
    pub fn cancel(
        &self,
        ledger: &dyn Ledger,
        pledge: &PledgeUtxo,
    ) -> Result<CancelOutcome, ContractError> {
        let refunded = match pledge.satoshis.checked_sub(CANCEL_FEE) {
            Some(value) if value >= DUST_LIMIT => value,
            _ => {
                return Err(ContractError::InsufficientFunds {
                    needed: CANCEL_FEE + DUST_LIMIT - 1,
                    available: pledge.satoshis,
                })
            }
        };

        let mut tx = Transaction::new();
        tx.add_input(self.pledge_input(pledge)?);
        tx.add_output(TransactionOutput::new(
            refunded,
            self.contract.refund_bytecode().clone(),
        ));
        let unlocker = self.contract.instance().unlocker("cancel", vec![])?;
        let txid = sign_and_broadcast(ledger, &mut tx, &[&unlocker], "cancel")?;
        Ok(CancelOutcome {
            txid,
            refunded_satoshis: refunded,
        })
    }

    fn require_start(&self, operation: &str) -> Result<(), ContractError> {
        match self.contract {
            PledgeContract::Start { .. } | PledgeContract::Donation { .. } => Ok(()),
            PledgeContract::Pledge { .. } => Err(ContractError::MissingCampaign(format!(
                "the Pledge contract has no {}; it only forwards into an existing campaign",
                operation
            ))),
        }
    }
}

/// The input spending the live campaign UTXO, with its minting token.
pub(crate) fn campaign_input(
    contracts: &CampaignContracts,
    campaign: &CampaignUtxo,
) -> Result<TransactionInput, ContractError> {
    Ok(TransactionInput::spending(
        campaign.outpoint()?,
        TransactionOutput::with_token(
            campaign.satoshis,
            contracts.main.instance.locking_bytecode().clone(),
            TokenData::minting(campaign.category()?),
        ),
    ))
}
