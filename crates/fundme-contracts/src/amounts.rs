//! Commit, change and refund arithmetic.
//!
//! Every forward splits a pledge of `S` satoshis into the amount committed
//! to the campaign, optional change back to the pledger and the merge fee:
//!
//! ```text
//! commit + change + fee == S
//! ```
//!
//! In the capped generation the commit is bounded so the campaign never
//! holds more than `goal + MERGE_FEE`, the amount the payout needs.

use crate::constants::{
    DUST_LIMIT, GENESIS_FEE, MERGE_FEE, MIN_CAMPAIGN_SATOSHIS, REFUND_FEE,
};
use crate::error::ContractError;
use crate::types::ContractGeneration;

/// How a pledge is split by a forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitPlan {
    /// The pledge value.
    pub pledge: u64,
    /// Amount added to the campaign.
    pub commit: u64,
    /// Change returned to the pledger; `None` rather than zero.
    pub change: Option<u64>,
    /// Fee charged.
    pub fee: u64,
}

impl CommitPlan {
    /// Check `commit + change + fee == pledge`.
    pub fn verify(&self) -> Result<(), ContractError> {
        let change = self.change.unwrap_or(0);
        let total = u128::from(self.commit) + u128::from(change) + u128::from(self.fee);
        if total != u128::from(self.pledge) || self.change == Some(0) {
            return Err(ContractError::ChangeMiscalculation {
                commit: self.commit,
                change,
                fee: self.fee,
                pledge: self.pledge,
            });
        }
        Ok(())
    }
}

/// The most a campaign holding `campaign_satoshis` can still take.
///
/// # Returns
/// The pledgable amount, or `AlreadyCompletable` once the campaign holds
/// `goal + MERGE_FEE` or more.
pub fn max_pledgable(goal_satoshis: u64, campaign_satoshis: u64) -> Result<u64, ContractError> {
    match goal_satoshis
        .saturating_add(MERGE_FEE)
        .checked_sub(campaign_satoshis)
    {
        Some(max) if max > 0 => Ok(max),
        _ => Err(ContractError::AlreadyCompletable {
            campaign_satoshis,
            goal_satoshis,
        }),
    }
}

/// Split a pledge for a forward.
///
/// # Arguments
/// * `generation` - Capped generations bound the commit and return change.
/// * `goal_satoshis` - The campaign goal.
/// * `campaign_satoshis` - Value of the live campaign UTXO, `None` when the
///   forward creates the campaign.
/// * `pledge_satoshis` - Value of the pledge UTXO.
///
/// # Returns
/// A verified [`CommitPlan`]. A new campaign must start at no less than the
/// dust limit; a merge must add something. Change the contract would return
/// below the dust limit is `DustChange`.
pub fn plan_commit(
    generation: ContractGeneration,
    goal_satoshis: u64,
    campaign_satoshis: Option<u64>,
    pledge_satoshis: u64,
) -> Result<CommitPlan, ContractError> {
    let max = match generation {
        ContractGeneration::Capped => Some(max_pledgable(
            goal_satoshis,
            campaign_satoshis.unwrap_or(0),
        )?),
        ContractGeneration::Uncapped => None,
    };

    let available = pledge_satoshis
        .checked_sub(MERGE_FEE)
        .ok_or(ContractError::InsufficientFunds {
            needed: MERGE_FEE,
            available: pledge_satoshis,
        })?;
    let commit = max.map_or(available, |max| available.min(max));

    let minimum = if campaign_satoshis.is_some() { 1 } else { DUST_LIMIT };
    if commit < minimum {
        return Err(ContractError::InsufficientFunds {
            needed: MERGE_FEE + minimum - 1,
            available: pledge_satoshis,
        });
    }

    let change = available - commit;
    let plan = CommitPlan {
        pledge: pledge_satoshis,
        commit,
        change: (change > 0).then_some(change),
        fee: MERGE_FEE,
    };
    plan.verify()?;
    if let Some(change) = plan.change.filter(|&change| change < DUST_LIMIT) {
        return Err(ContractError::DustChange {
            change,
            pledge: pledge_satoshis,
        });
    }
    tracing::debug!(
        ?generation,
        pledge = plan.pledge,
        commit = plan.commit,
        change = plan.change.unwrap_or(0),
        campaign = campaign_satoshis.unwrap_or(0),
        "planned pledge commit"
    );
    Ok(plan)
}

/// Value of the normalized vout-0 pledge produced by a genesis forward.
pub fn plan_genesis(pledge_satoshis: u64) -> Result<u64, ContractError> {
    match pledge_satoshis.checked_sub(GENESIS_FEE) {
        Some(value) if value >= DUST_LIMIT => Ok(value),
        _ => Err(ContractError::InsufficientFunds {
            needed: GENESIS_FEE + DUST_LIMIT - 1,
            available: pledge_satoshis,
        }),
    }
}

/// How a refund splits the campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundPlan {
    /// Value the campaign UTXO keeps.
    pub next_campaign: u64,
    /// Value returned to the pledger.
    pub returned: u64,
}

/// Split a refund of `pledged_amount` out of a campaign holding
/// `campaign_satoshis`. Both outputs are floored: the campaign at
/// [`MIN_CAMPAIGN_SATOSHIS`], the refund at [`DUST_LIMIT`].
pub fn plan_refund(campaign_satoshis: u64, pledged_amount: u64) -> RefundPlan {
    let plan = RefundPlan {
        next_campaign: campaign_satoshis
            .saturating_sub(pledged_amount)
            .max(MIN_CAMPAIGN_SATOSHIS),
        returned: pledged_amount.saturating_sub(REFUND_FEE).max(DUST_LIMIT),
    };
    tracing::debug!(
        campaign = campaign_satoshis,
        pledged = pledged_amount,
        next_campaign = plan.next_campaign,
        returned = plan.returned,
        "planned refund"
    );
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_campaign_under_cap() {
        let plan = plan_commit(ContractGeneration::Capped, 1000, None, 5000).expect("plan");
        assert_eq!(plan.commit, 3000);
        assert_eq!(plan.change, None);
        assert_eq!(plan.fee, MERGE_FEE);
    }

    #[test]
    fn test_new_campaign_over_cap_returns_change() {
        let plan = plan_commit(ContractGeneration::Capped, 1000, None, 6000).expect("plan");
        assert_eq!(plan.commit, 3000);
        assert_eq!(plan.change, Some(1000));
    }

    #[test]
    fn test_exact_fit_has_no_change() {
        // 3000 pledgable into a 1000 goal campaign holding 0
        let plan = plan_commit(ContractGeneration::Capped, 1000, None, 5000).expect("plan");
        assert!(plan.change.is_none());
        let plan = plan_commit(ContractGeneration::Capped, 10_000, Some(7000), 7000).expect("plan");
        assert_eq!(plan.commit, 5000);
        assert_eq!(plan.change, None);
    }

    #[test]
    fn test_sequential_merges() {
        let goal = 10_000;
        let first = plan_commit(ContractGeneration::Capped, goal, None, 5000).expect("first");
        assert_eq!(first.commit, 3000);
        let second = plan_commit(ContractGeneration::Capped, goal, Some(3000), 6000).expect("second");
        assert_eq!(second.commit, 4000);
        let third = plan_commit(ContractGeneration::Capped, goal, Some(7000), 8000).expect("third");
        assert_eq!(third.commit, 5000);
        assert_eq!(third.change, Some(1000));
        assert!(matches!(
            plan_commit(ContractGeneration::Capped, goal, Some(12_000), 5000),
            Err(ContractError::AlreadyCompletable { campaign_satoshis: 12_000, goal_satoshis: 10_000 })
        ));
    }

    #[test]
    fn test_uncapped_ignores_goal() {
        let plan = plan_commit(ContractGeneration::Uncapped, 1000, Some(50_000), 6000).expect("plan");
        assert_eq!(plan.commit, 4000);
        assert_eq!(plan.change, None);
    }

    #[test]
    fn test_insufficient_funds() {
        assert!(matches!(
            plan_commit(ContractGeneration::Uncapped, 1000, None, 1999),
            Err(ContractError::InsufficientFunds { .. })
        ));
        // 2500 leaves 500, below the dust floor for a new campaign
        assert!(plan_commit(ContractGeneration::Capped, 1000, None, 2500).is_err());
        // but a merge may add it
        let plan = plan_commit(ContractGeneration::Capped, 1000, Some(1000), 2500).expect("merge");
        assert_eq!(plan.commit, 500);
        assert!(plan_commit(ContractGeneration::Capped, 1000, Some(1000), 2000).is_err());
    }

    #[test]
    fn test_dust_change_is_refused() {
        // 12_000 pledgable; 14_100 leaves 100 over
        assert!(matches!(
            plan_commit(ContractGeneration::Capped, 10_000, None, 14_100),
            Err(ContractError::DustChange { change: 100, pledge: 14_100 })
        ));
        assert!(matches!(
            plan_commit(ContractGeneration::Capped, 10_000, Some(11_500), 2545),
            Err(ContractError::DustChange { change: 45, .. })
        ));
        let plan = plan_commit(ContractGeneration::Capped, 10_000, Some(11_500), 3046).expect("plan");
        assert_eq!((plan.commit, plan.change), (500, Some(DUST_LIMIT)));
    }

    #[test]
    fn test_verify_catches_bad_plans() {
        let plan = CommitPlan { pledge: 5000, commit: 3000, change: Some(1), fee: 2000 };
        assert!(matches!(plan.verify(), Err(ContractError::ChangeMiscalculation { .. })));
        let zero_change = CommitPlan { pledge: 5000, commit: 3000, change: Some(0), fee: 2000 };
        assert!(zero_change.verify().is_err());
    }

    #[test]
    fn test_genesis_plan() {
        assert_eq!(plan_genesis(5000).expect("genesis"), 4000);
        assert_eq!(plan_genesis(1546).expect("genesis"), 546);
        assert!(plan_genesis(1545).is_err());
    }

    #[test]
    fn test_refund_floors() {
        assert_eq!(plan_refund(7000, 3000), RefundPlan { next_campaign: 4000, returned: 1000 });
        assert_eq!(plan_refund(3000, 3000), RefundPlan { next_campaign: 1000, returned: 1000 });
        assert_eq!(plan_refund(5000, 2200), RefundPlan { next_campaign: 2800, returned: 546 });
    }
}
