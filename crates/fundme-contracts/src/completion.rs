//! Campaign payout.

use fundme_ledger::Ledger;
use fundme_transaction::{Transaction, TransactionOutput};

use crate::constants::{DUST_LIMIT, PAYOUT_FEE};
use crate::error::ContractError;
use crate::factory::CampaignContracts;
use crate::forwarding::campaign_input;
use crate::submit::sign_and_broadcast;
use crate::types::{CampaignUtxo, CompletionOutcome};

/// Pays a matured campaign out to its payout address.
#[derive(Debug, Clone, Copy)]
pub struct CompletionEngine<'a> {
    campaign: &'a CampaignContracts,
}

impl<'a> CompletionEngine<'a> {
    /// An engine for the given campaign contracts.
    pub fn new(campaign: &'a CampaignContracts) -> Self {
        CompletionEngine { campaign }
    }

    /// Spend the campaign UTXO through `Main.payout`.
    ///
    /// The whole value less the payout fee goes to the payout bytecode and
    /// the minting token is burned. The contract decides whether the goal
    /// was reached; a premature payout is refused by the ledger.
    pub fn complete(
        &self,
        ledger: &dyn Ledger,
        campaign: &CampaignUtxo,
    ) -> Result<CompletionOutcome, ContractError> {
        let payout = match campaign.satoshis.checked_sub(PAYOUT_FEE) {
            Some(value) if value >= DUST_LIMIT => value,
            _ => {
                return Err(ContractError::InsufficientFunds {
                    needed: PAYOUT_FEE + DUST_LIMIT - 1,
                    available: campaign.satoshis,
                })
            }
        };

        let mut tx = Transaction::new();
        tx.add_input(campaign_input(self.campaign, campaign)?);
        tx.add_output(TransactionOutput::new(
            payout,
            self.campaign.main.params.payout_bytecode.clone(),
        ));
        let unlocker = self.campaign.main.instance.unlocker("payout", vec![])?;
        let txid = sign_and_broadcast(ledger, &mut tx, &[&unlocker], "complete")?;
        Ok(CompletionOutcome {
            txid,
            payout_satoshis: payout,
        })
    }
}
