//! Refunds of forwarded pledges.
//!
//! A refund spends the live campaign UTXO together with the pledge receipt
//! held at the Exit contract. The campaign keeps its minting token at a
//! reduced value, the receipt NFT is burned and the pledger is paid at the
//! refund bytecode recorded in the receipt commitment.
//!
//! Before expiry both inputs need the platform's signature. After expiry
//! anyone may refund: the transaction is time-locked to the campaign expiry
//! and the ledger refuses it until the chain has passed that time.

use fundme_ledger::Ledger;
use fundme_script::Script;
use fundme_transaction::input::LOCKTIME_SEQUENCE_NUMBER;
use fundme_transaction::token::TokenData;
use fundme_transaction::{Transaction, TransactionInput, TransactionOutput};

use crate::amounts::{self, RefundPlan};
use crate::commitment::PledgeCommitment;
use crate::error::ContractError;
use crate::factory::CampaignContracts;
use crate::forwarding::campaign_input;
use crate::platform::PlatformKey;
use crate::submit::sign_and_broadcast;
use crate::types::{CampaignUtxo, ForwardedPledgeUtxo, RefundOutcome};

/// Refunds receipts of one campaign.
#[derive(Debug, Clone, Copy)]
pub struct ExitRefundEngine<'a> {
    campaign: &'a CampaignContracts,
}

enum Path<'k> {
    Platform(&'k PlatformKey),
    Expired,
}

impl<'a> ExitRefundEngine<'a> {
    /// An engine for the given campaign contracts.
    pub fn new(campaign: &'a CampaignContracts) -> Self {
        ExitRefundEngine { campaign }
    }

    /// Refund a receipt while the campaign is live, co-signed by the
    /// platform on both inputs.
    ///
    /// # Arguments
    /// * `ledger` - Where to broadcast.
    /// * `campaign` - The live campaign UTXO.
    /// * `receipt` - The receipt at the Exit contract.
    /// * `commitment` - The receipt's commitment, rebuilt from the pledge
    ///   record; it must match the NFT on chain for the spend to verify.
    /// * `platform` - The platform key.
    pub fn refund_before_expiration(
        &self,
        ledger: &dyn Ledger,
        campaign: &CampaignUtxo,
        receipt: &ForwardedPledgeUtxo,
        commitment: &PledgeCommitment,
        platform: &PlatformKey,
    ) -> Result<RefundOutcome, ContractError> {
        self.refund(ledger, campaign, receipt, commitment, Path::Platform(platform))
    }

    /// Refund a receipt after the campaign expired, without the platform.
    ///
    /// The transaction is locked to the campaign expiry; broadcasting it
    /// earlier fails with `BroadcastFailure`.
    pub fn refund_after_expiration(
        &self,
        ledger: &dyn Ledger,
        campaign: &CampaignUtxo,
        receipt: &ForwardedPledgeUtxo,
        commitment: &PledgeCommitment,
    ) -> Result<RefundOutcome, ContractError> {
        self.refund(ledger, campaign, receipt, commitment, Path::Expired)
    }

    /// The amounts a refund of `receipt` would produce.
    pub fn plan(&self, campaign: &CampaignUtxo, receipt: &ForwardedPledgeUtxo) -> RefundPlan {
        amounts::plan_refund(campaign.satoshis, receipt.pledged_amount)
    }

    fn refund(
        &self,
        ledger: &dyn Ledger,
        campaign: &CampaignUtxo,
        receipt: &ForwardedPledgeUtxo,
        commitment: &PledgeCommitment,
        path: Path<'_>,
    ) -> Result<RefundOutcome, ContractError> {
        if commitment.pledged_amount != receipt.pledged_amount {
            return Err(ContractError::MalformedCommitment(format!(
                "receipt {}:{} records {} pledged, commitment holds {}",
                receipt.txid, receipt.vout, receipt.pledged_amount, commitment.pledged_amount
            )));
        }
        let category = campaign.category()?;
        let plan = self.plan(campaign, receipt);

        let mut tx = Transaction::new();
        tx.add_input(campaign_input(self.campaign, campaign)?);
        tx.add_input(TransactionInput::spending(
            receipt.outpoint()?,
            TransactionOutput::with_token(
                receipt.satoshis,
                self.campaign.exit.instance.locking_bytecode().clone(),
                TokenData::immutable_nft(category, commitment.encode()?),
            ),
        ));
        tx.add_output(TransactionOutput::with_token(
            plan.next_campaign,
            self.campaign.main.instance.locking_bytecode().clone(),
            TokenData::minting(category),
        ));
        tx.add_output(TransactionOutput::new(
            plan.returned,
            Script::from_bytes(&commitment.refund_bytecode),
        ));

        let main = &self.campaign.main.instance;
        let exit = &self.campaign.exit.instance;
        let (operation, main, exit) = match path {
            Path::Platform(platform) => (
                "refundBeforeExpiration",
                main.unlocker("refund", platform.function_args())?,
                exit.unlocker("refund", platform.function_args())?,
            ),
            Path::Expired => {
                tx.lock_time = self.campaign.main.params.expires_at_unix;
                for input in &mut tx.inputs {
                    input.sequence_number = LOCKTIME_SEQUENCE_NUMBER;
                }
                (
                    "refundAfterExpiration",
                    main.unlocker("refundAfterExpiration", vec![])?,
                    exit.unlocker("refundAfterExpiration", vec![])?,
                )
            }
        };
        let txid = sign_and_broadcast(ledger, &mut tx, &[&main, &exit], operation)?;

        Ok(RefundOutcome {
            campaign: CampaignUtxo {
                txid: txid.clone(),
                vout: 0,
                satoshis: plan.next_campaign,
                category_id: campaign.category_id.clone(),
            },
            returned_satoshis: plan.returned,
            txid,
        })
    }
}
