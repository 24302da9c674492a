use proptest::prelude::*;

use std::path::PathBuf;

use fundme_contracts::amounts::{max_pledgable, plan_commit, plan_refund};
use fundme_contracts::constants::{DUST_LIMIT, MERGE_FEE, MIN_CAMPAIGN_SATOSHIS, RECEIPT_SATOSHIS};
use fundme_contracts::{
    ArtifactSet, CampaignInfo, CommitmentLayout, ContractAddressType, ContractError,
    ContractFactory, ContractGeneration, ForwardingEngine, PledgeCommitment, PledgeType,
    PledgeUtxo,
};
use fundme_ledger::{ChainTracker, MemoryLedger};
use fundme_script::Network;
use fundme_transaction::TransactionOutput;

const PLATFORM_KEY_HASH: [u8; 20] = [0x44; 20];
const PAYOUT_ADDRESS: &str = "bchtest:qqg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyarjfagm9";
const REFUND_ADDRESS: &str = "bchtest:qq3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg8632f694";

fn factory(generation: ContractGeneration) -> ContractFactory {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/artifacts")
        .join(generation.dir_name());
    let set = ArtifactSet::load_dir(&dir, generation).expect("artifacts");
    ContractFactory::new(set, ContractAddressType::P2sh32)
}

fn generation() -> impl Strategy<Value = ContractGeneration> {
    prop_oneof![Just(ContractGeneration::Uncapped), Just(ContractGeneration::Capped)]
}

fn pledge_type() -> impl Strategy<Value = PledgeType> {
    prop_oneof![
        Just(PledgeType::Starting),
        Just(PledgeType::Started),
        Just(PledgeType::Donation)
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every accepted split conserves the pledge and respects the cap.
    #[test]
    fn commit_change_and_fee_sum_to_pledge(
        generation in generation(),
        goal in 1u64..10_000_000,
        campaign in prop::option::of(0u64..12_000_000),
        pledge in 0u64..20_000_000,
    ) {
        match plan_commit(generation, goal, campaign, pledge) {
            Ok(plan) => {
                prop_assert_eq!(plan.commit + plan.change.unwrap_or(0) + plan.fee, pledge);
                prop_assert_eq!(plan.fee, MERGE_FEE);
                prop_assert!(plan.change.map_or(true, |change| change >= DUST_LIMIT));
                if campaign.is_none() {
                    prop_assert!(plan.commit >= DUST_LIMIT);
                }
                match generation {
                    ContractGeneration::Capped => {
                        let held = campaign.unwrap_or(0) + plan.commit;
                        prop_assert!(held <= goal + MERGE_FEE);
                        if plan.change.is_some() {
                            prop_assert_eq!(held, goal + MERGE_FEE);
                        }
                    }
                    ContractGeneration::Uncapped => prop_assert_eq!(plan.change, None),
                }
            }
            Err(ContractError::AlreadyCompletable { .. }) => {
                prop_assert_eq!(generation, ContractGeneration::Capped);
                prop_assert!(max_pledgable(goal, campaign.unwrap_or(0)).is_err());
            }
            Err(ContractError::InsufficientFunds { .. }) => {
                let minimum = if campaign.is_some() { 1 } else { DUST_LIMIT };
                let available = pledge.saturating_sub(MERGE_FEE);
                let commit = match generation {
                    ContractGeneration::Capped => available.min(max_pledgable(goal, campaign.unwrap_or(0)).unwrap()),
                    ContractGeneration::Uncapped => available,
                };
                prop_assert!(pledge < MERGE_FEE || commit < minimum);
            }
            Err(ContractError::DustChange { change, pledge: refused }) => {
                prop_assert_eq!(generation, ContractGeneration::Capped);
                prop_assert_eq!(refused, pledge);
                prop_assert!(change > 0 && change < DUST_LIMIT);
                let max = max_pledgable(goal, campaign.unwrap_or(0)).unwrap();
                prop_assert_eq!(pledge - MERGE_FEE - max, change);
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    /// A refund never leaves the campaign below its floor or pays dust.
    #[test]
    fn refund_outputs_are_floored(campaign in 0u64..10_000_000, pledged in 0u64..10_000_000) {
        let plan = plan_refund(campaign, pledged);
        prop_assert!(plan.next_campaign >= MIN_CAMPAIGN_SATOSHIS);
        prop_assert!(plan.returned >= DUST_LIMIT);
        prop_assert!(plan.returned <= pledged.max(DUST_LIMIT));
    }

    /// Commitments decode to what was encoded, in the layout their pledge type selects.
    #[test]
    fn commitment_codec_roundtrip(
        pledge_type in pledge_type(),
        generation in generation(),
        amount in any::<u64>(),
        refund in prop::collection::vec(any::<u8>(), 1..=31),
    ) {
        let commitment = PledgeCommitment::new(pledge_type, generation, amount, refund.clone());
        let layout = CommitmentLayout::for_pledge(pledge_type, generation);
        prop_assert_eq!(commitment.layout(), layout);

        let bytes = commitment.encode().unwrap();
        let flag_len = usize::from(layout == CommitmentLayout::Flagged);
        prop_assert_eq!(bytes.len(), flag_len + 8 + refund.len());

        let decoded = PledgeCommitment::decode(&bytes, layout).unwrap();
        prop_assert_eq!(decoded.is_donation, commitment.is_donation);
        prop_assert_eq!(decoded.pledged_amount, amount);
        prop_assert_eq!(&decoded.refund_bytecode, &refund);
    }

    /// Anything past the 40 byte NFT commitment limit is refused.
    #[test]
    fn oversized_commitments_are_refused(extra in 0usize..64, amount in any::<u64>()) {
        let commitment = PledgeCommitment::new(
            PledgeType::Donation,
            ContractGeneration::Capped,
            amount,
            vec![0x51; 32 + extra],
        );
        prop_assert!(matches!(commitment.encode(), Err(ContractError::MalformedCommitment(_))));
    }

    /// Creating a campaign spends the whole pledge into campaign, receipt,
    /// optional change and fee, and mints the campaign's category.
    #[test]
    fn new_campaign_conserves_the_pledge(
        generation in generation(),
        goal in 546u64..50_000,
        pledge in 2_546u64..100_000,
    ) {
        let factory = factory(generation);
        let info = CampaignInfo {
            payout_address: PAYOUT_ADDRESS.into(),
            goal_satoshis: goal,
            expires_at_unix: 1_750_000_000,
            network: Network::Chipnet,
            version: generation.version(),
        };
        let contracts = factory.campaign(&info, PLATFORM_KEY_HASH).unwrap();
        let start = factory.start(&info, &contracts, REFUND_ADDRESS).unwrap();
        let engine = ForwardingEngine::new(&contracts, &start).unwrap();

        let ledger = MemoryLedger::new();
        let funding = ledger
            .fund(vec![TransactionOutput::new(pledge, start.instance().locking_bytecode().clone())])
            .unwrap();
        let utxo = PledgeUtxo { txid: funding.tx_id_hex(), vout: 0, satoshis: pledge };

        match plan_commit(generation, goal, None, pledge) {
            Ok(plan) => {
                let outcome = engine.forward_to_new_campaign(&ledger, &utxo).unwrap();
                prop_assert_eq!(outcome.campaign.satoshis, plan.commit);
                prop_assert_eq!(outcome.receipt.pledged_amount, plan.commit);
                prop_assert_eq!(outcome.receipt.satoshis, RECEIPT_SATOSHIS);
                prop_assert_eq!(outcome.change.as_ref().map(|c| c.satoshis), plan.change);
                prop_assert_eq!(&outcome.campaign.category_id, &utxo.txid);
                let paid = plan.commit + RECEIPT_SATOSHIS + plan.change.unwrap_or(0);
                prop_assert!(paid <= pledge);

                let campaign = ledger.source_output(&outcome.campaign.outpoint().unwrap()).unwrap().unwrap();
                prop_assert!(campaign.token.unwrap().is_minting());
            }
            Err(ContractError::DustChange { .. }) => {
                // refused before anything reaches the ledger
                let refused = engine.forward_to_new_campaign(&ledger, &utxo);
                let is_dust_change = matches!(refused, Err(ContractError::DustChange { .. }));
                prop_assert!(is_dust_change);
                prop_assert!(ledger.source_output(&utxo.outpoint().unwrap()).unwrap().is_some());
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }
}
