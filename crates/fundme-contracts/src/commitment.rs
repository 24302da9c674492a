//! Pledge receipt commitments.
//!
//! The NFT on every pledge receipt carries a positional, fixed-layout
//! commitment:
//!
//! | Layout    | Bytes                                                    |
//! |-----------|----------------------------------------------------------|
//! | flagged   | `[is_donation: 1][pledged_amount: 8 LE][refund bytecode]` |
//! | unflagged | `[pledged_amount: 8 LE][refund bytecode]`                |
//!
//! The layout is not self-describing, so decoding takes it explicitly.

use fundme_transaction::token::MAX_COMMITMENT_LEN;

use crate::error::ContractError;
use crate::types::{ContractGeneration, PledgeType};

const AMOUNT_LEN: usize = 8;

/// Which commitment layout a receipt uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitmentLayout {
    /// Leading donation flag byte.
    Flagged,
    /// No flag byte.
    Unflagged,
}

impl CommitmentLayout {
    /// The layout receipts of `pledge_type` use in `generation`.
    ///
    /// Start receipts are flagged from the capped generation on, Donation
    /// receipts are always flagged and Pledge-contract receipts never are.
    pub fn for_pledge(pledge_type: PledgeType, generation: ContractGeneration) -> Self {
        match (pledge_type, generation) {
            (PledgeType::Donation, _) => CommitmentLayout::Flagged,
            (PledgeType::Starting, ContractGeneration::Capped) => CommitmentLayout::Flagged,
            (PledgeType::Starting, ContractGeneration::Uncapped) => CommitmentLayout::Unflagged,
            (PledgeType::Started, _) => CommitmentLayout::Unflagged,
        }
    }
}

/// The data a pledge receipt commits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PledgeCommitment {
    /// Donation flag; `None` for the unflagged layout.
    pub is_donation: Option<bool>,
    /// Amount the pledge committed to the campaign.
    pub pledged_amount: u64,
    /// Where a refund of this pledge is paid.
    pub refund_bytecode: Vec<u8>,
}

impl PledgeCommitment {
    /// A commitment for `pledge_type` in `generation`.
    pub fn new(
        pledge_type: PledgeType,
        generation: ContractGeneration,
        pledged_amount: u64,
        refund_bytecode: Vec<u8>,
    ) -> Self {
        let is_donation = match CommitmentLayout::for_pledge(pledge_type, generation) {
            CommitmentLayout::Flagged => Some(pledge_type == PledgeType::Donation),
            CommitmentLayout::Unflagged => None,
        };
        PledgeCommitment {
            is_donation,
            pledged_amount,
            refund_bytecode,
        }
    }

    /// The layout this commitment encodes with.
    pub fn layout(&self) -> CommitmentLayout {
        if self.is_donation.is_some() {
            CommitmentLayout::Flagged
        } else {
            CommitmentLayout::Unflagged
        }
    }

    /// Encode the commitment.
    ///
    /// # Returns
    /// The commitment bytes, or `MalformedCommitment` if the refund
    /// bytecode is empty or the result exceeds the NFT commitment limit.
    pub fn encode(&self) -> Result<Vec<u8>, ContractError> {
        if self.refund_bytecode.is_empty() {
            return Err(ContractError::MalformedCommitment(
                "refund bytecode is empty".into(),
            ));
        }
        let mut bytes = Vec::with_capacity(1 + AMOUNT_LEN + self.refund_bytecode.len());
        if let Some(flag) = self.is_donation {
            bytes.push(u8::from(flag));
        }
        bytes.extend_from_slice(&self.pledged_amount.to_le_bytes());
        bytes.extend_from_slice(&self.refund_bytecode);
        if bytes.len() > MAX_COMMITMENT_LEN {
            return Err(ContractError::MalformedCommitment(format!(
                "{} bytes exceeds the {} byte commitment limit",
                bytes.len(),
                MAX_COMMITMENT_LEN
            )));
        }
        Ok(bytes)
    }

    /// Decode a commitment of the given layout.
    pub fn decode(bytes: &[u8], layout: CommitmentLayout) -> Result<Self, ContractError> {
        let (is_donation, rest) = match layout {
            CommitmentLayout::Flagged => match bytes.split_first() {
                Some((0x00, rest)) => (Some(false), rest),
                Some((0x01, rest)) => (Some(true), rest),
                Some((flag, _)) => {
                    return Err(ContractError::MalformedCommitment(format!(
                        "donation flag {:#04x}",
                        flag
                    )))
                }
                None => return Err(ContractError::MalformedCommitment("empty commitment".into())),
            },
            CommitmentLayout::Unflagged => (None, bytes),
        };
        if rest.len() <= AMOUNT_LEN {
            return Err(ContractError::MalformedCommitment(format!(
                "{} bytes after the flag, need an amount and refund bytecode",
                rest.len()
            )));
        }
        let (amount, refund) = rest.split_at(AMOUNT_LEN);
        let mut amount_bytes = [0u8; AMOUNT_LEN];
        amount_bytes.copy_from_slice(amount);
        Ok(PledgeCommitment {
            is_donation,
            pledged_amount: u64::from_le_bytes(amount_bytes),
            refund_bytecode: refund.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFUND: &str = "76a914c0a3c167a28cabb9fbb495affa0761e6e74ac60d88ac";

    fn refund() -> Vec<u8> {
        hex::decode(REFUND).expect("hex")
    }

    #[test]
    fn test_flagged_layout_bytes() {
        let commitment = PledgeCommitment::new(PledgeType::Donation, ContractGeneration::Capped, 1000, refund());
        let bytes = commitment.encode().expect("encode");
        assert_eq!(hex::encode(&bytes), format!("01e803000000000000{}", REFUND));
        assert_eq!(bytes.len(), 34);
        assert_eq!(
            PledgeCommitment::decode(&bytes, CommitmentLayout::Flagged).expect("decode"),
            commitment
        );
    }

    #[test]
    fn test_unflagged_layout_bytes() {
        let commitment = PledgeCommitment::new(PledgeType::Started, ContractGeneration::Capped, 3000, refund());
        assert_eq!(commitment.is_donation, None);
        let bytes = commitment.encode().expect("encode");
        assert_eq!(hex::encode(&bytes), format!("b80b000000000000{}", REFUND));
        assert_eq!(
            PledgeCommitment::decode(&bytes, CommitmentLayout::Unflagged).expect("decode"),
            commitment
        );
    }

    #[test]
    fn test_layout_selection() {
        use ContractGeneration::*;
        use PledgeType::*;
        assert_eq!(CommitmentLayout::for_pledge(Starting, Capped), CommitmentLayout::Flagged);
        assert_eq!(CommitmentLayout::for_pledge(Starting, Uncapped), CommitmentLayout::Unflagged);
        assert_eq!(CommitmentLayout::for_pledge(Donation, Capped), CommitmentLayout::Flagged);
        assert_eq!(CommitmentLayout::for_pledge(Started, Capped), CommitmentLayout::Unflagged);

        let start = PledgeCommitment::new(Starting, Capped, 1, refund());
        assert_eq!(start.is_donation, Some(false));
    }

    #[test]
    fn test_malformed_commitments() {
        let layout = CommitmentLayout::Flagged;
        assert!(PledgeCommitment::decode(&[], layout).is_err());
        assert!(PledgeCommitment::decode(&[0x02; 20], layout).is_err());
        // flag plus amount but no refund bytecode
        assert!(PledgeCommitment::decode(&[0x00; 9], layout).is_err());
        assert!(PledgeCommitment::decode(&[0x00; 8], CommitmentLayout::Unflagged).is_err());

        let empty = PledgeCommitment { is_donation: None, pledged_amount: 5, refund_bytecode: vec![] };
        assert!(empty.encode().is_err());

        // a P2SH32 refund does not fit next to the flag and amount
        let too_long = PledgeCommitment { is_donation: Some(false), pledged_amount: 5, refund_bytecode: vec![0xaa; 35] };
        assert!(matches!(too_long.encode(), Err(ContractError::MalformedCommitment(_))));
    }
}
