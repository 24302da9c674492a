//! CashTokens token prefix.
//!
//! Token data travels inside an output's locking-bytecode field, ahead of the
//! locking script itself:
//!
//! | Field            | Size                                   |
//! |------------------|----------------------------------------|
//! | `0xef`           | 1 byte                                 |
//! | category         | 32 bytes (internal order)              |
//! | bitfield         | 1 byte                                 |
//! | commitment       | compact size + bytes, if flagged       |
//! | amount           | compact size, if flagged               |

use fundme_primitives::chainhash::Hash;
use fundme_primitives::util::{ByteReader, ByteWriter, CompactSize};

use crate::TransactionError;

/// First byte of a token prefix.
pub const PREFIX_TOKEN: u8 = 0xef;

/// Longest commitment an NFT may carry.
pub const MAX_COMMITMENT_LEN: usize = 40;

/// Largest fungible amount an output may carry.
pub const MAX_TOKEN_AMOUNT: u64 = i64::MAX as u64;

const HAS_COMMITMENT_LENGTH: u8 = 0x40;
const HAS_NFT: u8 = 0x20;
const HAS_AMOUNT: u8 = 0x10;
const RESERVED_BIT: u8 = 0x80;
const CAPABILITY_MASK: u8 = 0x0f;

/// The capability of a non-fungible token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NftCapability {
    /// The commitment can never change.
    Immutable,
    /// Spending may rewrite the commitment of one output NFT.
    Mutable,
    /// Spending may create any NFTs of the category.
    Minting,
}

impl NftCapability {
    fn bits(self) -> u8 {
        match self {
            NftCapability::Immutable => 0x00,
            NftCapability::Mutable => 0x01,
            NftCapability::Minting => 0x02,
        }
    }

    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x00 => Some(NftCapability::Immutable),
            0x01 => Some(NftCapability::Mutable),
            0x02 => Some(NftCapability::Minting),
            _ => None,
        }
    }
}

/// A non-fungible token: a capability plus its commitment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NonFungibleToken {
    pub capability: NftCapability,
    pub commitment: Vec<u8>,
}

/// Tokens held by one output.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TokenData {
    /// Token category id, in internal byte order.
    pub category: Hash,
    /// Fungible amount; zero when the output holds only an NFT.
    pub amount: u64,
    /// The NFT, if any.
    pub nft: Option<NonFungibleToken>,
}

impl TokenData {
    /// A minting NFT with an empty commitment and no fungible amount.
    pub fn minting(category: Hash) -> Self {
        TokenData {
            category,
            amount: 0,
            nft: Some(NonFungibleToken {
                capability: NftCapability::Minting,
                commitment: Vec::new(),
            }),
        }
    }

    /// An immutable NFT carrying `commitment`.
    pub fn immutable_nft(category: Hash, commitment: Vec<u8>) -> Self {
        TokenData {
            category,
            amount: 0,
            nft: Some(NonFungibleToken {
                capability: NftCapability::Immutable,
                commitment,
            }),
        }
    }

    /// Whether this output carries a minting NFT.
    pub fn is_minting(&self) -> bool {
        matches!(&self.nft, Some(nft) if nft.capability == NftCapability::Minting)
    }

    /// Check the encoding limits a prefix must satisfy.
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.amount > MAX_TOKEN_AMOUNT {
            return Err(TransactionError::InvalidTokenPrefix(format!(
                "amount {} exceeds maximum",
                self.amount
            )));
        }
        if self.nft.is_none() && self.amount == 0 {
            return Err(TransactionError::InvalidTokenPrefix(
                "token prefix carries neither an NFT nor an amount".to_string(),
            ));
        }
        if let Some(nft) = &self.nft {
            if nft.commitment.len() > MAX_COMMITMENT_LEN {
                return Err(TransactionError::InvalidTokenPrefix(format!(
                    "commitment of {} bytes exceeds {}",
                    nft.commitment.len(),
                    MAX_COMMITMENT_LEN
                )));
            }
        }
        Ok(())
    }

    /// Append the serialized prefix to `writer`.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        let mut bitfield = 0u8;
        if let Some(nft) = &self.nft {
            bitfield |= HAS_NFT | nft.capability.bits();
            if !nft.commitment.is_empty() {
                bitfield |= HAS_COMMITMENT_LENGTH;
            }
        }
        if self.amount > 0 {
            bitfield |= HAS_AMOUNT;
        }

        writer.write_u8(PREFIX_TOKEN);
        writer.write_bytes(self.category.as_bytes());
        writer.write_u8(bitfield);
        if let Some(nft) = &self.nft {
            if !nft.commitment.is_empty() {
                writer.write_var_bytes(&nft.commitment);
            }
        }
        if self.amount > 0 {
            writer.write_compact_size(CompactSize(self.amount));
        }
    }

    /// Serialize the prefix to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(34 + MAX_COMMITMENT_LEN + 10);
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    /// Parse a prefix, including its leading `0xef`.
    ///
    /// # Arguments
    /// * `reader` - Positioned at the prefix byte.
    ///
    /// # Returns
    /// The token data, or `InvalidTokenPrefix` for any encoding the
    /// consensus rules reject.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let bad = |msg: &str| TransactionError::InvalidTokenPrefix(msg.to_string());

        if reader.read_u8().map_err(|_| bad("missing prefix byte"))? != PREFIX_TOKEN {
            return Err(bad("missing token prefix"));
        }
        let category = Hash::new(reader.read_array::<32>().map_err(|_| bad("truncated category"))?);
        let bitfield = reader.read_u8().map_err(|_| bad("missing bitfield"))?;

        if bitfield & RESERVED_BIT != 0 {
            return Err(bad("reserved bit set"));
        }
        let has_nft = bitfield & HAS_NFT != 0;
        let has_commitment = bitfield & HAS_COMMITMENT_LENGTH != 0;
        let has_amount = bitfield & HAS_AMOUNT != 0;
        let capability =
            NftCapability::from_bits(bitfield & CAPABILITY_MASK).ok_or_else(|| bad("unknown capability"))?;

        if !has_nft && (has_commitment || capability != NftCapability::Immutable) {
            return Err(bad("capability or commitment without an NFT"));
        }
        if !has_nft && !has_amount {
            return Err(bad("prefix encodes no tokens"));
        }

        let commitment = if has_commitment {
            let len = reader.read_compact_size().map_err(|_| bad("truncated commitment length"))?;
            let len = len.value() as usize;
            if len == 0 {
                return Err(bad("empty commitment flagged as present"));
            }
            if len > MAX_COMMITMENT_LEN {
                return Err(bad("commitment too long"));
            }
            reader.read_bytes(len).map_err(|_| bad("truncated commitment"))?.to_vec()
        } else {
            Vec::new()
        };

        let amount = if has_amount {
            let amount = reader.read_compact_size().map_err(|_| bad("truncated amount"))?.value();
            if amount == 0 {
                return Err(bad("zero amount flagged as present"));
            }
            if amount > MAX_TOKEN_AMOUNT {
                return Err(bad("amount exceeds maximum"));
            }
            amount
        } else {
            0
        };

        Ok(TokenData {
            category,
            amount,
            nft: has_nft.then_some(NonFungibleToken {
                capability,
                commitment,
            }),
        })
    }
}
