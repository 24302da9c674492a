//! CashAddr addresses.
//!
//! An address is a network prefix plus a base32 payload carrying a version
//! byte (`type << 3 | size`) and a 20- or 32-byte hash, protected by a
//! 40-bit BCH checksum. Types 0/1 are P2PKH/P2SH; types 2/3 are their
//! token-aware forms, which wallets use to signal CashTokens support.

use std::fmt;
use std::str::FromStr;

use fundme_primitives::ec::PublicKey;

use crate::{Script, ScriptError};

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const GENERATORS: [u64; 5] = [
    0x98f2bc8e61,
    0x79b76d99e2,
    0xf33e5fb3c4,
    0xae2eabe2a8,
    0x1e4f43e470,
];
const CHECKSUM_LEN: usize = 8;

const TYPE_P2PKH: u8 = 0;
const TYPE_P2SH: u8 = 1;
const TYPE_TOKEN_P2PKH: u8 = 2;
const TYPE_TOKEN_P2SH: u8 = 3;

const SIZE_160: u8 = 0;
const SIZE_256: u8 = 3;

/// The network an address belongs to, selected by its prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// `bitcoincash:`
    Mainnet,
    /// `bchtest:`
    #[serde(alias = "testnet")]
    Chipnet,
    /// `bchreg:`
    Regtest,
}

impl Network {
    /// The CashAddr prefix for this network.
    pub fn prefix(&self) -> &'static str {
        match self {
            Network::Mainnet => "bitcoincash",
            Network::Chipnet => "bchtest",
            Network::Regtest => "bchreg",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        [Network::Mainnet, Network::Chipnet, Network::Regtest]
            .into_iter()
            .find(|n| n.prefix() == prefix)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Network::Mainnet => "mainnet",
            Network::Chipnet => "chipnet",
            Network::Regtest => "regtest",
        })
    }
}

/// The locking-script shape an address stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressType {
    /// Pay to public key hash (20 bytes).
    P2pkh,
    /// Pay to script hash via Hash160 (20 bytes).
    P2sh20,
    /// Pay to script hash via SHA-256d (32 bytes).
    P2sh32,
}

/// A decoded CashAddr address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    /// The network the prefix selects.
    pub network: Network,
    /// The script shape.
    pub kind: AddressType,
    /// Whether the address uses the token-aware version type.
    pub token_aware: bool,
    /// The 20- or 32-byte hash.
    pub hash: Vec<u8>,
}

impl Address {
    /// The P2PKH address of a public key.
    pub fn from_public_key(pub_key: &PublicKey, network: Network) -> Self {
        Address {
            network,
            kind: AddressType::P2pkh,
            token_aware: false,
            hash: pub_key.hash160().to_vec(),
        }
    }

    /// The address of a standard locking script.
    ///
    /// # Arguments
    /// * `bytecode` - A P2PKH, P2SH20 or P2SH32 locking script.
    /// * `network` - The network to address on.
    /// * `token_aware` - Whether to use the token-aware type.
    ///
    /// # Returns
    /// The address, or `NonStandardBytecode` for other scripts.
    pub fn from_locking_bytecode(
        bytecode: &Script,
        network: Network,
        token_aware: bool,
    ) -> Result<Self, ScriptError> {
        let kind = if bytecode.is_p2pkh() {
            AddressType::P2pkh
        } else if bytecode.is_p2sh20() {
            AddressType::P2sh20
        } else if bytecode.is_p2sh32() {
            AddressType::P2sh32
        } else {
            return Err(ScriptError::NonStandardBytecode(bytecode.to_hex()));
        };
        let hash = bytecode
            .hash_digest()
            .ok_or_else(|| ScriptError::NonStandardBytecode(bytecode.to_hex()))?
            .to_vec();
        Ok(Address {
            network,
            kind,
            token_aware,
            hash,
        })
    }

    /// The locking script this address pays to.
    pub fn to_locking_bytecode(&self) -> Result<Script, ScriptError> {
        let bad_len = || {
            ScriptError::InvalidAddress(format!(
                "{} byte hash for {:?}",
                self.hash.len(),
                self.kind
            ))
        };
        match self.kind {
            AddressType::P2pkh => {
                let hash: [u8; 20] = self.hash.as_slice().try_into().map_err(|_| bad_len())?;
                Ok(Script::p2pkh(&hash))
            }
            AddressType::P2sh20 => {
                let hash: [u8; 20] = self.hash.as_slice().try_into().map_err(|_| bad_len())?;
                Ok(Script::p2sh20(&hash))
            }
            AddressType::P2sh32 => {
                let hash: [u8; 32] = self.hash.as_slice().try_into().map_err(|_| bad_len())?;
                Ok(Script::p2sh32(&hash))
            }
        }
    }

    /// Parse a CashAddr string.
    ///
    /// The prefix may be omitted, in which case each known network prefix
    /// is tried against the checksum. Mixed-case strings are rejected.
    ///
    /// # Arguments
    /// * `addr` - The address string.
    ///
    /// # Returns
    /// The decoded address, or an error naming what failed.
    pub fn from_string(addr: &str) -> Result<Self, ScriptError> {
        let has_lower = addr.chars().any(|c| c.is_ascii_lowercase());
        if has_lower && addr.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(ScriptError::InvalidAddress(format!("mixed case in '{}'", addr)));
        }
        let lower = addr.to_ascii_lowercase();

        let (network, payload) = match lower.split_once(':') {
            Some((prefix, payload)) => {
                let network = Network::from_prefix(prefix)
                    .ok_or_else(|| ScriptError::UnknownPrefix(prefix.to_string()))?;
                (network, payload)
            }
            None => {
                let network = [Network::Mainnet, Network::Chipnet, Network::Regtest]
                    .into_iter()
                    .find(|n| verify_checksum(n.prefix(), &lower).unwrap_or(false))
                    .ok_or(ScriptError::ChecksumFailed)?;
                (network, lower.as_str())
            }
        };

        if !verify_checksum(network.prefix(), payload)? {
            return Err(ScriptError::ChecksumFailed);
        }

        let values = base32_decode(payload)?;
        if values.len() <= CHECKSUM_LEN {
            return Err(ScriptError::InvalidAddress(format!("'{}' is too short", addr)));
        }
        let data = convert_bits(&values[..values.len() - CHECKSUM_LEN], 5, 8, false)
            .ok_or_else(|| ScriptError::InvalidAddress(format!("bad padding in '{}'", addr)))?;
        let (&version, hash) = data
            .split_first()
            .ok_or_else(|| ScriptError::InvalidAddress(format!("empty payload in '{}'", addr)))?;

        if version & 0x80 != 0 {
            return Err(ScriptError::InvalidAddress(format!("reserved version bit in '{}'", addr)));
        }
        let expected_len = match version & 0x07 {
            SIZE_160 => 20,
            SIZE_256 => 32,
            other => {
                return Err(ScriptError::InvalidAddress(format!("unsupported hash size {}", other)))
            }
        };
        if hash.len() != expected_len {
            return Err(ScriptError::InvalidAddress(format!(
                "hash length {} does not match version byte {:#04x}",
                hash.len(),
                version
            )));
        }

        let (kind, token_aware) = match (version >> 3, expected_len) {
            (TYPE_P2PKH, 20) => (AddressType::P2pkh, false),
            (TYPE_TOKEN_P2PKH, 20) => (AddressType::P2pkh, true),
            (TYPE_P2SH, 20) => (AddressType::P2sh20, false),
            (TYPE_TOKEN_P2SH, 20) => (AddressType::P2sh20, true),
            (TYPE_P2SH, 32) => (AddressType::P2sh32, false),
            (TYPE_TOKEN_P2SH, 32) => (AddressType::P2sh32, true),
            (t, len) => {
                return Err(ScriptError::InvalidAddress(format!(
                    "unsupported type {} with {} byte hash",
                    t, len
                )))
            }
        };

        Ok(Address {
            network,
            kind,
            token_aware,
            hash: hash.to_vec(),
        })
    }

    fn version_byte(&self) -> u8 {
        let kind = match (self.kind, self.token_aware) {
            (AddressType::P2pkh, false) => TYPE_P2PKH,
            (AddressType::P2pkh, true) => TYPE_TOKEN_P2PKH,
            (_, false) => TYPE_P2SH,
            (_, true) => TYPE_TOKEN_P2SH,
        };
        let size = if self.hash.len() == 32 { SIZE_256 } else { SIZE_160 };
        kind << 3 | size
    }
}

impl fmt::Display for Address {
    /// Render the full prefixed CashAddr string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.network.prefix();
        let mut raw = Vec::with_capacity(1 + self.hash.len());
        raw.push(self.version_byte());
        raw.extend_from_slice(&self.hash);

        let mut values = convert_bits(&raw, 8, 5, true).unwrap_or_default();
        let checksum = polymod_with_prefix(prefix, &values, true);
        values.extend((0..CHECKSUM_LEN).map(|i| ((checksum >> (5 * (7 - i))) & 0x1f) as u8));

        let encoded: String = values.iter().map(|&v| CHARSET[v as usize] as char).collect();
        write!(f, "{}:{}", prefix, encoded)
    }
}

impl FromStr for Address {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_string(s)
    }
}

// ---------------------------------------------------------------------------
// AddressCodec
// ---------------------------------------------------------------------------

/// Converts between address strings and locking bytecode.
///
/// Contract constructors take addresses as bytecode; this is the seam the
/// contract factory uses to get there.
pub trait AddressCodec {
    /// The locking bytecode an address pays to.
    fn to_locking_bytecode(&self, address: &str) -> Result<Script, ScriptError>;

    /// The hash an address commits to (public key hash or script hash).
    fn to_hash_digest(&self, address: &str) -> Result<Vec<u8>, ScriptError>;

    /// The network an address belongs to.
    fn network(&self, address: &str) -> Result<Network, ScriptError>;

    /// The locking bytecode of an address that must belong to `network`.
    ///
    /// # Returns
    /// The bytecode, or `WrongNetwork` if the address is for another network.
    fn to_locking_bytecode_on(&self, address: &str, network: Network) -> Result<Script, ScriptError> {
        let found = self.network(address)?;
        if found != network {
            return Err(ScriptError::WrongNetwork {
                address: address.to_string(),
                expected: network,
                found,
            });
        }
        self.to_locking_bytecode(address)
    }

    /// The address string for a standard locking script.
    fn from_locking_bytecode(
        &self,
        bytecode: &Script,
        network: Network,
        token_aware: bool,
    ) -> Result<String, ScriptError>;
}

/// The CashAddr implementation of [`AddressCodec`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CashAddrCodec;

impl AddressCodec for CashAddrCodec {
    fn to_locking_bytecode(&self, address: &str) -> Result<Script, ScriptError> {
        Address::from_string(address)?.to_locking_bytecode()
    }

    fn to_hash_digest(&self, address: &str) -> Result<Vec<u8>, ScriptError> {
        Ok(Address::from_string(address)?.hash)
    }

    fn network(&self, address: &str) -> Result<Network, ScriptError> {
        Ok(Address::from_string(address)?.network)
    }

    fn from_locking_bytecode(
        &self,
        bytecode: &Script,
        network: Network,
        token_aware: bool,
    ) -> Result<String, ScriptError> {
        Ok(Address::from_locking_bytecode(bytecode, network, token_aware)?.to_string())
    }
}

// ---------------------------------------------------------------------------
// base32 and checksum
// ---------------------------------------------------------------------------

fn polymod(values: impl IntoIterator<Item = u8>) -> u64 {
    let mut c: u64 = 1;
    for d in values {
        let c0 = (c >> 35) as u8;
        c = ((c & 0x07_ffff_ffff) << 5) ^ u64::from(d);
        for (i, g) in GENERATORS.iter().enumerate() {
            if (c0 >> i) & 1 == 1 {
                c ^= g;
            }
        }
    }
    c ^ 1
}

/// Checksum over `prefix ‖ 0 ‖ values`, optionally followed by the
/// eight zero placeholders used when computing a fresh checksum.
fn polymod_with_prefix(prefix: &str, values: &[u8], with_template: bool) -> u64 {
    let template = if with_template { CHECKSUM_LEN } else { 0 };
    polymod(
        prefix
            .bytes()
            .map(|b| b & 0x1f)
            .chain(std::iter::once(0))
            .chain(values.iter().copied())
            .chain(std::iter::repeat(0).take(template)),
    )
}

fn verify_checksum(prefix: &str, payload: &str) -> Result<bool, ScriptError> {
    let values = base32_decode(payload)?;
    Ok(polymod_with_prefix(prefix, &values, false) == 0)
}

fn base32_decode(payload: &str) -> Result<Vec<u8>, ScriptError> {
    payload
        .bytes()
        .map(|b| {
            CHARSET
                .iter()
                .position(|&c| c == b)
                .map(|p| p as u8)
                .ok_or_else(|| ScriptError::InvalidAddress(format!("bad character '{}'", b as char)))
        })
        .collect()
}

/// Regroup bits from `from`-bit to `to`-bit words.
///
/// Without padding, leftover bits must be fewer than `from` and zero.
fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let max = (1u32 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);
    for &value in data {
        acc = (acc << from) | u32::from(value);
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & max) as u8);
        }
    }
    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & max) as u8);
        }
    } else if bits >= from || (acc << (to - bits)) & max != 0 {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(s: &str) -> Vec<u8> {
        hex::decode(s).expect("valid hex")
    }

    /// Published CashAddr and CashTokens address vectors.
    #[test]
    fn test_known_vectors() {
        let vectors = [
            (
                "bitcoincash:qr6m7j9njldwwzlg9v7v53unlr4jkmx6eylep8ekg2",
                Network::Mainnet,
                AddressType::P2pkh,
                false,
                "f5bf48b397dae70be82b3cca4793f8eb2b6cdac9",
            ),
            (
                "bchtest:pr6m7j9njldwwzlg9v7v53unlr4jkmx6eyvwc0uz5t",
                Network::Chipnet,
                AddressType::P2sh20,
                false,
                "f5bf48b397dae70be82b3cca4793f8eb2b6cdac9",
            ),
            (
                "bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a",
                Network::Mainnet,
                AddressType::P2pkh,
                false,
                "76a04053bda0a88bda5177b86a15c3b29f559873",
            ),
            (
                "bitcoincash:ppm2qsznhks23z7629mms6s4cwef74vcwvn0h829pq",
                Network::Mainnet,
                AddressType::P2sh20,
                false,
                "76a04053bda0a88bda5177b86a15c3b29f559873",
            ),
            (
                "bitcoincash:zpm2qsznhks23z7629mms6s4cwef74vcwvrqekrq9w",
                Network::Mainnet,
                AddressType::P2pkh,
                true,
                "76a04053bda0a88bda5177b86a15c3b29f559873",
            ),
        ];
        for (text, network, kind, token_aware, hash) in vectors {
            let addr = Address::from_string(text).expect(text);
            assert_eq!(addr.network, network, "{}", text);
            assert_eq!(addr.kind, kind, "{}", text);
            assert_eq!(addr.token_aware, token_aware, "{}", text);
            assert_eq!(addr.hash, h(hash), "{}", text);
            assert_eq!(addr.to_string(), text);
        }
    }

    #[test]
    fn test_p2sh32_round_trip() {
        let addr = Address {
            network: Network::Chipnet,
            kind: AddressType::P2sh32,
            token_aware: false,
            hash: (0u8..32).collect(),
        };
        let text = addr.to_string();
        assert_eq!(
            text,
            "bchtest:pvqqzqsrqszsvpcgpy9qkrqdpc83qygjzv2p29shrqv35xcur50p75dfqqc8x"
        );
        assert_eq!(Address::from_string(&text).expect("decodes"), addr);

        let script = addr.to_locking_bytecode().expect("bytecode");
        assert!(script.is_p2sh32());
        let back = Address::from_locking_bytecode(&script, Network::Chipnet, false).expect("standard");
        assert_eq!(back, addr);
    }

    #[test]
    fn test_prefixless_and_uppercase() {
        let addr = Address::from_string("qr6m7j9njldwwzlg9v7v53unlr4jkmx6eylep8ekg2").expect("no prefix");
        assert_eq!(addr.network, Network::Mainnet);

        let upper = "BITCOINCASH:QR6M7J9NJLDWWZLG9V7V53UNLR4JKMX6EYLEP8EKG2";
        assert_eq!(Address::from_string(upper).expect("upper"), addr);
    }

    #[test]
    fn test_rejections() {
        // mixed case
        assert!(Address::from_string("bitcoincash:qr6m7j9njldwwzlg9v7v53unlr4jkmx6eylep8ekG2").is_err());
        // one character changed
        assert!(matches!(
            Address::from_string("bitcoincash:qr6m7j9njldwwzlg9v7v53unlr4jkmx6eylep8ekg3"),
            Err(ScriptError::ChecksumFailed)
        ));
        // valid payload under the wrong prefix
        assert!(Address::from_string("bchtest:qr6m7j9njldwwzlg9v7v53unlr4jkmx6eylep8ekg2").is_err());
        assert!(matches!(
            Address::from_string("bitcoin:qr6m7j9njldwwzlg9v7v53unlr4jkmx6eylep8ekg2"),
            Err(ScriptError::UnknownPrefix(_))
        ));
        // 'b' is not in the charset
        assert!(Address::from_string("bitcoincash:qr6m7j9njldwwzlg9v7v53unlr4jkmx6eylep8ekgb").is_err());
        assert!(Address::from_string("bitcoincash:").is_err());
    }

    #[test]
    fn test_codec_seam() {
        let codec = CashAddrCodec;
        let text = "bitcoincash:qr6m7j9njldwwzlg9v7v53unlr4jkmx6eylep8ekg2";
        let script = codec.to_locking_bytecode(text).expect("bytecode");
        assert_eq!(script.to_hex(), "76a914f5bf48b397dae70be82b3cca4793f8eb2b6cdac988ac");
        assert_eq!(codec.to_hash_digest(text).expect("hash"), h("f5bf48b397dae70be82b3cca4793f8eb2b6cdac9"));
        assert_eq!(
            codec.from_locking_bytecode(&script, Network::Mainnet, false).expect("address"),
            text
        );
        assert!(codec
            .from_locking_bytecode(&Script::from_hex("51").expect("hex"), Network::Mainnet, false)
            .is_err());
    }

    #[test]
    fn test_codec_checks_network() {
        let codec = CashAddrCodec;
        let mainnet = "bitcoincash:qr6m7j9njldwwzlg9v7v53unlr4jkmx6eylep8ekg2";
        let chipnet = "bchtest:pr6m7j9njldwwzlg9v7v53unlr4jkmx6eyvwc0uz5t";
        assert_eq!(codec.network(chipnet).expect("network"), Network::Chipnet);
        assert_eq!(
            codec.to_locking_bytecode_on(mainnet, Network::Mainnet).expect("bytecode"),
            codec.to_locking_bytecode(mainnet).expect("bytecode")
        );
        match codec.to_locking_bytecode_on(chipnet, Network::Mainnet) {
            Err(ScriptError::WrongNetwork { expected, found, .. }) => {
                assert_eq!((expected, found), (Network::Mainnet, Network::Chipnet));
            }
            other => panic!("expected a network mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_from_public_key() {
        let mut one = [0u8; 32];
        one[31] = 1;
        let key = fundme_primitives::ec::PrivateKey::from_bytes(&one).expect("scalar one");
        let addr = Address::from_public_key(&key.pub_key(), Network::Mainnet);
        assert_eq!(addr.hash, h("751e76e8199196d454941c45d1b3a323f1433bd6"));
        assert_eq!(addr.to_locking_bytecode().expect("p2pkh").hash_digest(), Some(&addr.hash[..]));
    }

    #[test]
    fn test_network_serde() {
        assert_eq!(serde_json::to_string(&Network::Chipnet).expect("json"), "\"chipnet\"");
        let n: Network = serde_json::from_str("\"testnet\"").expect("alias");
        assert_eq!(n, Network::Chipnet);
        let n: Network = serde_json::from_str("\"regtest\"").expect("json");
        assert_eq!(n.prefix(), "bchreg");
    }
}
