/// Script type - a sequence of opcodes and data pushes.
///
/// Scripts appear as locking bytecode on outputs, unlocking bytecode on
/// inputs, and as the redeem scripts of contracts. The Script wraps a
/// `Vec<u8>` and provides construction from ASM, minimal pushes,
/// P2PKH / P2SH classification and builders, and ASM output.

use std::fmt;

use fundme_primitives::hash::{hash160, sha256d};

use crate::chunk::{decode_script, minimal_push, ScriptChunk};
use crate::number::encode_number;
use crate::opcodes::*;
use crate::ScriptError;

/// A script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "aa20...87").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        let bytes = hex::decode(hex_str).map_err(|e| ScriptError::InvalidHex(e.to_string()))?;
        Ok(Script(bytes))
    }

    /// Create a script from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Create a script from an ASM string.
    ///
    /// Tokens are separated by whitespace. Known opcode names (e.g.
    /// `OP_CHECKSIG`, `OP_UTXOTOKENCATEGORY`) are emitted directly; any other
    /// token must be hex and is pushed minimally, so `01` becomes `OP_1`
    /// exactly as a contract compiler would emit it.
    ///
    /// # Arguments
    /// * `asm` - A whitespace-separated ASM string.
    ///
    /// # Returns
    /// A `Script`, or `InvalidAsmToken` for an unknown token.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        for token in asm.split_whitespace() {
            if let Some(opcode) = string_to_opcode(token) {
                script.0.push(opcode);
                continue;
            }
            let data = hex::decode(token.trim_start_matches("0x"))
                .map_err(|_| ScriptError::InvalidAsmToken(token.to_string()))?;
            script.append_push_data(&data)?;
        }
        Ok(script)
    }

    /// Build a P2PKH locking script for a 20-byte public key hash.
    ///
    /// Pattern: OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
    pub fn p2pkh(pub_key_hash: &[u8; 20]) -> Self {
        let mut b = Vec::with_capacity(25);
        b.extend_from_slice(&[OP_DUP, OP_HASH160, OP_DATA_20]);
        b.extend_from_slice(pub_key_hash);
        b.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        Script(b)
    }

    /// Build a P2SH20 locking script for a 20-byte script hash.
    ///
    /// Pattern: OP_HASH160 <20 bytes> OP_EQUAL
    pub fn p2sh20(script_hash: &[u8; 20]) -> Self {
        let mut b = Vec::with_capacity(23);
        b.extend_from_slice(&[OP_HASH160, OP_DATA_20]);
        b.extend_from_slice(script_hash);
        b.push(OP_EQUAL);
        Script(b)
    }

    /// Build a P2SH32 locking script for a 32-byte script hash.
    ///
    /// Pattern: OP_HASH256 <32 bytes> OP_EQUAL
    pub fn p2sh32(script_hash: &[u8; 32]) -> Self {
        let mut b = Vec::with_capacity(35);
        b.extend_from_slice(&[OP_HASH256, OP_DATA_32]);
        b.extend_from_slice(script_hash);
        b.push(OP_EQUAL);
        Script(b)
    }

    /// The P2SH20 locking script committing to `redeem` via Hash160.
    pub fn p2sh20_for(redeem: &Script) -> Self {
        Self::p2sh20(&hash160(&redeem.0))
    }

    /// The P2SH32 locking script committing to `redeem` via SHA-256d.
    pub fn p2sh32_for(redeem: &Script) -> Self {
        Self::p2sh32(&sha256d(&redeem.0))
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Encode the script as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Convert the script to its ASM representation.
    ///
    /// # Returns
    /// A space-separated ASM string. Returns an empty string for empty or
    /// truncated scripts.
    pub fn to_asm(&self) -> String {
        match self.chunks() {
            Ok(chunks) => chunks
                .iter()
                .map(ScriptChunk::to_asm_string)
                .collect::<Vec<_>>()
                .join(" "),
            Err(_) => String::new(),
        }
    }

    /// Return a reference to the underlying bytes.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the script, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Return the length of the script in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the script is empty (zero bytes).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // -----------------------------------------------------------------------
    // Script classification
    // -----------------------------------------------------------------------

    /// Check if this is a Pay-to-Public-Key-Hash (P2PKH) output script.
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Check if this is a P2SH20 output script (`OP_HASH160 <20> OP_EQUAL`).
    pub fn is_p2sh20(&self) -> bool {
        let b = &self.0;
        b.len() == 23 && b[0] == OP_HASH160 && b[1] == OP_DATA_20 && b[22] == OP_EQUAL
    }

    /// Check if this is a P2SH32 output script (`OP_HASH256 <32> OP_EQUAL`).
    pub fn is_p2sh32(&self) -> bool {
        let b = &self.0;
        b.len() == 35 && b[0] == OP_HASH256 && b[1] == OP_DATA_32 && b[34] == OP_EQUAL
    }

    /// Check if this is either form of pay-to-script-hash.
    pub fn is_p2sh(&self) -> bool {
        self.is_p2sh20() || self.is_p2sh32()
    }

    // -----------------------------------------------------------------------
    // Data extraction
    // -----------------------------------------------------------------------

    /// The hash committed to by a P2PKH or P2SH script.
    ///
    /// # Returns
    /// The 20- or 32-byte hash, or `None` for any other script shape.
    pub fn hash_digest(&self) -> Option<&[u8]> {
        if self.is_p2pkh() {
            Some(&self.0[3..23])
        } else if self.is_p2sh20() {
            Some(&self.0[2..22])
        } else if self.is_p2sh32() {
            Some(&self.0[2..34])
        } else {
            None
        }
    }

    /// Whether `redeem` is the script this P2SH locking script commits to.
    ///
    /// # Arguments
    /// * `redeem` - Candidate redeem script bytes.
    ///
    /// # Returns
    /// `false` if this is not a P2SH script or the hash differs.
    pub fn p2sh_matches(&self, redeem: &[u8]) -> bool {
        if self.is_p2sh32() {
            self.0[2..34] == sha256d(redeem)
        } else if self.is_p2sh20() {
            self.0[2..22] == hash160(redeem)
        } else {
            false
        }
    }

    /// Parse the script into a vector of decoded chunks.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    /// The data of the final chunk, which must be a push.
    ///
    /// For a P2SH unlocking script this is the redeem script.
    pub fn last_push(&self) -> Result<Vec<u8>, ScriptError> {
        let chunks = self.chunks()?;
        chunks
            .last()
            .and_then(ScriptChunk::push_value)
            .ok_or_else(|| ScriptError::InvalidScript("script does not end with a push".into()))
    }

    // -----------------------------------------------------------------------
    // Mutation / building
    // -----------------------------------------------------------------------

    /// Append a minimal push of `data`.
    ///
    /// Empty data and single bytes `1..=16` / `0x81` use the dedicated
    /// opcodes; everything else gets the smallest PUSHDATA prefix.
    ///
    /// # Arguments
    /// * `data` - The data bytes to push.
    ///
    /// # Returns
    /// `Ok(())` on success, or an error if the data is too large.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        self.0.extend_from_slice(&minimal_push(data)?);
        Ok(())
    }

    /// Append an integer as a minimally-encoded script number push.
    pub fn append_number(&mut self, value: i64) -> Result<(), ScriptError> {
        self.append_push_data(&encode_number(value))
    }

    /// Append raw opcodes to the script.
    ///
    /// Rejects push data opcodes (OP_DATA_1..OP_PUSHDATA4); use
    /// `append_push_data` for those.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        if let Some(&op) = opcodes
            .iter()
            .find(|&&op| (OP_DATA_1..=OP_PUSHDATA4).contains(&op))
        {
            return Err(ScriptError::InvalidOpcodeType(opcode_to_string(op)));
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }

    /// Append the raw bytes of another script.
    pub fn append_script(&mut self, other: &Script) {
        self.0.extend_from_slice(&other.0);
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Script {
    /// Display the script as a lowercase hex string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
