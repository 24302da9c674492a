//! Transaction input referencing a previous output.
//!
//! Contains the source outpoint, unlocking script, sequence number and the
//! source output being spent (value, tokens, locking script), which signing
//! needs and which the wire format does not carry.

use fundme_primitives::chainhash::Hash;
use fundme_primitives::util::{ByteReader, ByteWriter};
use fundme_script::Script;

use crate::output::TransactionOutput;
use crate::TransactionError;

/// Sequence number of a final input.
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// Largest sequence number that still lets the transaction's lock time apply.
pub const LOCKTIME_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFE;

/// A reference to one output of a previous transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Outpoint {
    /// The source transaction id, internal byte order.
    pub txid: Hash,
    /// The output index within the source transaction.
    pub vout: u32,
}

impl Outpoint {
    /// Create an outpoint.
    pub fn new(txid: Hash, vout: u32) -> Self {
        Outpoint { txid, vout }
    }

    /// Create an outpoint from a display-order hex txid.
    pub fn from_hex(txid: &str, vout: u32) -> Result<Self, TransactionError> {
        Ok(Outpoint {
            txid: Hash::from_hex(txid)?,
            vout,
        })
    }

    fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_bytes(self.txid.as_bytes());
        writer.write_u32_le(self.vout);
    }
}

impl std::fmt::Display for Outpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// A single input in a transaction.
///
/// # Wire format
///
/// | Field              | Size             |
/// |--------------------|------------------|
/// | source txid        | 32 bytes         |
/// | source vout        | 4 bytes (LE)     |
/// | script length      | CompactSize      |
/// | unlocking_script   | variable         |
/// | sequence_number    | 4 bytes (LE)     |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    /// The output being spent.
    pub outpoint: Outpoint,

    /// Sequence number. Defaults to `0xFFFFFFFF` (final).
    pub sequence_number: u32,

    /// The unlocking script. `None` until the input is signed.
    pub unlocking_script: Option<Script>,

    /// The source output being spent, needed for signing.
    source_output: Option<TransactionOutput>,
}

impl TransactionInput {
    /// Create an unsigned input spending `outpoint`.
    pub fn new(outpoint: Outpoint) -> Self {
        TransactionInput {
            outpoint,
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
            unlocking_script: None,
            source_output: None,
        }
    }

    /// Create an unsigned input with its source output attached.
    ///
    /// # Arguments
    /// * `outpoint` - The output being spent.
    /// * `source` - That output's value, tokens and locking script.
    pub fn spending(outpoint: Outpoint, source: TransactionOutput) -> Self {
        TransactionInput {
            source_output: Some(source),
            ..Self::new(outpoint)
        }
    }

    /// Deserialize a `TransactionInput` from a `ByteReader`.
    ///
    /// The source output is not part of the wire format and is left unset.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let txid = reader.read_array::<32>().map_err(|e| {
            TransactionError::SerializationError(format!("reading source txid: {}", e))
        })?;

        let vout = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output index: {}", e))
        })?;

        let script_bytes = reader.read_var_bytes().map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;

        let sequence_number = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence number: {}", e))
        })?;

        Ok(TransactionInput {
            outpoint: Outpoint::new(Hash::new(txid), vout),
            sequence_number,
            unlocking_script: (!script_bytes.is_empty()).then(|| Script::from_bytes(script_bytes)),
            source_output: None,
        })
    }

    /// Serialize this input into a `ByteWriter`.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        self.outpoint.write_to(writer);
        let script = self.unlocking_script.as_ref().map(Script::to_bytes).unwrap_or(&[]);
        writer.write_var_bytes(script);
        writer.write_u32_le(self.sequence_number);
    }

    /// Serialize only the outpoint (txid + vout).
    pub fn outpoint_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(36);
        self.outpoint.write_to(&mut writer);
        writer.into_bytes()
    }

    /// Set or clear the source output.
    pub fn set_source_output(&mut self, output: Option<TransactionOutput>) {
        self.source_output = output;
    }

    /// The source output being spent, if known.
    pub fn source_output(&self) -> Option<&TransactionOutput> {
        self.source_output.as_ref()
    }

    /// The satoshi value of the source output, if known.
    pub fn source_satoshis(&self) -> Option<u64> {
        self.source_output.as_ref().map(|o| o.satoshis)
    }

    /// Whether this input leaves the transaction lock time in force.
    pub fn is_final(&self) -> bool {
        self.sequence_number == DEFAULT_SEQUENCE_NUMBER
    }
}
