//! Core transaction type.
//!
//! Represents a complete transaction with version, inputs, outputs, and
//! lock time. Supports binary and hex serialization, transaction id
//! computation, and signature hashes for inputs whose source output is
//! attached.

use fundme_primitives::chainhash::Hash;
use fundme_primitives::hash::sha256d;
use fundme_primitives::util::{ByteReader, ByteWriter, CompactSize};

use crate::input::{Outpoint, TransactionInput};
use crate::output::TransactionOutput;
use crate::sighash;
use crate::TransactionError;

/// Version of every transaction the engine builds.
pub const TX_VERSION: u32 = 2;

/// A transaction: version, inputs, outputs and lock time.
///
/// # Wire format
///
/// | Field        | Size                      |
/// |--------------|---------------------------|
/// | version      | 4 bytes (LE)              |
/// | input count  | CompactSize               |
/// | inputs       | variable (per input)      |
/// | output count | CompactSize               |
/// | outputs      | variable (per output)     |
/// | lock_time    | 4 bytes (LE)              |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u32,

    /// Ordered list of transaction inputs.
    pub inputs: Vec<TransactionInput>,

    /// Ordered list of transaction outputs.
    pub outputs: Vec<TransactionOutput>,

    /// Lock time, a block height below 500,000,000 and a Unix time above.
    pub lock_time: u32,
}

impl Transaction {
    /// Create a new empty version 2 transaction with lock time 0.
    pub fn new() -> Self {
        Transaction {
            version: TX_VERSION,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a transaction from a hex-encoded string.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| TransactionError::SerializationError(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Parse a transaction from raw bytes.
    ///
    /// The slice must hold exactly one transaction with no trailing data.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a `ByteReader`.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let ser = |what: &'static str| {
            move |e: fundme_primitives::PrimitivesError| {
                TransactionError::SerializationError(format!("reading {}: {}", what, e))
            }
        };

        let version = reader.read_u32_le().map_err(ser("version"))?;

        let input_count = reader.read_compact_size().map_err(ser("input count"))?.value();
        let mut inputs = Vec::with_capacity(input_count.min(1024) as usize);
        for _ in 0..input_count {
            inputs.push(TransactionInput::read_from(reader)?);
        }

        let output_count = reader.read_compact_size().map_err(ser("output count"))?.value();
        let mut outputs = Vec::with_capacity(output_count.min(1024) as usize);
        for _ in 0..output_count {
            outputs.push(TransactionOutput::read_from(reader)?);
        }

        let lock_time = reader.read_u32_le().map_err(ser("lock time"))?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize this transaction to raw bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(512);
        writer.write_u32_le(self.version);

        writer.write_compact_size(CompactSize::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut writer);
        }

        writer.write_compact_size(CompactSize::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer);
        }

        writer.write_u32_le(self.lock_time);
        writer.into_bytes()
    }

    /// Serialize this transaction to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Size of the serialized transaction in bytes.
    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }

    // -----------------------------------------------------------------
    // Transaction ID
    // -----------------------------------------------------------------

    /// Compute the transaction id (double SHA-256 of the serialization).
    ///
    /// The hash is in internal byte order; its `Display` form is the
    /// conventional reversed hex.
    pub fn tx_id(&self) -> Hash {
        Hash::new(sha256d(&self.to_bytes()))
    }

    /// The transaction id as display-order hex.
    pub fn tx_id_hex(&self) -> String {
        self.tx_id().to_string()
    }

    /// The outpoint of output `vout` of this transaction.
    pub fn outpoint(&self, vout: u32) -> Outpoint {
        Outpoint::new(self.tx_id(), vout)
    }

    // -----------------------------------------------------------------
    // Inputs and outputs
    // -----------------------------------------------------------------

    /// Append an input.
    pub fn add_input(&mut self, input: TransactionInput) {
        self.inputs.push(input);
    }

    /// Append an output.
    pub fn add_output(&mut self, output: TransactionOutput) {
        self.outputs.push(output);
    }

    /// Sum of all output values.
    pub fn total_output_satoshis(&self) -> u64 {
        self.outputs.iter().map(|o| o.satoshis).sum()
    }

    /// Sum of all input values, from their attached source outputs.
    ///
    /// # Returns
    /// The total, or an error naming the first input with no source output.
    pub fn total_input_satoshis(&self) -> Result<u64, TransactionError> {
        self.inputs.iter().enumerate().try_fold(0u64, |total, (i, input)| {
            input
                .source_satoshis()
                .map(|sats| total + sats)
                .ok_or_else(|| {
                    TransactionError::InvalidTransaction(format!(
                        "missing source output on input {}",
                        i
                    ))
                })
        })
    }

    // -----------------------------------------------------------------
    // Signature hash
    // -----------------------------------------------------------------

    /// Compute the signature hash for an input.
    ///
    /// # Arguments
    /// * `input_index` - Index of the input being signed.
    /// * `script_code` - The script being satisfied. `None` uses the source
    ///   output's locking script (P2PKH); contracts pass their redeem script.
    /// * `sighash_flag` - The combined sighash flags.
    ///
    /// # Returns
    /// The 32-byte digest, or an error if the input or its source output
    /// is missing.
    pub fn calc_input_signature_hash(
        &self,
        input_index: usize,
        script_code: Option<&[u8]>,
        sighash_flag: u32,
    ) -> Result<[u8; 32], TransactionError> {
        let input = self.inputs.get(input_index).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!(
                "input index {} out of range (tx has {} inputs)",
                input_index,
                self.inputs.len()
            ))
        })?;
        let source = input.source_output().ok_or_else(|| {
            TransactionError::SigningError(format!(
                "missing source output on input {}",
                input_index
            ))
        })?;
        let code = script_code.unwrap_or_else(|| source.locking_script.to_bytes());
        sighash::signature_hash(self, input_index, code, source, sighash_flag)
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Transaction {
    /// Display the transaction as its hex-encoded serialization.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
