//! Transaction output with satoshi value, optional tokens and locking script.
//!
//! Provides binary serialization/deserialization following the wire format,
//! with the CashTokens prefix carried inside the locking-bytecode field.

use fundme_primitives::util::{ByteReader, ByteWriter, CompactSize};
use fundme_script::Script;

use crate::token::{TokenData, PREFIX_TOKEN};
use crate::TransactionError;

/// A single output in a transaction.
///
/// # Wire format
///
/// | Field                  | Size           |
/// |------------------------|----------------|
/// | satoshis               | 8 bytes (LE)   |
/// | prefix + script length | CompactSize    |
/// | token prefix           | optional       |
/// | locking_script         | variable       |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutput {
    /// The number of satoshis locked by this output.
    pub satoshis: u64,

    /// The locking script that defines spending conditions.
    pub locking_script: Script,

    /// Tokens carried by this output.
    pub token: Option<TokenData>,
}

impl TransactionOutput {
    /// Create an output without tokens.
    pub fn new(satoshis: u64, locking_script: Script) -> Self {
        TransactionOutput {
            satoshis,
            locking_script,
            token: None,
        }
    }

    /// Create an output carrying `token`.
    pub fn with_token(satoshis: u64, locking_script: Script, token: TokenData) -> Self {
        TransactionOutput {
            satoshis,
            locking_script,
            token: Some(token),
        }
    }

    /// Deserialize a `TransactionOutput` from a `ByteReader`.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of an encoded output.
    ///
    /// # Returns
    /// `Ok(TransactionOutput)` on success, or a `TransactionError` if the
    /// data is truncated or the token prefix is malformed.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let satoshis = reader.read_u64_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading satoshis: {}", e))
        })?;

        let field = reader.read_var_bytes().map_err(|e| {
            TransactionError::SerializationError(format!("reading locking bytecode: {}", e))
        })?;

        let mut field_reader = ByteReader::new(field);
        let token = if field_reader.peek_u8() == Some(PREFIX_TOKEN) {
            Some(TokenData::read_from(&mut field_reader)?)
        } else {
            None
        };

        Ok(TransactionOutput {
            satoshis,
            locking_script: Script::from_bytes(field_reader.read_to_end()),
            token,
        })
    }

    /// Serialize this output into a `ByteWriter`.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u64_le(self.satoshis);
        let prefix = self.token.as_ref().map(TokenData::to_bytes).unwrap_or_default();
        let script = self.locking_script.to_bytes();
        writer.write_compact_size(CompactSize::from(prefix.len() + script.len()));
        writer.write_bytes(&prefix);
        writer.write_bytes(script);
    }

    /// Serialize this output to a byte vector.
    ///
    /// This is also the form committed to by hashOutputs in the signing
    /// serialization.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundme_primitives::chainhash::Hash;

    #[test]
    fn test_plain_output_layout() {
        let script = Script::from_hex("76a914e2a623699e81b291c0327f408fea765d534baa2a88ac").expect("hex");
        let output = TransactionOutput::new(1000, script);
        let bytes = output.to_bytes();
        assert_eq!(&bytes[..8], &1000u64.to_le_bytes());
        assert_eq!(bytes[8], 25);
        let parsed = TransactionOutput::read_from(&mut ByteReader::new(&bytes)).expect("parses");
        assert_eq!(parsed, output);
    }

    /// The token prefix counts toward the locking-bytecode length.
    #[test]
    fn test_token_output_layout() {
        let script = Script::from_hex("aa20").expect("hex");
        let token = TokenData::minting(Hash::new([7u8; 32]));
        let output = TransactionOutput::with_token(3000, script.clone(), token.clone());
        let bytes = output.to_bytes();
        assert_eq!(bytes[8] as usize, 34 + script.len());
        assert_eq!(bytes[9], PREFIX_TOKEN);

        let parsed = TransactionOutput::read_from(&mut ByteReader::new(&bytes)).expect("parses");
        assert_eq!(parsed.token, Some(token));
        assert_eq!(parsed.locking_script, script);
    }

    #[test]
    fn test_bad_token_prefix_is_an_error() {
        let mut bytes = 546u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0x02, PREFIX_TOKEN, 0x00]);
        assert!(matches!(
            TransactionOutput::read_from(&mut ByteReader::new(&bytes)),
            Err(TransactionError::InvalidTokenPrefix(_))
        ));
    }
}
