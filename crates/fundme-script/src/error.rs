/// Error types for script operations.
///
/// Covers ASM parsing, push encoding, script numbers and CashAddr
/// address validation.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Generic invalid script error.
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// An ASM token was neither a known opcode nor valid hex.
    #[error("invalid ASM token '{0}'")]
    InvalidAsmToken(String),

    /// Attempted to append a push opcode as a bare opcode.
    #[error("use append_push_data for push data opcodes: {0}")]
    InvalidOpcodeType(String),

    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Not enough data in script to complete a push operation.
    #[error("not enough data")]
    DataTooSmall,

    /// Push data exceeds maximum allowed size.
    #[error("data too big")]
    DataTooBig,

    /// Script number longer than permitted.
    #[error("script number of {0} bytes is too big")]
    NumberTooBig(usize),

    /// Script number with a redundant trailing byte.
    #[error("non-minimally encoded script number {0}")]
    NonMinimalNumber(String),

    /// Invalid address string.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// CashAddr checksum does not match.
    #[error("address checksum failed")]
    ChecksumFailed,

    /// Address prefix names no supported network.
    #[error("unknown address prefix '{0}'")]
    UnknownPrefix(String),

    /// Address belongs to another network than the one required.
    #[error("address {address} is for {found}, expected {expected}")]
    WrongNetwork {
        /// The address as given.
        address: String,
        /// The network required.
        expected: crate::Network,
        /// The network the address prefix selects.
        found: crate::Network,
    },

    /// Locking bytecode has no address form.
    #[error("locking bytecode is not a standard address: {0}")]
    NonStandardBytecode(String),
}
