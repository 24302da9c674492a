/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction structure is invalid (e.g. an input index out of range).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// Signing failed (e.g. missing source output).
    #[error("signing error: {0}")]
    SigningError(String),
    /// Binary/hex serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// A token prefix violates the CashTokens encoding rules.
    #[error("invalid token prefix: {0}")]
    InvalidTokenPrefix(String),
    /// An underlying script error.
    #[error("script error: {0}")]
    Script(#[from] fundme_script::ScriptError),
    /// An underlying primitives error.
    #[error("primitives error: {0}")]
    Primitives(#[from] fundme_primitives::PrimitivesError),
}
