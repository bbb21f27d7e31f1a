use thiserror::Error;

/// Result type alias using CardStoreError
pub type Result<T> = std::result::Result<T, CardStoreError>;

/// Error taxonomy for card store operations
///
/// Expected failure modes (validation, version conflict, not-found) are
/// folded into `WriteResult.errors` by the engine; these variants cross the
/// repository boundary so the engine can distinguish them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CardStoreError {
    /// Optimistic-lock version mismatch; the stored record is unchanged
    #[error("Concurrent modification on card {card_id}: expected version {expected}, found {actual}")]
    ConcurrentModification {
        card_id: String,
        expected: u64,
        actual: u64,
    },

    /// Card not found in the store
    #[error("Card not found: {card_id}")]
    CardNotFound { card_id: String },

    /// A required field for the given operation kind is missing or invalid
    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    /// Commit or rollback issued with no open transaction frame
    #[error("No transaction is currently open")]
    NoActiveTransaction,

    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversion from serde_json::Error to CardStoreError
impl From<serde_json::Error> for CardStoreError {
    fn from(err: serde_json::Error) -> Self {
        CardStoreError::Serialization {
            message: err.to_string(),
        }
    }
}
