//! Error types for protocol encoding.

use crate::entity::EntityKind;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while encoding, decoding or dispatching protocol values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A value could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),

    /// A message could not be deserialized.
    #[error("decode error: {0}")]
    Decode(String),

    /// A payload was tagged with a different entity than expected.
    #[error("payload mismatch: expected {expected}, got {actual}")]
    PayloadMismatch {
        /// Entity the caller dispatched on.
        expected: EntityKind,
        /// Entity the payload actually carries.
        actual: EntityKind,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProtocolError::PayloadMismatch {
            expected: EntityKind::Cart,
            actual: EntityKind::Profile,
        };
        assert_eq!(err.to_string(), "payload mismatch: expected cart, got profile");

        let err = ProtocolError::Decode("eof".into());
        assert_eq!(err.to_string(), "decode error: eof");
    }
}
