//! Error types for the sync engine.

use grocer_sync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The device is offline; no attempt was made.
    #[error("network unavailable")]
    NetworkUnavailable,

    /// Network or transport error observed during a call.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The server answered with a non-success response.
    #[error("server rejected request ({status}): {message}")]
    ServerRejected {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The local cache could not be read or written.
    #[error("local store error: {0}")]
    LocalStore(String),

    /// A message could not be encoded, decoded or dispatched.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A retryable operation kept failing.
    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The error from the last attempt.
        source: Box<SyncError>,
    },

    /// Sync was cancelled.
    #[error("sync cancelled")]
    Cancelled,

    /// Another pass is still running on this orchestrator.
    #[error("a sync pass is already in progress")]
    SyncInProgress,
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a local store error.
    pub fn local_store(message: impl std::fmt::Display) -> Self {
        Self::LocalStore(message.to_string())
    }

    /// Returns true if this error can be retried.
    ///
    /// Only transient transport failures qualify. A server rejection is an
    /// answer, not a failure to get one.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transport { retryable: true, .. })
    }

    /// Returns the error from the final attempt, unwrapping retry exhaustion.
    pub fn root(&self) -> &SyncError {
        match self {
            SyncError::RetriesExhausted { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        SyncError::Protocol(err.to_string())
    }
}
