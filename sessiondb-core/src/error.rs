//! Error types for session database operations.

use thiserror::Error;

/// Result type for session database operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type for key-value service operations.
pub type KvResult<T> = Result<T, KvError>;

/// Session database errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Error reported by the key-value service
    #[error("Key-value service error: {0}")]
    KeyValue(#[from] KvError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl SessionError {
    /// Check if retrying the operation could succeed.
    ///
    /// Encoding problems are permanent; service errors defer to
    /// [`KvError::is_retryable`].
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::KeyValue(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// Errors surfaced by a [`KeyValueService`](crate::KeyValueService).
///
/// A missing key is not an error: `get` returns `Ok(None)` for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KvError {
    /// Could not connect, or the connection was lost.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The service rejected or failed a command.
    #[error("Command error: {0}")]
    Command(String),

    /// The stored value is not a byte string.
    #[error("Unexpected value type: {0}")]
    UnexpectedType(String),

    /// The service was used after `close`.
    #[error("Connection is closed")]
    Closed,

    /// The command did not complete in time.
    #[error("Operation timed out")]
    Timeout,
}

impl KvError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout | Self::Closed)
    }

    /// Check if this error indicates connection loss.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(KvError::Connection("refused".into()).is_retryable());
        assert!(KvError::Timeout.is_retryable());
        assert!(!KvError::UnexpectedType("hash".into()).is_retryable());
        assert!(!KvError::Command("ERR".into()).is_retryable());

        let err = SessionError::from(KvError::Timeout);
        assert!(err.is_retryable());
        assert!(!SessionError::Deserialization("bad".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = SessionError::KeyValue(KvError::Connection("refused".to_string()));
        assert!(err.to_string().contains("refused"));
    }
}
