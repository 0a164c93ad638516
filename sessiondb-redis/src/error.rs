//! Redis error types.

use sessiondb_core::{KvError, SessionError};
use thiserror::Error;

/// Result type for Redis operations.
pub type Result<T> = std::result::Result<T, RedisError>;

/// Redis errors.
#[derive(Debug, Error)]
pub enum RedisError {
    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Pool error.
    #[error("Pool error: {0}")]
    Pool(String),

    /// Command error.
    #[error("Command error: {0}")]
    Command(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The key holds a value that is not a string.
    #[error("Wrong type: {0}")]
    WrongType(String),

    /// No connection has been established.
    #[error("Not connected")]
    NotConnected,

    /// Timeout error.
    #[error("Operation timed out")]
    Timeout,

    /// Underlying Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl RedisError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout | Self::Pool(_) | Self::NotConnected => true,
            Self::Redis(err) => err.is_io_error() || err.is_connection_dropped(),
            _ => false,
        }
    }

    /// Check if this error indicates connection loss.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection(_) | Self::NotConnected => true,
            Self::Redis(err) => err.is_connection_dropped() || err.is_connection_refusal(),
            _ => false,
        }
    }
}

impl<E> From<bb8::RunError<E>> for RedisError
where
    E: std::error::Error + 'static,
{
    fn from(err: bb8::RunError<E>) -> Self {
        match err {
            bb8::RunError::TimedOut => Self::Timeout,
            bb8::RunError::User(e) => Self::Pool(e.to_string()),
        }
    }
}

impl From<RedisError> for KvError {
    fn from(err: RedisError) -> Self {
        match err {
            RedisError::Timeout => KvError::Timeout,
            RedisError::NotConnected => KvError::Closed,
            RedisError::WrongType(kind) => KvError::UnexpectedType(kind),
            RedisError::Command(msg) => KvError::Command(msg),
            err if err.is_connection_error() || err.is_retryable() => {
                KvError::Connection(err.to_string())
            }
            err => KvError::Command(err.to_string()),
        }
    }
}

impl From<RedisError> for SessionError {
    fn from(err: RedisError) -> Self {
        match err {
            RedisError::Config(msg) => SessionError::Config(msg),
            err => SessionError::KeyValue(err.into()),
        }
    }
}
