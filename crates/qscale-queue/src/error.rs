//! Queue store error types.

use thiserror::Error;

/// Result type alias for queue store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// The queue store could not answer. Always transient from the loop's view.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to queue store: {0}")]
    Connect(String),

    #[error("queue store command failed: {0}")]
    Command(String),

    #[error("queue store call timed out")]
    Timeout,

    #[error("queue store unavailable")]
    Unavailable,
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_timeout() {
            StoreError::Timeout
        } else if e.is_connection_refusal() || e.is_connection_dropped() || e.is_io_error() {
            StoreError::Connect(e.to_string())
        } else {
            StoreError::Command(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn from_io(kind: io::ErrorKind) -> StoreError {
        StoreError::from(redis::RedisError::from(io::Error::new(kind, "boom")))
    }

    #[test]
    fn timeouts_classified_as_timeout() {
        assert!(matches!(from_io(io::ErrorKind::TimedOut), StoreError::Timeout));
    }

    #[test]
    fn refused_connection_classified_as_connect() {
        assert!(matches!(
            from_io(io::ErrorKind::ConnectionRefused),
            StoreError::Connect(_)
        ));
    }

    #[test]
    fn malformed_url_is_a_command_error() {
        let err = redis::Client::open("not a url").map(|_| ()).map_err(StoreError::from);
        assert!(matches!(err, Err(StoreError::Command(_))));
    }
}
