//! Session manager errors

use std::time::Duration;

use thiserror::Error;

/// Failure talking to the key-value backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Backend operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed payload: {0}")]
    Payload(String),
}

impl BackendError {
    /// Whether the failure says the connection itself is unusable, as opposed
    /// to the server rejecting one command on a healthy connection.
    pub fn is_connection_fault(&self) -> bool {
        match self {
            BackendError::Redis(e) => e.is_io_error() || e.is_connection_dropped(),
            BackendError::Unreachable(_) | BackendError::Timeout(_) => true,
            BackendError::Payload(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    /// Token absent or expired. Callers treat this as "not logged in".
    #[error("Session not found")]
    NotFound,

    #[error("Failed to read session: {0}")]
    BackendRead(#[source] BackendError),

    #[error("Failed to write session: {0}")]
    BackendWrite(#[source] BackendError),

    #[error("Random source unavailable: {0}")]
    RandomSource(String),

    #[error("Failed to reconnect to session backend: {0}")]
    Reconnect(#[source] BackendError),

    #[error("Failed to connect to session backend: {0}")]
    Connect(#[source] BackendError),

    #[error("Invalid session configuration: {0}")]
    Config(String),
}

impl SessionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_faults() {
        assert!(BackendError::Unreachable("refused".into()).is_connection_fault());
        assert!(BackendError::Timeout(Duration::from_millis(50)).is_connection_fault());
        assert!(!BackendError::Payload("WRONGTYPE".into()).is_connection_fault());
    }
}
