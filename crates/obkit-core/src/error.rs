//! Error types shared by the transport capability layer.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Opening a connection failed.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The URL that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// The connection is closed and cannot be read from or written to anymore.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// A single frame could not be read; the connection itself is still usable.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Writing to the connection failed.
    #[error("failed to send frame: {0}")]
    SendFailed(String),

    /// The request could not be built from the given parts.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// Creates a connection-closed error.
    pub fn closed(reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error means the connection is gone for good.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed { .. })
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_closed_errors_are_terminal() {
        assert!(TransportError::closed("eof").is_closed());
        assert!(!TransportError::InvalidFrame("bad utf-8".into()).is_closed());
        assert!(!TransportError::Io("reset".into()).is_closed());
    }

    #[test]
    fn test_display() {
        let err = TransportError::ConnectionFailed {
            url: "ws://127.0.0.1:3001".into(),
            reason: "refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "connection failed: ws://127.0.0.1:3001 - refused"
        );
    }
}
