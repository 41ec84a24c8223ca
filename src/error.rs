//! Error types for the WebSocket session bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Fallible library operations return [`Result<T>`] which uses [`Error`].
//! Connection establishment has its own taxonomy, [`ConnectError`], because
//! every variant maps onto the HTTP-like status reported back to the caller.
//!
//! ```ignore
//! use wsbridge::{ConnectError, Error};
//!
//! let err = ConnectError::handshake_rejected(403, "forbidden");
//! assert_eq!(err.status(), 403);
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] |
//! | Session | [`Error::ConnectionClosed`], [`Error::Queue`], [`Error::InvalidPayload`] |
//! | Connect | [`ConnectError::Timeout`], [`ConnectError::Unreachable`], [`ConnectError::HandshakeRejected`], [`ConnectError::InvalidHandshake`], [`ConnectError::InvalidTarget`] |
//! | External | [`Error::Io`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

/// Status reported for every connect failure that carries no status of its own.
pub const INTERNAL_ERROR_STATUS: u16 = 500;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when bridge or request configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument supplied by the caller.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// WebSocket connection closed.
    ///
    /// Returned when a read or write hits a transport that is already gone.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Outbound queue rejected a payload.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Payload failed validation before reaching the transport.
    #[error("Invalid payload: {message}")]
    InvalidPayload {
        /// Why the payload was rejected.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid payload error.
    #[inline]
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the transport underneath is gone.
    ///
    /// Covers both the crate's own [`Error::ConnectionClosed`] and the
    /// tungstenite variants that mean the same thing.
    #[must_use]
    pub fn is_connection_closed(&self) -> bool {
        match self {
            Self::ConnectionClosed | Self::Queue(QueueError::Closed) => true,
            Self::WebSocket(e) => is_closed_ws_error(e),
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

/// Returns `true` for tungstenite errors raised on a closed socket.
pub(crate) fn is_closed_ws_error(err: &WsError) -> bool {
    use tokio_tungstenite::tungstenite::error::ProtocolError;

    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => true,
        WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
        WsError::Protocol(ProtocolError::SendAfterClosing) => true,
        WsError::Io(e) => matches!(
            e.kind(),
            std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}

// ============================================================================
// QueueError
// ============================================================================

/// Producer-side failures of the outbound queue.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue is at capacity.
    #[error("outbound queue is full ({capacity} pending)")]
    Full {
        /// Configured queue bound.
        capacity: usize,
    },

    /// The end-of-sending sentinel was already enqueued.
    #[error("outbound queue no longer accepts messages")]
    Sealed,

    /// The consumer is gone.
    #[error("outbound queue consumer has stopped")]
    Closed,
}

// ============================================================================
// ConnectError
// ============================================================================

/// Failure to establish the WebSocket connection.
///
/// Every variant maps onto the status reported by the terminal response,
/// see [`ConnectError::status`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// Connect did not finish within the timeout.
    #[error("Connection timed out after {timeout_ms}ms")]
    Timeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// OS-level connect failure, including proxy tunnel failures.
    #[error("Cannot connect to websocket: {message}")]
    Unreachable {
        /// Underlying failure.
        message: String,
    },

    /// The server answered the upgrade request with a non-101 status.
    #[error("server rejected WebSocket connection: HTTP {status}")]
    HandshakeRejected {
        /// HTTP status returned by the server.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The opening handshake was malformed or could not be completed.
    #[error("Invalid handshake: {message}")]
    InvalidHandshake {
        /// Description of the handshake problem.
        message: String,
    },

    /// The target URI cannot be used for a WebSocket connection.
    #[error("Invalid target: {message}")]
    InvalidTarget {
        /// Description of what is wrong with the target.
        message: String,
    },
}

impl ConnectError {
    /// Creates a timeout error.
    #[inline]
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Creates an unreachable error.
    #[inline]
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Creates a handshake rejected error.
    #[inline]
    pub fn handshake_rejected(status: u16, body: impl Into<String>) -> Self {
        Self::HandshakeRejected {
            status,
            body: body.into(),
        }
    }

    /// Creates an invalid handshake error.
    #[inline]
    pub fn invalid_handshake(message: impl Into<String>) -> Self {
        Self::InvalidHandshake {
            message: message.into(),
        }
    }

    /// Creates an invalid target error.
    #[inline]
    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::InvalidTarget {
            message: message.into(),
        }
    }

    /// Returns the HTTP-like status reported for this failure.
    #[inline]
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::HandshakeRejected { status, .. } => *status,
            _ => INTERNAL_ERROR_STATUS,
        }
    }

    /// Returns the human-readable detail used as the response body.
    ///
    /// A rejected handshake includes the server's body when it sent one.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::HandshakeRejected { body, .. } if !body.trim().is_empty() => {
                format!("{self}\n{}", body.trim_end())
            }
            _ => self.to_string(),
        }
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::config("queue size must be positive");
        assert_eq!(
            err.to_string(),
            "Configuration error: queue size must be positive"
        );
    }

    #[test]
    fn test_connect_error_status_mapping() {
        assert_eq!(ConnectError::timeout(1000).status(), 500);
        assert_eq!(ConnectError::unreachable("refused").status(), 500);
        assert_eq!(ConnectError::invalid_handshake("bad accept").status(), 500);
        assert_eq!(ConnectError::invalid_target("ftp://x").status(), 500);
        assert_eq!(ConnectError::handshake_rejected(403, "").status(), 403);
    }

    #[test]
    fn test_rejected_detail_includes_body() {
        let err = ConnectError::handshake_rejected(403, "forbidden\n");
        assert_eq!(
            err.detail(),
            "server rejected WebSocket connection: HTTP 403\nforbidden"
        );

        let empty = ConnectError::handshake_rejected(401, "  ");
        assert_eq!(
            empty.detail(),
            "server rejected WebSocket connection: HTTP 401"
        );
    }

    #[test]
    fn test_is_timeout() {
        assert!(ConnectError::timeout(5000).is_timeout());
        assert!(!ConnectError::unreachable("x").is_timeout());
    }

    #[test]
    fn test_is_connection_closed() {
        assert!(Error::ConnectionClosed.is_connection_closed());
        assert!(Error::WebSocket(WsError::AlreadyClosed).is_connection_closed());
        assert!(Error::Queue(QueueError::Closed).is_connection_closed());
        assert!(!Error::Queue(QueueError::Sealed).is_connection_closed());
        assert!(!Error::config("x").is_connection_closed());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_connection_closed());
    }

    #[test]
    fn test_queue_error_display() {
        let err = QueueError::Full { capacity: 4 };
        assert_eq!(err.to_string(), "outbound queue is full (4 pending)");
    }
}
