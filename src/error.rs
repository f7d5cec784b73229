//! Error types for the WebSocket request bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use ws_rpc_bridge::{Error, Result, StreamReader};
//!
//! async fn read_some(reader: &mut dyn StreamReader) -> Result<Vec<u8>> {
//!     let mut buf = [0u8; 64];
//!     let n = reader.read(&mut buf).await?;
//!     Ok(buf[..n].to_vec())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Upgrade`], [`Error::PeerClosed`], [`Error::ConnectionClosed`], [`Error::Cancelled`] |
//! | Deadlines | [`Error::Timeout`] |
//! | Processing | [`Error::Processing`], [`Error::Protocol`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::{Error as IoError, ErrorKind};
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Peer-initiated closes are carried by their own variant so the lifecycle
/// manager can tell a graceful shutdown apart from every other failure
/// without inspecting messages.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid connection parameters.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// HTTP to WebSocket upgrade failed.
    #[error("WebSocket upgrade failed: {message}")]
    Upgrade {
        /// Description of the upgrade failure.
        message: String,
    },

    /// The peer completed a close handshake.
    ///
    /// Returned by reads once the peer's close frame has arrived.
    #[error("Peer closed connection: status {code}")]
    PeerClosed {
        /// Status code reported by the peer.
        code: CloseCode,
        /// Reason text reported by the peer.
        reason: String,
    },

    /// Transport ended without a close handshake.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The connection's lifetime token was cancelled.
    #[error("Connection cancelled")]
    Cancelled,

    // ========================================================================
    // Deadline Errors
    // ========================================================================
    /// Operation exceeded its deadline.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Processing Errors
    // ========================================================================
    /// Request processor failed to produce a response.
    #[error("Processing error: {message}")]
    Processing {
        /// Description of the processing failure.
        message: String,
    },

    /// Payload violates the transport contract.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

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

    /// Creates an upgrade error.
    #[inline]
    pub fn upgrade(message: impl Into<String>) -> Self {
        Self::Upgrade {
            message: message.into(),
        }
    }

    /// Creates a peer closed error.
    #[inline]
    pub fn peer_closed(code: CloseCode, reason: impl Into<String>) -> Self {
        Self::PeerClosed {
            code,
            reason: reason.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a processing error.
    #[inline]
    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the peer initiated a close handshake.
    #[inline]
    #[must_use]
    pub fn is_peer_close(&self) -> bool {
        matches!(self, Self::PeerClosed { .. })
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if the connection was already closed when we tried to
    /// close it.
    ///
    /// The transport reports this race through several unrelated error
    /// kinds and exposes no single "already closed" signal, so the check is
    /// kept to exactly these kinds. Only the close path consults it.
    ///
    /// A peer that drops its socket without a close handshake leaves the
    /// close frame with nowhere to go; the OS reports that as a reset or
    /// broken pipe rather than as a WebSocket state.
    #[must_use]
    pub fn is_already_closed(&self) -> bool {
        let Self::WebSocket(err) = self else {
            return false;
        };

        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => true,
            WsError::Protocol(
                ProtocolError::SendAfterClosing | ProtocolError::ResetWithoutClosingHandshake,
            ) => true,
            WsError::Io(io) => matches!(
                io.kind(),
                ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
