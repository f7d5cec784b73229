//! WebSocket transport layer.
//!
//! This module turns a discrete-message WebSocket connection into the
//! byte-stream shape a request processor reads from and writes to.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   whole messages   ┌──────────────┐   byte chunks   ┌─────────────┐
//! │ MessageTransport │ ─────────────────► │   WsStream   │ ──────────────► │  Processor  │
//! │ (tungstenite)    │ ◄───────────────── │ (1 pending)  │ ◄────────────── │             │
//! └──────────────────┘   one text frame   └──────────────┘   one response  └─────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `params` | Read ceiling and write deadline |
//! | `stream` | Byte-stream adapter over one connection |

// ============================================================================
// Submodules
// ============================================================================

/// Connection parameters.
pub mod params;

/// Byte-stream adapter.
pub mod stream;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

// ============================================================================
// Re-exports
// ============================================================================

pub use params::ConnParams;
pub use stream::{StreamReader, WsStream};

// ============================================================================
// MessageTransport
// ============================================================================

/// A duplex channel of whole WebSocket messages.
///
/// This is the only surface of the transport library the adapter touches.
/// Handshakes, framing, masking and ping replies stay inside the library.
#[async_trait]
pub trait MessageTransport: Send {
    /// Waits for the next complete message.
    ///
    /// Returns `None` once the underlying stream has ended.
    async fn recv_message(&mut self) -> Option<Result<Message, WsError>>;

    /// Sends one message and flushes it.
    async fn send_message(&mut self, message: Message) -> Result<(), WsError>;

    /// Starts (or answers) the close handshake.
    async fn close_with(&mut self, frame: Option<CloseFrame>) -> Result<(), WsError>;

    /// Flushes frames the library queued on its own, such as close replies.
    async fn flush_pending(&mut self) -> Result<(), WsError>;
}

#[async_trait]
impl<S> MessageTransport for WebSocketStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv_message(&mut self) -> Option<Result<Message, WsError>> {
        self.next().await
    }

    async fn send_message(&mut self, message: Message) -> Result<(), WsError> {
        SinkExt::send(self, message).await
    }

    async fn close_with(&mut self, frame: Option<CloseFrame>) -> Result<(), WsError> {
        WebSocketStream::close(self, frame).await
    }

    async fn flush_pending(&mut self) -> Result<(), WsError> {
        SinkExt::flush(self).await
    }
}
