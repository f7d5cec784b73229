//! Byte-stream adapter over a WebSocket connection.
//!
//! [`WsStream`] lets a request processor read a request incrementally, in
//! whatever chunk sizes its parser prefers, even though the transport only
//! ever hands over whole messages. Writes go the other way: one call, one
//! text message.
//!
//! # Read Model
//!
//! ```text
//! transport:  [ message 1 ][ message 2 ]
//! pending:    [ m1 remainder ]            ← at most one message buffered
//! reads:      [..][..][..][.]             ← caller-sized chunks
//! ```
//!
//! A new message is fetched only once the pending remainder is exhausted, so
//! the adapter never prefetches more than the message being delivered.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::{Error, Result};

use super::{ConnParams, MessageTransport};

// ============================================================================
// StreamReader
// ============================================================================

/// Byte-stream read side handed to request processors.
#[async_trait]
pub trait StreamReader: Send {
    /// Reads up to `buf.len()` bytes.
    ///
    /// Waits for the next transport message only when nothing from the
    /// previous one is left.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

// ============================================================================
// WsStream
// ============================================================================

/// Byte-stream adapter owning one transport connection.
///
/// The adapter is used by a single task at a time; writes are never issued
/// concurrently even where the transport would allow it.
pub struct WsStream<T> {
    /// Underlying message transport.
    transport: T,
    /// Undelivered bytes of the current message.
    pending: Bytes,
    /// Shared connection parameters.
    params: Arc<ConnParams>,
    /// Connection lifetime token.
    cancel: CancellationToken,
}

impl<T: MessageTransport> WsStream<T> {
    /// Wraps a transport connection.
    pub fn new(transport: T, params: Arc<ConnParams>, cancel: CancellationToken) -> Self {
        Self {
            transport,
            pending: Bytes::new(),
            params,
            cancel,
        }
    }

    /// Returns the number of buffered, undelivered bytes.
    #[inline]
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns the connection's lifetime token.
    #[inline]
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Sends `payload` as exactly one text message.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if `payload` is not valid UTF-8
    /// - [`Error::Timeout`] if the write misses the configured deadline
    /// - [`Error::Cancelled`] if the connection token is cancelled
    /// - [`Error::WebSocket`] if the transport fails
    pub async fn write(&mut self, payload: Vec<u8>) -> Result<usize> {
        let len = payload.len();
        let text = String::from_utf8(payload)
            .map_err(|e| Error::protocol(format!("response is not valid UTF-8: {e}")))?;

        let deadline = self.params.write_timeout;
        let send = self.transport.send_message(Message::text(text));

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = timeout(deadline, send) => match result {
                Ok(sent) => {
                    sent?;
                    trace!(len, "Response written");
                    Ok(len)
                }
                Err(_) => Err(Error::timeout("write", self.params.write_timeout_ms())),
            },
        }
    }

    /// Closes the connection with `code` and `reason`.
    ///
    /// Bounded by the write deadline, since a peer that stopped reading can
    /// stall the close frame as well.
    pub async fn close(&mut self, code: CloseCode, reason: String) -> Result<()> {
        let frame = CloseFrame {
            code,
            reason: reason.into(),
        };

        timeout(
            self.params.write_timeout,
            self.transport.close_with(Some(frame)),
        )
        .await
        .map_err(|_| Error::timeout("close", self.params.write_timeout_ms()))??;

        Ok(())
    }

    /// Sends the close reply the transport queued after a peer close.
    pub async fn finish(&mut self) -> Result<()> {
        timeout(self.params.write_timeout, self.transport.flush_pending())
            .await
            .map_err(|_| Error::timeout("close reply", self.params.write_timeout_ms()))??;

        Ok(())
    }

    /// Waits for the next data message, skipping control frames.
    async fn next_message(&mut self) -> Result<Bytes> {
        loop {
            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                received = self.transport.recv_message() => received,
            };

            match received {
                Some(Ok(message @ (Message::Text(_) | Message::Binary(_)))) => {
                    return Ok(message.into_data());
                }
                Some(Ok(Message::Close(frame))) => {
                    return Err(match frame {
                        Some(frame) => Error::peer_closed(frame.code, frame.reason.as_str()),
                        None => Error::peer_closed(CloseCode::Status, ""),
                    });
                }
                // Ping, Pong and raw frames are handled by the transport.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(Error::WebSocket(e)),
                None => return Err(Error::ConnectionClosed),
            }
        }
    }
}

#[async_trait]
impl<T: MessageTransport> StreamReader for WsStream<T> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.pending.is_empty() {
            self.pending = self.next_message().await?;
            trace!(len = self.pending.len(), "Message received");
        }

        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending.split_to(n));
        Ok(n)
    }
}

// ============================================================================
// Tests
// ============================================================================
