//! Connection lifecycle manager.
//!
//! [`Websocket`] owns one connection from upgrade to close:
//!
//! ```text
//! Upgrading ──► Active ──► Closing(reason) ──► Closed
//!     │           ▲  │
//!     ▼           └──┘ read request → notify → write response
//!  (failed)
//! ```
//!
//! The loop is strictly request/response: request N+1 is not read until
//! response N has been written. Any error leaves the loop and is classified:
//! a peer close handshake ends quietly, everything else is answered with an
//! internal-error close frame carrying the error text.

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::accept_async_with_config;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::error::{Error, Result};
use crate::handler::{NewRequestListener, NoopListener, RequestContext, RequestHandler};
use crate::transport::{ConnParams, MessageTransport, WsStream};

// ============================================================================
// Constants
// ============================================================================

/// Maximum length of a close frame reason in bytes.
pub const CLOSE_REASON_MAX_BYTES: usize = 125;

/// Label passed to the request hook.
const REQUEST_LABEL: &str = "any";

// ============================================================================
// Closure
// ============================================================================

/// How a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closure {
    /// The HTTP upgrade failed; the connection never became active.
    UpgradeFailed,
    /// The peer completed a close handshake.
    Peer {
        /// Status code the peer reported.
        code: CloseCode,
    },
    /// We closed the connection after an error.
    Internal {
        /// Reason sent in the close frame.
        reason: String,
    },
}

// ============================================================================
// Websocket
// ============================================================================

/// Serves WebSocket connections against a request processor.
///
/// Holds no per-connection state; one instance serves any number of
/// concurrent connections, each in its own task.
pub struct Websocket<H> {
    /// Request-processing core.
    handler: Arc<H>,
    /// Shared connection parameters.
    params: Arc<ConnParams>,
    /// Request hook.
    listener: Arc<dyn NewRequestListener>,
}

impl<H> Clone for Websocket<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            params: Arc::clone(&self.params),
            listener: Arc::clone(&self.listener),
        }
    }
}

impl<H: RequestHandler> Websocket<H> {
    /// Creates a manager with default parameters and a no-op hook.
    pub fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            params: Arc::new(ConnParams::default()),
            listener: Arc::new(NoopListener),
        }
    }

    /// Validates and applies connection parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either limit is zero.
    pub fn with_params(mut self, params: ConnParams) -> Result<Self> {
        params.validate()?;
        self.params = Arc::new(params);
        Ok(self)
    }

    /// Registers the request hook.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn NewRequestListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Returns the connection parameters.
    #[inline]
    #[must_use]
    pub fn params(&self) -> &ConnParams {
        &self.params
    }

    /// Upgrades `stream` to a WebSocket and serves it until it closes.
    ///
    /// The connection's whole lifetime is spent in this call.
    pub async fn serve<S>(
        &self,
        stream: S,
        peer: Option<SocketAddr>,
        cancel: CancellationToken,
    ) -> Closure
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let upgrade = accept_async_with_config(stream, Some(self.params.ws_config()));
        let upgraded = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = upgrade => result.map_err(|e| Error::upgrade(e.to_string())),
        };

        match upgraded {
            Ok(ws) => self.run(ws, peer, cancel).await,
            Err(e) => {
                error!(?peer, error = %e, "Failed to upgrade connection");
                Closure::UpgradeFailed
            }
        }
    }

    /// Serves an already upgraded transport until it closes.
    pub async fn run<T: MessageTransport>(
        &self,
        transport: T,
        peer: Option<SocketAddr>,
        cancel: CancellationToken,
    ) -> Closure {
        let ctx = RequestContext::new(peer, cancel.clone());
        let span = info_span!("ws_conn", conn_id = %ctx.conn_id, peer = ?peer);

        let conn = WsStream::new(transport, Arc::clone(&self.params), cancel);
        self.drive(conn, ctx).instrument(span).await
    }

    /// Runs the request loop, then closes according to the error that ended it.
    async fn drive<T: MessageTransport>(
        &self,
        mut conn: WsStream<T>,
        ctx: RequestContext,
    ) -> Closure {
        debug!("WebSocket connection active");

        let err = loop {
            let response = match self.handler.handle_reader(&ctx, &mut conn).await {
                Ok(response) => response,
                Err(e) => break e,
            };

            self.listener.on_new_request(REQUEST_LABEL);

            if let Err(e) = conn.write(response).await {
                break e;
            }
        };

        Self::close(&mut conn, err).await
    }

    /// Classifies the terminal error and closes the connection.
    async fn close<T: MessageTransport>(conn: &mut WsStream<T>, err: Error) -> Closure {
        if let Error::PeerClosed { code, reason } = &err {
            info!(status = %code, reason = %reason, "Client closed websocket connection");
            if let Err(e) = conn.finish().await {
                debug!(error = %e, "Close reply not delivered");
            }
            return Closure::Peer { code: *code };
        }

        warn!(error = %err, "Closing websocket connection due to internal error");

        let reason = close_reason(&err.to_string()).to_owned();
        if let Err(e) = conn.close(CloseCode::Error, reason.clone()).await {
            if e.is_already_closed() {
                debug!(error = %e, "WebSocket connection already closed");
            } else {
                error!(error = %e, "Failed to close websocket connection");
            }
        }

        Closure::Internal { reason }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Truncates `message` to at most [`CLOSE_REASON_MAX_BYTES`] bytes.
///
/// The cut is made on bytes; if it would split a multi-byte character the
/// cut moves back to the preceding character boundary so the reason stays
/// valid UTF-8.
#[must_use]
pub fn close_reason(message: &str) -> &str {
    if message.len() <= CLOSE_REASON_MAX_BYTES {
        return message;
    }

    let mut end = CLOSE_REASON_MAX_BYTES;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    &message[..end]
}

// ============================================================================
// Tests
// ============================================================================
