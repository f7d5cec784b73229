//! TCP listener feeding connections to a [`Websocket`].
//!
//! # Connection Flow
//!
//! 1. Bind to an address (port 0 picks a free port)
//! 2. Accept TCP connections until the shutdown token is cancelled
//! 3. Spawn one task per connection running [`Websocket::serve`]
//! 4. On shutdown, cancel live connections and wait for them to close

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::handler::RequestHandler;

use super::Websocket;

// ============================================================================
// Constants
// ============================================================================

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

// ============================================================================
// WebSocketServer
// ============================================================================

/// A bound listener serving WebSocket connections.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use ws_rpc_bridge::{WebSocketServer, Websocket};
///
/// let server = WebSocketServer::bind("127.0.0.1:0").await?;
/// println!("listening on {}", server.ws_url());
///
/// let shutdown = CancellationToken::new();
/// server.run(Websocket::new(Arc::new(handler)), shutdown.clone()).await?;
/// ```
pub struct WebSocketServer {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Address the listener is bound to.
    local_addr: SocketAddr,
}

impl WebSocketServer {
    /// Binds a listener to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if binding fails.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, "WebSocket listener bound");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Returns the bound address.
    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the WebSocket URL for this listener.
    ///
    /// Format: `ws://{ip}:{port}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Accepts connections until `shutdown` is cancelled.
    ///
    /// Each connection gets a child of `shutdown` as its lifetime token, so
    /// cancelling it also fails in-flight reads and writes. Returns once
    /// every connection task has finished.
    pub async fn run<H>(self, websocket: Websocket<H>, shutdown: CancellationToken) -> Result<()>
    where
        H: RequestHandler + 'static,
    {
        let tracker = TaskTracker::new();

        info!(addr = %self.local_addr, "WebSocket server listening");

        loop {
            let accepted = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Errors such as EMFILE persist until a connection
                    // closes, so back off instead of spinning.
                    warn!(error = %e, "Failed to accept TCP connection");
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        _ = sleep(ACCEPT_BACKOFF) => {}
                    }
                    continue;
                }
            };

            debug!(%peer, "TCP connection accepted");

            let websocket = websocket.clone();
            let cancel = shutdown.child_token();
            tracker.spawn(async move {
                let closure = websocket.serve(stream, Some(peer), cancel).await;
                debug!(%peer, ?closure, "Connection finished");
            });
        }

        tracker.close();
        debug!(live = tracker.len(), "Waiting for connections to close");
        tracker.wait().await;

        info!("WebSocket server stopped");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
