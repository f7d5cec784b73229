//! Collaborator contracts: the request processor and the request hook.
//!
//! Both are injected into [`Websocket`](crate::Websocket) at construction, so
//! hosts can swap in no-op or test doubles without touching global state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::Result;
use crate::transport::StreamReader;

// ============================================================================
// RequestContext
// ============================================================================

/// Per-connection context passed to the request processor.
#[derive(Clone)]
pub struct RequestContext {
    /// Unique ID of the connection, also recorded in its log span.
    pub conn_id: Uuid,
    /// Remote address, when the host knows it.
    pub peer: Option<SocketAddr>,
    /// Connection lifetime token.
    pub cancel: CancellationToken,
}

impl RequestContext {
    /// Creates a context for a fresh connection.
    #[must_use]
    pub fn new(peer: Option<SocketAddr>, cancel: CancellationToken) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            peer,
            cancel,
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("conn_id", &self.conn_id)
            .field("peer", &self.peer)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// The request-processing core.
///
/// Each call must read exactly one request from `reader` and return the
/// serialized response. Errors returned here end the connection with an
/// internal-error close; errors surfaced by `reader` should be returned
/// unchanged so a peer close is still recognised.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Reads one request and produces its response.
    async fn handle_reader(
        &self,
        ctx: &RequestContext,
        reader: &mut dyn StreamReader,
    ) -> Result<Vec<u8>>;
}

// ============================================================================
// NewRequestListener
// ============================================================================

/// Hook notified once per completed request/response cycle.
///
/// Implementations must return quickly; the connection loop waits for them.
pub trait NewRequestListener: Send + Sync {
    /// Called with a fixed label after each successfully handled request.
    fn on_new_request(&self, _label: &str) {}
}

/// Listener that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl NewRequestListener for NoopListener {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_ids_are_unique() {
        let a = RequestContext::new(None, CancellationToken::new());
        let b = RequestContext::new(None, CancellationToken::new());
        assert_ne!(a.conn_id, b.conn_id);
    }

    #[test]
    fn test_context_debug_reports_cancellation() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new("127.0.0.1:9000".parse().ok(), token.clone());
        token.cancel();

        let debug = format!("{ctx:?}");
        assert!(debug.contains("127.0.0.1:9000"));
        assert!(debug.contains("cancelled: true"));
    }

    #[test]
    fn test_noop_listener() {
        let listener: &dyn NewRequestListener = &NoopListener;
        listener.on_new_request("any");
    }
}
