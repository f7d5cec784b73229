//! WebSocket request bridge.
//!
//! This library connects a WebSocket connection, which moves whole
//! messages, to a request processor that reads requests from a byte stream
//! and answers each one with a serialized response.
//!
//! # Architecture
//!
//! Each connection is an independent lifecycle running in its own task:
//!
//! - **Upgrade**: the inbound stream is upgraded with `tokio-tungstenite`
//! - **Active**: the processor reads one request through [`WsStream`], the
//!   [`NewRequestListener`] is notified, the response goes out as one text
//!   message
//! - **Close**: a peer close handshake ends quietly; any other error is
//!   answered with an internal-error close frame carrying the error text
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use ws_rpc_bridge::{
//!     RequestContext, RequestHandler, Result, StreamReader, WebSocketServer, Websocket,
//! };
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl RequestHandler for Echo {
//!     async fn handle_reader(
//!         &self,
//!         _ctx: &RequestContext,
//!         reader: &mut dyn StreamReader,
//!     ) -> Result<Vec<u8>> {
//!         let mut buf = vec![0u8; 4096];
//!         let n = reader.read(&mut buf).await?;
//!         buf.truncate(n);
//!         Ok(buf)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = WebSocketServer::bind("127.0.0.1:8080").await?;
//!     server
//!         .run(Websocket::new(Arc::new(Echo)), CancellationToken::new())
//!         .await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`handler`] | Processor and hook contracts |
//! | [`server`] | Lifecycle manager and TCP listener |
//! | [`transport`] | Connection parameters and byte-stream adapter |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Request processor and request hook contracts.
pub mod handler;

/// Connection lifecycle and listener.
pub mod server;

/// WebSocket transport adaptation.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Collaborator contracts
pub use handler::{NewRequestListener, NoopListener, RequestContext, RequestHandler};

// Server types
pub use server::{CLOSE_REASON_MAX_BYTES, Closure, WebSocketServer, Websocket, close_reason};

// Transport types
pub use transport::{ConnParams, MessageTransport, StreamReader, WsStream};
