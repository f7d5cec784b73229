//! Connection serving.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `lifecycle` | Upgrade, request loop and classified close for one connection |
//! | `acceptor` | TCP listener spawning one task per connection |

// ============================================================================
// Submodules
// ============================================================================

/// TCP listener.
pub mod acceptor;

/// Connection lifecycle manager.
pub mod lifecycle;

// ============================================================================
// Re-exports
// ============================================================================

pub use acceptor::WebSocketServer;
pub use lifecycle::{CLOSE_REASON_MAX_BYTES, Closure, Websocket, close_reason};
