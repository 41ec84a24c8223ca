//! WebSocket transport layer.
//!
//! This module opens the connection to the remote endpoint and owns the
//! socket for the lifetime of one session.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Session        │                              │  Remote         │
//! │                 │   TCP ─ [proxy tunnel] ─     │  WebSocket      │
//! │  Listener  ◄────┼──── [TLS] ─ WebSocket ──────►│  Endpoint       │
//! │  Sender    ─────┼─►                            │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `connect` - Resolve target, open proxy tunnel, TLS and WebSocket handshakes
//! 2. `ConnectionHandle::take_reader` - Listener takes the read half once
//! 3. `ConnectionHandle::send` - Sender writes payloads
//! 4. `ConnectionHandle::close` - Session sends the close frame once
//! 5. `ConnectionHandle::release` - Session shuts the socket down once
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Split connection handle |
//! | `establish` | Connect and failure classification |
//! | `proxy` | Proxy configuration and tunnels |
//! | `tls` | TLS connector settings |

// ============================================================================
// Submodules
// ============================================================================

/// Split connection handle.
pub mod connection;

/// Connect and failure classification.
pub mod establish;

/// Proxy configuration and tunnels.
pub mod proxy;

/// TLS connector settings.
pub mod tls;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{ConnectionHandle, WsReader, WsStream, WsWriter};
pub use establish::connect;
pub use proxy::{ProxyConfig, ProxyType, normalize_proxy_url};
pub use tls::{TlsCredential, TlsOptions};
