//! WsBridge - Interactive WebSocket sessions behind a synchronous call.
//!
//! This library lets a synchronous HTTP-style client talk to a WebSocket
//! endpoint interactively: local input lines become outbound messages,
//! inbound messages are printed as they arrive, and the whole exchange
//! collapses into one [`Response`] once the session ends.
//!
//! # Architecture
//!
//! Each [`WebsocketBridge::send`] call runs one session:
//!
//! - **Controller** (caller's thread): connects, pumps input, tears down
//! - **Listener** (task): prints inbound frames, records the close frame
//! - **Sender** (task): drains the [`OutboundQueue`] in FIFO order
//!
//! Key design principles:
//!
//! - Connect failures become responses, never errors
//! - Teardown runs exactly once, whatever ends the session
//! - Output from all units is serialized line by line
//!
//! # Quick Start
//!
//! ```no_run
//! use wsbridge::{BridgeConfig, BridgeRequest, Result, WebsocketBridge};
//!
//! fn main() -> Result<()> {
//!     let bridge = WebsocketBridge::new(BridgeConfig::default().with_transcript());
//!
//!     let request = BridgeRequest::new("wss://echo.example.com/socket")
//!         .header("Authorization", "Bearer token");
//!     let response = bridge.send(&request)?;
//!
//!     println!("{} {}", response.status, response.body);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Session tunables and exit keywords |
//! | [`console`] | Input sources, continuation escape, output sink |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Session identifiers |
//! | [`protocol`] | Payloads, close info, handshake headers |
//! | [`request`] | [`BridgeRequest`] builder |
//! | [`session`] | Controller, listener, sender and [`Response`] |
//! | [`transport`] | Connect, proxies, TLS and the connection handle |

// ============================================================================
// Modules
// ============================================================================

/// Session configuration.
pub mod config;

/// Local console: input sources and serialized output.
///
/// - [`InputSource`] - Non-blocking line source
/// - [`OutputSink`] - Line-atomic output shared by every unit
pub mod console;

/// Error types and result aliases.
///
/// Operations return [`Result<T>`] which uses [`Error`]. Connect failures
/// use [`ConnectError`] and end up in the [`Response`].
pub mod error;

/// Session identifiers.
pub mod identifiers;

/// WebSocket payloads and close frame information.
pub mod protocol;

/// Request description.
pub mod request;

/// Interactive session lifecycle.
pub mod session;

/// WebSocket transport layer.
///
/// Opens the connection through an optional proxy and TLS.
pub mod transport;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::BridgeConfig;

// Console types
pub use console::{InputSource, KeystrokeInput, OutputBuffer, OutputSink, ScriptedInput};

// Error types
pub use error::{ConnectError, Error, QueueError, Result};

// Identifier types
pub use identifiers::SessionId;

// Protocol types
pub use protocol::{Chunk, CloseInfo, Inbound, Payload};

// Request types
pub use request::BridgeRequest;

// Session types
pub use session::{
    Direction, InterruptLevel, Interrupter, OutboundHandle, OutboundQueue, Response,
    ResponseParts, SessionState, WebsocketBridge,
};

// Transport types
pub use transport::{ProxyConfig, ProxyType, TlsCredential, TlsOptions};
