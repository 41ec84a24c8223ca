//! WebSocket protocol types.
//!
//! This module defines what travels over the connection and how it is
//! described to the caller.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `close` | Close frame payload codec and [`CloseInfo`] |
//! | `headers` | Handshake header conversion |
//! | `payload` | Outbound [`Payload`] and inbound [`Inbound`] messages |

// ============================================================================
// Submodules
// ============================================================================

/// Close frame information.
pub mod close;

/// Handshake header conversion.
pub mod headers;

/// Outbound payloads and inbound messages.
pub mod payload;

// ============================================================================
// Re-exports
// ============================================================================

pub use close::{
    CLOSE_ABNORMAL, CLOSE_GOING_AWAY, CLOSE_NO_STATUS, CLOSE_NORMAL, CLOSED_BY_USER, CloseInfo,
};
pub use headers::{DEFAULT_USER_AGENT, to_handshake_headers};
pub use payload::{Chunk, ChunkStream, Inbound, Payload};
