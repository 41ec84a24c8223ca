//! Type-safe identifiers.
//!
//! Newtype wrappers keep identifiers from being mixed with plain strings.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use uuid::Uuid;

// ============================================================================
// SessionId
// ============================================================================

/// Identifier of one bridge session.
///
/// A fresh id is generated for every call to
/// [`WebsocketBridge::send`](crate::WebsocketBridge::send) and recorded on the
/// session's tracing span so log lines from the listener and sender tasks can
/// be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a new random session id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
