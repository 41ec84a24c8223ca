//! Append-only log of the exchanged payloads.
//!
//! Each entry is a direction marker, a space, the payload bytes and a line
//! break:
//!
//! ```text
//! > hello
//! < hello
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;

// ============================================================================
// Direction
// ============================================================================

/// Direction of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent to the peer.
    Outbound,
    /// Received from the peer.
    Inbound,
}

impl Direction {
    /// Returns the entry marker.
    #[inline]
    #[must_use]
    pub const fn marker(self) -> u8 {
        match self {
            Self::Outbound => b'>',
            Self::Inbound => b'<',
        }
    }
}

// ============================================================================
// Transcript
// ============================================================================

/// Shared transcript buffer. Clones append to the same log.
#[derive(Debug, Clone, Default)]
pub(crate) struct Transcript {
    log: Arc<Mutex<Vec<u8>>>,
}

impl Transcript {
    /// Appends one entry.
    pub(crate) fn record(&self, direction: Direction, payload: &[u8]) {
        let mut log = self.log.lock();
        log.reserve(payload.len() + 3);
        log.push(direction.marker());
        log.push(b' ');
        log.extend_from_slice(payload);
        log.push(b'\n');
    }

    /// Returns a copy of the log.
    pub(crate) fn snapshot(&self) -> Vec<u8> {
        self.log.lock().clone()
    }
}

// ============================================================================
// Tests
// ============================================================================
