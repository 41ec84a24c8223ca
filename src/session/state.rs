//! Session, listener and sender states, plus the shared close record.
//!
//! | Unit | Transitions |
//! |------|-------------|
//! | Listener | `Idle` -> `Listening` -> `Closed` or `Errored` |
//! | Sender | `Idle` -> `Sending` -> `Closed` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::protocol::CloseInfo;

// ============================================================================
// SessionState
// ============================================================================

/// Lifecycle of one session. Only the controller changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Created, nothing attempted yet.
    #[default]
    Idle,
    /// Connection establishment in progress.
    Connecting,
    /// Connected; listener and sender running.
    Open,
    /// Teardown in progress.
    Closing,
    /// Torn down.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Unit States
// ============================================================================

/// State of the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenerState {
    /// Not spawned yet.
    #[default]
    Idle,
    /// Reading frames.
    Listening,
    /// Stopped after a close, end of stream or cancellation.
    Closed,
    /// Stopped on an unexpected error.
    Errored,
}

/// State of the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderState {
    /// Not spawned yet.
    #[default]
    Idle,
    /// Draining the outbound queue.
    Sending,
    /// Stopped.
    Closed,
}

/// State of one unit, written by the unit and read by the controller.
#[derive(Debug, Clone, Default)]
pub(crate) struct UnitState<T> {
    state: Arc<Mutex<T>>,
}

impl<T: Copy + fmt::Debug> UnitState<T> {
    pub(crate) fn get(&self) -> T {
        *self.state.lock()
    }

    pub(crate) fn set(&self, next: T) {
        let mut state = self.state.lock();
        trace!(from = ?*state, to = ?next, "Unit state changed");
        *state = next;
    }
}

// ============================================================================
// CloseSlot
// ============================================================================

/// Close information of a session, written once.
///
/// The first writer wins: a locally recorded interruption is not replaced
/// by the peer's reply to our close frame.
#[derive(Debug, Clone, Default)]
pub(crate) struct CloseSlot {
    info: Arc<Mutex<Option<CloseInfo>>>,
}

impl CloseSlot {
    /// Records `info` unless something was recorded already.
    ///
    /// Returns `true` if `info` was stored.
    pub(crate) fn record(&self, info: CloseInfo) -> bool {
        let mut slot = self.info.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(info);
        true
    }

    /// Returns the recorded information.
    pub(crate) fn get(&self) -> Option<CloseInfo> {
        self.info.lock().clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_slot_first_writer_wins() {
        let slot = CloseSlot::default();
        assert!(slot.get().is_none());

        assert!(slot.record(CloseInfo::abnormal("Interrupted by user")));
        assert!(!slot.record(CloseInfo::closed_by_user()));

        let info = slot.get().unwrap();
        assert_eq!(info.code, 1006);
        assert_eq!(info.reason, "Interrupted by user");
    }

    #[test]
    fn test_close_slot_is_shared_between_clones() {
        let slot = CloseSlot::default();
        let clone = slot.clone();
        clone.record(CloseInfo::new(1001, "going away"));
        assert_eq!(slot.get().unwrap().code, 1001);
    }

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::default(), SessionState::Idle);
        assert_eq!(SessionState::Closing.to_string(), "closing");
    }

    #[test]
    fn test_unit_state_is_shared_between_clones() {
        let state = UnitState::<SenderState>::default();
        assert_eq!(state.get(), SenderState::Idle);

        let unit = state.clone();
        unit.set(SenderState::Sending);
        assert_eq!(state.get(), SenderState::Sending);

        unit.set(SenderState::Closed);
        assert_eq!(state.get(), SenderState::Closed);
    }
}
