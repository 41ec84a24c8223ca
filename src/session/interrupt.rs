//! User interrupts.
//!
//! The first interrupt asks the session to wind down gracefully; a second one
//! abandons the remaining teardown waits. Ctrl+C feeds the same
//! [`Interrupter`] that library callers can trigger directly.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

// ============================================================================
// InterruptLevel
// ============================================================================

/// Effect of one [`Interrupter::trigger`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptLevel {
    /// Close gracefully.
    Graceful,
    /// Skip the remaining waits and abort.
    Forced,
}

// ============================================================================
// Interrupter
// ============================================================================

#[derive(Debug, Default)]
struct Tokens {
    interrupt: CancellationToken,
    force: CancellationToken,
}

/// Clonable handle that interrupts the running session.
///
/// Each [`WebsocketBridge::send`](crate::WebsocketBridge::send) call starts
/// with fresh tokens, so an interrupt never leaks into the next session.
#[derive(Debug, Clone, Default)]
pub struct Interrupter {
    tokens: Arc<Mutex<Tokens>>,
}

impl Interrupter {
    /// Creates an idle interrupter.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupts the session, escalating on repeated calls.
    pub fn trigger(&self) -> InterruptLevel {
        let tokens = self.tokens.lock();
        if tokens.interrupt.is_cancelled() {
            tokens.force.cancel();
            warn!("Forced shutdown requested");
            InterruptLevel::Forced
        } else {
            tokens.interrupt.cancel();
            debug!("Interrupt requested");
            InterruptLevel::Graceful
        }
    }

    /// Returns `true` once the current session was interrupted.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.tokens.lock().interrupt.is_cancelled()
    }

    /// Returns the interrupt and force tokens of the current session.
    pub(crate) fn tokens(&self) -> (CancellationToken, CancellationToken) {
        let tokens = self.tokens.lock();
        (tokens.interrupt.clone(), tokens.force.clone())
    }

    /// Installs fresh tokens for the next session.
    pub(crate) fn reset(&self) {
        *self.tokens.lock() = Tokens::default();
    }

    /// Forwards Ctrl+C presses until a forced shutdown.
    pub(crate) async fn watch_ctrl_c(self) {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Ctrl+C handler unavailable");
                return;
            }
            if self.trigger() == InterruptLevel::Forced {
                return;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
