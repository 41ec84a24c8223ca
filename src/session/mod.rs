//! Interactive session: controller, concurrent units and result.
//!
//! One [`WebsocketBridge::send`] call drives one session. The controller runs
//! on the caller's thread and pumps local input; the listener and the sender
//! run as tasks on a runtime owned by the session.
//!
//! ```text
//!  input ──► controller ──► OutboundQueue ──► sender ──► connection
//!                                                             │
//!  output ◄────────────────────────────────── listener ◄──────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `controller` | [`WebsocketBridge`] and the session lifecycle |
//! | `interrupt` | Graceful and forced interrupts |
//! | `listener` | Receive loop |
//! | `queue` | Bounded outbound queue with sentinel, and [`OutboundHandle`] |
//! | `response` | [`Response`] synthesis |
//! | `sender` | Send loop |
//! | `state` | Session and unit states, and the close slot |
//! | `transcript` | Optional exchange log |

// ============================================================================
// Submodules
// ============================================================================

mod controller;
mod interrupt;
mod listener;
mod queue;
mod response;
mod sender;
mod state;
mod transcript;

// ============================================================================
// Re-exports
// ============================================================================

pub use controller::{INTERRUPTED_BY_USER, WebsocketBridge};
pub use interrupt::{InterruptLevel, Interrupter};
pub use queue::{OutboundHandle, OutboundQueue};
pub use response::{OK_STATUS, Response, ResponseParts};
pub use state::{ListenerState, SenderState, SessionState};
pub use transcript::Direction;
