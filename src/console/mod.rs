//! Local console: input sources, continuation handling and serialized output.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `continuation` | Trailing-backslash continuation escape |
//! | `input` | Non-blocking line sources |
//! | `output` | Mutex-guarded output sink |

// ============================================================================
// Submodules
// ============================================================================

/// Trailing-backslash continuation escape.
pub mod continuation;

/// Non-blocking line sources.
pub mod input;

/// Mutex-guarded output sink.
pub mod output;

// ============================================================================
// Re-exports
// ============================================================================

pub use continuation::{ContinuationBuffer, unescape_trailing};
#[cfg(unix)]
pub use input::FdPollInput;
pub use input::{
    InputSource, KeystrokeInput, LineAssembler, LineKey, ScriptedInput, default_source,
};
pub use output::{OutputBuffer, OutputSink};
