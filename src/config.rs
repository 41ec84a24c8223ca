//! Bridge configuration.
//!
//! [`BridgeConfig`] holds the knobs that stay the same across sessions:
//! queue bound, the bounded-wait intervals used by every loop, the exit
//! keywords and optional features.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use wsbridge::BridgeConfig;
//!
//! let config = BridgeConfig::new()
//!     .with_queue_size(64)
//!     .with_close_timeout(Duration::from_secs(2))
//!     .with_transcript();
//!
//! assert!(config.transcript);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default outbound queue bound.
pub const DEFAULT_QUEUE_SIZE: usize = 1024;

/// Default bounded wait of one input poll.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default bounded wait of one listener receive.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Default bounded wait of one sender queue pop.
pub const DEFAULT_SEND_WAIT: Duration = Duration::from_secs(1);

/// Default time allowed for the close handshake during teardown.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(4);

/// Default connect timeout when the request carries no hint.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Words that end the session when typed on their own line.
pub const DEFAULT_EXIT_KEYWORDS: [&str; 2] = ["exit", "quit"];

// ============================================================================
// BridgeConfig
// ============================================================================

/// Session-independent bridge settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Maximum number of pending outbound payloads.
    pub queue_size: usize,

    /// Bounded wait of one input poll.
    pub poll_interval: Duration,

    /// Bounded wait of one listener receive.
    pub recv_timeout: Duration,

    /// Bounded wait of one sender queue pop.
    pub send_wait: Duration,

    /// Time allowed for the close handshake and the sender drain.
    pub close_timeout: Duration,

    /// Connect timeout used when the request has no timeout hint.
    pub connect_timeout: Duration,

    /// Case-insensitive words that end the session.
    pub exit_keywords: Vec<String>,

    /// Record every sent and received payload.
    pub transcript: bool,

    /// Install a Ctrl+C handler for the duration of each session.
    pub handle_ctrl_c: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl BridgeConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue_size: DEFAULT_QUEUE_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            send_wait: DEFAULT_SEND_WAIT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            exit_keywords: DEFAULT_EXIT_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
            transcript: false,
            handle_ctrl_c: true,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BridgeConfig {
    /// Sets the outbound queue bound.
    #[inline]
    #[must_use]
    pub fn with_queue_size(mut self, size: usize) -> Self {
        self.queue_size = size;
        self
    }

    /// Sets the input poll interval.
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the listener receive wait.
    #[inline]
    #[must_use]
    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Sets the sender pop wait.
    #[inline]
    #[must_use]
    pub fn with_send_wait(mut self, wait: Duration) -> Self {
        self.send_wait = wait;
        self
    }

    /// Sets the close handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Sets the default connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Replaces the exit keywords.
    #[must_use]
    pub fn with_exit_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exit_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Enables the transcript buffer.
    #[inline]
    #[must_use]
    pub fn with_transcript(mut self) -> Self {
        self.transcript = true;
        self
    }

    /// Disables the built-in Ctrl+C handler.
    ///
    /// Interrupts can still be delivered through
    /// [`WebsocketBridge::interrupter`](crate::WebsocketBridge::interrupter).
    #[inline]
    #[must_use]
    pub fn without_ctrl_c(mut self) -> Self {
        self.handle_ctrl_c = false;
        self
    }
}

// ============================================================================
// Queries
// ============================================================================

impl BridgeConfig {
    /// Returns `true` if `line` is one of the exit keywords.
    #[must_use]
    pub fn is_exit_keyword(&self, line: &str) -> bool {
        let line = line.trim();
        self.exit_keywords
            .iter()
            .any(|keyword| keyword.eq_ignore_ascii_case(line))
    }

    /// Checks that the configuration can drive a session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero queue bound or a zero wait.
    pub fn validate(&self) -> Result<()> {
        if self.queue_size == 0 {
            return Err(Error::config("queue size must be at least 1"));
        }

        let waits = [
            ("poll interval", self.poll_interval),
            ("receive timeout", self.recv_timeout),
            ("send wait", self.send_wait),
            ("connect timeout", self.connect_timeout),
        ];
        for (name, wait) in waits {
            if wait.is_zero() {
                return Err(Error::config(format!("{name} must be non-zero")));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
