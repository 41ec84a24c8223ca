//! Close frame information.
//!
//! A close control frame carries an optional payload: a 2-byte big-endian
//! status code followed by a UTF-8 reason. [`CloseInfo`] is the decoded pair,
//! whether it came from the remote peer or was synthesized locally.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

// ============================================================================
// Constants
// ============================================================================

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Endpoint is going away.
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// A close frame arrived without a status code.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// The connection ended without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Reason sent with every locally initiated close.
pub const CLOSED_BY_USER: &str = "Closed by user";

// ============================================================================
// CloseInfo
// ============================================================================

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseInfo {
    /// Close status code.
    pub code: u16,
    /// Close reason, possibly empty.
    pub reason: String,
}

impl CloseInfo {
    /// Creates close info from a code and reason.
    #[inline]
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Close info for a normal, user-initiated close.
    #[inline]
    #[must_use]
    pub fn closed_by_user() -> Self {
        Self::new(CLOSE_NORMAL, CLOSED_BY_USER)
    }

    /// Close info for a connection that ended without a close handshake.
    #[inline]
    #[must_use]
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(CLOSE_ABNORMAL, reason)
    }

    /// Decodes a close frame payload.
    ///
    /// An empty payload means "no status code" (1005). A single stray byte is
    /// not a valid code and is treated the same way. Invalid UTF-8 in the
    /// reason is replaced rather than rejected.
    #[must_use]
    pub fn decode(payload: &[u8]) -> Self {
        match payload {
            [hi, lo, reason @ ..] => Self {
                code: u16::from_be_bytes([*hi, *lo]),
                reason: String::from_utf8_lossy(reason).into_owned(),
            },
            _ => Self::new(CLOSE_NO_STATUS, ""),
        }
    }

    /// Encodes this close info as a close frame payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(2 + self.reason.len());
        payload.extend_from_slice(&self.code.to_be_bytes());
        payload.extend_from_slice(self.reason.as_bytes());
        payload
    }

    /// Converts into a tungstenite close frame for sending.
    #[must_use]
    pub fn to_frame(&self) -> CloseFrame {
        CloseFrame {
            code: CloseCode::from(self.code),
            reason: self.reason.clone().into(),
        }
    }

    /// Converts an optional received close frame.
    ///
    /// `None` means the peer sent a close frame with an empty payload.
    #[must_use]
    pub fn from_frame(frame: Option<&CloseFrame>) -> Self {
        match frame {
            Some(frame) => {
                let reason: &str = &frame.reason;
                Self::new(u16::from(frame.code), reason)
            }
            None => Self::new(CLOSE_NO_STATUS, ""),
        }
    }
}

impl fmt::Display for CloseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Close Code: {}\nReason: {}", self.code, self.reason)
    }
}

// ============================================================================
// Tests
// ============================================================================
