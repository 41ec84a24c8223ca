//! Terminal result of a session.
//!
//! [`Response`] mirrors what a synchronous HTTP adapter returns: a status,
//! headers, a body and a replayable raw stream. It is built once, after
//! teardown, by [`Response::synthesize`] from a [`ResponseParts`] snapshot.
//!
//! | Situation | Status | Body |
//! |-----------|--------|------|
//! | session ran | 200 | `Close Code: <code>\nReason: <reason>` |
//! | connect failed | mapped status | failure detail |
//! | override given | override status | override message |

// ============================================================================
// Imports
// ============================================================================

use std::io::{Cursor, Read};

use crate::protocol::CloseInfo;

// ============================================================================
// Constants
// ============================================================================

/// Status of a session that connected.
pub const OK_STATUS: u16 = 200;

// ============================================================================
// ResponseParts
// ============================================================================

/// Session state captured at the end of teardown.
#[derive(Debug, Clone, Default)]
pub struct ResponseParts {
    /// Target URL as requested.
    pub url: String,
    /// Status override, set for connect failures.
    pub status: Option<u16>,
    /// Body override, set for connect failures.
    pub message: Option<String>,
    /// Handshake response headers, if a connection ever existed.
    pub headers: Option<Vec<(String, String)>>,
    /// Observed or locally recorded close information.
    pub close_info: Option<CloseInfo>,
    /// Transcript bytes, if recording was enabled.
    pub transcript: Option<Vec<u8>>,
}

// ============================================================================
// Response
// ============================================================================

/// Result of [`WebsocketBridge::send`](crate::WebsocketBridge::send).
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP-like status code.
    pub status: u16,
    /// Target URL.
    pub url: String,
    /// Close reason, or the failure detail when the session never opened.
    pub reason: String,
    /// Handshake response headers; empty if the connection never opened.
    pub headers: Vec<(String, String)>,
    /// Descriptive body.
    pub body: String,
    /// Close information; 1006 when nothing was observed.
    pub close_info: CloseInfo,
    raw: Cursor<Vec<u8>>,
}

impl Response {
    /// Builds the response from the final session state.
    #[must_use]
    pub fn synthesize(parts: ResponseParts) -> Self {
        let close_info = parts.close_info.unwrap_or_else(|| CloseInfo::abnormal(""));

        let body = parts
            .message
            .clone()
            .unwrap_or_else(|| close_info.to_string());
        let reason = parts
            .message
            .filter(|_| parts.headers.is_none())
            .unwrap_or_else(|| close_info.reason.clone());

        let raw = parts
            .transcript
            .unwrap_or_else(|| body.clone().into_bytes());

        Self {
            status: parts.status.unwrap_or(OK_STATUS),
            url: parts.url,
            reason,
            headers: parts.headers.unwrap_or_default(),
            body,
            close_info,
            raw: Cursor::new(raw),
        }
    }

    /// Returns the first header named `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns `true` for a 2xx status.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the raw stream: the transcript when recorded, otherwise the
    /// body.
    #[inline]
    pub fn raw(&mut self) -> &mut Cursor<Vec<u8>> {
        &mut self.raw
    }

    /// Consumes the response into its raw stream, rewound to the start.
    #[must_use]
    pub fn into_raw(mut self) -> Cursor<Vec<u8>> {
        self.raw.set_position(0);
        self.raw
    }

    /// Returns the whole raw stream, whatever has been read from it.
    #[must_use]
    pub fn raw_bytes(&self) -> &[u8] {
        self.raw.get_ref()
    }
}

impl Read for Response {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.raw.read(buf)
    }
}

// ============================================================================
// Tests
// ============================================================================
