//! Handshake header conversion.
//!
//! Request headers supplied by the caller are forwarded on the WebSocket
//! opening handshake, minus the headers the handshake itself owns.

// ============================================================================
// Constants
// ============================================================================

/// Headers generated by the WebSocket client during the handshake.
pub const HANDSHAKE_OWNED_HEADERS: [&str; 6] = [
    "upgrade",
    "connection",
    "origin",
    "host",
    "sec-websocket-key",
    "sec-websocket-version",
];

/// User agent sent when the caller provides none.
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Conversion
// ============================================================================

/// Converts caller headers into the extra headers of the handshake request.
///
/// Order is preserved. Handshake-owned headers are dropped (case-insensitive)
/// and a `User-Agent` is appended when none is present. An empty header list
/// converts to an empty list.
#[must_use]
pub fn to_handshake_headers(headers: &[(String, String)]) -> Vec<(String, String)> {
    if headers.is_empty() {
        return Vec::new();
    }

    let mut converted: Vec<(String, String)> = headers
        .iter()
        .filter(|(name, _)| !is_handshake_owned(name))
        .cloned()
        .collect();

    let has_user_agent = converted
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("user-agent"));
    if !has_user_agent {
        converted.push(("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string()));
    }

    converted
}

/// Returns `true` if `name` is generated by the handshake itself.
#[inline]
#[must_use]
pub fn is_handshake_owned(name: &str) -> bool {
    HANDSHAKE_OWNED_HEADERS
        .iter()
        .any(|owned| owned.eq_ignore_ascii_case(name.trim()))
}

/// Parses a `Name: value` header line.
///
/// Returns `None` when there is no colon or the name is empty.
#[must_use]
pub fn parse_header_line(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

// ============================================================================
// Tests
// ============================================================================
