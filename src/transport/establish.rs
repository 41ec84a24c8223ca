//! Connection establishment.
//!
//! Opens the TCP stream (directly or through the primary proxy), runs the
//! TLS and WebSocket handshakes under one timeout, and classifies every
//! failure into a [`ConnectError`].
//!
//! | Failure | Classified as |
//! |---------|---------------|
//! | malformed URL, non-WebSocket scheme | [`ConnectError::InvalidTarget`] |
//! | TCP or proxy failure | [`ConnectError::Unreachable`] |
//! | timeout elapsed | [`ConnectError::Timeout`] |
//! | non-101 handshake response | [`ConnectError::HandshakeRejected`] |
//! | anything else during the handshake | [`ConnectError::InvalidHandshake`] |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::timeout;
use tokio_tungstenite::client_async_tls_with_config;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tracing::{debug, info, warn};
use url::Url;

use crate::console::OutputSink;
use crate::error::ConnectError;
use crate::protocol::to_handshake_headers;
use crate::request::BridgeRequest;

use super::connection::ConnectionHandle;
use super::proxy::{ProxyConfig, open_stream};

// ============================================================================
// connect
// ============================================================================

/// Opens a WebSocket connection for `request`.
///
/// `default_timeout` applies when the request carries no timeout. The
/// timeout covers the proxy tunnel, TLS and WebSocket handshakes together.
///
/// # Errors
///
/// Returns the [`ConnectError`] variant matching the failure; see the
/// module table.
pub async fn connect(
    request: &BridgeRequest,
    default_timeout: Duration,
    output: &OutputSink,
) -> Result<ConnectionHandle, ConnectError> {
    let url = parse_target(&request.url)?;
    let host = url
        .host_str()
        .ok_or_else(|| ConnectError::invalid_target(format!("{} has no host", request.url)))?
        .trim_matches(|c| c == '[' || c == ']')
        .to_string();
    let port = url
        .port_or_known_default()
        .ok_or_else(|| ConnectError::invalid_target(format!("{} has no port", request.url)))?;
    let secure = url.scheme() == "wss";

    let proxy = select_proxy(&request.proxies, output);
    let handshake_request = build_request(&url, &request.headers)?;
    let connect_timeout = request.effective_timeout(default_timeout);

    debug!(
        url = %url,
        proxy = ?proxy.map(ProxyConfig::display_url),
        timeout = ?connect_timeout,
        "Connecting"
    );

    let handshake = async {
        let connector = request.tls.connector(secure, output).await?;
        let stream = open_stream(proxy, &host, port).await?;
        client_async_tls_with_config(handshake_request, stream, None, connector)
            .await
            .map_err(classify_handshake_error)
    };

    let (stream, response) = timeout(connect_timeout, handshake).await.map_err(|_| {
        let timeout_ms = u64::try_from(connect_timeout.as_millis()).unwrap_or(u64::MAX);
        ConnectError::timeout(timeout_ms)
    })??;

    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    info!(url = %url, status = response.status().as_u16(), "WebSocket connected");

    Ok(ConnectionHandle::new(stream, url, headers))
}

// ============================================================================
// Helpers
// ============================================================================

/// Parses and checks the target URL.
fn parse_target(raw: &str) -> Result<Url, ConnectError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConnectError::invalid_target(format!("{raw}: {e}")))?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ConnectError::invalid_target(format!(
            "unsupported scheme '{other}' in {raw}, expected ws or wss"
        ))),
    }
}

/// Picks the primary proxy and reports the ignored ones.
fn select_proxy<'a>(proxies: &'a [ProxyConfig], output: &OutputSink) -> Option<&'a ProxyConfig> {
    let (primary, ignored) = proxies.split_first()?;

    if !ignored.is_empty() {
        let ignored = ignored
            .iter()
            .map(ProxyConfig::display_url)
            .collect::<Vec<_>>()
            .join(", ");
        output.warn(&format!(
            "Only one proxy is supported, using {} and ignoring {ignored}",
            primary.display_url()
        ));
        warn!(primary = %primary.display_url(), ignored = %ignored, "Extra proxies ignored");
    }

    Some(primary)
}

/// Builds the handshake request with the caller's headers.
fn build_request(url: &Url, headers: &[(String, String)]) -> Result<Request, ConnectError> {
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| ConnectError::invalid_target(e.to_string()))?;

    for (name, value) in to_handshake_headers(headers) {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ConnectError::invalid_handshake(format!("invalid header name '{name}': {e}"))
        })?;
        let header_value = HeaderValue::from_str(&value).map_err(|e| {
            ConnectError::invalid_handshake(format!("invalid value for header '{name}': {e}"))
        })?;
        request.headers_mut().append(header_name, header_value);
    }

    Ok(request)
}

/// Maps a handshake failure onto the connect taxonomy.
fn classify_handshake_error(err: WsError) -> ConnectError {
    match err {
        WsError::Http(response) => {
            let body = response
                .body()
                .as_deref()
                .map(|body| String::from_utf8_lossy(body).into_owned())
                .unwrap_or_default();
            ConnectError::handshake_rejected(response.status().as_u16(), body)
        }
        WsError::Url(e) => ConnectError::invalid_target(e.to_string()),
        WsError::Io(e) => ConnectError::unreachable(e.to_string()),
        WsError::Tls(e) => ConnectError::invalid_handshake(format!("TLS handshake failed: {e}")),
        other => ConnectError::invalid_handshake(other.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================
