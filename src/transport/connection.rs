//! Established WebSocket connection.
//!
//! The stream is split by direction on creation. The read half is handed
//! out exactly once, to the listener; the write half stays behind an async
//! mutex shared by the sender and the session's close path.
//!
//! # Lifecycle
//!
//! | Flag | Set by | Meaning |
//! |------|--------|---------|
//! | `open` | establish, cleared by [`ConnectionHandle::mark_closed`] | peer may still exchange data |
//! | `close_sent` | [`ConnectionHandle::close`] | our close frame went out |
//! | `released` | [`ConnectionHandle::release`] | socket shut down |

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::SinkExt;
use futures_util::stream::{SplitSink, SplitStream, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result, is_closed_ws_error};
use crate::protocol::CloseInfo;

// ============================================================================
// Types
// ============================================================================

/// WebSocket stream over plain TCP or TLS.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of a [`WsStream`].
pub type WsWriter = SplitSink<WsStream, Message>;

/// Read half of a [`WsStream`].
pub type WsReader = SplitStream<WsStream>;

// ============================================================================
// ConnectionHandle
// ============================================================================

/// An open WebSocket connection owned by one session.
///
/// # Thread Safety
///
/// `ConnectionHandle` is `Send + Sync`; the session shares it with its
/// listener and sender through an `Arc`.
pub struct ConnectionHandle {
    url: Url,
    response_headers: Vec<(String, String)>,
    writer: tokio::sync::Mutex<WsWriter>,
    reader: Mutex<Option<WsReader>>,
    open: AtomicBool,
    close_sent: AtomicBool,
    released: AtomicBool,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("url", &self.url.as_str())
            .field("open", &self.is_open())
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}

impl ConnectionHandle {
    /// Wraps a freshly handshaken stream.
    pub(crate) fn new(stream: WsStream, url: Url, response_headers: Vec<(String, String)>) -> Self {
        let (writer, reader) = stream.split();

        Self {
            url,
            response_headers,
            writer: tokio::sync::Mutex::new(writer),
            reader: Mutex::new(Some(reader)),
            open: AtomicBool::new(true),
            close_sent: AtomicBool::new(false),
            released: AtomicBool::new(false),
        }
    }

    /// Returns the connected URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the headers of the handshake response.
    #[inline]
    #[must_use]
    pub fn response_headers(&self) -> &[(String, String)] {
        &self.response_headers
    }

    /// Returns `true` while the connection can carry data.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Returns `true` once our close frame has been sent.
    #[inline]
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.close_sent.load(Ordering::Acquire)
    }

    /// Returns `true` once the socket has been released.
    #[inline]
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Records that the connection can no longer carry data.
    pub(crate) fn mark_closed(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            debug!(url = %self.url, "Connection marked closed");
        }
    }

    /// Hands out the read half.
    ///
    /// Returns `None` on every call after the first: a connection has one
    /// reader at most.
    pub(crate) fn take_reader(&self) -> Option<WsReader> {
        self.reader.lock().take()
    }

    /// Sends one message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection is closed or
    /// closes while sending, [`Error::WebSocket`] for other transport
    /// failures.
    pub(crate) async fn send(&self, message: Message) -> Result<()> {
        if self.is_released() {
            return Err(Error::ConnectionClosed);
        }

        let mut writer = self.writer.lock().await;
        writer.send(message).await.map_err(|e| {
            if is_closed_ws_error(&e) {
                self.mark_closed();
                Error::ConnectionClosed
            } else {
                Error::WebSocket(e)
            }
        })
    }

    /// Starts the closing handshake.
    ///
    /// Only the first call sends a frame; later calls return `Ok(false)`.
    /// A connection that already closed is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocket`] if the frame cannot be written for a
    /// reason other than the connection being closed.
    pub(crate) async fn close(&self, info: &CloseInfo) -> Result<bool> {
        if self.close_sent.swap(true, Ordering::AcqRel) || self.is_released() {
            return Ok(false);
        }

        debug!(code = info.code, reason = %info.reason, "Sending close frame");

        let mut writer = self.writer.lock().await;
        match writer.send(Message::Close(Some(info.to_frame()))).await {
            Ok(()) => Ok(true),
            Err(e) if is_closed_ws_error(&e) => {
                trace!(error = %e, "Close frame after connection end");
                Ok(false)
            }
            Err(e) => Err(Error::WebSocket(e)),
        }
    }

    /// Shuts the socket down.
    ///
    /// Idempotent: only the first call touches the socket.
    pub(crate) async fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.mark_closed();

        drop(self.reader.lock().take());

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.close().await {
            trace!(error = %e, "Socket shutdown reported an error");
        }

        debug!(url = %self.url, "Connection released");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::{EchoServer, connect_raw};

    #[tokio::test]
    async fn test_reader_is_handed_out_once() {
        let server = EchoServer::start().await;
        let handle = connect_raw(&server.url()).await;

        assert!(handle.take_reader().is_some());
        assert!(handle.take_reader().is_none());
    }

    #[tokio::test]
    async fn test_close_and_release_are_idempotent() {
        let server = EchoServer::start().await;
        let handle = connect_raw(&server.url()).await;
        let info = CloseInfo::closed_by_user();

        assert!(handle.close(&info).await.unwrap());
        assert!(!handle.close(&info).await.unwrap());

        handle.release().await;
        handle.release().await;
        assert!(handle.is_released());
        assert!(!handle.is_open());
    }

    #[tokio::test]
    async fn test_send_after_release_fails() {
        let server = EchoServer::start().await;
        let handle = connect_raw(&server.url()).await;
        handle.release().await;

        let err = handle
            .send(Message::Text(String::from("late").into()))
            .await
            .unwrap_err();
        assert!(err.is_connection_closed());
    }
}
