//! Inbound half of a session.
//!
//! The listener owns the read half of the connection. It prints data frames,
//! records the peer's close frame and, whenever it stops on its own, seals
//! the outbound queue so the sender stops too.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::console::OutputSink;
use crate::error::is_closed_ws_error;
use crate::protocol::{CloseInfo, Inbound};
use crate::transport::ConnectionHandle;

use super::queue::OutboundQueue;
use super::state::{CloseSlot, ListenerState, UnitState};
use super::transcript::{Direction, Transcript};

// ============================================================================
// Listener
// ============================================================================

/// Receive loop of one session.
pub(crate) struct Listener {
    pub(crate) handle: Arc<ConnectionHandle>,
    pub(crate) output: OutputSink,
    pub(crate) queue: OutboundQueue,
    pub(crate) close: CloseSlot,
    pub(crate) transcript: Option<Transcript>,
    pub(crate) recv_timeout: Duration,
    pub(crate) cancel: CancellationToken,
    pub(crate) state: UnitState<ListenerState>,
}

impl Listener {
    /// Runs until the connection closes, fails, or the session cancels.
    pub(crate) async fn run(self) -> ListenerState {
        let state = self.listen().await;
        self.state.set(state);
        state
    }

    async fn listen(&self) -> ListenerState {
        let Some(mut reader) = self.handle.take_reader() else {
            self.output
                .line("Another WebSocket receiver is already running on this connection");
            error!("Connection read half already taken");
            self.queue.finish();
            return ListenerState::Errored;
        };

        self.state.set(ListenerState::Listening);
        debug!("Listener started");

        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    debug!("Listener cancelled");
                    return ListenerState::Closed;
                }
                next = timeout(self.recv_timeout, reader.next()) => next,
            };

            let Ok(next) = next else {
                continue;
            };

            match next {
                Some(Ok(Message::Text(text))) => {
                    self.deliver(Inbound::Text(text.as_str().to_string()));
                }
                Some(Ok(Message::Binary(data))) => {
                    self.deliver(Inbound::Binary(data.to_vec()));
                }
                Some(Ok(Message::Close(frame))) => {
                    let info = CloseInfo::from_frame(frame.as_ref());
                    self.stop_closed(info);
                    return ListenerState::Closed;
                }
                Some(Ok(other)) => {
                    trace!(kind = ?other, "Control frame ignored");
                }
                Some(Err(e)) if is_closed_ws_error(&e) => {
                    debug!(error = %e, "Connection closed while listening");
                    self.stop_closed(CloseInfo::abnormal(""));
                    return ListenerState::Closed;
                }
                Some(Err(e)) => {
                    self.output
                        .line(&format!("Unexpected error while listening: {e}"));
                    error!(error = %e, "Listener failed");
                    self.close.record(CloseInfo::abnormal(e.to_string()));
                    self.handle.mark_closed();
                    self.queue.finish();
                    return ListenerState::Errored;
                }
                None => {
                    debug!("Inbound stream ended");
                    self.stop_closed(CloseInfo::abnormal(""));
                    return ListenerState::Closed;
                }
            }
        }
    }

    fn deliver(&self, message: Inbound) {
        self.output.payload(message.as_bytes());
        if let Some(transcript) = &self.transcript {
            transcript.record(Direction::Inbound, message.as_bytes());
        }
    }

    /// Records the close, reports it unless we started the close, and
    /// unblocks the sender.
    fn stop_closed(&self, info: CloseInfo) {
        let initiated_locally = self.handle.is_closing();
        self.handle.mark_closed();
        self.close.record(info.clone());

        if initiated_locally {
            debug!(code = info.code, reason = %info.reason, "Close handshake completed");
        } else {
            let recorded = self.close.get().unwrap_or(info);
            self.output.line(&format!(
                "Connection closed when listening with code: {}, reason: {}",
                recorded.code, recorded.reason
            ));
            debug!(code = recorded.code, reason = %recorded.reason, "Connection closed by peer");
        }

        self.queue.finish();
    }
}

// ============================================================================
// Tests
// ============================================================================
