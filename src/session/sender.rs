//! Outbound half of a session.
//!
//! The sender drains the outbound queue in FIFO order and writes each
//! payload to the connection until it pops the sentinel.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::console::OutputSink;
use crate::protocol::CloseInfo;
use crate::transport::ConnectionHandle;

use super::queue::{OutboundQueue, Pop};
use super::state::{CloseSlot, SenderState, UnitState};
use super::transcript::{Direction, Transcript};

// ============================================================================
// Sender
// ============================================================================

/// Send loop of one session.
pub(crate) struct Sender {
    pub(crate) handle: Arc<ConnectionHandle>,
    pub(crate) output: OutputSink,
    pub(crate) queue: OutboundQueue,
    pub(crate) close: CloseSlot,
    pub(crate) transcript: Option<Transcript>,
    pub(crate) send_wait: Duration,
    pub(crate) cancel: CancellationToken,
    pub(crate) state: UnitState<SenderState>,
}

impl Sender {
    /// Runs until the sentinel, a closed connection, or cancellation.
    pub(crate) async fn run(self) -> SenderState {
        self.state.set(SenderState::Sending);
        let state = self.drain().await;
        self.state.set(state);
        state
    }

    async fn drain(&self) -> SenderState {
        debug!("Sender started");
        let mut sent = 0usize;

        loop {
            let popped = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    debug!(sent, "Sender cancelled");
                    return SenderState::Closed;
                }
                popped = self.queue.pop(self.send_wait) => popped,
            };

            let payload = match popped {
                Pop::Payload(payload) => payload,
                Pop::Empty => continue,
                Pop::Done => {
                    debug!(sent, "Sentinel reached");
                    return SenderState::Closed;
                }
            };

            let message = match payload.into_message() {
                Ok(message) => message,
                Err(e) => {
                    self.output.line(&format!("Message skipped: {e}"));
                    error!(error = %e, "Invalid payload reached the sender");
                    continue;
                }
            };

            let logged = self.transcript.as_ref().map(|_| message.clone());

            match self.handle.send(message).await {
                Ok(()) => {
                    sent += 1;
                    trace!(sent, "Payload sent");
                    if let (Some(transcript), Some(logged)) = (&self.transcript, logged) {
                        transcript.record(Direction::Outbound, &logged.into_data());
                    }
                }
                Err(e) if e.is_connection_closed() => {
                    let info = self.close.get().unwrap_or_else(|| CloseInfo::abnormal(""));
                    self.output.line(&format!(
                        "Connection closed when sending with code: {}, reason: {}",
                        info.code, info.reason
                    ));
                    debug!(sent, "Connection closed while sending");
                    return SenderState::Closed;
                }
                Err(e) => {
                    self.output.line(&format!("Unexpected error when sending: {e}"));
                    warn!(error = %e, "Sender failed");
                    return SenderState::Closed;
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::{Chunk, Inbound, Payload};
    use crate::testing::{EchoServer, connect_raw};

    fn sender(handle: Arc<ConnectionHandle>, output: OutputSink) -> Sender {
        Sender {
            handle,
            output,
            queue: OutboundQueue::new(16),
            close: CloseSlot::default(),
            transcript: Some(Transcript::default()),
            send_wait: Duration::from_millis(20),
            cancel: CancellationToken::new(),
            state: UnitState::default(),
        }
    }

    #[tokio::test]
    async fn test_payloads_sent_in_order_until_sentinel() {
        let server = EchoServer::start().await;
        let handle = Arc::new(connect_raw(&server.url()).await);
        // Keeps the socket open until the echoes are read.
        let _conn = Arc::clone(&handle);
        let (output, _buffer) = OutputSink::buffer();
        let sender = sender(handle, output);
        let queue = sender.queue.clone();
        let transcript = sender.transcript.clone().unwrap();

        queue.push(Payload::text("m1")).unwrap();
        queue.push(Payload::binary(vec![1, 2, 3])).unwrap();
        queue
            .push(Payload::Chunks(vec![Chunk::Text("m".into()), Chunk::Text("3".into())]))
            .unwrap();
        queue.finish();

        assert_eq!(sender.run().await, SenderState::Closed);

        let received = server.wait_for_messages(3, Duration::from_secs(5)).await;
        assert_eq!(
            received,
            vec![
                Inbound::Text("m1".into()),
                Inbound::Binary(vec![1, 2, 3]),
                Inbound::Text("m3".into()),
            ]
        );
        assert_eq!(
            transcript.snapshot(),
            b"> m1\n> \x01\x02\x03\n> m3\n".to_vec()
        );
    }

    #[tokio::test]
    async fn test_sentinel_stops_without_forwarding_later_items() {
        let server = EchoServer::start().await;
        let handle = Arc::new(connect_raw(&server.url()).await);
        let (output, _buffer) = OutputSink::buffer();
        let sender = sender(handle, output);
        let queue = sender.queue.clone();

        queue.finish();
        assert!(queue.push(Payload::text("after")).is_err());
        assert_eq!(sender.run().await, SenderState::Closed);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(server.received().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_stream_is_reported_not_fatal() {
        let server = EchoServer::start().await;
        let handle = Arc::new(connect_raw(&server.url()).await);
        let _conn = Arc::clone(&handle);
        let (output, buffer) = OutputSink::buffer();
        let sender = sender(handle, output);
        let queue = sender.queue.clone();

        queue.push(Payload::stream(Vec::new())).unwrap();
        queue.push(Payload::text("still sent")).unwrap();
        queue.finish();

        assert_eq!(sender.run().await, SenderState::Closed);
        assert!(buffer.contents().contains("Message skipped"));

        let received = server.wait_for_messages(1, Duration::from_secs(5)).await;
        assert_eq!(received, vec![Inbound::Text("still sent".into())]);
    }

    #[tokio::test]
    async fn test_closed_connection_stops_sender() {
        let server = EchoServer::start().await;
        let handle = Arc::new(connect_raw(&server.url()).await);
        handle.release().await;

        let (output, buffer) = OutputSink::buffer();
        let sender = sender(handle, output);
        sender.queue.push(Payload::text("lost")).unwrap();

        assert_eq!(sender.run().await, SenderState::Closed);
        assert!(buffer.contents().contains("Connection closed when sending"));
    }

    #[tokio::test]
    async fn test_cancelled_sender_exits() {
        let server = EchoServer::start().await;
        let handle = Arc::new(connect_raw(&server.url()).await);
        let (output, _buffer) = OutputSink::buffer();
        let sender = sender(handle, output);
        let state = sender.state.clone();
        sender.cancel.cancel();

        assert_eq!(state.get(), SenderState::Idle);
        assert_eq!(sender.run().await, SenderState::Closed);
        assert_eq!(state.get(), SenderState::Closed);
    }

    #[tokio::test]
    async fn test_state_is_sending_while_draining() {
        let server = EchoServer::start().await;
        let handle = Arc::new(connect_raw(&server.url()).await);
        let (output, _buffer) = OutputSink::buffer();
        let sender = sender(handle, output);
        let state = sender.state.clone();
        let queue = sender.queue.clone();

        let task = tokio::spawn(sender.run());
        for _ in 0..100 {
            if state.get() == SenderState::Sending {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(state.get(), SenderState::Sending);

        queue.finish();
        assert_eq!(task.await.unwrap(), SenderState::Closed);
        assert_eq!(state.get(), SenderState::Closed);
    }
}
