//! Session controller and the synchronous entry point.
//!
//! [`WebsocketBridge::send`] runs one session to completion on the caller's
//! thread:
//!
//! 1. Connect (once). A failure skips straight to teardown.
//! 2. Spawn the listener and sender on a runtime owned by the session.
//! 3. Pump local input lines into the outbound queue.
//! 4. Tear down exactly once: drain, close handshake, cancel, release.
//! 5. Synthesize the [`Response`].
//!
//! The controller is the only writer of the session state. After step 2 it
//! touches the connection only to close and release it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, trace, warn};

use crate::config::BridgeConfig;
use crate::console::{ContinuationBuffer, InputSource, OutputSink, default_source};
use crate::error::{ConnectError, Result};
use crate::identifiers::SessionId;
use crate::protocol::{CLOSE_GOING_AWAY, CLOSE_NORMAL, CLOSED_BY_USER, CloseInfo, Payload};
use crate::request::BridgeRequest;
use crate::transport::{self, ConnectionHandle};

use super::interrupt::Interrupter;
use super::listener::Listener;
use super::queue::{OutboundHandle, OutboundQueue};
use super::response::{Response, ResponseParts};
use super::sender::Sender;
use super::state::{CloseSlot, ListenerState, SenderState, SessionState, UnitState};
use super::transcript::Transcript;

// ============================================================================
// Constants
// ============================================================================

/// Worker threads of a session runtime: one per concurrent unit.
const SESSION_WORKERS: usize = 2;

/// Grace period for runtime shutdown after teardown.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Close reason recorded locally when the user interrupts a session.
pub const INTERRUPTED_BY_USER: &str = "Interrupted by user";

// ============================================================================
// WebsocketBridge
// ============================================================================

/// Interactive WebSocket client behind a synchronous request/response call.
///
/// # Example
///
/// ```no_run
/// use wsbridge::{BridgeConfig, BridgeRequest, WebsocketBridge};
///
/// # fn example() -> wsbridge::Result<()> {
/// let bridge = WebsocketBridge::new(BridgeConfig::default());
/// let response = bridge.send(&BridgeRequest::new("ws://localhost:8000/chat"))?;
///
/// println!("{}", response.body);
/// # Ok(())
/// # }
/// ```
///
/// # Blocking
///
/// `send` blocks the calling thread for the whole session and drives its own
/// runtime, so it must not be called from inside an async context.
#[derive(Debug)]
pub struct WebsocketBridge {
    config: BridgeConfig,
    output: OutputSink,
    interrupter: Interrupter,
    outbound: OutboundHandle,
}

impl Default for WebsocketBridge {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

impl WebsocketBridge {
    /// Creates a bridge printing to standard output.
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            output: OutputSink::stdout(),
            interrupter: Interrupter::new(),
            outbound: OutboundHandle::new(),
        }
    }

    /// Replaces the output sink.
    #[inline]
    #[must_use]
    pub fn with_output(mut self, output: OutputSink) -> Self {
        self.output = output;
        self
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns the output sink shared by every session.
    #[inline]
    #[must_use]
    pub fn output(&self) -> &OutputSink {
        &self.output
    }

    /// Returns a handle that interrupts the running session.
    #[inline]
    #[must_use]
    pub fn interrupter(&self) -> Interrupter {
        self.interrupter.clone()
    }

    /// Returns a handle that pushes payloads to the running session.
    ///
    /// Pushes fail with [`QueueError::Closed`](crate::QueueError::Closed)
    /// while no session is open.
    #[inline]
    #[must_use]
    pub fn outbound(&self) -> OutboundHandle {
        self.outbound.clone()
    }

    /// Runs one session reading the platform's standard input.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if the configuration is invalid
    /// - [`Error::Io`](crate::Error::Io) if the session runtime cannot start
    ///
    /// Connection failures are not errors: they produce a non-200
    /// [`Response`].
    pub fn send(&self, request: &BridgeRequest) -> Result<Response> {
        let mut input = default_source(self.config.poll_interval);
        self.send_with_input(request, input.as_mut())
    }

    /// Runs one session reading lines from `input`.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub fn send_with_input(
        &self,
        request: &BridgeRequest,
        input: &mut dyn InputSource,
    ) -> Result<Response> {
        self.config.validate()?;

        let runtime = Builder::new_multi_thread()
            .worker_threads(SESSION_WORKERS)
            .thread_name("wsbridge-session")
            .enable_all()
            .build()?;

        let mut session = Session::new(
            runtime,
            self.config.clone(),
            self.output.clone(),
            self.interrupter.clone(),
            request.clone(),
        )
        .with_outbound(self.outbound.clone());
        let span = info_span!("session", id = %session.id(), target = %request.url);
        let response = span.in_scope(|| session.run(input));
        debug!(
            id = %session.id(),
            state = %session.state(),
            listener = ?session.listener_state(),
            sender = ?session.sender_state(),
            status = response.status,
            "Session finished"
        );

        drop(session);
        self.interrupter.reset();

        Ok(response)
    }
}

// ============================================================================
// TaskSlot
// ============================================================================

/// A spawned unit until it is joined or aborted.
struct TaskSlot<T> {
    handle: Option<JoinHandle<T>>,
}

impl<T> Default for TaskSlot<T> {
    fn default() -> Self {
        Self { handle: None }
    }
}

impl<T: fmt::Debug + Send + 'static> TaskSlot<T> {
    fn new(handle: JoinHandle<T>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Waits up to `limit` for the unit to finish.
    ///
    /// Gives up early once `abandon` fires. Returns `true` if the unit is
    /// no longer running.
    async fn wait(&mut self, limit: Duration, abandon: &CancellationToken) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            return true;
        };

        let joined = tokio::select! {
            joined = timeout(limit, handle) => joined,
            () = abandon.cancelled() => return false,
        };

        match joined {
            Ok(result) => {
                self.handle = None;
                match result {
                    Ok(state) => trace!(?state, "Session task joined"),
                    Err(e) => warn!(error = %e, "Session task failed"),
                }
                true
            }
            Err(_) => false,
        }
    }

    /// Aborts the unit if it is still running.
    ///
    /// Returns `true` if the unit was cut short.
    async fn abort(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        handle.abort();
        match handle.await {
            Ok(state) => {
                trace!(?state, "Session task finished before abort");
                false
            }
            Err(e) if e.is_cancelled() => {
                debug!("Session task aborted");
                true
            }
            Err(e) => {
                warn!(error = %e, "Session task failed");
                true
            }
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Why the input pump stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpExit {
    ExitKeyword,
    Interrupted,
    RemoteClosed,
    Dropped,
}

/// One end-to-end session.
pub(crate) struct Session {
    id: SessionId,
    config: BridgeConfig,
    output: OutputSink,
    request: BridgeRequest,
    runtime: Option<Runtime>,
    state: SessionState,
    handle: Option<Arc<ConnectionHandle>>,
    response_headers: Option<Vec<(String, String)>>,
    connect_error: Option<ConnectError>,
    queue: OutboundQueue,
    outbound: OutboundHandle,
    close: CloseSlot,
    transcript: Option<Transcript>,
    cancel: CancellationToken,
    interrupter: Interrupter,
    interrupt: CancellationToken,
    force: CancellationToken,
    listener: TaskSlot<ListenerState>,
    sender: TaskSlot<SenderState>,
    listener_state: UnitState<ListenerState>,
    sender_state: UnitState<SenderState>,
}

impl Session {
    pub(crate) fn new(
        runtime: Runtime,
        config: BridgeConfig,
        output: OutputSink,
        interrupter: Interrupter,
        request: BridgeRequest,
    ) -> Self {
        let (interrupt, force) = interrupter.tokens();

        Self {
            id: SessionId::generate(),
            queue: OutboundQueue::new(config.queue_size),
            outbound: OutboundHandle::new(),
            transcript: config.transcript.then(Transcript::default),
            config,
            output,
            request,
            runtime: Some(runtime),
            state: SessionState::Idle,
            handle: None,
            response_headers: None,
            connect_error: None,
            close: CloseSlot::default(),
            cancel: CancellationToken::new(),
            interrupter,
            interrupt,
            force,
            listener: TaskSlot::default(),
            sender: TaskSlot::default(),
            listener_state: UnitState::default(),
            sender_state: UnitState::default(),
        }
    }

    /// Publishes the session queue through `outbound` while units run.
    pub(crate) fn with_outbound(mut self, outbound: OutboundHandle) -> Self {
        self.outbound = outbound;
        self
    }

    #[inline]
    pub(crate) fn id(&self) -> SessionId {
        self.id
    }

    #[inline]
    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub(crate) fn listener_state(&self) -> ListenerState {
        self.listener_state.get()
    }

    #[inline]
    pub(crate) fn sender_state(&self) -> SenderState {
        self.sender_state.get()
    }

    /// Runs the whole session and returns its result.
    pub(crate) fn run(&mut self, input: &mut dyn InputSource) -> Response {
        if self.config.handle_ctrl_c
            && let Some(runtime) = &self.runtime
        {
            runtime.spawn(self.interrupter.clone().watch_ctrl_c());
        }

        let handle = match self.connect() {
            Ok(handle) => handle,
            Err(e) => {
                self.output.line(&e.to_string());
                warn!(error = %e, status = e.status(), "Connect failed");
                self.connect_error = Some(e);
                self.teardown();
                return self.response();
            }
        };

        self.print_banner();
        self.start(&handle);

        let exit = self.pump(&handle, input);
        debug!(?exit, "Input pump stopped");

        self.teardown();
        self.response()
    }

    // ========================================================================
    // Connect
    // ========================================================================

    /// Connects, or returns the existing handle if already open.
    pub(crate) fn connect(&mut self) -> std::result::Result<Arc<ConnectionHandle>, ConnectError> {
        if self.state == SessionState::Open
            && let Some(handle) = &self.handle
        {
            return Ok(Arc::clone(handle));
        }
        let Some(runtime) = &self.runtime else {
            return Err(ConnectError::unreachable("session already torn down"));
        };

        self.state = SessionState::Connecting;

        let attempt = transport::connect(&self.request, self.config.connect_timeout, &self.output);
        let interrupt = self.interrupt.clone();
        let result = runtime.block_on(async move {
            tokio::select! {
                result = attempt => result,
                () = interrupt.cancelled() => {
                    Err(ConnectError::unreachable("connection attempt interrupted"))
                }
            }
        });

        let handle = Arc::new(result?);
        self.response_headers = Some(handle.response_headers().to_vec());
        self.handle = Some(Arc::clone(&handle));
        self.state = SessionState::Open;

        Ok(handle)
    }

    fn print_banner(&self) {
        let keywords = self
            .config
            .exit_keywords
            .iter()
            .map(|keyword| format!("'{keyword}'"))
            .collect::<Vec<_>>()
            .join(", ");

        self.output.line(&format!(
            "> Connected to {}\n\
             Type a message and press enter to send it\n\
             Type {keywords} or press Ctrl+C to close the connection",
            self.request.url
        ));
    }

    // ========================================================================
    // Units
    // ========================================================================

    /// Spawns the listener and the sender.
    fn start(&mut self, handle: &Arc<ConnectionHandle>) {
        let Some(runtime) = &self.runtime else {
            return;
        };

        let listener = Listener {
            handle: Arc::clone(handle),
            output: self.output.clone(),
            queue: self.queue.clone(),
            close: self.close.clone(),
            transcript: self.transcript.clone(),
            recv_timeout: self.config.recv_timeout,
            cancel: self.cancel.clone(),
            state: self.listener_state.clone(),
        };
        let sender = Sender {
            handle: Arc::clone(handle),
            output: self.output.clone(),
            queue: self.queue.clone(),
            close: self.close.clone(),
            transcript: self.transcript.clone(),
            send_wait: self.config.send_wait,
            cancel: self.cancel.clone(),
            state: self.sender_state.clone(),
        };

        self.listener = TaskSlot::new(runtime.spawn(listener.run().instrument(info_span!("listener"))));
        self.sender = TaskSlot::new(runtime.spawn(sender.run().instrument(info_span!("sender"))));
        self.outbound.attach(self.queue.clone());

        info!("Session open");
    }

    // ========================================================================
    // Input Pump
    // ========================================================================

    /// Feeds local input into the outbound queue until the session ends.
    fn pump(&self, handle: &ConnectionHandle, input: &mut dyn InputSource) -> PumpExit {
        let mut continuation = ContinuationBuffer::new();

        loop {
            if self.interrupt.is_cancelled() {
                return self.on_interrupt();
            }
            if !handle.is_open() {
                return PumpExit::RemoteClosed;
            }

            let Some(line) = input.poll() else {
                continue;
            };
            if self.interrupt.is_cancelled() {
                return self.on_interrupt();
            }
            if line.is_empty() {
                continue;
            }
            if self.config.is_exit_keyword(&line) {
                if let Some(pending) = continuation.take_pending() {
                    debug!(
                        fragments = pending.lines().count(),
                        "Unfinished continued message discarded"
                    );
                }
                return PumpExit::ExitKeyword;
            }

            let Some(message) = continuation.push(&line) else {
                continue;
            };

            if !handle.is_open() {
                self.output
                    .line(&format!("Websocket closed, message {message} not sent"));
                return PumpExit::Dropped;
            }

            if let Err(e) = self.queue.push(Payload::Text(message)) {
                self.output.line(&format!("Message not sent: {e}"));
                warn!(error = %e, "Outbound queue rejected a message");
            }
        }
    }

    fn on_interrupt(&self) -> PumpExit {
        self.output
            .line("Interrupt received. Cleaning up, press Ctrl+C again to force exit.");
        self.close.record(CloseInfo::abnormal(INTERRUPTED_BY_USER));
        self.queue.finish();
        PumpExit::Interrupted
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Ends the session. Safe to call any number of times.
    pub(crate) fn teardown(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };
        self.outbound.detach();

        let interrupted = self.interrupt.is_cancelled();
        if interrupted {
            self.close.record(CloseInfo::abnormal(INTERRUPTED_BY_USER));
        }
        self.queue.finish();

        if let Some(handle) = self.handle.take() {
            self.state = SessionState::Closing;
            runtime.block_on(self.shutdown(&handle));
        }

        self.report_dropped();

        if self.response_headers.is_some() && !self.interrupt.is_cancelled() {
            self.close.record(CloseInfo::closed_by_user());
        }

        runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
        self.state = SessionState::Closed;

        debug!(
            listener = ?self.listener_state(),
            sender = ?self.sender_state(),
            "Session closed"
        );
    }

    async fn shutdown(&mut self, handle: &ConnectionHandle) {
        let limit = self.config.close_timeout;

        // Let the sender flush what was queued ahead of the sentinel.
        if !self.interrupt.is_cancelled() && !self.sender.wait(limit, &self.interrupt).await {
            debug!("Sender drain abandoned");
        }

        if handle.is_open() && !self.force.is_cancelled() {
            let code = if self.interrupt.is_cancelled() {
                CLOSE_GOING_AWAY
            } else {
                CLOSE_NORMAL
            };
            match timeout(limit, handle.close(&CloseInfo::new(code, CLOSED_BY_USER))).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => debug!(error = %e, "Close frame not sent"),
                Err(_) => debug!("Close frame send timed out"),
            }

            // The listener exits once it sees the peer's close reply.
            if !self.listener.wait(limit, &self.force).await {
                debug!("No close reply from peer");
            }
        }

        self.cancel.cancel();
        if !self.listener.wait(limit, &self.force).await && self.listener.abort().await {
            self.listener_state.set(ListenerState::Closed);
        }
        if !self.sender.wait(limit, &self.force).await && self.sender.abort().await {
            self.sender_state.set(SenderState::Closed);
        }

        if timeout(limit, handle.release()).await.is_err() {
            debug!("Connection release timed out");
        }

        if self.force.is_cancelled() {
            self.output.line("Forced shutdown");
        }
    }

    fn report_dropped(&self) {
        let dropped = self.queue.drain_pending();
        if dropped.is_empty() {
            return;
        }

        let list = dropped
            .iter()
            .map(Payload::describe)
            .collect::<Vec<_>>()
            .join(", ");
        self.output.line(&format!("Dropped messages: [{list}]"));
        warn!(count = dropped.len(), "Queued messages dropped");
    }

    // ========================================================================
    // Result
    // ========================================================================

    pub(crate) fn response(&self) -> Response {
        Response::synthesize(ResponseParts {
            url: self.request.url.clone(),
            status: self.connect_error.as_ref().map(ConnectError::status),
            message: self.connect_error.as_ref().map(ConnectError::detail),
            headers: self.response_headers.clone(),
            close_info: self.close.get(),
            transcript: self.transcript.as_ref().map(Transcript::snapshot),
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::console::ScriptedInput;
    use crate::session::InterruptLevel;
    use crate::testing::{BackgroundServer, ServerScript};

    fn test_config() -> BridgeConfig {
        BridgeConfig::new()
            .with_poll_interval(Duration::from_millis(20))
            .with_recv_timeout(Duration::from_millis(50))
            .with_send_wait(Duration::from_millis(50))
            .with_close_timeout(Duration::from_secs(2))
            .with_connect_timeout(Duration::from_secs(2))
            .without_ctrl_c()
    }

    fn session(url: &str) -> (Session, crate::console::OutputBuffer) {
        session_with(url, test_config())
    }

    fn session_with(url: &str, config: BridgeConfig) -> (Session, crate::console::OutputBuffer) {
        let runtime = Builder::new_multi_thread()
            .worker_threads(SESSION_WORKERS)
            .enable_all()
            .build()
            .unwrap();
        let (output, buffer) = OutputSink::buffer();
        let session = Session::new(
            runtime,
            config,
            output,
            Interrupter::new(),
            BridgeRequest::new(url),
        );
        (session, buffer)
    }

    #[test]
    fn test_connect_is_idempotent() {
        let server = BackgroundServer::start(ServerScript::Echo);
        let (mut session, _buffer) = session(&server.url());

        let first = session.connect().unwrap();
        let second = session.connect().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(server.connection_count(), 1);
    }

    #[test]
    fn test_teardown_twice_is_harmless() {
        let server = BackgroundServer::start(ServerScript::Echo);
        let (mut session, _buffer) = session(&server.url());

        let handle = session.connect().unwrap();
        session.start(&handle);

        session.teardown();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(handle.is_released());
        let first = session.response();

        session.teardown();
        assert_eq!(session.state(), SessionState::Closed);
        let second = session.response();

        assert_eq!(first.body, second.body);
        assert_eq!(first.close_info, CloseInfo::closed_by_user());
    }

    #[test]
    fn test_connect_failure_starts_no_units() {
        let (mut session, buffer) = session("ws://127.0.0.1:1");
        let mut input = ScriptedInput::new(["never sent"]);

        let response = session.run(&mut input);
        assert_eq!(response.status, 500);
        assert_eq!(session.listener_state(), ListenerState::Idle);
        assert_eq!(session.sender_state(), SenderState::Idle);
        assert!(!input.is_exhausted());
        assert!(!buffer.contents().contains("Connected to"));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_pump_joins_continuations_until_exit() {
        let server = BackgroundServer::start(ServerScript::Echo);
        let (mut session, buffer) = session(&server.url());
        let mut input = ScriptedInput::new(["first\\", "second", "", "plain", "quit", "ignored"]);

        let response = session.run(&mut input);
        assert_eq!(response.status, 200);
        assert_eq!(response.close_info.code, 1000);
        assert!(!input.is_exhausted());

        let received = server.wait_for_messages(2, Duration::from_secs(5));
        assert_eq!(
            received,
            vec![
                crate::protocol::Inbound::Text("first\nsecond".into()),
                crate::protocol::Inbound::Text("plain".into()),
            ]
        );
        assert!(buffer.contents().contains("> Connected to"));
        assert_eq!(server.close_codes(), vec![1000]);
    }

    #[test]
    fn test_remote_close_ends_pump() {
        let server = BackgroundServer::start(ServerScript::CloseAfter {
            messages: 0,
            code: 1001,
            reason: "going away".to_string(),
        });
        let (mut session, _buffer) = session(&server.url());
        let mut input = ScriptedInput::silent().with_idle(Duration::from_millis(10));

        let response = session.run(&mut input);
        assert_eq!(response.status, 200);
        assert_eq!(response.close_info, CloseInfo::new(1001, "going away"));
        assert_eq!(session.listener_state(), ListenerState::Closed);
        assert_eq!(session.sender_state(), SenderState::Closed);
    }

    #[test]
    fn test_interrupt_records_abnormal_close() {
        let server = BackgroundServer::start(ServerScript::Echo);
        let (mut session, buffer) = session(&server.url());
        let interrupter = session.interrupter.clone();

        let handle = session.connect().unwrap();
        session.start(&handle);
        interrupter.trigger();

        let mut input = ScriptedInput::new(["never sent"]);
        assert_eq!(session.pump(&handle, &mut input), PumpExit::Interrupted);
        assert!(!input.is_exhausted());

        session.teardown();
        let response = session.response();
        assert_eq!(response.close_info.code, 1006);
        assert_eq!(response.close_info.reason, INTERRUPTED_BY_USER);
        assert!(buffer.contents().contains("Interrupt received"));
        assert_eq!(server.close_codes(), vec![1001]);
        assert!(server.received().is_empty());
    }

    #[test]
    fn test_second_interrupt_forces_shutdown() {
        let server = BackgroundServer::start(ServerScript::Echo);
        let (mut session, buffer) = session(&server.url());
        let interrupter = session.interrupter.clone();

        let handle = session.connect().unwrap();
        session.start(&handle);
        assert_eq!(interrupter.trigger(), InterruptLevel::Graceful);
        assert_eq!(interrupter.trigger(), InterruptLevel::Forced);

        let mut input = ScriptedInput::new(["never sent"]);
        assert_eq!(session.pump(&handle, &mut input), PumpExit::Interrupted);

        session.teardown();
        assert!(buffer.contents().contains("Forced shutdown"));
        assert!(handle.is_released());
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.listener_state(), ListenerState::Closed);
        assert_eq!(session.sender_state(), SenderState::Closed);
        assert_eq!(session.response().close_info.reason, INTERRUPTED_BY_USER);
        assert!(server.received().is_empty());
    }

    #[test]
    fn test_unsent_payloads_are_reported_as_dropped() {
        let server = BackgroundServer::start(ServerScript::Echo);
        let (mut session, buffer) = session(&server.url());

        // Connected, but no sender drains the queue.
        session.connect().unwrap();
        session.queue.push(Payload::text("a")).unwrap();
        session.queue.push(Payload::binary(vec![1, 2])).unwrap();

        session.teardown();
        assert!(
            buffer
                .lines()
                .contains(&"Dropped messages: [\"a\", <2 bytes>]".to_string())
        );
        assert_eq!(session.response().close_info, CloseInfo::closed_by_user());
        assert!(server.received().is_empty());
    }

    #[test]
    fn test_full_queue_reports_message_not_sent() {
        let server = BackgroundServer::start(ServerScript::Echo);
        let (mut session, buffer) = session_with(&server.url(), test_config().with_queue_size(1));

        let handle = session.connect().unwrap();
        let mut input = ScriptedInput::new(["a", "b", "exit"]);
        assert_eq!(session.pump(&handle, &mut input), PumpExit::ExitKeyword);

        let output = buffer.contents();
        assert!(output.contains("Message not sent: "));
        assert_eq!(output.matches("Message not sent").count(), 1);

        session.teardown();
        assert!(buffer.lines().contains(&"Dropped messages: [\"a\"]".to_string()));
    }

    #[test]
    fn test_exit_discards_unfinished_continuation() {
        let server = BackgroundServer::start(ServerScript::Echo);
        let (mut session, _buffer) = session(&server.url());

        let handle = session.connect().unwrap();
        session.start(&handle);
        let mut input = ScriptedInput::new(["half\\", "exit"]);
        assert_eq!(session.pump(&handle, &mut input), PumpExit::ExitKeyword);

        session.teardown();
        assert!(server.received().is_empty());
        assert_eq!(server.close_codes(), vec![1000]);
    }

    #[test]
    fn test_outbound_handle_follows_session() {
        let server = BackgroundServer::start(ServerScript::Echo);
        let (session, _buffer) = session(&server.url());
        let outbound = OutboundHandle::new();
        let mut session = session.with_outbound(outbound.clone());

        let handle = session.connect().unwrap();
        assert!(!outbound.is_attached());
        session.start(&handle);
        assert!(outbound.is_attached());

        outbound.push(Payload::binary(vec![7, 8])).unwrap();
        let received = server.wait_for_messages(1, Duration::from_secs(5));
        assert_eq!(received, vec![crate::protocol::Inbound::Binary(vec![7, 8])]);

        session.teardown();
        assert!(!outbound.is_attached());
        assert!(outbound.push("late").is_err());
    }
}
