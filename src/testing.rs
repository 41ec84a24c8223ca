//! In-process WebSocket peers for unit tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;

use crate::console::OutputSink;
use crate::protocol::Inbound;
use crate::request::BridgeRequest;
use crate::transport::{self, ConnectionHandle};

// ============================================================================
// ServerScript
// ============================================================================

/// Behaviour of the test peer.
#[derive(Debug, Clone)]
pub(crate) enum ServerScript {
    /// Echo every data frame.
    Echo,
    /// Echo `messages` data frames, then send a close frame.
    CloseAfter {
        messages: usize,
        code: u16,
        reason: String,
    },
    /// Refuse the handshake with an HTTP status.
    Reject { status: u16, body: String },
    /// Accept TCP and never answer the handshake.
    Stall,
}

// ============================================================================
// EchoServer
// ============================================================================

#[derive(Default)]
struct ServerState {
    received: Mutex<Vec<Inbound>>,
    headers: Mutex<Vec<(String, String)>>,
    closes: Mutex<Vec<u16>>,
    connections: AtomicUsize,
}

/// Local WebSocket peer recording what it receives.
pub(crate) struct EchoServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    task: JoinHandle<()>,
}

impl EchoServer {
    pub(crate) async fn start() -> Self {
        Self::with_script(ServerScript::Echo).await
    }

    pub(crate) async fn with_script(script: ServerScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(ServerState::default());

        let accept_state = Arc::clone(&state);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accept_state.connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(stream, script.clone(), Arc::clone(&accept_state)));
            }
        });

        Self { addr, state, task }
    }

    pub(crate) fn url(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    pub(crate) fn received(&self) -> Vec<Inbound> {
        self.state.received.lock().clone()
    }

    pub(crate) fn handshake_headers(&self) -> Vec<(String, String)> {
        self.state.headers.lock().clone()
    }

    pub(crate) fn close_codes(&self) -> Vec<u16> {
        self.state.closes.lock().clone()
    }

    pub(crate) fn connection_count(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Polls until `count` data frames arrived or `limit` elapsed.
    pub(crate) async fn wait_for_messages(&self, count: usize, limit: Duration) -> Vec<Inbound> {
        let deadline = tokio::time::Instant::now() + limit;
        while self.state.received.lock().len() < count && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.received()
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(stream: TcpStream, script: ServerScript, state: Arc<ServerState>) {
    if matches!(script, ServerScript::Stall) {
        let _held = stream;
        tokio::time::sleep(Duration::from_secs(60)).await;
        return;
    }

    let rejection = match &script {
        ServerScript::Reject { status, body } => Some((*status, body.clone())),
        _ => None,
    };
    let header_state = Arc::clone(&state);
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        header_state.headers.lock().extend(request.headers().iter().map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        }));
        match rejection {
            Some((status, body)) => Err(http::Response::builder()
                .status(status)
                .body(Some(body))
                .unwrap()),
            None => Ok(response),
        }
    };

    let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
        return;
    };

    let close_after = match script {
        ServerScript::CloseAfter {
            messages,
            code,
            reason,
        } => Some((messages, code, reason)),
        _ => None,
    };
    let close_frame = |code: u16, reason: &str| {
        Message::Close(Some(CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        }))
    };

    if let Some((0, code, reason)) = &close_after {
        let _ = ws.send(close_frame(*code, reason)).await;
    }

    let mut echoed = 0usize;
    while let Some(Ok(message)) = ws.next().await {
        let reply = match message {
            Message::Text(text) => {
                state
                    .received
                    .lock()
                    .push(Inbound::Text(text.as_str().to_string()));
                Message::Text(text)
            }
            Message::Binary(data) => {
                state.received.lock().push(Inbound::Binary(data.to_vec()));
                Message::Binary(data)
            }
            Message::Close(frame) => {
                state
                    .closes
                    .lock()
                    .push(frame.map_or(1005, |frame| u16::from(frame.code)));
                continue;
            }
            _ => continue,
        };

        if ws.send(reply).await.is_err() {
            break;
        }
        echoed += 1;

        if let Some((messages, code, reason)) = &close_after
            && *messages == echoed
            && ws.send(close_frame(*code, reason)).await.is_err()
        {
            break;
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Connects to `url` without proxy or custom headers.
pub(crate) async fn connect_raw(url: &str) -> ConnectionHandle {
    let (output, _buffer) = OutputSink::buffer();
    transport::connect(&BridgeRequest::new(url), Duration::from_secs(5), &output)
        .await
        .unwrap()
}

/// An [`EchoServer`] on its own runtime, for synchronous session tests.
pub(crate) struct BackgroundServer {
    server: EchoServer,
    runtime: Runtime,
}

impl BackgroundServer {
    pub(crate) fn start(script: ServerScript) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let server = runtime.block_on(EchoServer::with_script(script));
        Self { server, runtime }
    }

    pub(crate) fn url(&self) -> String {
        self.server.url()
    }

    pub(crate) fn received(&self) -> Vec<Inbound> {
        self.server.received()
    }

    pub(crate) fn close_codes(&self) -> Vec<u16> {
        self.server.close_codes()
    }

    pub(crate) fn connection_count(&self) -> usize {
        self.server.connection_count()
    }

    pub(crate) fn wait_for_messages(&self, count: usize, limit: Duration) -> Vec<Inbound> {
        self.runtime.block_on(self.server.wait_for_messages(count, limit))
    }
}
