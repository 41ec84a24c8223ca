//! Local WebSocket peer shared by the integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;

/// How the peer behaves after the handshake.
#[derive(Debug, Clone)]
pub enum Behaviour {
    Echo,
    CloseImmediately { code: u16, reason: String },
    Reject { status: u16, body: String },
}

#[derive(Default)]
struct Seen {
    texts: Mutex<Vec<String>>,
    binaries: Mutex<Vec<Vec<u8>>>,
    closes: Mutex<Vec<u16>>,
}

/// Peer running on its own runtime so tests can stay synchronous.
pub struct Peer {
    addr: SocketAddr,
    seen: Arc<Seen>,
    _runtime: Runtime,
}

impl Peer {
    pub fn start(behaviour: Behaviour) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;
        let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0"))?;
        let addr = listener.local_addr()?;
        let seen = Arc::new(Seen::default());

        let accept_seen = Arc::clone(&seen);
        runtime.spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, behaviour.clone(), Arc::clone(&accept_seen)));
            }
        });

        Ok(Self {
            addr,
            seen,
            _runtime: runtime,
        })
    }

    pub fn url(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    pub fn texts(&self) -> Vec<String> {
        self.seen.texts.lock().clone()
    }

    pub fn binaries(&self) -> Vec<Vec<u8>> {
        self.seen.binaries.lock().clone()
    }

    pub fn closes(&self) -> Vec<u16> {
        self.seen.closes.lock().clone()
    }

    /// Waits until the peer saw `count` text frames.
    pub fn wait_for_texts(&self, count: usize) -> Vec<String> {
        for _ in 0..500 {
            if self.seen.texts.lock().len() >= count {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        self.texts()
    }
}

async fn serve(stream: tokio::net::TcpStream, behaviour: Behaviour, seen: Arc<Seen>) {
    let rejection = match &behaviour {
        Behaviour::Reject { status, body } => Some((*status, body.clone())),
        _ => None,
    };
    let callback = move |_: &Request, response: Response| -> Result<Response, ErrorResponse> {
        match rejection {
            Some((status, body)) => Err(http::Response::builder()
                .status(status)
                .body(Some(body))
                .expect("valid rejection")),
            None => Ok(response),
        }
    };
    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
        return;
    };

    if let Behaviour::CloseImmediately { code, reason } = &behaviour {
        let frame = CloseFrame {
            code: (*code).into(),
            reason: reason.clone().into(),
        };
        let _ = ws.send(Message::Close(Some(frame))).await;
    }

    while let Some(Ok(message)) = ws.next().await {
        match message {
            Message::Text(text) => {
                seen.texts.lock().push(text.as_str().to_string());
                if ws.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Message::Binary(data) => {
                seen.binaries.lock().push(data.to_vec());
                if ws.send(Message::Binary(data)).await.is_err() {
                    break;
                }
            }
            Message::Close(frame) => {
                seen.closes
                    .lock()
                    .push(frame.map_or(1005, |frame| frame.code.into()));
            }
            _ => {}
        }
    }
}
