//! Bounded outbound queue.
//!
//! Producers push [`Payload`]s; the sender pops them in FIFO order until it
//! reaches the sentinel enqueued by [`OutboundQueue::finish`]. The channel
//! keeps one slot in reserve so the sentinel always fits, even when
//! producers filled the queue to its bound.
//!
//! # Back-pressure
//!
//! [`OutboundQueue::push`] never blocks: a full queue returns
//! [`QueueError::Full`] to the producer.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::{QueueError, Result};
use crate::protocol::Payload;

// ============================================================================
// Types
// ============================================================================

/// Queue item: a payload or the end-of-sending sentinel.
pub(crate) enum Outbound {
    Payload(Payload),
    Done,
}

/// Result of one bounded pop.
pub(crate) enum Pop {
    /// Next payload in FIFO order.
    Payload(Payload),
    /// The sentinel: nothing more will be sent.
    Done,
    /// Nothing arrived within the wait.
    Empty,
}

// ============================================================================
// OutboundQueue
// ============================================================================

/// Bounded FIFO of payloads waiting for the sender.
///
/// Clones share the same queue.
#[derive(Clone)]
pub struct OutboundQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    tx: mpsc::Sender<Outbound>,
    rx: tokio::sync::Mutex<mpsc::Receiver<Outbound>>,
    /// Serializes producers so the reserved sentinel slot stays free.
    producer: Mutex<()>,
    sealed: AtomicBool,
    capacity: usize,
}

impl std::fmt::Debug for OutboundQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundQueue")
            .field("capacity", &self.inner.capacity)
            .field("len", &self.len())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

impl OutboundQueue {
    /// Creates a queue holding at most `capacity` payloads.
    ///
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity + 1);

        Self {
            inner: Arc::new(QueueInner {
                tx,
                rx: tokio::sync::Mutex::new(rx),
                producer: Mutex::new(()),
                sealed: AtomicBool::new(false),
                capacity,
            }),
        }
    }

    /// Returns the payload bound.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Returns the number of queued items, the sentinel included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.capacity + 1 - self.inner.tx.capacity()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once the sentinel has been enqueued.
    #[inline]
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.inner.sealed.load(Ordering::Acquire)
    }

    /// Enqueues a payload.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPayload`](crate::Error::InvalidPayload) if the
    ///   payload is an empty or mixed chunk list
    /// - [`QueueError::Sealed`] after [`finish`](Self::finish)
    /// - [`QueueError::Full`] when `capacity` payloads are pending
    pub fn push(&self, payload: Payload) -> Result<()> {
        payload.validate()?;

        let _producer = self.inner.producer.lock();
        if self.is_sealed() {
            return Err(QueueError::Sealed.into());
        }
        if self.inner.tx.capacity() <= 1 {
            return Err(QueueError::Full {
                capacity: self.inner.capacity,
            }
            .into());
        }

        match self.inner.tx.try_send(Outbound::Payload(payload)) {
            Ok(()) => {
                trace!(pending = self.len(), "Payload queued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(QueueError::Full {
                capacity: self.inner.capacity,
            }
            .into()),
            Err(TrySendError::Closed(_)) => Err(QueueError::Closed.into()),
        }
    }

    /// Enqueues the sentinel and stops accepting payloads.
    ///
    /// Idempotent: returns `true` only for the call that sealed the queue.
    pub fn finish(&self) -> bool {
        let _producer = self.inner.producer.lock();
        if self.inner.sealed.swap(true, Ordering::AcqRel) {
            return false;
        }

        if let Err(e) = self.inner.tx.try_send(Outbound::Done) {
            debug!(error = %e, "Sentinel not enqueued");
        }
        trace!("Outbound queue sealed");
        true
    }

    /// Waits up to `wait` for the next item.
    pub(crate) async fn pop(&self, wait: Duration) -> Pop {
        let mut rx = self.inner.rx.lock().await;
        match timeout(wait, rx.recv()).await {
            Ok(Some(Outbound::Payload(payload))) => Pop::Payload(payload),
            Ok(Some(Outbound::Done) | None) => Pop::Done,
            Err(_) => Pop::Empty,
        }
    }

    /// Removes every payload still queued.
    ///
    /// Returns nothing while the sender holds the receiving end.
    pub(crate) fn drain_pending(&self) -> Vec<Payload> {
        let Ok(mut rx) = self.inner.rx.try_lock() else {
            debug!("Queue still in use, pending payloads not drained");
            return Vec::new();
        };

        let mut pending = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(Outbound::Payload(payload)) => pending.push(payload),
                Ok(Outbound::Done) => {}
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        pending
    }
}

// ============================================================================
// OutboundHandle
// ============================================================================

/// Push-only access to the outbound queue of whichever session is running.
///
/// Obtained from [`WebsocketBridge::outbound`](crate::WebsocketBridge::outbound).
/// A session attaches its queue once the listener and sender are running and
/// detaches it when teardown starts, so payloads pushed between sessions are
/// rejected instead of leaking into the next one.
///
/// # Example
///
/// ```no_run
/// use std::thread;
/// use wsbridge::{BridgeConfig, BridgeRequest, Payload, WebsocketBridge};
///
/// let bridge = WebsocketBridge::new(BridgeConfig::default());
/// let outbound = bridge.outbound();
///
/// thread::spawn(move || {
///     while outbound.push(Payload::binary(vec![0x01, 0x02])).is_err() {
///         thread::sleep(std::time::Duration::from_millis(10));
///     }
/// });
/// let _response = bridge.send(&BridgeRequest::new("ws://localhost:8000/chat"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct OutboundHandle {
    queue: Arc<Mutex<Option<OutboundQueue>>>,
}

impl OutboundHandle {
    /// Creates a handle with no session attached.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a session accepts payloads through this handle.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.queue.lock().is_some()
    }

    /// Enqueues a payload on the running session.
    ///
    /// # Errors
    ///
    /// - [`QueueError::Closed`] if no session is running
    /// - otherwise the errors of [`OutboundQueue::push`]
    pub fn push(&self, payload: impl Into<Payload>) -> Result<()> {
        match self.queue.lock().as_ref() {
            Some(queue) => queue.push(payload.into()),
            None => Err(QueueError::Closed.into()),
        }
    }

    pub(crate) fn attach(&self, queue: OutboundQueue) {
        *self.queue.lock() = Some(queue);
    }

    pub(crate) fn detach(&self) {
        if self.queue.lock().take().is_some() {
            trace!("Outbound handle detached");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
