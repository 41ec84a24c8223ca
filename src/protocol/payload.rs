//! Outbound payloads and inbound messages.
//!
//! [`Payload`] is everything a producer may put on the outbound queue:
//! a text message, a binary message, or a message assembled from chunks,
//! either a finite list or a lazily evaluated iterator. [`Inbound`] is a data
//! frame received from the peer.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio_tungstenite::tungstenite::Message;

use crate::error::{Error, Result};

// ============================================================================
// Chunk
// ============================================================================

/// One piece of a chunked payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Text fragment.
    Text(String),
    /// Binary fragment.
    Binary(Vec<u8>),
}

impl Chunk {
    fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

// ============================================================================
// Payload
// ============================================================================

/// Lazily produced chunks.
pub type ChunkStream = Box<dyn Iterator<Item = Chunk> + Send>;

/// A message waiting on the outbound queue.
pub enum Payload {
    /// UTF-8 text message.
    Text(String),
    /// Binary message.
    Binary(Vec<u8>),
    /// Message assembled from a finite list of chunks.
    Chunks(Vec<Chunk>),
    /// Message assembled from chunks produced on demand by the sender.
    Stream(ChunkStream),
}

impl Payload {
    /// Creates a text payload.
    #[inline]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates a binary payload.
    #[inline]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::Binary(data.into())
    }

    /// Creates a payload from a lazily evaluated chunk iterator.
    #[inline]
    pub fn stream<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Chunk>,
        I::IntoIter: Send + 'static,
    {
        Self::Stream(Box::new(chunks.into_iter()))
    }

    /// Checks what can be checked before the payload is queued.
    ///
    /// A finite chunk list must be non-empty and must not mix text and
    /// binary chunks. Lazy streams can only be checked when consumed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPayload`] for an empty or mixed chunk list.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Chunks(chunks) => check_chunks(chunks),
            _ => Ok(()),
        }
    }

    /// Short human-readable form, used when reporting dropped messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Text(text) => format!("{text:?}"),
            Self::Binary(data) => format!("<{} bytes>", data.len()),
            Self::Chunks(chunks) => format!("<{} chunks>", chunks.len()),
            Self::Stream(_) => "<stream>".to_string(),
        }
    }

    /// Consumes the payload into one WebSocket message.
    ///
    /// Chunks are concatenated into a single message of their common kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPayload`] when the chunks are empty or mixed.
    pub fn into_message(self) -> Result<Message> {
        match self {
            Self::Text(text) => Ok(Message::Text(text.into())),
            Self::Binary(data) => Ok(Message::Binary(data.into())),
            Self::Chunks(chunks) => join_chunks(chunks),
            Self::Stream(stream) => join_chunks(stream.collect()),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Binary(data) => f.debug_tuple("Binary").field(&data.len()).finish(),
            Self::Chunks(chunks) => f.debug_tuple("Chunks").field(&chunks.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Self::Binary(data)
    }
}

fn check_chunks(chunks: &[Chunk]) -> Result<()> {
    let Some(first) = chunks.first() else {
        return Err(Error::invalid_payload("chunked message has no chunks"));
    };
    let text = first.is_text();
    if chunks.iter().any(|chunk| chunk.is_text() != text) {
        return Err(Error::invalid_payload(
            "chunked message mixes text and binary chunks",
        ));
    }
    Ok(())
}

fn join_chunks(chunks: Vec<Chunk>) -> Result<Message> {
    check_chunks(&chunks)?;

    if chunks[0].is_text() {
        let mut text = String::new();
        for chunk in chunks {
            if let Chunk::Text(part) = chunk {
                text.push_str(&part);
            }
        }
        Ok(Message::Text(text.into()))
    } else {
        let mut data = Vec::new();
        for chunk in chunks {
            if let Chunk::Binary(part) = chunk {
                data.extend_from_slice(&part);
            }
        }
        Ok(Message::Binary(data.into()))
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// A data frame received from the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Text-typed frame.
    Text(String),
    /// Binary-typed frame.
    Binary(Vec<u8>),
}

impl Inbound {
    /// Returns the raw bytes of the frame.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(data) => data,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
