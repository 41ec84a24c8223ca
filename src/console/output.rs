//! Serialized local output.
//!
//! Every component that prints to the user holds a clone of one
//! [`OutputSink`]. Each write emits a complete line under a single lock, so
//! concurrent writers never interleave partial lines.

// ============================================================================
// Imports
// ============================================================================

use std::io::{self, Write};
use std::sync::Arc;

use crossterm::style::Stylize;
use parking_lot::Mutex;
use tracing::trace;

// ============================================================================
// Constants
// ============================================================================

/// Prefix of warning lines, highlighted in yellow.
const WARNING_PREFIX: &str = "WARNING:";

// ============================================================================
// OutputSink
// ============================================================================

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Line-oriented output shared by concurrent writers.
#[derive(Clone)]
pub struct OutputSink {
    writer: SharedWriter,
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

impl OutputSink {
    /// Creates a sink over any writer.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Creates a sink writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Creates a sink writing into memory, plus a handle to read it back.
    #[must_use]
    pub fn buffer() -> (Self, OutputBuffer) {
        let buffer = OutputBuffer::default();
        (Self::new(buffer.clone()), buffer)
    }

    /// Writes `text` followed by a line break.
    ///
    /// Empty text is skipped.
    pub fn line(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.write_all(&[text.as_bytes(), b"\n"]);
    }

    /// Writes a received payload verbatim followed by a line break.
    ///
    /// Unlike [`line`](Self::line), an empty payload still prints the line
    /// break.
    pub fn payload(&self, data: &[u8]) {
        self.write_all(&[data, b"\n"]);
    }

    /// Writes a warning line with a highlighted prefix.
    pub fn warn(&self, text: &str) {
        let prefix = format!("{} ", WARNING_PREFIX.yellow());
        self.write_all(&[prefix.as_bytes(), text.as_bytes(), b"\n"]);
    }

    fn write_all(&self, parts: &[&[u8]]) {
        let mut writer = self.writer.lock();
        let mut result = Ok(());
        for part in parts {
            result = writer.write_all(part);
            if result.is_err() {
                break;
            }
        }
        if let Err(e) = result.and_then(|()| writer.flush()) {
            trace!(error = %e, "Output write failed");
        }
    }
}

// ============================================================================
// OutputBuffer
// ============================================================================

/// In-memory writer backing [`OutputSink::buffer`].
#[derive(Clone, Default)]
pub struct OutputBuffer {
    data: Arc<Mutex<Vec<u8>>>,
}

impl OutputBuffer {
    /// Returns everything written so far, lossily decoded.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.data.lock()).into_owned()
    }

    /// Returns the written lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
