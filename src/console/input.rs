//! Local input sources.
//!
//! An [`InputSource`] hands the session controller at most one line per
//! poll and never blocks longer than its poll interval, so the controller
//! keeps observing interrupts and remote closure between keystrokes.
//!
//! | Backend | Platform | Strategy |
//! |---------|----------|----------|
//! | [`FdPollInput`] | Unix | readiness poll on stdin, then one read |
//! | [`KeystrokeInput`] | any (default off Unix) | terminal key events assembled into lines |
//! | [`ScriptedInput`] | any | predefined lines, for tests and automation |
//!
//! Read failures are reported as "no input this poll", never as errors.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use tracing::trace;

// ============================================================================
// InputSource
// ============================================================================

/// Non-blocking producer of local input lines.
pub trait InputSource {
    /// Returns the next complete line, if one arrived within the poll
    /// interval.
    ///
    /// Returned lines have trailing whitespace stripped.
    fn poll(&mut self) -> Option<String>;
}

/// Returns the input backend for the current platform.
#[must_use]
pub fn default_source(interval: Duration) -> Box<dyn InputSource> {
    #[cfg(unix)]
    {
        Box::new(FdPollInput::new(interval))
    }
    #[cfg(not(unix))]
    {
        Box::new(KeystrokeInput::new(interval))
    }
}

// ============================================================================
// LineSplitter
// ============================================================================

/// Splits raw input bytes into trimmed lines.
#[derive(Debug, Default)]
struct LineSplitter {
    partial: Vec<u8>,
    ready: VecDeque<String>,
}

impl LineSplitter {
    fn feed(&mut self, data: &[u8]) {
        for &byte in data {
            if byte == b'\n' {
                let line = String::from_utf8_lossy(&self.partial);
                self.ready.push_back(line.trim_end().to_string());
                self.partial.clear();
            } else {
                self.partial.push(byte);
            }
        }
    }

    /// Flushes an unterminated last line at end of input.
    fn finish(&mut self) {
        if !self.partial.is_empty() {
            self.feed(b"\n");
        }
    }

    fn next_line(&mut self) -> Option<String> {
        self.ready.pop_front()
    }
}

// ============================================================================
// FdPollInput
// ============================================================================

/// Reads stdin after a bounded readiness poll on its file descriptor.
#[cfg(unix)]
#[derive(Debug)]
pub struct FdPollInput {
    interval: Duration,
    lines: LineSplitter,
    eof: bool,
}

#[cfg(unix)]
impl FdPollInput {
    /// Size of one raw read.
    const READ_CHUNK: usize = 8192;

    /// Creates a source that waits at most `interval` per poll.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            lines: LineSplitter::default(),
            eof: false,
        }
    }

    /// Waits for stdin to become readable.
    fn wait_readable(&self) -> bool {
        use std::os::fd::AsFd;

        use nix::poll::{PollFd, PollFlags, PollTimeout, poll};

        let stdin = std::io::stdin();
        let millis = u16::try_from(self.interval.as_millis()).unwrap_or(u16::MAX);
        let mut fds = [PollFd::new(
            stdin.as_fd(),
            PollFlags::POLLIN | PollFlags::POLLHUP,
        )];

        match poll(&mut fds, PollTimeout::from(millis)) {
            Ok(0) => false,
            Ok(_) => fds[0]
                .revents()
                .is_some_and(|events| events.intersects(PollFlags::POLLIN | PollFlags::POLLHUP)),
            Err(e) => {
                trace!(error = %e, "stdin poll failed");
                thread::sleep(self.interval);
                false
            }
        }
    }
}

#[cfg(unix)]
impl InputSource for FdPollInput {
    fn poll(&mut self) -> Option<String> {
        use std::io::Read;

        if let Some(line) = self.lines.next_line() {
            return Some(line);
        }
        if self.eof {
            thread::sleep(self.interval);
            return None;
        }
        if !self.wait_readable() {
            return None;
        }

        let mut buffer = [0u8; Self::READ_CHUNK];
        match std::io::stdin().lock().read(&mut buffer) {
            Ok(0) => {
                trace!("stdin reached end of input");
                self.eof = true;
                self.lines.finish();
            }
            Ok(count) => self.lines.feed(&buffer[..count]),
            Err(e) => trace!(error = %e, "stdin read failed"),
        }

        self.lines.next_line()
    }
}

// ============================================================================
// KeystrokeInput
// ============================================================================

/// Assembles key presses into lines.
#[derive(Debug, Default, Clone)]
pub struct LineAssembler {
    line: String,
}

impl LineAssembler {
    /// Applies one key press, returning the line when it is terminated.
    pub fn press(&mut self, key: LineKey) -> Option<String> {
        match key {
            LineKey::Char(c) => {
                self.line.push(c);
                None
            }
            LineKey::Backspace => {
                self.line.pop();
                None
            }
            LineKey::Enter => {
                let line = self.line.trim_end().to_string();
                self.line.clear();
                Some(line)
            }
        }
    }

    /// Returns the unterminated text typed so far.
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.line
    }
}

/// Key presses relevant to line assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKey {
    /// Printable character.
    Char(char),
    /// Erase the last character.
    Backspace,
    /// Line terminator.
    Enter,
}

/// Reads terminal key events and assembles them into lines.
#[derive(Debug)]
pub struct KeystrokeInput {
    interval: Duration,
    assembler: LineAssembler,
}

impl KeystrokeInput {
    /// Creates a source that waits at most `interval` per poll.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            assembler: LineAssembler::default(),
        }
    }

    fn line_key(event: &KeyEvent) -> Option<LineKey> {
        if event.kind != KeyEventKind::Press {
            return None;
        }
        match event.code {
            KeyCode::Char(c) => Some(LineKey::Char(c)),
            KeyCode::Backspace => Some(LineKey::Backspace),
            KeyCode::Enter => Some(LineKey::Enter),
            _ => None,
        }
    }
}

impl InputSource for KeystrokeInput {
    fn poll(&mut self) -> Option<String> {
        let mut wait = self.interval;

        // Drain every key already available, then report.
        loop {
            match event::poll(wait) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => {
                    trace!(error = %e, "terminal event poll failed");
                    return None;
                }
            }
            wait = Duration::ZERO;

            let key = match event::read() {
                Ok(Event::Key(event)) => Self::line_key(&event),
                Ok(_) => None,
                Err(e) => {
                    trace!(error = %e, "terminal event read failed");
                    return None;
                }
            };
            if let Some(line) = key.and_then(|key| self.assembler.press(key)) {
                return Some(line);
            }
        }
    }
}

// ============================================================================
// ScriptedInput
// ============================================================================

#[derive(Debug, Clone)]
enum Step {
    Line(String),
    Wait(Duration),
}

/// Replays a predefined script of lines and pauses.
///
/// Once the script is exhausted every poll sleeps for the idle interval and
/// returns `None`, like a terminal nobody types into.
///
/// ```
/// use std::time::Duration;
/// use wsbridge::{InputSource, ScriptedInput};
///
/// let mut input = ScriptedInput::new(["hello  "])
///     .wait(Duration::from_millis(1))
///     .line("exit");
/// assert_eq!(input.poll().as_deref(), Some("hello"));
/// assert_eq!(input.poll(), None);
/// assert_eq!(input.poll().as_deref(), Some("exit"));
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    steps: VecDeque<Step>,
    idle: Duration,
}

impl ScriptedInput {
    /// Default pause once the script runs out.
    const DEFAULT_IDLE: Duration = Duration::from_millis(50);

    /// Creates a script from lines.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: lines.into_iter().map(|line| Step::Line(line.into())).collect(),
            idle: Self::DEFAULT_IDLE,
        }
    }

    /// Creates a script that never produces input.
    #[must_use]
    pub fn silent() -> Self {
        Self::new(Vec::<String>::new())
    }

    /// Appends a line.
    #[must_use]
    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.steps.push_back(Step::Line(line.into()));
        self
    }

    /// Appends a pause: one poll that sleeps for `duration` and yields
    /// nothing.
    #[must_use]
    pub fn wait(mut self, duration: Duration) -> Self {
        self.steps.push_back(Step::Wait(duration));
        self
    }

    /// Sets the pause used once the script is exhausted.
    #[must_use]
    pub fn with_idle(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    /// Returns `true` once every step has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.steps.is_empty()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Option<String> {
        match self.steps.pop_front() {
            Some(Step::Line(line)) => Some(line.trim_end().to_string()),
            Some(Step::Wait(duration)) => {
                thread::sleep(duration);
                None
            }
            None => {
                thread::sleep(self.idle);
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
