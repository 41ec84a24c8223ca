//! Continuation escape for multi-line messages.
//!
//! A line ending in an odd number of backslashes continues on the next line.
//! Trailing backslash pairs collapse to one literal backslash.
//!
//! | Input line | Fragment | Complete |
//! |------------|----------|----------|
//! | `example` | `example` | yes |
//! | `example\` | `example` | no |
//! | `example\\` | `example\` | yes |
//! | `example\\\` | `example\` | no |

// ============================================================================
// Unescape
// ============================================================================

/// Resolves the trailing backslashes of one line.
///
/// Returns the fragment with trailing backslash pairs collapsed and whether
/// the logical message is complete (an even number of trailing backslashes,
/// zero included).
#[must_use]
pub fn unescape_trailing(line: &str) -> (String, bool) {
    let body = line.trim_end_matches('\\');
    let count = line.len() - body.len();

    let mut fragment = String::with_capacity(body.len() + count / 2);
    fragment.push_str(body);
    fragment.extend(std::iter::repeat_n('\\', count / 2));

    (fragment, count % 2 == 0)
}

// ============================================================================
// ContinuationBuffer
// ============================================================================

/// Accumulates continued lines into one message.
#[derive(Debug, Default, Clone)]
pub struct ContinuationBuffer {
    fragments: Vec<String>,
}

impl ContinuationBuffer {
    /// Creates an empty buffer.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one input line.
    ///
    /// Returns the assembled message, fragments joined by line breaks, once
    /// a line completes it.
    pub fn push(&mut self, line: &str) -> Option<String> {
        let (fragment, complete) = unescape_trailing(line);
        self.fragments.push(fragment);

        if complete {
            let message = self.fragments.join("\n");
            self.fragments.clear();
            Some(message)
        } else {
            None
        }
    }

    /// Discards any pending fragments, returning them joined.
    pub fn take_pending(&mut self) -> Option<String> {
        if self.fragments.is_empty() {
            return None;
        }
        let pending = self.fragments.join("\n");
        self.fragments.clear();
        Some(pending)
    }
}

// ============================================================================
// Tests
// ============================================================================
