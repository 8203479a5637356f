//! Output capture for a dispatch call.
//!
//! Everything an action or filter produces goes into an [`OutputBuffer`]
//! owned by the dispatch call. After-action hooks receive the buffer for
//! post-processing; the final contents are returned to the caller in
//! [`Dispatched::Completed`](crate::Dispatched::Completed). If parameter
//! binding is rejected the buffer is dropped and nothing is returned.

use std::fmt;

/// Captured response body text.
///
/// Implements [`fmt::Write`], so handlers can use `write!`:
///
/// ```rust
/// use std::fmt::Write;
/// use stagehand_dispatch::OutputBuffer;
///
/// let mut out = OutputBuffer::new();
/// write!(out, "{} items", 3).unwrap();
/// assert_eq!(out.as_str(), "3 items");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputBuffer {
    buf: String,
}

impl OutputBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends text.
    pub fn push_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    /// The captured text so far.
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Discards everything captured so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Replaces the captured text, returning the previous contents.
    pub fn replace(&mut self, text: impl Into<String>) -> String {
        std::mem::replace(&mut self.buf, text.into())
    }

    /// Takes the captured text, leaving the buffer empty.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }

    /// Consumes the buffer.
    pub fn into_string(self) -> String {
        self.buf
    }
}

impl fmt::Write for OutputBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buf.push_str(s);
        Ok(())
    }
}

impl fmt::Display for OutputBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buf)
    }
}

impl From<OutputBuffer> for String {
    fn from(out: OutputBuffer) -> Self {
        out.buf
    }
}
