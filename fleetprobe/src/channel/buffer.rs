//! Line assembly and accumulation for session output.
//!
//! Devices write output in arbitrary chunks. [`LineBuffer`] reassembles a
//! single stream into complete lines, stripping carriage returns and ANSI
//! escape sequences, and [`SessionOutput`] is the ordered text buffer both
//! stream drains append to.

use bytes::BytesMut;

/// Reassembles one byte stream into lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    /// Bytes received after the last newline.
    pending: BytesMut,
}

impl LineBuffer {
    /// Create an empty line buffer.
    pub fn new() -> Self {
        Self {
            pending: BytesMut::with_capacity(1024),
        }
    }

    /// Feed a chunk and return every line it completed.
    pub fn push(&mut self, data: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(data);

        let mut lines = Vec::new();
        while let Some(pos) = memchr::memchr(b'\n', &self.pending) {
            let line = self.pending.split_to(pos + 1);
            lines.push(clean_line(&line[..pos]));
        }
        lines
    }

    /// Flush a trailing line that never saw its newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = self.pending.split();
        Some(clean_line(&rest))
    }
}

/// Strip the line terminator remnant and terminal control sequences.
fn clean_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let cleaned = strip_ansi_escapes::strip(raw);
    String::from_utf8_lossy(&cleaned).into_owned()
}

/// Ordered text captured from one session.
#[derive(Debug, Default)]
pub struct SessionOutput {
    text: String,
}

impl SessionOutput {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line.
    pub fn push_line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    /// Take the captured text, leaving the buffer empty.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }
}
