//! Line codec: raw serial bytes in, trimmed text lines out
//!
//! The board terminates every line with `\n` (usually `\r\n`). Bytes are
//! buffered until a terminator arrives, so a line split across several reads
//! comes out whole, and several lines in one read come out one by one.

use std::collections::VecDeque;

use tracing::warn;

use crate::protocol::Command;

/// Longest partial line kept before it is dropped as garbage
const MAX_LINE_LEN: usize = 1024;

/// Buffers incoming bytes and splits them into lines
#[derive(Debug, Default)]
pub struct LineCodec {
    partial: Vec<u8>,
    lines: VecDeque<String>,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; completed lines become available via [`next_line`](Self::next_line)
    pub fn push(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if b == b'\n' {
                let line = String::from_utf8_lossy(&self.partial);
                let line = line.trim();
                if !line.is_empty() {
                    self.lines.push_back(line.to_string());
                }
                self.partial.clear();
            } else {
                if self.partial.len() >= MAX_LINE_LEN {
                    warn!(
                        "Dropping {} bytes of unterminated input",
                        self.partial.len()
                    );
                    self.partial.clear();
                }
                self.partial.push(b);
            }
        }
    }

    /// Pop the oldest complete line
    pub fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    /// Discard buffered lines and any partial line
    pub fn reset(&mut self) -> usize {
        let dropped = self.lines.len();
        self.lines.clear();
        self.partial.clear();
        dropped
    }

    /// Render a command to the bytes written on the wire
    pub fn encode(command: &Command) -> Vec<u8> {
        command.to_wire().into_bytes()
    }
}

/// Split a comma-delimited record into trimmed fields
pub fn split_fields(line: &str) -> Vec<String> {
    line.split(',').map(|f| f.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_split_across_pushes() {
        let mut codec = LineCodec::new();
        codec.push(b"OpenFIRE,5.2,Dawn,");
        assert!(codec.next_line().is_none());
        codec.push(b"rpipico,0\r\n");
        assert_eq!(
            codec.next_line().as_deref(),
            Some("OpenFIRE,5.2,Dawn,rpipico,0")
        );
        assert!(codec.next_line().is_none());
    }

    #[test]
    fn test_multiple_lines_in_one_push() {
        let mut codec = LineCodec::new();
        codec.push(b"Pressed:03\r\n\r\nReleased:03\nPartial");
        assert_eq!(codec.next_line().as_deref(), Some("Pressed:03"));
        assert_eq!(codec.next_line().as_deref(), Some("Released:03"));
        assert!(codec.next_line().is_none());
        codec.push(b"\n");
        assert_eq!(codec.next_line().as_deref(), Some("Partial"));
    }

    #[test]
    fn test_reset_drops_everything() {
        let mut codec = LineCodec::new();
        codec.push(b"a\nb\nc");
        assert_eq!(codec.reset(), 2);
        codec.push(b"\n");
        assert!(codec.next_line().is_none());
    }

    #[test]
    fn test_overlong_partial_is_dropped() {
        let mut codec = LineCodec::new();
        codec.push(&vec![b'x'; MAX_LINE_LEN + 10]);
        codec.push(b"\n");
        let line = codec.next_line().unwrap();
        assert_eq!(line.len(), 10);
    }

    #[test]
    fn test_split_fields() {
        assert_eq!(split_fields("1, 2 ,3"), vec!["1", "2", "3"]);
        assert_eq!(split_fields("solo"), vec!["solo"]);
    }

    #[test]
    fn test_encode_has_no_terminator() {
        assert_eq!(LineCodec::encode(&Command::Probe), b"XP".to_vec());
    }
}
