use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved location inside a [`SourceBuffer`].
///
/// `offset` is the 0-based byte index both backends use as the instruction
/// pointer. `line`/`col` are 1-based for human-readable messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl Position {
    /// Create a new position.
    pub fn new(offset: usize, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Immutable program text shared by the interpreter and the code generator.
///
/// Program text is handled as bytes: every instruction is ASCII, and any
/// other byte (including parts of multi-byte UTF-8 sequences) is a no-op.
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    name: String,
    bytes: Vec<u8>,
    /// Cached line start byte offsets for fast line lookup.
    line_starts: Vec<usize>,
}

impl SourceBuffer {
    /// Create a source buffer from program text.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self::from_bytes(name, source.into().into_bytes())
    }

    /// Create a source buffer from raw bytes.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let line_starts = std::iter::once(0)
            .chain(
                bytes
                    .iter()
                    .enumerate()
                    .filter(|(_, &b)| b == b'\n')
                    .map(|(i, _)| i + 1),
            )
            .collect();
        Self {
            name: name.into(),
            bytes,
            line_starts,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The program text, with invalid UTF-8 replaced.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Resolve a byte offset into a line/column position.
    ///
    /// Offsets past the end resolve to the end of the last line.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.bytes.len());
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let col = offset - self.line_starts[line_idx] + 1;
        Position::new(offset, line_idx as u32 + 1, col as u32)
    }

    /// Extract a source line by 1-based line number.
    ///
    /// Returns `None` if the line number is out of range.
    pub fn line(&self, line_number: u32) -> Option<String> {
        let idx = line_number.checked_sub(1)? as usize;
        if idx >= self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[idx];
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&s| s.saturating_sub(1)) // strip the \n
            .unwrap_or(self.bytes.len());
        let line = String::from_utf8_lossy(&self.bytes[start..end]);
        // Also strip trailing \r for CRLF
        Some(line.trim_end_matches('\r').to_string())
    }

    /// Get the total number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_first_line() {
        let src = SourceBuffer::new("t.b", "+[-]");
        assert_eq!(src.position(0), Position::new(0, 1, 1));
        assert_eq!(src.position(3), Position::new(3, 1, 4));
    }

    #[test]
    fn test_position_after_newline() {
        let src = SourceBuffer::new("t.b", "++\n[-]\n.");
        assert_eq!(src.position(3), Position::new(3, 2, 1));
        assert_eq!(src.position(5), Position::new(5, 2, 3));
        assert_eq!(src.position(7), Position::new(7, 3, 1));
    }

    #[test]
    fn test_position_clamps_to_end() {
        let src = SourceBuffer::new("t.b", "ab");
        assert_eq!(src.position(99).offset, 2);
    }

    #[test]
    fn test_line_extraction() {
        let src = SourceBuffer::new("t.b", "line one\r\nline two\n");
        assert_eq!(src.line(1).as_deref(), Some("line one"));
        assert_eq!(src.line(2).as_deref(), Some("line two"));
        assert_eq!(src.line(3).as_deref(), Some(""));
        assert_eq!(src.line(0), None);
        assert_eq!(src.line_count(), 3);
    }

    #[test]
    fn test_non_utf8_bytes_are_kept() {
        let src = SourceBuffer::from_bytes("t.b", vec![b'+', 0xff, b'.']);
        assert_eq!(src.bytes(), &[b'+', 0xff, b'.']);
        assert_eq!(src.len(), 3);
        assert_eq!(src.text(), "+\u{fffd}.");
    }
}
