//! Text documents and line/character positions.

use serde::{Deserialize, Serialize};

/// Zero-based line and character. `character` counts chars, not bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line index.
    pub line: u32,
    /// Character index within the line.
    pub character: u32,
}

impl Position {
    /// Position at `line`, `character`.
    #[must_use]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// An open text document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Document URI.
    pub uri: String,
    /// Editor language identifier, e.g. `typescript`.
    pub language_id: String,
    /// Editor version counter.
    pub version: u32,
    /// Full text.
    pub text: String,
}

impl Document {
    /// Version-0 document.
    pub fn new(uri: impl Into<String>, language_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            language_id: language_id.into(),
            version: 0,
            text: text.into(),
        }
    }

    /// Set the version.
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Number of lines. An empty document has one.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts().len()
    }

    /// Clamp `offset` into the text and back onto a char boundary.
    #[must_use]
    pub fn clamp_offset(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    /// Position of byte `offset`. Offsets past the end map to the end.
    #[must_use]
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = self.clamp_offset(offset);
        let starts = self.line_starts();
        let line = starts.partition_point(|&start| start <= offset).saturating_sub(1);
        let character = self.text[starts[line]..offset].chars().count();
        Position {
            line: u32::try_from(line).unwrap_or(u32::MAX),
            character: u32::try_from(character).unwrap_or(u32::MAX),
        }
    }

    /// Byte offset of `position`. Lines past the end map to the end of the
    /// text; characters past the end of a line map to the line end.
    #[must_use]
    pub fn offset_at(&self, position: Position) -> usize {
        let starts = self.line_starts();
        let Some(&start) = starts.get(position.line as usize) else {
            return self.text.len();
        };
        let line = &self.text[start..];
        let line_end = line.find(['\r', '\n']).unwrap_or(line.len());
        let within = line[..line_end]
            .char_indices()
            .nth(position.character as usize)
            .map_or(line_end, |(idx, _)| idx);
        start + within
    }

    /// Byte offsets where each line begins. `\r\n`, `\r` and `\n` all end a line.
    fn line_starts(&self) -> Vec<usize> {
        let bytes = self.text.as_bytes();
        let mut starts = vec![0];
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    starts.push(i + 2);
                    i += 2;
                    continue;
                }
                b'\r' | b'\n' => starts.push(i + 1),
                _ => {}
            }
            i += 1;
        }
        starts
    }
}
