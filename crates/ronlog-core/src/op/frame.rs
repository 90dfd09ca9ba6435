use std::fmt;

use super::Op;
use super::parser::{Cursor, DecodeError, decode};
use super::writer::Builder;

/// An owned, immutable frame of op text.
///
/// Construct with [`Frame::parse`] to validate up front, or
/// [`Frame::new`] to defer errors to the first read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Frame {
    data: String,
}

impl Frame {
    /// Wrap text without validating it.
    #[must_use]
    pub const fn new(data: String) -> Self {
        Self { data }
    }

    /// Validate `text` and wrap it.
    ///
    /// # Errors
    ///
    /// Returns the first [`DecodeError`] in `text`.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        decode(text)?;
        Ok(Self::new(text.to_string()))
    }

    /// Encode `ops` into a compact frame.
    #[must_use]
    pub fn from_ops<'o>(ops: impl IntoIterator<Item = &'o Op>) -> Self {
        let mut builder = Builder::new();
        for op in ops {
            builder.append(op);
        }
        builder.into_frame()
    }

    /// A cursor positioned on the first op.
    #[must_use]
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(&self.data)
    }

    /// Decode every op.
    ///
    /// # Errors
    ///
    /// Returns the first [`DecodeError`] in the frame.
    pub fn ops(&self) -> Result<Vec<Op>, DecodeError> {
        decode(&self.data)
    }

    /// Number of ops decodable from the start of the frame.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut cursor = self.cursor();
        let mut count = 0;
        while cursor.valid() {
            count += 1;
            cursor.advance();
        }
        count
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.data
    }

    /// Returns `true` if the frame holds no op text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.trim().is_empty()
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.data
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data)
    }
}

impl From<Frame> for String {
    fn from(frame: Frame) -> Self {
        frame.data
    }
}
