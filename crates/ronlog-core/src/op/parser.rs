//! Frame text decoder.
//!
//! A frame is a sequence of ops, each `[@id] [:ref] atom* term`. Absent
//! specs are implicit: a missing `@id` is the previous op's id plus one and
//! a missing `:ref` is the previous op's id. The first op's "previous" id is
//! zero.
//!
//! # Grammar
//!
//! ```text
//! op    := ('@' uuid)? (':' uuid)? atom* term
//! atom  := int | float | string | '>' uuid | bare-uuid
//! term  := ';' | ',' | '!' | '?'
//! ```
//!
//! Whitespace separates tokens. A number must be followed by whitespace, a
//! terminator or end of input. `?` (query) is recognised and rejected.

use super::atom::{Atom, unescape};
use super::uuid::{Uuid, UuidError, is_uuid_byte, symbol_value};
use super::{Marker, Op, Term};
use crate::error::ErrorCode;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from decoding frame text. Offsets are byte offsets into the frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A byte that cannot start any token here.
    #[error("unexpected {found:?} at byte {offset}")]
    Unexpected { offset: usize, found: char },

    /// Input ended inside an op.
    #[error("op starting at byte {offset} has no terminator")]
    Truncated { offset: usize },

    /// An identifier token failed to parse.
    #[error("bad identifier at byte {offset}: {source}")]
    BadUuid {
        offset: usize,
        #[source]
        source: UuidError,
    },

    /// A numeric literal that is malformed, out of range, or run into
    /// another token.
    #[error("bad number {raw:?} at byte {offset}")]
    BadNumber { offset: usize, raw: String },

    /// A string literal with no closing quote.
    #[error("unterminated string at byte {offset}")]
    UnterminatedString { offset: usize },

    /// An unknown or malformed escape sequence inside a string.
    #[error("bad escape sequence at byte {offset}")]
    BadEscape { offset: usize },

    /// A query op (`?`); queries are not supported.
    #[error("query ops are not supported (byte {offset})")]
    NotImplemented { offset: usize },
}

impl DecodeError {
    /// Map onto the shared error code table.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotImplemented { .. } => ErrorCode::NotImplemented,
            _ => ErrorCode::BadSyntax,
        }
    }

    /// Byte offset the error was detected at.
    #[must_use]
    pub const fn offset(&self) -> usize {
        match self {
            Self::Unexpected { offset, .. }
            | Self::Truncated { offset }
            | Self::BadUuid { offset, .. }
            | Self::BadNumber { offset, .. }
            | Self::UnterminatedString { offset }
            | Self::BadEscape { offset }
            | Self::NotImplemented { offset } => *offset,
        }
    }
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum State {
    Valid,
    End,
    Failed(DecodeError),
}

/// A forward-only reader positioned on one op of a frame at a time.
///
/// A new cursor is already positioned on the first op (if any). Once the
/// cursor becomes invalid, either at the end of input or on malformed input,
/// it stays invalid; [`Cursor::error`] tells the two apart.
///
/// ```
/// use ronlog_core::op::Cursor;
///
/// let mut cur = Cursor::new("@1+A :rga! 'a', 'b',");
/// let mut ids = Vec::new();
/// while cur.valid() {
///     ids.push(cur.id().map(|id| id.to_string()));
///     cur.advance();
/// }
/// assert_eq!(ids.len(), 3);
/// assert!(cur.error().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a str,
    pos: usize,
    start: usize,
    prev: Uuid,
    op: Option<Op>,
    state: State,
}

impl<'a> Cursor<'a> {
    /// Open a cursor over frame text and position it on the first op.
    #[must_use]
    pub fn new(data: &'a str) -> Self {
        let mut cursor = Self {
            data,
            pos: 0,
            start: 0,
            prev: Uuid::ZERO,
            op: None,
            state: State::End,
        };
        cursor.advance();
        cursor
    }

    /// Move to the next op. Returns whether the cursor is now valid.
    pub fn advance(&mut self) -> bool {
        if matches!(self.state, State::Failed(_)) {
            return false;
        }
        match self.read_op() {
            Ok(Some(op)) => {
                self.prev = op.id;
                self.op = Some(op);
                self.state = State::Valid;
                true
            }
            Ok(None) => {
                self.op = None;
                self.state = State::End;
                false
            }
            Err(e) => {
                tracing::debug!(offset = e.offset(), error = %e, "frame decode stopped");
                self.op = None;
                self.state = State::Failed(e);
                false
            }
        }
    }

    /// Returns `true` while positioned on a decoded op.
    #[must_use]
    pub const fn valid(&self) -> bool {
        matches!(self.state, State::Valid)
    }

    /// The current op, if valid.
    #[must_use]
    pub const fn op(&self) -> Option<&Op> {
        self.op.as_ref()
    }

    #[must_use]
    pub fn id(&self) -> Option<Uuid> {
        self.op.as_ref().map(|op| op.id)
    }

    #[must_use]
    pub fn ref_id(&self) -> Option<Uuid> {
        self.op.as_ref().map(|op| op.ref_id)
    }

    /// Byte offset where the current op starts, or where decoding stopped.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.start
    }

    /// The decode error that invalidated the cursor, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&DecodeError> {
        match &self.state {
            State::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Returns `true` when the cursor ran off the end of well-formed input.
    #[must_use]
    pub const fn at_end(&self) -> bool {
        matches!(self.state, State::End)
    }

    /// Drain the remaining ops, starting with the current one.
    ///
    /// # Errors
    ///
    /// Returns the [`DecodeError`] that stopped the cursor, if any.
    pub fn collect_ops(mut self) -> Result<Vec<Op>, DecodeError> {
        let mut ops = Vec::new();
        while let Some(op) = self.op.take() {
            ops.push(op);
            self.advance();
        }
        match self.state {
            State::Failed(e) => Err(e),
            _ => Ok(ops),
        }
    }

    // -----------------------------------------------------------------------
    // Lexing
    // -----------------------------------------------------------------------

    fn peek(&self) -> Option<u8> {
        self.data.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn read_op(&mut self) -> Result<Option<Op>, DecodeError> {
        self.skip_ws();
        self.start = self.pos;
        if self.peek().is_none() {
            return Ok(None);
        }

        let mut id = None;
        let mut ref_id = None;
        if self.peek() == Some(b'@') {
            self.pos += 1;
            id = Some(self.read_uuid()?);
            self.skip_ws();
        }
        if self.peek() == Some(b':') {
            self.pos += 1;
            ref_id = Some(self.read_uuid()?);
        }

        let mut atoms = Vec::new();
        let term = loop {
            self.skip_ws();
            let Some(b) = self.peek() else {
                return Err(DecodeError::Truncated { offset: self.start });
            };
            match b {
                b';' => break Term::Raw,
                b',' => break Term::Reduced,
                b'!' => break Term::Header,
                b'?' => return Err(DecodeError::NotImplemented { offset: self.pos }),
                b'\'' => atoms.push(Atom::String(self.read_string()?)),
                b'>' => {
                    self.pos += 1;
                    atoms.push(Atom::Uuid(self.read_uuid()?));
                }
                b'0'..=b'9' | b'-' | b'+' => atoms.push(self.read_number()?),
                b if symbol_value(b).is_some() => atoms.push(Atom::Uuid(self.read_uuid()?)),
                _ => {
                    let found = self.data[self.pos..].chars().next().unwrap_or('\0');
                    return Err(DecodeError::Unexpected {
                        offset: self.pos,
                        found,
                    });
                }
            }
        };
        self.pos += 1;

        let id = id.unwrap_or_else(|| self.prev.inc());
        let ref_id = ref_id.unwrap_or(self.prev);
        let term = if term != Term::Header && Marker::from_atoms(&atoms).is_some() {
            Term::Marker
        } else {
            term
        };
        Ok(Some(Op::new(term, id, ref_id, atoms)))
    }

    fn read_uuid(&mut self) -> Result<Uuid, DecodeError> {
        let offset = self.pos;
        while self.peek().is_some_and(is_uuid_byte) {
            self.pos += 1;
        }
        Uuid::parse(&self.data[offset..self.pos])
            .map_err(|source| DecodeError::BadUuid { offset, source })
    }

    fn read_number(&mut self) -> Result<Atom, DecodeError> {
        let offset = self.pos;
        let bytes = self.data.as_bytes();
        let digits = |pos: &mut usize| {
            let from = *pos;
            while bytes.get(*pos).is_some_and(u8::is_ascii_digit) {
                *pos += 1;
            }
            *pos > from
        };

        let mut pos = self.pos;
        if matches!(bytes.get(pos), Some(b'-' | b'+')) {
            pos += 1;
        }
        let mut ok = digits(&mut pos);
        let mut float = false;
        if bytes.get(pos) == Some(&b'.') {
            pos += 1;
            float = true;
            ok &= digits(&mut pos);
        }
        if matches!(bytes.get(pos), Some(b'e' | b'E')) {
            pos += 1;
            float = true;
            if matches!(bytes.get(pos), Some(b'-' | b'+')) {
                pos += 1;
            }
            ok &= digits(&mut pos);
        }
        ok &= match bytes.get(pos) {
            None => true,
            Some(b) => b.is_ascii_whitespace() || matches!(b, b';' | b',' | b'!' | b'?'),
        };

        let raw = &self.data[offset..pos];
        let bad = || DecodeError::BadNumber {
            offset,
            raw: raw.to_string(),
        };
        if !ok {
            return Err(bad());
        }
        self.pos = pos;
        if float {
            match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(Atom::Float(v)),
                _ => Err(bad()),
            }
        } else {
            raw.parse::<i64>().map(Atom::Int).map_err(|_| bad())
        }
    }

    fn read_string(&mut self) -> Result<String, DecodeError> {
        let offset = self.pos;
        let bytes = self.data.as_bytes();
        let body = offset + 1;
        let mut pos = body;
        loop {
            match bytes.get(pos) {
                None => return Err(DecodeError::UnterminatedString { offset }),
                Some(b'\\') => pos += 2,
                Some(b'\'') => break,
                Some(_) => pos += 1,
            }
        }
        let text = unescape(&self.data[body..pos])
            .map_err(|at| DecodeError::BadEscape { offset: body + at })?;
        self.pos = pos + 1;
        Ok(text)
    }
}

/// Decode a whole frame.
///
/// # Errors
///
/// Returns the first [`DecodeError`] in the text.
pub fn decode(data: &str) -> Result<Vec<Op>, DecodeError> {
    Cursor::new(data).collect_ops()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid(text: &str) -> Uuid {
        Uuid::parse(text).expect("uuid")
    }

    #[test]
    fn expands_implicit_specs() {
        let ops = decode("@1+A :rga! 'a', 'b',").expect("decode");
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].term, Term::Header);
        assert_eq!(ops[0].ref_id, uuid("rga"));
        assert_eq!(ops[1].id, uuid("1000000001+A"));
        assert_eq!(ops[1].ref_id, uuid("1+A"));
        assert_eq!(ops[2].id, uuid("1000000002+A"));
        assert_eq!(ops[2].ref_id, uuid("1000000001+A"));
        assert_eq!(ops[2].atoms, vec![Atom::string("b")]);
    }

    #[test]
    fn first_implicit_op_follows_zero() {
        let ops = decode("'x';").expect("decode");
        assert_eq!(ops[0].id, Uuid::ZERO.inc());
        assert_eq!(ops[0].ref_id, Uuid::ZERO);
        assert_eq!(ops[0].term, Term::Raw);
    }

    #[test]
    fn classifies_markers() {
        let ops = decode("@1+A :rga! 'a', rm, un;").expect("decode");
        assert_eq!(ops[2].marker_kind(), Some(Marker::Remove));
        assert_eq!(ops[3].marker_kind(), Some(Marker::Undo));
        assert_eq!(ops[3].term, Term::Marker);
    }

    #[test]
    fn decodes_every_atom_kind() {
        let ops = decode("@1+A :0 1 -2 3.5 1e3 'q\\'s' >1+B lww;").expect("decode");
        assert_eq!(
            ops[0].atoms,
            vec![
                Atom::Int(1),
                Atom::Int(-2),
                Atom::Float(3.5),
                Atom::Float(1000.0),
                Atom::string("q's"),
                Atom::Uuid(uuid("1+B")),
                Atom::Uuid(uuid("lww")),
            ]
        );
    }

    #[test]
    fn empty_and_blank_frames_have_no_ops() {
        assert!(decode("").expect("decode").is_empty());
        assert!(decode("  \n\t").expect("decode").is_empty());
        let cur = Cursor::new("");
        assert!(!cur.valid());
        assert!(cur.at_end());
    }

    #[test]
    fn rejects_queries() {
        let err = decode("@1+A :rga?").expect_err("query");
        assert_eq!(err, DecodeError::NotImplemented { offset: 9 });
        assert_eq!(err.code(), ErrorCode::NotImplemented);
    }

    #[test]
    fn number_must_end_at_a_boundary() {
        assert!(matches!(decode("@1+A 12ab;"), Err(DecodeError::BadNumber { .. })));
        assert!(matches!(decode("@1+A 1+A;"), Err(DecodeError::BadNumber { .. })));
        assert!(matches!(decode("@1+A 1.;"), Err(DecodeError::BadNumber { .. })));
        assert!(matches!(
            decode("@1+A 99999999999999999999;"),
            Err(DecodeError::BadNumber { .. })
        ));
        assert!(matches!(decode("@1+A 1e999;"), Err(DecodeError::BadNumber { .. })));
    }

    #[test]
    fn malformed_input_invalidates_the_cursor() {
        let mut cur = Cursor::new("@1+A :rga! 'a', 'b");
        assert!(cur.valid());
        assert!(cur.advance());
        assert!(!cur.advance());
        assert!(!cur.at_end());
        assert_eq!(cur.error(), Some(&DecodeError::UnterminatedString { offset: 16 }));
        assert_eq!(cur.offset(), 16);
        assert!(!cur.advance());
    }

    #[test]
    fn missing_terminator_is_truncation() {
        assert_eq!(decode("@1+A 'a'"), Err(DecodeError::Truncated { offset: 0 }));
        assert!(matches!(
            decode("@1+A 'a' @2+A 'b';"),
            Err(DecodeError::Unexpected { found: '@', .. })
        ));
    }

    #[test]
    fn bad_escape_reports_its_offset() {
        assert_eq!(decode("'a\\qb';"), Err(DecodeError::BadEscape { offset: 2 }));
    }
}
