//! Frame text encoder.
//!
//! The [`Builder`] appends ops to a growing frame, eliding each op's `@id`
//! when it is the previous id plus one and its `:ref` when it equals the
//! previous id. Tokens are separated by single spaces and the terminator is
//! attached to the op's last token:
//!
//! ```text
//! @1+A :rga! 'a', 'b', @1000000004+B 'D',
//! ```

use std::fmt::{self, Write as _};

use super::frame::Frame;
use super::parser::{Cursor, DecodeError};
use super::uuid::Uuid;
use super::{Atom, Op, Term};

/// Write `op` with both specs spelled out (`@id :ref atoms term`).
///
/// This is the form fed to op hashing, so it must stay stable.
///
/// # Errors
///
/// Propagates errors from the underlying writer.
pub fn write_canonical<W: fmt::Write + ?Sized>(w: &mut W, op: &Op) -> fmt::Result {
    write_op(w, op, None)
}

fn write_op<W: fmt::Write + ?Sized>(w: &mut W, op: &Op, prev: Option<Uuid>) -> fmt::Result {
    let mut spaced = false;
    let mut sep = |w: &mut W| -> fmt::Result {
        if spaced {
            w.write_char(' ')?;
        }
        spaced = true;
        Ok(())
    };

    if prev.is_none_or(|p| op.id != p.inc()) {
        sep(w)?;
        write!(w, "@{}", op.id)?;
    }
    if prev.is_none_or(|p| op.ref_id != p) {
        sep(w)?;
        write!(w, ":{}", op.ref_id)?;
    }
    for atom in &op.atoms {
        sep(w)?;
        write!(w, "{atom}")?;
    }
    w.write_char(op.term.punct())
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Accumulates ops into frame text.
#[derive(Debug, Clone)]
pub struct Builder {
    data: String,
    prev: Uuid,
    compact: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// A builder that elides implicit specs.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_compaction(true)
    }

    /// A builder that elides implicit specs only when `compact` is set.
    ///
    /// Both forms decode to the same ops.
    #[must_use]
    pub const fn with_compaction(compact: bool) -> Self {
        Self {
            data: String::new(),
            prev: Uuid::ZERO,
            compact,
        }
    }

    /// Append a fully specified op.
    pub fn append(&mut self, op: &Op) {
        if !self.data.is_empty() {
            self.data.push(' ');
        }
        let prev = self.compact.then_some(self.prev);
        // fmt::Write for String never fails
        let _ = write_op(&mut self.data, op, prev);
        self.prev = op.id;
    }

    /// Append an op, resolving [`Uuid::UNSPECIFIED`] specs from the previous
    /// op: the id becomes its successor and the ref becomes the previous id.
    pub fn append_new(&mut self, term: Term, id: Uuid, ref_id: Uuid, atoms: Vec<Atom>) -> Uuid {
        let id = if id.is_unspecified() { self.prev.inc() } else { id };
        let ref_id = if ref_id.is_unspecified() { self.prev } else { ref_id };
        self.append(&Op::new(term, id, ref_id, atoms));
        id
    }

    /// Drain `cursor` into the frame, starting with its current op.
    ///
    /// # Errors
    ///
    /// Returns the [`DecodeError`] that stopped the cursor. Ops read before
    /// the error stay appended.
    pub fn append_all(&mut self, cursor: &mut Cursor<'_>) -> Result<usize, DecodeError> {
        let mut count = 0;
        while let Some(op) = cursor.op() {
            self.append(op);
            count += 1;
            cursor.advance();
        }
        match cursor.error() {
            Some(e) => Err(e.clone()),
            None => Ok(count),
        }
    }

    /// Append every op of `frame`.
    ///
    /// # Errors
    ///
    /// Returns the [`DecodeError`] if `frame` is malformed.
    pub fn append_frame(&mut self, frame: &Frame) -> Result<usize, DecodeError> {
        self.append_all(&mut frame.cursor())
    }

    /// The id of the last appended op (zero when empty).
    #[must_use]
    pub const fn prev(&self) -> Uuid {
        self.prev
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// A copy of the frame built so far.
    #[must_use]
    pub fn frame(&self) -> Frame {
        Frame::new(self.data.clone())
    }

    /// Finish building and take the frame.
    #[must_use]
    pub fn into_frame(self) -> Frame {
        Frame::new(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{Marker, decode};

    fn uuid(text: &str) -> Uuid {
        Uuid::parse(text).expect("uuid")
    }

    #[test]
    fn elides_sequential_specs() {
        let head = uuid("1+A");
        let mut b = Builder::new();
        b.append(&Op::header(head, uuid("rga")));
        b.append(&Op::value(head.inc(), head, vec![Atom::string("a")]));
        b.append(&Op::value(uuid("1b+C"), head.inc(), vec![Atom::string("b")]));
        b.append(&Op::value(uuid("1a+B"), head, vec![Atom::string("c")]));
        assert_eq!(
            b.frame().as_str(),
            "@1+A :rga! 'a', @1b+C 'b', @1a+B :1+A 'c',"
        );
    }

    #[test]
    fn op_with_no_tokens_writes_bare_terminator() {
        let mut b = Builder::new();
        b.append_new(Term::Raw, Uuid::UNSPECIFIED, Uuid::UNSPECIFIED, vec![]);
        assert_eq!(b.frame().as_str(), ";");
        assert_eq!(b.prev(), Uuid::ZERO.inc());
    }

    #[test]
    fn append_new_infers_from_previous() {
        let mut b = Builder::new();
        b.append(&Op::header(uuid("1+A"), uuid("rga")));
        let id = b.append_new(
            Term::Marker,
            Uuid::UNSPECIFIED,
            Uuid::UNSPECIFIED,
            vec![Atom::Uuid(Marker::Remove.uuid())],
        );
        assert_eq!(id, uuid("1000000001+A"));
        assert_eq!(b.frame().as_str(), "@1+A :rga! rm,");
    }

    #[test]
    fn uncompacted_frames_decode_identically() {
        let text = "@1+A :rga! 'a', 'b', @1000000004+B 'D', rm,";
        let ops = decode(text).expect("decode");

        let mut full = Builder::with_compaction(false);
        let mut compact = Builder::new();
        for op in &ops {
            full.append(op);
            compact.append(op);
        }
        assert_eq!(compact.frame().as_str(), text);
        assert!(full.frame().as_str().starts_with("@1+A :rga! @1000000001+A :1+A 'a',"));
        assert_eq!(decode(full.frame().as_str()).expect("decode"), ops);
    }

    #[test]
    fn append_all_reports_decode_errors() {
        let mut b = Builder::new();
        let mut cur = Cursor::new("@1+A :rga! 'a', @");
        let err = b.append_all(&mut cur).expect_err("truncated");
        assert!(matches!(err, DecodeError::BadUuid { .. }));
        assert_eq!(b.frame().as_str(), "@1+A :rga! 'a',");
    }
}
