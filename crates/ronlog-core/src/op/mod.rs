//! The op model: identifiers, atoms, ops and frames.
//!
//! An [`Op`] is the unit of replication: a unique id, the id of the op it
//! causally follows (its *ref*), a terminator class and a payload of
//! [`Atom`]s. Ops travel in [`Frame`]s, read with a [`Cursor`] and written
//! with a [`Builder`].

pub mod atom;
pub mod frame;
pub mod parser;
pub mod uuid;
pub mod writer;

use std::fmt;

pub use atom::Atom;
pub use frame::Frame;
pub use parser::{Cursor, DecodeError, decode};
pub use uuid::{Scheme, Uuid, UuidError};
pub use writer::{Builder, write_canonical};

// ---------------------------------------------------------------------------
// Term
// ---------------------------------------------------------------------------

/// The terminator class of an op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    /// A freshly authored op (`;`).
    Raw,
    /// An op inside a reduced (merged) chain (`,`).
    Reduced,
    /// An object header (`!`). Its ref names the data type.
    Header,
    /// A delete or undo marker. Written as `,`.
    Marker,
}

impl Term {
    /// The punctuation written after the op.
    #[must_use]
    pub const fn punct(self) -> char {
        match self {
            Self::Raw => ';',
            Self::Reduced | Self::Marker => ',',
            Self::Header => '!',
        }
    }
}

// ---------------------------------------------------------------------------
// Marker
// ---------------------------------------------------------------------------

/// Control ops that hide or restore content instead of carrying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// `rm`: hide the nearest live content on the path.
    Remove,
    /// `un`: undo the most recent remove on the path.
    Undo,
}

impl Marker {
    /// The name identifier carried as the marker's single atom.
    #[must_use]
    pub const fn uuid(self) -> Uuid {
        // "rm" and "un" as left-aligned name words
        match self {
            Self::Remove => Uuid::new((54 << 54) | (49 << 48), 0, Scheme::Name),
            Self::Undo => Uuid::new((57 << 54) | (50 << 48), 0, Scheme::Name),
        }
    }

    /// Classify a payload: a marker is exactly one bare `rm` or `un` atom.
    #[must_use]
    pub fn from_atoms(atoms: &[Atom]) -> Option<Self> {
        match atoms {
            [Atom::Uuid(u)] if *u == Self::Remove.uuid() => Some(Self::Remove),
            [Atom::Uuid(u)] if *u == Self::Undo.uuid() => Some(Self::Undo),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Op
// ---------------------------------------------------------------------------

/// A single immutable operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Op {
    pub id: Uuid,
    /// The causal parent, or the data type for a header.
    pub ref_id: Uuid,
    pub term: Term,
    pub atoms: Vec<Atom>,
}

impl Op {
    #[must_use]
    pub const fn new(term: Term, id: Uuid, ref_id: Uuid, atoms: Vec<Atom>) -> Self {
        Self {
            id,
            ref_id,
            term,
            atoms,
        }
    }

    /// An object header: `@id :rdt!`.
    #[must_use]
    pub const fn header(id: Uuid, rdt: Uuid) -> Self {
        Self::new(Term::Header, id, rdt, Vec::new())
    }

    /// A reduced op carrying `atoms`. A lone bare `rm` or `un` atom reads
    /// back as a marker, so such an op is built as one.
    #[must_use]
    pub fn value(id: Uuid, ref_id: Uuid, atoms: Vec<Atom>) -> Self {
        let term = if Marker::from_atoms(&atoms).is_some() {
            Term::Marker
        } else {
            Term::Reduced
        };
        Self::new(term, id, ref_id, atoms)
    }

    /// A marker op of the given kind.
    #[must_use]
    pub fn marker(id: Uuid, ref_id: Uuid, kind: Marker) -> Self {
        Self::new(Term::Marker, id, ref_id, vec![Atom::Uuid(kind.uuid())])
    }

    /// The marker kind, if this op is a marker.
    #[must_use]
    pub fn marker_kind(&self) -> Option<Marker> {
        if self.term == Term::Marker {
            Marker::from_atoms(&self.atoms)
        } else {
            None
        }
    }

    /// Returns `true` for causal roots: headers and ops referencing zero.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.term == Term::Header || self.ref_id.is_zero()
    }
}

impl fmt::Display for Op {
    /// Fully qualified text: `@id :ref atoms term`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_canonical(f, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_uuids_match_their_names() {
        assert_eq!(Marker::Remove.uuid(), Uuid::name("rm").expect("rm"));
        assert_eq!(Marker::Undo.uuid(), Uuid::name("un").expect("un"));
    }

    #[test]
    fn marker_requires_a_single_bare_atom() {
        let rm = Atom::Uuid(Marker::Remove.uuid());
        assert_eq!(Marker::from_atoms(std::slice::from_ref(&rm)), Some(Marker::Remove));
        assert_eq!(Marker::from_atoms(&[rm.clone(), rm]), None);
        assert_eq!(Marker::from_atoms(&[Atom::string("rm")]), None);
    }

    #[test]
    fn value_with_a_marker_atom_is_a_marker() {
        let id = Uuid::parse("1a+B").expect("id");
        let parent = Uuid::parse("1+A").expect("ref");
        let op = Op::value(id, parent, vec![Atom::Uuid(Marker::Remove.uuid())]);
        assert_eq!(op.term, Term::Marker);
        assert_eq!(op.marker_kind(), Some(Marker::Remove));
        assert_eq!(op, Op::marker(id, parent, Marker::Remove));

        let frame = Frame::from_ops([&op]);
        assert_eq!(decode(frame.as_str()).expect("decode"), vec![op]);

        let text = Op::value(id, parent, vec![Atom::string("rm")]);
        assert_eq!(text.term, Term::Reduced);
    }

    #[test]
    fn headers_and_zero_refs_are_roots() {
        let id = Uuid::parse("1+A").expect("id");
        let rga = Uuid::name("rga").expect("rga");
        assert!(Op::header(id, rga).is_root());
        assert!(Op::value(id, Uuid::ZERO, vec![]).is_root());
        assert!(!Op::value(id.inc(), id, vec![]).is_root());
    }

    #[test]
    fn display_is_fully_qualified() {
        let id = Uuid::parse("1+A").expect("id");
        let op = Op::value(id.inc(), id, vec![Atom::string("a")]);
        assert_eq!(op.to_string(), "@1000000001+A :1+A 'a',");
        assert_eq!(Op::marker(id.inc(), id, Marker::Undo).to_string(), "@1000000001+A :1+A un,");
    }
}
