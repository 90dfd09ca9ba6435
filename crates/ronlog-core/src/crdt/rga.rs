//! Replicated growable array: causal-tree merge.
//!
//! The union of all input ops forms a forest through the `ref` relation.
//! Merged output is a depth-first walk of that forest: roots in ascending id
//! order, each node's children in descending id order. A later insertion at
//! the same anchor therefore lands closer to the anchor, and the output
//! depends only on the set of ops, never on input order.

use std::collections::HashMap;

use tracing::instrument;

use super::tombstone::{ScanError, scan_tombstones};
use crate::error::ErrorCode;
use crate::op::{Atom, Builder, Cursor, DecodeError, Frame, Op, Term, Uuid};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from merging op streams.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// An op's ref names an op that no input supplies.
    #[error("op {id} references {missing}, which no input supplies")]
    CausalBreak { id: Uuid, missing: Uuid },

    /// One id is bound to two different ops.
    #[error("id {id} names two different ops")]
    Repeat { id: Uuid },

    /// The object type has no reducer.
    #[error("no reducer for type {rdt}")]
    NotImplemented { rdt: Uuid },

    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl MergeError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Decode(e) => e.code(),
            Self::CausalBreak { .. } => ErrorCode::CausalBreak,
            Self::Repeat { .. } => ErrorCode::Repeat,
            Self::NotImplemented { .. } => ErrorCode::NotImplemented,
            Self::Scan(e) => e.code(),
        }
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Merge op streams into one compact frame.
///
/// # Errors
///
/// See [`merge_with`].
pub fn merge<'a, I>(inputs: I) -> Result<Frame, MergeError>
where
    I: IntoIterator<Item = Cursor<'a>>,
{
    merge_with(inputs, Builder::new())
}

/// Merge op streams, writing the result through `builder`.
///
/// Body ops come out reduced (`,`); headers stay headers. An op present in
/// several inputs is emitted once.
///
/// # Errors
///
/// - [`MergeError::CausalBreak`] if a ref cannot be resolved within the
///   inputs, or ops form a cycle unreachable from any root.
/// - [`MergeError::Repeat`] if one id names two different ops.
/// - [`MergeError::Decode`] if any input is malformed.
///
/// No partial frame is produced on error.
#[instrument(skip_all)]
pub fn merge_with<'a, I>(inputs: I, mut builder: Builder) -> Result<Frame, MergeError>
where
    I: IntoIterator<Item = Cursor<'a>>,
{
    let mut ops: Vec<Op> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for mut cursor in inputs {
        while let Some(op) = cursor.op() {
            let op = reduced(op);
            match index.get(&op.id) {
                Some(&at) if ops[at] == op => {}
                Some(_) => {
                    tracing::warn!(id = %op.id, "merge rejected: repeated id");
                    return Err(MergeError::Repeat { id: op.id });
                }
                None => {
                    index.insert(op.id, ops.len());
                    ops.push(op);
                }
            }
            cursor.advance();
        }
        if let Some(e) = cursor.error() {
            return Err(e.clone().into());
        }
    }

    let mut roots: Vec<usize> = Vec::new();
    let mut children: HashMap<Uuid, Vec<usize>> = HashMap::new();
    for (i, op) in ops.iter().enumerate() {
        if op.is_root() {
            roots.push(i);
        } else if index.contains_key(&op.ref_id) {
            children.entry(op.ref_id).or_default().push(i);
        } else {
            tracing::warn!(id = %op.id, missing = %op.ref_id, "merge rejected: causal break");
            return Err(MergeError::CausalBreak {
                id: op.id,
                missing: op.ref_id,
            });
        }
    }
    roots.sort_by_key(|&i| ops[i].id);
    for siblings in children.values_mut() {
        siblings.sort_by(|&a, &b| ops[b].id.cmp(&ops[a].id));
    }

    let mut emitted = vec![false; ops.len()];
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(i) = stack.pop() {
        builder.append(&ops[i]);
        emitted[i] = true;
        if let Some(siblings) = children.get(&ops[i].id) {
            stack.extend(siblings.iter().rev());
        }
    }

    // only ref cycles leave ops unreached
    if let Some(stray) = ops
        .iter()
        .zip(&emitted)
        .filter(|(_, done)| !**done)
        .map(|(op, _)| op)
        .min_by_key(|op| op.id)
    {
        tracing::warn!(id = %stray.id, "merge rejected: op unreachable from any root");
        return Err(MergeError::CausalBreak {
            id: stray.id,
            missing: stray.ref_id,
        });
    }

    tracing::debug!(ops = ops.len(), roots = roots.len(), "merged");
    Ok(builder.into_frame())
}

fn reduced(op: &Op) -> Op {
    let mut op = op.clone();
    if op.term == Term::Raw {
        op.term = Term::Reduced;
    }
    op
}

// ---------------------------------------------------------------------------
// Materialization
// ---------------------------------------------------------------------------

/// The atoms of live value ops, in merged order.
///
/// # Errors
///
/// Any [`MergeError`] from merging or scanning `frame`.
pub fn visible_atoms(frame: &Frame) -> Result<Vec<Atom>, MergeError> {
    let merged = merge([frame.cursor()])?;
    let tombs = scan_tombstones(&merged)?;
    let ops = merged.ops()?;
    Ok(ops
        .into_iter()
        .zip(tombs)
        .filter(|(op, tomb)| !tomb && op.term != Term::Header && op.marker_kind().is_none())
        .flat_map(|(op, _)| op.atoms)
        .collect())
}

/// The concatenated string atoms of live value ops.
///
/// # Errors
///
/// See [`visible_atoms`].
pub fn visible_text(frame: &Frame) -> Result<String, MergeError> {
    Ok(visible_atoms(frame)?
        .iter()
        .filter_map(Atom::as_str)
        .collect())
}
