pub mod rga;
pub mod tombstone;

use tracing::instrument;

use crate::op::{Cursor, Frame, Scheme, Term, Uuid};

pub use rga::{MergeError, merge, merge_with, visible_atoms, visible_text};
pub use tombstone::{ScanError, scan_cursor, scan_tombstones};

/// Type name of the replicated growable array (`rga`).
pub const RGA: Uuid = Uuid::new((54 << 54) | (43 << 48) | (37 << 42), 0, Scheme::Name);

/// Type name of the last-writer-wins object (`lww`). Recognised, not reduced.
pub const LWW: Uuid = Uuid::new((48 << 54) | (59 << 48) | (48 << 42), 0, Scheme::Name);

/// A data type that can merge op streams of its objects.
pub trait Reducer: Sync {
    /// The type name found in object headers.
    fn rdt(&self) -> Uuid;

    /// Merge `inputs` into one frame.
    ///
    /// # Errors
    ///
    /// Returns a [`MergeError`] when the inputs cannot be merged.
    fn merge(&self, inputs: Vec<Cursor<'_>>) -> Result<Frame, MergeError>;
}

/// The causal-tree reducer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rga;

impl Reducer for Rga {
    fn rdt(&self) -> Uuid {
        RGA
    }

    #[instrument(skip_all, fields(inputs = inputs.len()))]
    fn merge(&self, inputs: Vec<Cursor<'_>>) -> Result<Frame, MergeError> {
        merge(inputs)
    }
}

static RGA_REDUCER: Rga = Rga;

/// Look up the reducer for a type name.
///
/// # Errors
///
/// Returns [`MergeError::NotImplemented`] for `lww` and unknown types.
pub fn reducer_for(rdt: &Uuid) -> Result<&'static dyn Reducer, MergeError> {
    if *rdt == RGA {
        Ok(&RGA_REDUCER)
    } else {
        Err(MergeError::NotImplemented { rdt: *rdt })
    }
}

/// The type named by the first header op of `frame`, if any.
#[must_use]
pub fn object_type(frame: &Frame) -> Option<Uuid> {
    let mut cursor = frame.cursor();
    while let Some(op) = cursor.op() {
        if op.term == Term::Header {
            return Some(op.ref_id);
        }
        cursor.advance();
    }
    None
}
