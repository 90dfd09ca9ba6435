//! Liveness scan over a causal tree.
//!
//! Deletion is expressed with marker ops placed in the tree like any other
//! op. Walking the frame in order, each node inherits state from its parent:
//!
//! - a value is tomb when the number of unbalanced markers above it on its
//!   path (its *depth*) is nonzero;
//! - `rm` tombs the nearest value at or above its anchor that is still live
//!   on the marker's own path. A run of `rm`s cascades upward, one value per
//!   marker;
//! - `un` restores the value tombed by the most recent open `rm` on its path
//!   (last in, first out);
//! - an `rm` directly after an `un` re-applies what that `un` restored.
//!
//! Markers and the root are always tomb. Sibling branches never see each
//! other's markers because all state flows from parent to child: whether an
//! ancestor is "already tomb" is read from the open-`rm` stack of the path,
//! never from the reported bits. A value stays tomb while any open `rm`, on
//! any branch, still holds it.

use std::collections::HashMap;

use tracing::instrument;

use crate::error::ErrorCode;
use crate::op::{Cursor, DecodeError, Frame, Marker, Uuid};

/// Errors from scanning a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// An op's ref does not name an earlier op in the frame.
    #[error("op {id} references {missing}, which is not earlier in the frame")]
    CausalBreak { id: Uuid, missing: Uuid },
}

impl ScanError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Decode(e) => e.code(),
            Self::CausalBreak { .. } => ErrorCode::CausalBreak,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Root,
    Value,
    Remove,
    Undo,
}

/// Per-node scan state. Stacks are persistent linked lists through node
/// indices, so every node sees exactly the stacks of its own path.
#[derive(Debug, Clone, Copy)]
struct Node {
    parent: Option<usize>,
    kind: Kind,
    depth: u32,
    /// `rm`: the value it tombed. `un`: the value it restored.
    target: Option<usize>,
    /// Top of the open-`rm` stack (an `rm` node).
    open: Option<usize>,
    /// For an `rm` on the open stack, the entry below it.
    open_below: Option<usize>,
    /// Top of the redo stack (an `un` node).
    undone: Option<usize>,
    /// For an `un` on the redo stack, the entry below it.
    undone_below: Option<usize>,
}

impl Node {
    const fn new(parent: Option<usize>, kind: Kind, depth: u32) -> Self {
        Self {
            parent,
            kind,
            depth,
            target: None,
            open: None,
            open_below: None,
            undone: None,
            undone_below: None,
        }
    }
}

/// Compute one tomb bit per op of `frame`, in frame order.
///
/// # Errors
///
/// Returns [`ScanError::CausalBreak`] if an op's ref does not name an
/// earlier op, or [`ScanError::Decode`] for malformed text.
pub fn scan_tombstones(frame: &Frame) -> Result<Vec<bool>, ScanError> {
    scan_cursor(frame.cursor())
}

/// Compute tomb bits for the ops remaining in `cursor`.
///
/// # Errors
///
/// See [`scan_tombstones`].
#[instrument(skip_all)]
pub fn scan_cursor(mut cursor: Cursor<'_>) -> Result<Vec<bool>, ScanError> {
    let mut nodes: Vec<Node> = Vec::new();
    let mut tombs: Vec<bool> = Vec::new();
    let mut holds: Vec<u32> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    while let Some(op) = cursor.op() {
        let at = nodes.len();
        holds.push(0);
        let node = if op.is_root() {
            tombs.push(true);
            Node::new(None, Kind::Root, 0)
        } else {
            let p = *index.get(&op.ref_id).ok_or(ScanError::CausalBreak {
                id: op.id,
                missing: op.ref_id,
            })?;
            let kind = match op.marker_kind() {
                Some(Marker::Remove) => Kind::Remove,
                Some(Marker::Undo) => Kind::Undo,
                None => Kind::Value,
            };
            step(&nodes, &mut tombs, &mut holds, at, p, kind)
        };
        nodes.push(node);
        index.insert(op.id, at);
        cursor.advance();
    }
    if let Some(e) = cursor.error() {
        return Err(e.clone().into());
    }

    tracing::debug!(
        ops = tombs.len(),
        live = tombs.iter().filter(|t| !**t).count(),
        "scanned tombstones"
    );
    Ok(tombs)
}

/// Derive node `at` (child of `p`) and push its tomb bit. `holds[v]` counts
/// the open `rm`s tombing value `v`.
fn step(
    nodes: &[Node],
    tombs: &mut Vec<bool>,
    holds: &mut [u32],
    at: usize,
    p: usize,
    kind: Kind,
) -> Node {
    let parent = nodes[p];
    match kind {
        Kind::Root | Kind::Value => {
            tombs.push(parent.depth > 0);
            Node {
                open: parent.open,
                ..Node::new(Some(p), Kind::Value, parent.depth)
            }
        }
        Kind::Remove => {
            tombs.push(true);
            let mut node = Node::new(Some(p), kind, parent.depth + 1);
            let (target, undone) = match parent.kind {
                Kind::Root => (None, None),
                Kind::Value => (nearest_live(nodes, parent.open, p), None),
                Kind::Remove => (
                    parent.target.and_then(|t| nearest_live(nodes, parent.open, t)),
                    None,
                ),
                // redo
                Kind::Undo => parent
                    .undone
                    .map_or((None, None), |u| (nodes[u].target, nodes[u].undone_below)),
            };
            node.undone = undone;
            node.target = target;
            if let Some(t) = target {
                holds[t] += 1;
                tombs[t] = true;
                node.open = Some(at);
                node.open_below = parent.open;
            } else {
                node.open = parent.open;
            }
            node
        }
        Kind::Undo => {
            tombs.push(true);
            let mut node = Node::new(Some(p), kind, parent.depth.saturating_sub(1));
            if let Some(m) = parent.open {
                let target = nodes[m].target;
                if let Some(t) = target {
                    holds[t] = holds[t].saturating_sub(1);
                    tombs[t] = holds[t] > 0;
                }
                node.target = target;
                node.open = nodes[m].open_below;
                node.undone = Some(at);
                node.undone_below = parent.undone;
            } else {
                node.undone = parent.undone;
            }
            node
        }
    }
}

/// Whether the open-`rm` stack starting at `open` holds value `v`.
fn held_on_path(nodes: &[Node], open: Option<usize>, v: usize) -> bool {
    let mut at = open;
    while let Some(m) = at {
        if nodes[m].target == Some(v) {
            return true;
        }
        at = nodes[m].open_below;
    }
    false
}

/// The closest value at or above `from` that is live on the path whose
/// open-`rm` stack is `open`, skipping markers.
fn nearest_live(nodes: &[Node], open: Option<usize>, from: usize) -> Option<usize> {
    let mut at = Some(from);
    while let Some(n) = at {
        let node = &nodes[n];
        if node.kind == Kind::Value && node.depth == 0 && !held_on_path(nodes, open, n) {
            return Some(n);
        }
        at = node.parent;
    }
    None
}
