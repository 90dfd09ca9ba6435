//! Per-op hash chain.
//!
//! An op's digest covers, in order: its causal parent's digest (or the chain
//! seed for a root), the object's type digest, and the op's canonical text
//! (`@id :ref atoms term`, never the elided form). A raw op (`;`) is hashed
//! as its reduced form (`,`), the form merge emits, so digests survive a
//! merge. Altering any ancestor therefore changes every descendant digest.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use tracing::instrument;

use super::digest::Digest;
use crate::error::ErrorCode;
use crate::op::{DecodeError, Frame, Op, Term, Uuid, write_canonical};

// ---------------------------------------------------------------------------
// Algorithm
// ---------------------------------------------------------------------------

/// The hash function behind a chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    /// Digest of an identifier's text form.
    #[must_use]
    pub fn digest_uuid(self, uuid: &Uuid) -> Digest {
        let mut hasher = StreamHasher::new(self);
        let _ = write!(hasher, "{uuid}");
        hasher.finish()
    }

    /// Digest of `op` chained onto `parent` under type `schema`.
    #[must_use]
    pub fn hash_op(self, parent: &Digest, schema: &Digest, op: &Op) -> Digest {
        let mut hasher = StreamHasher::new(self);
        hasher.update(parent.as_bytes());
        hasher.update(schema.as_bytes());
        let op = if op.term == Term::Raw {
            Cow::Owned(Op {
                term: Term::Reduced,
                ..op.clone()
            })
        } else {
            Cow::Borrowed(op)
        };
        // hashing never fails a write
        let _ = write_canonical(&mut hasher, &op);
        hasher.finish()
    }
}

enum StreamHasher {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl StreamHasher {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(bytes),
            Self::Blake3(h) => {
                h.update(bytes);
            }
        }
    }

    fn finish(self) -> Digest {
        match self {
            Self::Sha256(h) => Digest::from_bytes(h.finalize().into()),
            Self::Blake3(h) => Digest::from_bytes(*h.finalize().as_bytes()),
        }
    }
}

impl fmt::Write for StreamHasher {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.update(s.as_bytes());
        Ok(())
    }
}

/// SHA-256 digest of `op` chained onto `parent` under type `schema`.
#[must_use]
pub fn hash_op(parent: &Digest, schema: &Digest, op: &Op) -> Digest {
    HashAlgorithm::Sha256.hash_op(parent, schema, op)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from hashing or verifying a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// An op's ref does not name an earlier op in the frame.
    #[error("op {id} references {missing}, which is not earlier in the frame")]
    CausalBreak { id: Uuid, missing: Uuid },

    /// A claimed digest does not match the recomputed one.
    #[error("op #{index} ({id}) digest mismatch: claimed {claimed}, computed {computed}")]
    HashBreak {
        index: usize,
        id: Uuid,
        claimed: String,
        computed: String,
    },

    /// The number of claimed digests differs from the number of ops.
    #[error("{claimed} digests claimed for {ops} ops")]
    Length { ops: usize, claimed: usize },
}

impl ChainError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Decode(e) => e.code(),
            Self::CausalBreak { .. } => ErrorCode::CausalBreak,
            Self::HashBreak { .. } | Self::Length { .. } => ErrorCode::HashBreak,
        }
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Hashing context for one object: root seed, type digest and algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashChain {
    seed: Digest,
    schema: Digest,
    algorithm: HashAlgorithm,
}

impl HashChain {
    /// A SHA-256 chain from explicit seed and type digests.
    #[must_use]
    pub const fn new(seed: Digest, schema: Digest) -> Self {
        Self {
            seed,
            schema,
            algorithm: HashAlgorithm::Sha256,
        }
    }

    /// A chain seeded from identifiers, hashing both with `algorithm`.
    #[must_use]
    pub fn for_object(seed: &Uuid, rdt: &Uuid, algorithm: HashAlgorithm) -> Self {
        Self {
            seed: algorithm.digest_uuid(seed),
            schema: algorithm.digest_uuid(rdt),
            algorithm,
        }
    }

    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[must_use]
    pub const fn seed(&self) -> &Digest {
        &self.seed
    }

    #[must_use]
    pub const fn schema(&self) -> &Digest {
        &self.schema
    }

    /// Digest of one op given its parent's digest.
    #[must_use]
    pub fn hash(&self, parent: &Digest, op: &Op) -> Digest {
        self.algorithm.hash_op(parent, &self.schema, op)
    }

    /// Digest every op of `frame`, in frame order.
    ///
    /// Roots chain onto the seed; every other op chains onto the digest of
    /// the op its ref names, which must appear earlier in the frame.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::CausalBreak`] for an unresolved ref and
    /// [`ChainError::Decode`] for malformed text.
    pub fn hash_frame(&self, frame: &Frame) -> Result<Vec<Digest>, ChainError> {
        Ok(self.hash_ops(frame)?.into_iter().map(|(_, d)| d).collect())
    }

    /// Check `claimed` digests (full or abbreviated) against `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::HashBreak`] at the first mismatch,
    /// [`ChainError::Length`] if the counts differ, or any error from
    /// [`HashChain::hash_frame`].
    #[instrument(skip_all, fields(claimed = claimed.len()))]
    pub fn verify(&self, frame: &Frame, claimed: &[Digest]) -> Result<(), ChainError> {
        let computed = self.hash_ops(frame)?;
        if computed.len() != claimed.len() {
            return Err(ChainError::Length {
                ops: computed.len(),
                claimed: claimed.len(),
            });
        }
        for (index, ((id, actual), expected)) in computed.iter().zip(claimed).enumerate() {
            if !expected.matches(actual) {
                tracing::warn!(index, %id, "hash chain broken");
                return Err(ChainError::HashBreak {
                    index,
                    id: *id,
                    claimed: expected.to_hex(),
                    computed: actual.to_hex(),
                });
            }
        }
        Ok(())
    }

    #[instrument(skip_all, fields(bytes = frame.as_str().len()))]
    fn hash_ops(&self, frame: &Frame) -> Result<Vec<(Uuid, Digest)>, ChainError> {
        let mut known: HashMap<Uuid, Digest> = HashMap::new();
        let mut out = Vec::new();
        let mut cursor = frame.cursor();
        while let Some(op) = cursor.op() {
            let parent = if op.is_root() {
                self.seed
            } else {
                *known.get(&op.ref_id).ok_or(ChainError::CausalBreak {
                    id: op.id,
                    missing: op.ref_id,
                })?
            };
            let digest = self.hash(&parent, op);
            known.insert(op.id, digest);
            out.push((op.id, digest));
            cursor.advance();
        }
        if let Some(e) = cursor.error() {
            return Err(e.clone().into());
        }
        tracing::debug!(ops = out.len(), "hashed frame");
        Ok(out)
    }
}

/// Digest every op of `frame` with SHA-256.
///
/// # Errors
///
/// See [`HashChain::hash_frame`].
pub fn hash_frame(seed: &Digest, schema: &Digest, frame: &Frame) -> Result<Vec<Digest>, ChainError> {
    HashChain::new(*seed, *schema).hash_frame(frame)
}

/// Verify `claimed` SHA-256 digests against `frame`.
///
/// # Errors
///
/// See [`HashChain::verify`].
pub fn verify_chain(
    seed: &Digest,
    schema: &Digest,
    frame: &Frame,
    claimed: &[Digest],
) -> Result<(), ChainError> {
    HashChain::new(*seed, *schema).verify(frame, claimed)
}
