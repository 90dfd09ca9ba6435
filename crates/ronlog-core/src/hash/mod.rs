//! Content-addressed op digests.
//!
//! - [`digest`]: the 256-bit [`Digest`] value, its hex and base64 text forms,
//!   and abbreviated-prefix matching.
//! - [`chain`]: chaining op digests through causal parents and verifying a
//!   frame against claimed digests.

pub mod chain;
pub mod digest;

pub use chain::{ChainError, HashAlgorithm, HashChain, hash_frame, hash_op, verify_chain};
pub use digest::{Digest, DigestEncoding, DigestError};
