//! ronlog-core library.
//!
//! Replicated op logs: decode and encode frames ([`op`]), merge causal trees
//! and compute liveness ([`crdt`]), and chain op digests ([`hash`]).
//!
//! ```
//! use ronlog_core::crdt::merge;
//! use ronlog_core::op::Cursor;
//!
//! let merged = merge([
//!     Cursor::new("@1+A :rga!"),
//!     Cursor::new("@1a+B :1+A 'b';"),
//!     Cursor::new("@1b+C :1+A 'a';"),
//! ])
//! .expect("causally complete");
//! assert_eq!(merged.as_str(), "@1+A :rga! @1b+C 'a', @1a+B :1+A 'b',");
//! ```
//!
//! # Conventions
//!
//! - **Errors**: each module returns its own `thiserror` enum; every enum maps
//!   onto [`error::ErrorCode`] through `code()`.
//! - **Logging**: use `tracing` macros (`debug!` for summaries, `warn!` for
//!   rejected input). Nothing here prints.

pub mod commit;
pub mod config;
pub mod crdt;
pub mod error;
pub mod hash;
pub mod op;

pub use commit::{Commit, CommitError, CommitSink, CommitState};
pub use error::ErrorCode;
