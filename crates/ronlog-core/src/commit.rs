//! Scoped commit of new ops on one yarn.
//!
//! A [`Commit`] collects ops authored on a single yarn and hands them to a
//! [`CommitSink`] in one piece. It is `Open` until [`Commit::commit`] or
//! [`Commit::abort`]; a scope dropped while still open commits if it wrote
//! anything and aborts otherwise.

use std::fmt;

use crate::error::ErrorCode;
use crate::op::{Atom, Builder, Frame, Op, Scheme, Term, Uuid};

/// Lifecycle of a [`Commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitState {
    Open,
    Committed,
    Aborted,
}

/// Errors from a commit scope.
#[derive(Debug)]
pub enum CommitError {
    /// The scope is no longer open.
    BadState { state: CommitState },
    /// An op id from a different yarn than the commit's base.
    ForeignYarn { base: Uuid, id: Uuid },
    /// An op id that does not advance the yarn.
    OutOfOrder { tip: Uuid, id: Uuid },
    /// The sink refused the frame.
    Sink { message: String },
}

impl CommitError {
    /// Machine-readable code associated with this commit error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::BadState { .. } => ErrorCode::BadState,
            Self::ForeignYarn { .. } | Self::OutOfOrder { .. } => ErrorCode::ChainBreak,
            Self::Sink { .. } => ErrorCode::Internal,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.code().code();
        match self {
            Self::BadState { state } => write!(f, "{code}: commit is already {state:?}"),
            Self::ForeignYarn { base, id } => {
                write!(f, "{code}: op {id} is not on the yarn of {base}")
            }
            Self::OutOfOrder { tip, id } => write!(f, "{code}: op {id} does not follow {tip}"),
            Self::Sink { message } => write!(f, "{code}: sink rejected commit: {message}"),
        }
    }
}

impl std::error::Error for CommitError {}

/// Receives the ops of a finished commit.
pub trait CommitSink {
    /// Persist `frame`, which advances the yarn from `base` to `tip`.
    ///
    /// # Errors
    ///
    /// Returns [`CommitError::Sink`] if the frame cannot be stored.
    fn save(&mut self, base: Uuid, tip: Uuid, frame: Frame) -> Result<(), CommitError>;
}

impl CommitSink for Vec<Frame> {
    fn save(&mut self, _base: Uuid, _tip: Uuid, frame: Frame) -> Result<(), CommitError> {
        self.push(frame);
        Ok(())
    }
}

/// An open batch of ops on one yarn.
pub struct Commit<'s, S: CommitSink + ?Sized> {
    sink: &'s mut S,
    base: Uuid,
    tip: Uuid,
    builder: Builder,
    state: CommitState,
}

impl<'s, S: CommitSink + ?Sized> Commit<'s, S> {
    /// Open a commit continuing the yarn whose last op is `base`.
    pub fn begin(sink: &'s mut S, base: Uuid) -> Self {
        tracing::debug!(%base, "commit opened");
        Self {
            sink,
            base,
            tip: base,
            builder: Builder::new(),
            state: CommitState::Open,
        }
    }

    #[must_use]
    pub const fn state(&self) -> CommitState {
        self.state
    }

    #[must_use]
    pub const fn base(&self) -> Uuid {
        self.base
    }

    /// The last id written, or the base if none.
    #[must_use]
    pub const fn tip(&self) -> Uuid {
        self.tip
    }

    /// The id the next appended op will get.
    #[must_use]
    pub const fn next_id(&self) -> Uuid {
        Uuid::event(self.tip.inc().value(), self.base.origin())
    }

    /// Add a fully specified op.
    ///
    /// # Errors
    ///
    /// - [`CommitError::BadState`] if the commit is closed.
    /// - [`CommitError::ForeignYarn`] if the id is not an event of the
    ///   base's yarn.
    /// - [`CommitError::OutOfOrder`] if the id does not exceed the tip.
    pub fn write(&mut self, op: &Op) -> Result<(), CommitError> {
        if self.state != CommitState::Open {
            return Err(CommitError::BadState { state: self.state });
        }
        if op.id.scheme() != Scheme::Event || op.id.origin() != self.base.origin() {
            return Err(CommitError::ForeignYarn {
                base: self.base,
                id: op.id,
            });
        }
        if op.id <= self.tip {
            return Err(CommitError::OutOfOrder {
                tip: self.tip,
                id: op.id,
            });
        }
        self.builder.append(op);
        self.tip = op.id;
        Ok(())
    }

    /// Stamp a new op with [`Commit::next_id`] and add it.
    ///
    /// # Errors
    ///
    /// See [`Commit::write`].
    pub fn append(&mut self, term: Term, ref_id: Uuid, atoms: Vec<Atom>) -> Result<Uuid, CommitError> {
        let id = self.next_id();
        self.write(&Op::new(term, id, ref_id, atoms))?;
        Ok(id)
    }

    /// Hand the ops to the sink and close. Returns the new tip.
    ///
    /// # Errors
    ///
    /// Returns [`CommitError::Sink`] if the sink refuses the frame; the
    /// commit is then aborted.
    pub fn commit(mut self) -> Result<Uuid, CommitError> {
        self.finish()
    }

    /// Drop the collected ops and close.
    pub fn abort(mut self) {
        self.state = CommitState::Aborted;
        tracing::debug!(base = %self.base, "commit aborted");
    }

    fn finish(&mut self) -> Result<Uuid, CommitError> {
        if self.state != CommitState::Open {
            return Err(CommitError::BadState { state: self.state });
        }
        if self.tip != self.base {
            let frame = std::mem::take(&mut self.builder).into_frame();
            if let Err(e) = self.sink.save(self.base, self.tip, frame) {
                self.state = CommitState::Aborted;
                return Err(e);
            }
        }
        self.state = CommitState::Committed;
        tracing::debug!(base = %self.base, tip = %self.tip, "commit saved");
        Ok(self.tip)
    }
}

impl<S: CommitSink + ?Sized> Drop for Commit<'_, S> {
    fn drop(&mut self) {
        if self.state != CommitState::Open {
            return;
        }
        if self.tip == self.base {
            self.state = CommitState::Aborted;
            return;
        }
        tracing::warn!(base = %self.base, tip = %self.tip, "open commit dropped, committing");
        if let Err(e) = self.finish() {
            tracing::warn!(error = %e, "commit on drop failed");
        }
    }
}

impl<S: CommitSink + ?Sized> fmt::Debug for Commit<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commit")
            .field("base", &self.base)
            .field("tip", &self.tip)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::Marker;

    fn uuid(text: &str) -> Uuid {
        Uuid::parse(text).expect("uuid")
    }

    struct Refusing;

    impl CommitSink for Refusing {
        fn save(&mut self, _base: Uuid, _tip: Uuid, _frame: Frame) -> Result<(), CommitError> {
            Err(CommitError::Sink {
                message: "read-only".to_string(),
            })
        }
    }

    #[test]
    fn commit_hands_ops_to_the_sink() {
        let mut saved: Vec<Frame> = Vec::new();
        let base = uuid("1+A");
        let mut commit = Commit::begin(&mut saved, base);
        let a = commit
            .append(Term::Reduced, base, vec![Atom::string("a")])
            .expect("append");
        commit
            .append(Term::Marker, a, vec![Atom::Uuid(Marker::Remove.uuid())])
            .expect("append");
        let tip = commit.commit().expect("commit");
        assert_eq!(tip, uuid("1000000002+A"));
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].as_str(), "@1000000001+A :1+A 'a', rm,");
    }

    #[test]
    fn rejects_ops_from_other_yarns() {
        let mut saved: Vec<Frame> = Vec::new();
        let mut commit = Commit::begin(&mut saved, uuid("1+A"));
        let err = commit
            .write(&Op::value(uuid("2+B"), uuid("1+A"), vec![]))
            .expect_err("foreign");
        assert!(matches!(err, CommitError::ForeignYarn { .. }));
        assert_eq!(err.code(), ErrorCode::ChainBreak);
    }

    #[test]
    fn rejects_ids_that_go_backwards() {
        let mut saved: Vec<Frame> = Vec::new();
        let mut commit = Commit::begin(&mut saved, uuid("5+A"));
        let err = commit
            .write(&Op::value(uuid("4+A"), uuid("5+A"), vec![]))
            .expect_err("backwards");
        assert!(err.to_string().starts_with("E3002"));
        assert!(err.hint().is_some());
    }

    #[test]
    fn dropping_an_advanced_commit_saves_it() {
        let mut saved: Vec<Frame> = Vec::new();
        {
            let mut commit = Commit::begin(&mut saved, uuid("1+A"));
            commit
                .append(Term::Reduced, uuid("1+A"), vec![Atom::Int(1)])
                .expect("append");
        }
        assert_eq!(saved.len(), 1);
    }

    #[test]
    fn dropping_an_empty_commit_aborts() {
        let mut saved: Vec<Frame> = Vec::new();
        drop(Commit::begin(&mut saved, uuid("1+A")));
        assert!(saved.is_empty());
    }

    #[test]
    fn abort_discards_ops() {
        let mut saved: Vec<Frame> = Vec::new();
        let mut commit = Commit::begin(&mut saved, uuid("1+A"));
        commit
            .append(Term::Reduced, uuid("1+A"), vec![Atom::Int(1)])
            .expect("append");
        commit.abort();
        assert!(saved.is_empty());
    }

    #[test]
    fn sink_failure_aborts_the_commit() {
        let mut sink = Refusing;
        let mut commit = Commit::begin(&mut sink, uuid("1+A"));
        commit
            .append(Term::Reduced, uuid("1+A"), vec![])
            .expect("append");
        let err = commit.commit().expect_err("refused");
        assert_eq!(err.code(), ErrorCode::Internal);
    }
}
