//! The sequencer-wide error taxonomy (spec.md §7).
//!
//! Every crate keeps its own leaf error type (`StorageError`,
//! `StateTreeError`, `ProvingError`, ...); this enum is what those convert
//! into at the boundary where a worker decides how to react: surface
//! verbatim, retry, quarantine, or abort.

use std::fmt;

/// The sequencer's top-level error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Malformed input from a submitter. Never retried; surfaced verbatim.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A signature did not verify against the claimed identity.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A voteID was already accepted for this process.
    #[error("replay: voteID already seen")]
    Replay,

    /// Census membership proof failed to verify.
    #[error("census rejected: {0}")]
    CensusRejected(String),

    /// Client-side ballot proof failed to verify.
    #[error("proof rejected: {0}")]
    ProofRejected(String),

    /// The process is not currently accepting ballots.
    #[error("process not accepting votes")]
    ProcessNotAcceptingVotes,

    /// A storage transaction's read set was invalidated before commit.
    #[error("storage conflict, retry")]
    Conflict,

    /// A network or chain RPC call failed in a way that may succeed on retry.
    #[error("transient error: {0}")]
    Transient(String),

    /// Proof generation failed after exhausting its own internal retries.
    #[error("proving failure: {0}")]
    ProvingFailure(String),

    /// An L1 reorg invalidated a previously confirmed submission.
    #[error("chain reorg affected a confirmed transition")]
    ChainReorg,

    /// An invariant was violated; the affected worker must stop accepting
    /// new work for the process until a human intervenes.
    #[error("fatal: {0}")]
    Fatal(String),

    /// The operation was canceled via its cancellation token before
    /// completing; no partial state was persisted.
    #[error("canceled")]
    Canceled,
}

impl ErrorKind {
    /// How [`crate::retry::retry`]'s default classifier treats this error.
    pub fn classification(&self) -> Classification {
        match self {
            ErrorKind::Transient(_) | ErrorKind::Conflict => Classification::Transient,
            _ => Classification::Permanent,
        }
    }
}

impl From<sequencer_storage::StorageError> for ErrorKind {
    fn from(err: sequencer_storage::StorageError) -> Self {
        match err {
            sequencer_storage::StorageError::Conflict => ErrorKind::Conflict,
            other => ErrorKind::Transient(other.to_string()),
        }
    }
}

/// Whether a failed operation is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Likely to succeed if retried (network blip, storage conflict).
    Transient,
    /// Retrying would reproduce the same failure.
    Permanent,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Transient => write!(f, "transient"),
            Classification::Permanent => write!(f, "permanent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_and_conflict_are_retryable() {
        assert_eq!(
            ErrorKind::Transient("x".into()).classification(),
            Classification::Transient
        );
        assert_eq!(ErrorKind::Conflict.classification(), Classification::Transient);
    }

    #[test]
    fn validation_errors_are_permanent() {
        assert_eq!(
            ErrorKind::BadRequest("x".into()).classification(),
            Classification::Permanent
        );
        assert_eq!(ErrorKind::Replay.classification(), Classification::Permanent);
    }
}
