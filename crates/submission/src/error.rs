//! Submission Manager error kinds.

use sequencer_runtime::ErrorKind;

/// Why a ready [`crate::SubmissionItem`] could not be submitted or confirmed.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// The process this submission targets has no `Process` record.
    #[error("unknown process")]
    UnknownProcess,

    /// The underlying storage transaction conflicted or failed.
    #[error(transparent)]
    Storage(#[from] sequencer_storage::StorageError),

    /// Blob packing or KZG commitment computation failed.
    #[error("kzg error: {0}")]
    Kzg(String),

    /// An RPC call to the L1 chain failed in a way that may succeed on retry.
    #[error("chain rpc error: {0}")]
    Chain(String),

    /// The broadcast transaction reverted on-chain.
    #[error("transaction reverted")]
    Reverted,

    /// The account's nonce sequence has a gap; a prior transaction from this
    /// signer never landed.
    #[error("nonce gap detected")]
    NonceGap,

    /// A reorg past finality invalidated a previously confirmed submission.
    #[error("chain reorg past finality")]
    ChainReorg,

    /// An invariant was violated.
    #[error("{0}")]
    Fatal(String),

    /// Submission was canceled via its cancellation token before completing.
    #[error("canceled")]
    Canceled,
}

impl From<&SubmissionError> for ErrorKind {
    fn from(err: &SubmissionError) -> Self {
        match err {
            SubmissionError::UnknownProcess => ErrorKind::Fatal("unknown process".into()),
            SubmissionError::Storage(sequencer_storage::StorageError::Conflict) => ErrorKind::Conflict,
            SubmissionError::Storage(e) => ErrorKind::Transient(e.to_string()),
            SubmissionError::Kzg(msg) => ErrorKind::Fatal(msg.clone()),
            SubmissionError::Chain(msg) => ErrorKind::Transient(msg.clone()),
            SubmissionError::Reverted => ErrorKind::Fatal("transaction reverted".into()),
            SubmissionError::NonceGap => ErrorKind::Fatal("nonce gap".into()),
            SubmissionError::ChainReorg => ErrorKind::ChainReorg,
            SubmissionError::Fatal(msg) => ErrorKind::Fatal(msg.clone()),
            SubmissionError::Canceled => ErrorKind::Canceled,
        }
    }
}

/// Whether a submission failure should be retried, or routed straight to the
/// dead letter (spec.md §4.8's "hard-failure classifier").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionFailure {
    /// Worth retrying (fee bump, transient RPC error).
    Retryable,
    /// Never going to succeed; quarantine and alert.
    Hard,
}

impl SubmissionError {
    /// Classify this error for the hard-failure / retry split.
    pub fn failure_kind(&self) -> SubmissionFailure {
        match self {
            SubmissionError::Reverted | SubmissionError::NonceGap | SubmissionError::Kzg(_) => {
                SubmissionFailure::Hard
            }
            SubmissionError::ChainReorg => SubmissionFailure::Hard,
            _ => SubmissionFailure::Retryable,
        }
    }
}
