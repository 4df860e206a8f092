//! Aggregator Worker error kinds.

use sequencer_runtime::ErrorKind;

/// Why a batch could not be assembled, proved, or persisted.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    /// The process this batch targets has no `Process` record.
    #[error("unknown process")]
    UnknownProcess,

    /// The underlying storage transaction conflicted or failed.
    #[error(transparent)]
    Storage(#[from] sequencer_storage::StorageError),

    /// Proof generation failed after exhausting its retry budget.
    #[error(transparent)]
    Proving(#[from] sequencer_proving::ProvingError),

    /// A batch number was already recorded for this process: only one
    /// aggregator task should ever run per process, so this signals that
    /// invariant has been violated.
    #[error("{0}")]
    Fatal(String),

    /// Aggregation was canceled via its cancellation token before completing.
    #[error("canceled")]
    Canceled,
}

impl From<&AggregatorError> for ErrorKind {
    fn from(err: &AggregatorError) -> Self {
        match err {
            AggregatorError::UnknownProcess => ErrorKind::ProcessNotAcceptingVotes,
            AggregatorError::Storage(sequencer_storage::StorageError::Conflict) => ErrorKind::Conflict,
            AggregatorError::Storage(e) => ErrorKind::Transient(e.to_string()),
            AggregatorError::Proving(e) => ErrorKind::ProvingFailure(e.to_string()),
            AggregatorError::Fatal(msg) => ErrorKind::Fatal(msg.clone()),
            AggregatorError::Canceled => ErrorKind::Canceled,
        }
    }
}
