//! State-Transition Worker error kinds.

use sequencer_runtime::ErrorKind;

/// Why a ready batch could not be applied to the state tree.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    /// The process this batch targets has no `Process` record.
    #[error("unknown process")]
    UnknownProcess,

    /// The ready queue named a batch number with no `batch/` record.
    #[error("unknown batch")]
    UnknownBatch,

    /// The underlying storage transaction conflicted or failed.
    #[error(transparent)]
    Storage(#[from] sequencer_storage::StorageError),

    /// The state tree rejected a transition (caller bookkeeping drifted
    /// from tree contents).
    #[error(transparent)]
    Tree(#[from] sequencer_state_tree::StateTreeError),

    /// Proof generation failed after exhausting its retry budget.
    #[error(transparent)]
    Proving(#[from] sequencer_proving::ProvingError),

    /// An invariant was violated: only one State-Transition Worker should
    /// ever run per process, so this signals that invariant has broken.
    #[error("{0}")]
    Fatal(String),

    /// Application was canceled via its cancellation token before
    /// completing.
    #[error("canceled")]
    Canceled,
}

impl From<&TransitionError> for ErrorKind {
    fn from(err: &TransitionError) -> Self {
        match err {
            TransitionError::UnknownProcess => ErrorKind::Fatal("unknown process".into()),
            TransitionError::UnknownBatch => ErrorKind::Fatal("unknown batch".into()),
            TransitionError::Storage(sequencer_storage::StorageError::Conflict) => ErrorKind::Conflict,
            TransitionError::Storage(e) => ErrorKind::Transient(e.to_string()),
            TransitionError::Tree(e) => ErrorKind::Fatal(e.to_string()),
            TransitionError::Proving(e) => ErrorKind::ProvingFailure(e.to_string()),
            TransitionError::Fatal(msg) => ErrorKind::Fatal(msg.clone()),
            TransitionError::Canceled => ErrorKind::Canceled,
        }
    }
}
