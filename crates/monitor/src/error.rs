//! Process Monitor error kinds.

use sequencer_runtime::ErrorKind;

/// Why a poll of the L1 process registry could not be completed.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The registry query failed; may succeed on retry.
    #[error("registry query failed: {0}")]
    Registry(String),

    /// A newly observed process failed ballot-mode validation and was
    /// skipped rather than initialized.
    #[error("process {0} rejected: invalid ballot mode")]
    InvalidBallotMode(String),

    /// The underlying storage transaction conflicted or failed.
    #[error(transparent)]
    Storage(#[from] sequencer_storage::StorageError),

    /// The state tree rejected a reserved-key write (should never happen
    /// for a first-ever initialization; signals corrupted bookkeeping).
    #[error(transparent)]
    Tree(#[from] sequencer_state_tree::StateTreeError),

    /// An invariant was violated.
    #[error("{0}")]
    Fatal(String),

    /// Polling was canceled via its cancellation token before completing.
    #[error("canceled")]
    Canceled,
}

impl From<&MonitorError> for ErrorKind {
    fn from(err: &MonitorError) -> Self {
        match err {
            MonitorError::Registry(msg) => ErrorKind::Transient(msg.clone()),
            MonitorError::InvalidBallotMode(msg) => ErrorKind::BadRequest(msg.clone()),
            MonitorError::Storage(sequencer_storage::StorageError::Conflict) => ErrorKind::Conflict,
            MonitorError::Storage(e) => ErrorKind::Transient(e.to_string()),
            MonitorError::Tree(e) => ErrorKind::Fatal(e.to_string()),
            MonitorError::Fatal(msg) => ErrorKind::Fatal(msg.clone()),
            MonitorError::Canceled => ErrorKind::Canceled,
        }
    }
}
