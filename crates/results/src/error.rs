//! Results Worker error kinds.

use sequencer_runtime::ErrorKind;

/// Why a process's final tallies could not be computed.
#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    /// The process this tick targets has no `Process` record.
    #[error("unknown process")]
    UnknownProcess,

    /// A decrypted accumulator point fell outside the configured
    /// `maxValue * maxVoters` search horizon: the accumulator bookkeeping
    /// has drifted from the ballot-mode bound it is supposed to respect.
    #[error("tally for field {field} exceeds the decryption search horizon")]
    TallyOutOfRange {
        /// Index of the offending field.
        field: usize,
    },

    /// The decryption-key collaborator could not produce a key for this
    /// process.
    #[error("decryption key unavailable: {0}")]
    KeyUnavailable(String),

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

    /// An invariant was violated.
    #[error("{0}")]
    Fatal(String),

    /// Computation was canceled via its cancellation token before
    /// completing.
    #[error("canceled")]
    Canceled,
}

impl From<&ResultsError> for ErrorKind {
    fn from(err: &ResultsError) -> Self {
        match err {
            ResultsError::UnknownProcess => ErrorKind::Fatal("unknown process".into()),
            ResultsError::TallyOutOfRange { field } => {
                ErrorKind::Fatal(format!("tally for field {field} out of range"))
            }
            ResultsError::KeyUnavailable(msg) => ErrorKind::Transient(msg.clone()),
            ResultsError::Storage(sequencer_storage::StorageError::Conflict) => ErrorKind::Conflict,
            ResultsError::Storage(e) => ErrorKind::Transient(e.to_string()),
            ResultsError::Tree(e) => ErrorKind::Fatal(e.to_string()),
            ResultsError::Proving(e) => ErrorKind::ProvingFailure(e.to_string()),
            ResultsError::Fatal(msg) => ErrorKind::Fatal(msg.clone()),
            ResultsError::Canceled => ErrorKind::Canceled,
        }
    }
}
