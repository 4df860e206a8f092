//! Ballot Intake error kinds (spec.md §4.3's "Error conditions" table).

use sequencer_runtime::ErrorKind;

/// Why a submitted [`sequencer_types::Vote`] was not admitted.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    /// The vote was malformed (wrong field count, empty ballot, ...).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The signature over the voteID did not verify against the claimed
    /// voter address.
    #[error("unauthorized: signature does not match claimed voter")]
    Unauthorized,

    /// The census membership proof did not verify, or the process's
    /// census scheme is not one this deployment supports.
    #[error("census rejected: {0}")]
    CensusRejected(String),

    /// The client-side ballot proof did not verify.
    #[error("proof rejected: {0}")]
    ProofRejected(String),

    /// This voteID has already been accepted for this process.
    #[error("replay: voteID already seen in this process")]
    Replay,

    /// The process is unknown, or not currently `Ready`.
    #[error("process not accepting votes")]
    ProcessNotAcceptingVotes,

    /// The underlying storage transaction conflicted or failed.
    #[error(transparent)]
    Storage(#[from] sequencer_storage::StorageError),

    /// Proof verification itself failed structurally (not the same as the
    /// proof verifying to `false`).
    #[error(transparent)]
    Proving(#[from] sequencer_proving::ProvingError),

    /// Admission was canceled via its cancellation token before completing.
    #[error("canceled")]
    Canceled,
}

impl From<&IntakeError> for ErrorKind {
    fn from(err: &IntakeError) -> Self {
        match err {
            IntakeError::BadRequest(msg) => ErrorKind::BadRequest(msg.clone()),
            IntakeError::Unauthorized => ErrorKind::Unauthorized("signature mismatch".into()),
            IntakeError::CensusRejected(msg) => ErrorKind::CensusRejected(msg.clone()),
            IntakeError::ProofRejected(msg) => ErrorKind::ProofRejected(msg.clone()),
            IntakeError::Replay => ErrorKind::Replay,
            IntakeError::ProcessNotAcceptingVotes => ErrorKind::ProcessNotAcceptingVotes,
            IntakeError::Storage(sequencer_storage::StorageError::Conflict) => ErrorKind::Conflict,
            IntakeError::Storage(e) => ErrorKind::Transient(e.to_string()),
            IntakeError::Proving(e) => ErrorKind::Transient(e.to_string()),
            IntakeError::Canceled => ErrorKind::Canceled,
        }
    }
}
