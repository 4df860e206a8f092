//! Core data model for the sequencer: processes, ballots, batches, and
//! state transitions.
//!
//! Proving-circuit internals, the census-building service, and the L1
//! contract ABI are collaborators outside this crate; it only defines the
//! shapes that cross those boundaries.

mod ballot;
mod batch;
mod hash;
mod identifiers;
mod process;
mod results;
mod serde_support;

pub use ballot::{EncryptedBallot, LiveBallot, OpaqueProofBytes, Vote, VerifiedVote, VoteSignature};
pub use batch::{AggregatedProof, BallotTransitionKind, Batch, BatchRecord, BatchSlot, StateTransition};
pub use hash::{Hash, HexError};
pub use identifiers::{Address, ProcessId, Sequence, VoteId, Weight};
pub use process::{
    BallotMode, BallotModeViolation, CensusDescriptor, CensusOrigin, CspScheme, Process,
    ProcessStatus,
};
pub use results::ResultsRecord;
