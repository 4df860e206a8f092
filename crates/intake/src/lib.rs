//! Ballot Intake: validates incoming votes and enqueues the verified ones
//! per process, per spec.md §4.3.

mod ballot_proof;
mod census;
mod error;
mod queue;
mod signature;
mod worker;

pub use ballot_proof::{inputs_hash, verify_ballot_proof};
pub use census::{CensusVerifier, CompositeCensusVerifier, CspSignatureVerifier, MerkleCensusVerifier};
pub use error::IntakeError;
pub use queue::{VoteIntakeQueue, VoteStatus};
pub use signature::{to_alloy_address, EcdsaVoteSignatureVerifier, SignatureVerifier};
pub use worker::BallotIntake;
