//! The Submission Manager: spec.md §4.8's EIP-4844 blob-tx construction,
//! fee/nonce management, confirmation tracking, and fee-bump retry.
//!
//! The L1 chain binding itself (signing, RPC transport, receipt polling)
//! is a collaborator outside this crate's scope, same as
//! `sequencer_proving::Prover` and `sequencer_monitor::RegistryClient`:
//! only the [`chain::ChainClient`] trait it is driven through lives here.

mod blob;
mod chain;
mod error;
mod inbox;
mod record;
mod worker;

pub use blob::{field_elements_from_bytes, pack_blobs, versioned_hash, BlobCommitter, FieldElement, KzgContext};
pub use chain::{ChainClient, FeeEstimate, PreparedSubmission, ReceiptStatus, TxHash};
pub use error::{SubmissionError, SubmissionFailure};
pub use inbox::{SubmissionInbox, SubmissionItem};
pub use record::{SubmissionRecord, SubmissionStatus};
pub use worker::SubmissionManager;

#[cfg(any(test, feature = "test-util"))]
pub use blob::FixtureBlobCommitter;

#[cfg(any(test, feature = "test-util"))]
pub use chain::fixture::FixtureChainClient;
