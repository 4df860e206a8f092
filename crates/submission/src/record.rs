//! The `tx/` storage record tracking one submission attempt through to
//! confirmation.

use serde::{Deserialize, Serialize};
use sequencer_types::ProcessId;

use crate::chain::{FeeEstimate, TxHash};
use crate::inbox::SubmissionItem;

/// Where a [`SubmissionRecord`] sits in spec.md §4.8's confirmation
/// lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// Broadcast, not yet confirmed or reverted.
    Pending,
    /// Included in a finalized block.
    Confirmed,
}

/// The persisted state of one `SubmissionItem`'s journey from broadcast to
/// confirmation, keyed by `seq` (stable across fee bumps, unlike
/// `tx_hash`, which changes on every re-broadcast).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// The process this submission reports on.
    pub process_id: ProcessId,
    /// The item being submitted, kept so a reorg-triggered resubmission or
    /// a fee bump can rebuild the blob sidecar without replaying the
    /// producing worker.
    pub item: SubmissionItem,
    /// The most recently broadcast transaction's hash.
    pub tx_hash: TxHash,
    /// The account nonce this submission (and every fee-bumped
    /// re-broadcast of it) uses.
    pub nonce: u64,
    /// The most recently used fee caps.
    pub fees: FeeEstimate,
    /// Confirmation status.
    pub status: SubmissionStatus,
    /// Number of broadcasts (1 plus the number of fee bumps).
    pub attempts: u32,
}

impl SubmissionRecord {
    /// The storage-key component identifying this record, stable across
    /// fee-bump re-broadcasts (derived from the nonce, which is fixed for
    /// the lifetime of one submission).
    pub fn storage_key(&self) -> u64 {
        self.nonce
    }
}
