//! The L1 chain binding this crate submits transactions through, injected
//! rather than implemented here.
//!
//! spec.md §6 lists the write side of the L1 Process Registry as
//! `submitStateTransition(processID, proof, input, blobSidecar)` and
//! `setProcessStatus(processID, status)`, plus an RPC/beacon environment
//! contract (execution endpoint, consensus-layer endpoint for blob
//! retrieval, signer key, contract addresses). All of that is a chain
//! binding outside this crate's scope, same shape as
//! `sequencer_proving::Prover` and `sequencer_monitor::RegistryClient`: only
//! the calls the Submission Manager needs from it are collapsed into one
//! trait.

use alloy_consensus::BlobTransactionSidecar;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sequencer_types::{Address, ProcessId};

use crate::error::SubmissionError;

/// A moving fee estimate: execution fee cap and blob fee cap, in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    /// `maxFeePerGas`.
    pub max_fee_per_gas: u128,
    /// `maxPriorityFeePerGas`.
    pub max_priority_fee_per_gas: u128,
    /// `maxFeePerBlobGas`.
    pub max_fee_per_blob_gas: u128,
}

impl FeeEstimate {
    /// Scale every component by `multiplier`, for a fee-bump re-broadcast.
    pub fn bumped(&self, multiplier: f64) -> Self {
        let scale = |fee: u128| -> u128 {
            ((fee as f64) * multiplier).ceil() as u128
        };
        Self {
            max_fee_per_gas: scale(self.max_fee_per_gas).max(self.max_fee_per_gas + 1),
            max_priority_fee_per_gas: scale(self.max_priority_fee_per_gas)
                .max(self.max_priority_fee_per_gas + 1),
            max_fee_per_blob_gas: scale(self.max_fee_per_blob_gas).max(self.max_fee_per_blob_gas + 1),
        }
    }
}

/// A blob-carrying transaction, built and ready to sign and broadcast.
#[derive(Debug, Clone)]
pub struct PreparedSubmission {
    /// The process this submission reports on.
    pub process_id: ProcessId,
    /// The sender account's nonce for this transaction.
    pub nonce: u64,
    /// Execution and blob fee caps.
    pub fees: FeeEstimate,
    /// Calldata for `submitStateTransition`/`submitResults` (the circuit
    /// proof plus public inputs, opaque to the chain client beyond its
    /// bytes).
    pub calldata: Vec<u8>,
    /// The EIP-4844 blob sidecar carrying the full witness.
    pub sidecar: BlobTransactionSidecar,
}

/// A broadcast transaction's hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub [u8; 32]);

/// The state of a broadcast transaction as observed by polling receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// Not yet included in a block.
    Pending,
    /// Included and successful.
    Confirmed,
    /// Included but reverted.
    Reverted,
}

/// Read/write access to the L1 chain this sequencer submits to.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// The signer account's current nonce.
    async fn account_nonce(&self, address: Address) -> Result<u64, SubmissionError>;

    /// The current fee-cap estimate for a new transaction.
    async fn fee_estimate(&self) -> Result<FeeEstimate, SubmissionError>;

    /// The registry's currently recorded state root for `process_id`, used
    /// to detect a reorg that reverted a previously confirmed transition.
    async fn current_root(&self, process_id: ProcessId) -> Result<[u8; 32], SubmissionError>;

    /// Sign and broadcast a prepared submission, returning its transaction
    /// hash.
    async fn broadcast(&self, submission: PreparedSubmission) -> Result<TxHash, SubmissionError>;

    /// Poll the current status of a previously broadcast transaction.
    async fn receipt_status(&self, tx: TxHash) -> Result<ReceiptStatus, SubmissionError>;
}

#[cfg(any(test, feature = "test-util"))]
pub mod fixture {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// An in-memory `ChainClient` stand-in for tests: nonces and roots are
    /// fixed at construction; receipt statuses and fee estimates can be
    /// replaced between polls to script confirmation, reversion, or a
    /// pending-then-bumped sequence.
    pub struct FixtureChainClient {
        nonce: Mutex<u64>,
        fee: Mutex<FeeEstimate>,
        root: Mutex<[u8; 32]>,
        receipts: Mutex<HashMap<[u8; 32], ReceiptStatus>>,
        next_status: Mutex<ReceiptStatus>,
        broadcasts: Mutex<Vec<PreparedSubmission>>,
    }

    impl FixtureChainClient {
        pub fn new(nonce: u64, root: [u8; 32]) -> Self {
            Self {
                nonce: Mutex::new(nonce),
                fee: Mutex::new(FeeEstimate {
                    max_fee_per_gas: 10,
                    max_priority_fee_per_gas: 1,
                    max_fee_per_blob_gas: 10,
                }),
                root: Mutex::new(root),
                receipts: Mutex::new(HashMap::new()),
                next_status: Mutex::new(ReceiptStatus::Confirmed),
                broadcasts: Mutex::new(Vec::new()),
            }
        }

        pub fn set_root(&self, root: [u8; 32]) {
            *self.root.lock().unwrap() = root;
        }

        pub fn set_next_status(&self, status: ReceiptStatus) {
            *self.next_status.lock().unwrap() = status;
        }

        pub fn set_status_for(&self, tx: TxHash, status: ReceiptStatus) {
            self.receipts.lock().unwrap().insert(tx.0, status);
        }

        pub fn broadcast_count(&self) -> usize {
            self.broadcasts.lock().unwrap().len()
        }

        pub fn last_fees(&self) -> Option<FeeEstimate> {
            self.broadcasts.lock().unwrap().last().map(|s| s.fees)
        }
    }

    #[async_trait]
    impl ChainClient for FixtureChainClient {
        async fn account_nonce(&self, _address: Address) -> Result<u64, SubmissionError> {
            Ok(*self.nonce.lock().unwrap())
        }

        async fn fee_estimate(&self) -> Result<FeeEstimate, SubmissionError> {
            Ok(*self.fee.lock().unwrap())
        }

        async fn current_root(&self, _process_id: ProcessId) -> Result<[u8; 32], SubmissionError> {
            Ok(*self.root.lock().unwrap())
        }

        async fn broadcast(&self, submission: PreparedSubmission) -> Result<TxHash, SubmissionError> {
            let mut nonce = self.nonce.lock().unwrap();
            *nonce += 1;
            let mut hash = [0u8; 32];
            hash[0..8].copy_from_slice(&submission.nonce.to_be_bytes());
            self.broadcasts.lock().unwrap().push(submission);
            Ok(TxHash(hash))
        }

        async fn receipt_status(&self, tx: TxHash) -> Result<ReceiptStatus, SubmissionError> {
            if let Some(status) = self.receipts.lock().unwrap().get(&tx.0) {
                return Ok(*status);
            }
            Ok(*self.next_status.lock().unwrap())
        }
    }
}
