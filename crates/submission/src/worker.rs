//! The `SubmissionManager`: spec.md §4.8's blob-tx construction, fee/nonce
//! management, confirmation tracking, and fee-bump retry.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use sequencer_runtime::Context;
use sequencer_storage::{codec, schema};
use sequencer_types::{Address, ProcessId};

use crate::blob::{field_elements_from_bytes, pack_blobs, BlobCommitter};
use crate::chain::{ChainClient, PreparedSubmission, ReceiptStatus};
use crate::error::{SubmissionError, SubmissionFailure};
use crate::inbox::{SubmissionInbox, SubmissionItem};
use crate::record::{SubmissionRecord, SubmissionStatus};

/// Compact execution calldata for a state transition: the circuit proof
/// plus the public inputs the verifier contract checks, excluding the full
/// witness (which travels in the blob sidecar instead).
#[derive(Serialize)]
struct TransitionCalldata<'a> {
    process_id: [u8; 32],
    old_root: [u8; 32],
    new_root: [u8; 32],
    batch_hash_bytes: Vec<u8>,
    proof: &'a [u8],
}

/// Compact execution calldata for a results submission.
#[derive(Serialize)]
struct ResultsCalldata<'a> {
    process_id: [u8; 32],
    tallies: &'a [u64],
    proof: &'a [u8],
}

fn calldata_and_witness(item: &SubmissionItem) -> (Vec<u8>, Vec<u8>) {
    match item {
        SubmissionItem::Transition(t) => {
            let calldata = TransitionCalldata {
                process_id: *t.process_id.as_bytes(),
                old_root: t.old_root,
                new_root: t.new_root,
                batch_hash_bytes: {
                    use ark_serialize::CanonicalSerialize;
                    let mut bytes = Vec::new();
                    t.batch_hash.serialize_compressed(&mut bytes).expect("field element serialization is infallible");
                    bytes
                },
                proof: &t.proof.0,
            };
            let calldata_bytes = codec::encode(&calldata).expect("calldata encoding is infallible");
            let witness_bytes = codec::encode(t).expect("transition encoding is infallible");
            (calldata_bytes, witness_bytes)
        }
        SubmissionItem::Results(r) => {
            let calldata = ResultsCalldata {
                process_id: *r.process_id.as_bytes(),
                tallies: &r.tallies,
                proof: &r.proof.0,
            };
            let calldata_bytes = codec::encode(&calldata).expect("calldata encoding is infallible");
            let witness_bytes = codec::encode(r).expect("results encoding is infallible");
            (calldata_bytes, witness_bytes)
        }
    }
}

/// Expected post-submission root for reorg detection. `None` for a
/// [`SubmissionItem::Results`], which does not move the state root.
fn expected_new_root(item: &SubmissionItem) -> Option<[u8; 32]> {
    match item {
        SubmissionItem::Transition(t) => Some(t.new_root),
        SubmissionItem::Results(_) => None,
    }
}

/// Builds, signs, and broadcasts blob-carrying submissions for ready
/// [`SubmissionItem`]s, and tracks their confirmation through to either
/// `Confirmed` or a dead-letter quarantine.
pub struct SubmissionManager {
    context: Context,
    chain: Arc<dyn ChainClient>,
    kzg: Arc<dyn BlobCommitter>,
    signer: Address,
    inbox: Arc<SubmissionInbox>,
    broadcast_at: DashMap<[u8; 32], Instant>,
}

impl SubmissionManager {
    /// Build a `SubmissionManager` from its injected collaborators.
    pub fn new(
        context: Context,
        chain: Arc<dyn ChainClient>,
        kzg: Arc<dyn BlobCommitter>,
        signer: Address,
        inbox: Arc<SubmissionInbox>,
    ) -> Self {
        Self { context, chain, kzg, signer, inbox, broadcast_at: DashMap::new() }
    }

    /// The inbox this manager drains.
    pub fn inbox(&self) -> &Arc<SubmissionInbox> {
        &self.inbox
    }

    /// One tick for `process_id`: advance every pending submission's
    /// confirmation state, then, if nothing was just broadcast, submit the
    /// next ready item. Returns whether any storage-visible state changed.
    pub async fn tick(&self, process_id: ProcessId) -> Result<bool, SubmissionError> {
        let progressed = self.poll_pending(process_id).await?;
        if progressed {
            return Ok(true);
        }

        let Some(item) = self.inbox.pop(process_id) else {
            return Ok(false);
        };

        match self.submit(process_id, item.clone()).await {
            Ok(()) => Ok(true),
            Err(err) => {
                self.inbox.push(item);
                Err(err)
            }
        }
    }

    /// Build the blob sidecar, sign, and broadcast `item`, then persist a
    /// `Pending` [`SubmissionRecord`].
    async fn submit(&self, process_id: ProcessId, item: SubmissionItem) -> Result<(), SubmissionError> {
        let (calldata, witness_bytes) = calldata_and_witness(&item);
        let elements = field_elements_from_bytes(&witness_bytes);
        let blobs = pack_blobs(&elements);
        let sidecar = self.kzg.build_sidecar(blobs)?;

        let nonce = self.chain.account_nonce(self.signer).await?;
        let fees = self.chain.fee_estimate().await?;

        let prepared = PreparedSubmission { process_id, nonce, fees, calldata, sidecar };
        let tx_hash = self.chain.broadcast(prepared).await?;
        self.broadcast_at.insert(tx_hash.0, self.context.clock.now());

        let record = SubmissionRecord {
            process_id,
            item,
            tx_hash,
            nonce,
            fees,
            status: SubmissionStatus::Pending,
            attempts: 1,
        };
        self.persist(process_id, &record)?;
        Ok(())
    }

    /// Re-broadcast `record` at a bumped fee, keeping the same nonce
    /// (spec.md §4.8: "on `replacement underpriced` or prolonged pending...
    /// re-broadcasts with fees increased by a configurable multiplier").
    async fn bump_and_rebroadcast(
        &self,
        process_id: ProcessId,
        mut record: SubmissionRecord,
    ) -> Result<(), SubmissionError> {
        let (calldata, witness_bytes) = calldata_and_witness(&record.item);
        let elements = field_elements_from_bytes(&witness_bytes);
        let blobs = pack_blobs(&elements);
        let sidecar = self.kzg.build_sidecar(blobs)?;

        let bumped = record.fees.bumped(self.context.config.bump_multiplier);
        let prepared = PreparedSubmission { process_id, nonce: record.nonce, fees: bumped, calldata, sidecar };
        let tx_hash = self.chain.broadcast(prepared).await?;
        self.broadcast_at.insert(tx_hash.0, self.context.clock.now());

        record.tx_hash = tx_hash;
        record.fees = bumped;
        record.attempts += 1;
        self.persist(process_id, &record)?;
        Ok(())
    }

    /// Advance every `Pending` submission for `process_id`: mark confirmed,
    /// detect a reorg and resubmit, route a hard failure to the dead
    /// letter, or bump fees past `BumpTimeout`. Returns whether any record
    /// changed.
    async fn poll_pending(&self, process_id: ProcessId) -> Result<bool, SubmissionError> {
        let pending = self.load_pending(process_id)?;
        let mut changed = false;

        for record in pending {
            match self.chain.receipt_status(record.tx_hash).await? {
                ReceiptStatus::Pending => {
                    let elapsed = self
                        .broadcast_at
                        .get(&record.tx_hash.0)
                        .map(|t| self.context.clock.now().saturating_duration_since(*t));
                    if elapsed.map(|e| e >= self.context.config.bump_timeout).unwrap_or(false) {
                        self.bump_and_rebroadcast(process_id, record).await?;
                        changed = true;
                    }
                }
                ReceiptStatus::Reverted => {
                    self.dead_letter(process_id, &record, SubmissionError::Reverted)?;
                    changed = true;
                }
                ReceiptStatus::Confirmed => {
                    let matches = match expected_new_root(&record.item) {
                        Some(expected) => self.chain.current_root(process_id).await? == expected,
                        None => true,
                    };
                    if matches {
                        self.mark_confirmed(process_id, record)?;
                    } else {
                        // spec.md §7: "ChainReorg past finality marks affected
                        // transitions as NeedsResubmit; the Submission
                        // Manager rebuilds and resubmits."
                        self.inbox.push(record.item.clone());
                        self.remove(process_id, &record)?;
                    }
                    changed = true;
                }
            }
        }
        Ok(changed)
    }

    fn load_pending(&self, process_id: ProcessId) -> Result<Vec<SubmissionRecord>, SubmissionError> {
        let txn = self.context.storage.begin();
        let entries = txn.iter_prefix(&schema::submission_prefix(&process_id))?;
        txn.rollback()?;
        entries
            .into_iter()
            .map(|(_, bytes)| codec::decode::<SubmissionRecord>(&bytes).map_err(SubmissionError::from))
            .filter(|r| !matches!(r, Ok(r) if r.status == SubmissionStatus::Confirmed))
            .collect()
    }

    fn persist(&self, process_id: ProcessId, record: &SubmissionRecord) -> Result<(), SubmissionError> {
        let txn = self.context.storage.begin();
        let key = schema::submission_key(&process_id, record.storage_key());
        txn.put(&key, codec::encode(record)?)?;
        txn.commit()?;
        Ok(())
    }

    fn remove(&self, process_id: ProcessId, record: &SubmissionRecord) -> Result<(), SubmissionError> {
        let txn = self.context.storage.begin();
        txn.delete(&schema::submission_key(&process_id, record.storage_key()))?;
        txn.commit()?;
        Ok(())
    }

    fn mark_confirmed(&self, process_id: ProcessId, mut record: SubmissionRecord) -> Result<(), SubmissionError> {
        record.status = SubmissionStatus::Confirmed;
        self.persist(process_id, &record)?;
        self.broadcast_at.remove(&record.tx_hash.0);
        Ok(())
    }

    /// Route a hard failure to the dead letter and drop the pending record.
    fn dead_letter(
        &self,
        process_id: ProcessId,
        record: &SubmissionRecord,
        err: SubmissionError,
    ) -> Result<(), SubmissionError> {
        debug_assert_eq!(err.failure_kind(), SubmissionFailure::Hard);
        tracing::error!(?process_id, tx = ?record.tx_hash, error = %err, "submission hard failure; quarantined");

        #[derive(Serialize)]
        struct Quarantined<'a> {
            record: &'a SubmissionRecord,
            reason: String,
        }
        let txn = self.context.storage.begin();
        txn.put(
            &schema::deadletter_batch_key(&process_id, record.storage_key()),
            codec::encode(&Quarantined { record, reason: err.to_string() })?,
        )?;
        txn.delete(&schema::submission_key(&process_id, record.storage_key()))?;
        txn.commit()?;
        self.broadcast_at.remove(&record.tx_hash.0);
        Ok(())
    }
}
