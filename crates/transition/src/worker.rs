//! The `StateTransitionWorker`: spec.md §4.6's per-process batch-to-tree
//! application.

use std::sync::Arc;

use ark_serialize::CanonicalSerialize;
use dashmap::DashMap;
use serde::Serialize;
use sequencer_aggregator::ReadyBatchQueue;
use sequencer_crypto::{Ciphertext, Fr};
use sequencer_intake::VoteIntakeQueue;
use sequencer_proving::{Circuit, Prover, ProvingError};
use sequencer_runtime::{retry::retry, Classification, Context, RetryError, RetryPolicy};
use sequencer_state_tree::{ReservedKind, StateKey, StateTree, TransitionProof};
use sequencer_storage::{codec, schema};
use sequencer_submission::{SubmissionInbox, SubmissionItem};
use sequencer_types::{
    Batch, BatchRecord, EncryptedBallot, LiveBallot, OpaqueProofBytes, Process, ProcessId,
    StateTransition, VoteId,
};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::TransitionError;

/// One slot's transition, reduced to the canonically-encoded form the
/// state-transition circuit's witness consumes. Opaque to this crate beyond
/// its CBOR encoding: the constraint system is a collaborator outside this
/// crate's scope.
#[derive(Serialize)]
struct SlotWitness {
    key: Vec<u8>,
    old_leaf_hash: Vec<u8>,
    new_leaf_hash: Vec<u8>,
    siblings: Vec<Vec<u8>>,
    is_old0: bool,
    fnc: (u8, u8),
}

fn slot_witness(proof: &TransitionProof) -> SlotWitness {
    SlotWitness {
        key: fr_bytes(proof.key),
        old_leaf_hash: fr_bytes(proof.old_leaf_hash),
        new_leaf_hash: fr_bytes(proof.new_leaf_hash),
        siblings: proof.siblings.iter().map(|s| fr_bytes(*s)).collect(),
        is_old0: proof.is_old0,
        fnc: proof.operation.fnc(),
    }
}

#[derive(Serialize)]
struct TransitionWitness {
    process_id: [u8; 32],
    old_root: Vec<u8>,
    new_root: Vec<u8>,
    batch_hash: Vec<u8>,
    aggregated_proof: Vec<u8>,
    valid_count: u32,
    slots: Vec<SlotWitness>,
    add_acc: SlotWitness,
    sub_acc: SlotWitness,
}

fn fr_bytes(value: Fr) -> Vec<u8> {
    let mut bytes = Vec::new();
    value
        .serialize_compressed(&mut bytes)
        .expect("field element serialization is infallible");
    bytes
}

fn fr_to_bytes32(value: Fr) -> [u8; 32] {
    let bytes = fr_bytes(value);
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    out
}

/// A live ballot's field element, under the same fold `EncryptedBallot`
/// leaves use (an accumulator vector is not a ballot, but the leaf-hash
/// formula only cares about the ciphertext list, so it is reused as-is).
fn accumulator_leaf(fields: &[Ciphertext]) -> Fr {
    EncryptedBallot::new(fields.to_vec()).leaf_value()
}

/// Applies spec.md §4.6's procedure to each ready batch, one process at a
/// time under an exclusive per-process lease, mirroring the teacher's
/// per-shard exclusive-ownership discipline, generalized here to one lease
/// per process rather than per shard.
pub struct TransitionWorker {
    context: Context,
    prover: Arc<dyn Prover>,
    ready: Arc<ReadyBatchQueue>,
    votes: Arc<VoteIntakeQueue>,
    inbox: Arc<SubmissionInbox>,
    leases: DashMap<ProcessId, Arc<AsyncMutex<()>>>,
}

impl TransitionWorker {
    /// Build a `TransitionWorker` from its injected collaborators.
    pub fn new(
        context: Context,
        prover: Arc<dyn Prover>,
        ready: Arc<ReadyBatchQueue>,
        votes: Arc<VoteIntakeQueue>,
        inbox: Arc<SubmissionInbox>,
    ) -> Self {
        Self { context, prover, ready, votes, inbox, leases: DashMap::new() }
    }

    /// The inbox this worker feeds the Submission Manager through.
    pub fn inbox(&self) -> &Arc<SubmissionInbox> {
        &self.inbox
    }

    fn lease(&self, process_id: ProcessId) -> Arc<AsyncMutex<()>> {
        self.leases
            .entry(process_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Apply at most one ready batch for `process_id`. Returns whether a
    /// batch was applied.
    ///
    /// Holds this process's lease for the full duration, so at most one
    /// transition is ever in flight per process (required since the
    /// underlying storage transaction's optimistic conflict detection alone
    /// would only catch a race after the fact, not prevent two transitions
    /// from racing to prove against the same `old_root`).
    pub async fn tick(&self, process_id: ProcessId) -> Result<bool, TransitionError> {
        let lease = self.lease(process_id);
        let _guard = lease.lock().await;

        let Some(batch_num) = self.ready.pop(process_id) else {
            return Ok(false);
        };

        match self.apply_batch(process_id, batch_num).await {
            Ok(vote_ids) => {
                self.votes.mark_applied(process_id, &vote_ids);
                Ok(true)
            }
            Err(err @ TransitionError::Proving(_)) => Err(err),
            Err(err) => {
                self.ready.push(process_id, batch_num);
                Err(err)
            }
        }
    }

    async fn apply_batch(
        &self,
        process_id: ProcessId,
        batch_num: u64,
    ) -> Result<Vec<VoteId>, TransitionError> {
        let txn = self.context.storage.begin();

        let process_bytes = txn
            .get(&schema::process_key(&process_id))?
            .ok_or(TransitionError::UnknownProcess)?;
        let mut process: Process = codec::decode(&process_bytes)?;

        let batch_bytes = txn
            .get(&schema::batch_key(&process_id, batch_num))?
            .ok_or(TransitionError::UnknownBatch)?;
        let record: BatchRecord = codec::decode(&batch_bytes)?;

        let tree = StateTree::new(&txn, process_id);
        let old_root = tree.root()?;

        let mut add_acc = process.add_acc.clone();
        let mut sub_acc = process.sub_acc.clone();
        let mut inserted = 0u64;
        let mut updated = 0u64;
        let mut vote_ids = Vec::with_capacity(record.manifest.len());
        let mut slot_witnesses = Vec::with_capacity(record.manifest.len());

        for verified in &record.manifest {
            let voter = verified.vote.voter;
            let key = StateKey::Voter(voter).to_field();
            let live_key = schema::live_key(&process_id, &voter);

            let old_live: Option<LiveBallot> = txn
                .get(&live_key)?
                .map(|bytes| codec::decode(&bytes))
                .transpose()?;
            let old_value = old_live.as_ref().map(|live| live.ballot.leaf_value());
            let new_value = verified.ballot().leaf_value();

            let proof = tree.apply_transition(key, old_value, new_value)?;
            slot_witnesses.push(slot_witness(&proof));

            let new_live = LiveBallot { ballot: verified.ballot().clone(), weight: verified.weight };
            let weighted_new = new_live.weighted_fields();

            if let Some(old_live) = &old_live {
                for (acc, w) in sub_acc.iter_mut().zip(old_live.weighted_fields().iter()) {
                    *acc = acc.add(w);
                }
                updated += 1;
            } else {
                inserted += 1;
            }
            for (acc, w) in add_acc.iter_mut().zip(weighted_new.iter()) {
                *acc = acc.add(w);
            }

            txn.put(&live_key, codec::encode(&new_live)?)?;
            vote_ids.push(verified.vote.vote_id);
        }

        let add_key = StateKey::Reserved(ReservedKind::AddAcc).to_field();
        let add_proof = tree.apply_transition(
            add_key,
            Some(accumulator_leaf(&process.add_acc)),
            accumulator_leaf(&add_acc),
        )?;

        let sub_key = StateKey::Reserved(ReservedKind::SubAcc).to_field();
        let sub_proof = tree.apply_transition(
            sub_key,
            Some(accumulator_leaf(&process.sub_acc)),
            accumulator_leaf(&sub_acc),
        )?;

        let new_root = tree.root()?;

        let witness = TransitionWitness {
            process_id: *process_id.as_bytes(),
            old_root: fr_bytes(old_root),
            new_root: fr_bytes(new_root),
            batch_hash: fr_bytes(record.proof.batch_hash),
            aggregated_proof: record.proof.proof.0.clone(),
            valid_count: record.proof.valid_count,
            slots: slot_witnesses,
            add_acc: slot_witness(&add_proof),
            sub_acc: slot_witness(&sub_proof),
        };
        let witness_bytes = codec::encode(&witness)?;

        let proof_policy = RetryPolicy {
            max_attempts: self.context.config.max_proof_attempts,
            initial_delay: self.context.config.retry_backoff_initial,
            ceiling: self.context.config.retry_backoff_ceiling,
        };
        let proof_bytes = match retry(
            proof_policy,
            &self.context.cancellation,
            |_: &ProvingError| Classification::Transient,
            || self.prover.prove(Circuit::StateTransition, &witness_bytes),
        )
        .await
        {
            Ok(bytes) => bytes,
            Err(RetryError::Canceled) => {
                txn.rollback()?;
                return Err(TransitionError::Canceled);
            }
            Err(RetryError::Failed(err)) => {
                txn.rollback()?;
                self.quarantine(process_id, batch_num, &record, &err)?;
                return Err(TransitionError::Proving(err));
            }
        };

        process.state_root = fr_to_bytes32(new_root);
        process.vote_count += inserted;
        process.overwrite_count += updated;
        process.add_acc = add_acc.clone();
        process.sub_acc = sub_acc.clone();

        txn.put(&schema::process_key(&process_id), codec::encode(&process)?)?;
        txn.commit()?;

        self.inbox.push(SubmissionItem::Transition(StateTransition {
            process_id,
            old_root: fr_to_bytes32(old_root),
            new_root: fr_to_bytes32(new_root),
            proof: OpaqueProofBytes(proof_bytes),
            add_acc,
            sub_acc,
            batch_hash: record.proof.batch_hash,
        }));

        Ok(vote_ids)
    }

    /// Route a batch whose state-transition proof could not be produced to
    /// the dead letter, and mark its votes rejected. The tree and process
    /// record are untouched since the transaction that staged them was
    /// rolled back before this is called.
    fn quarantine(
        &self,
        process_id: ProcessId,
        batch_num: u64,
        record: &BatchRecord,
        err: &ProvingError,
    ) -> Result<(), TransitionError> {
        #[derive(Serialize)]
        struct Quarantined<'a> {
            batch: &'a Batch,
            reason: String,
        }

        let txn = self.context.storage.begin();
        txn.put(
            &schema::deadletter_batch_key(&process_id, batch_num),
            codec::encode(&Quarantined { batch: &record.batch, reason: err.to_string() })?,
        )?;
        txn.commit()?;

        for verified in &record.manifest {
            self.votes.record_rejection(
                process_id,
                verified.vote.vote_id,
                format!("state-transition proving failed: {err}"),
            );
        }
        Ok(())
    }
}
