//! The Aggregator Worker: spec.md §4.4's tick-and-flush batch assembly.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use sequencer_intake::{inputs_hash, VoteIntakeQueue};
use sequencer_proving::{Circuit, Prover};
use sequencer_runtime::{retry::retry, Classification, Context, ErrorKind, RetryError, RetryPolicy};
use sequencer_storage::{codec, schema};
use sequencer_types::{
    AggregatedProof, Batch, BatchRecord, BatchSlot, OpaqueProofBytes, Process, ProcessId,
    VerifiedVote,
};

use crate::error::AggregatorError;
use crate::ready_queue::ReadyBatchQueue;

/// Witness handed to the recursive aggregation circuit: the batch's slot
/// layout plus the real votes backing its non-dummy slots. Opaque to this
/// crate beyond its canonical CBOR encoding: the constraint system that
/// consumes it is a collaborator outside this crate's scope.
#[derive(Serialize)]
struct AggregationWitness<'a> {
    batch: &'a Batch,
    votes: &'a [VerifiedVote],
}

/// Assembles batches of verified votes into one recursive proof per batch,
/// per spec.md §4.4.
pub struct AggregatorWorker {
    context: Context,
    prover: Arc<dyn Prover>,
    queue: Arc<VoteIntakeQueue>,
    ready: Arc<ReadyBatchQueue>,
    pending_since: DashMap<ProcessId, Instant>,
}

impl AggregatorWorker {
    /// Build an `AggregatorWorker` from its injected collaborators.
    pub fn new(
        context: Context,
        prover: Arc<dyn Prover>,
        queue: Arc<VoteIntakeQueue>,
        ready: Arc<ReadyBatchQueue>,
    ) -> Self {
        Self { context, prover, queue, ready, pending_since: DashMap::new() }
    }

    /// The queue of batch numbers ready for the State-Transition Worker.
    pub fn ready_queue(&self) -> &Arc<ReadyBatchQueue> {
        &self.ready
    }

    /// One tick for `process_id`: flush a batch if either the queue has
    /// reached `batch_size` or the oldest pending vote has sat longer than
    /// `aggregator_timeout`. Returns whether a batch was produced.
    pub async fn tick(&self, process_id: ProcessId) -> Result<bool, AggregatorError> {
        let batch_size = self.context.config.batch_size;

        if self.queue.is_empty(process_id) {
            self.pending_since.remove(&process_id);
            return Ok(false);
        }

        let first_seen = *self
            .pending_since
            .entry(process_id)
            .or_insert_with(|| self.context.clock.now());
        let elapsed = self.context.clock.now().saturating_duration_since(first_seen);

        let ready_to_flush =
            self.queue.len(process_id) >= batch_size || elapsed >= self.context.config.aggregator_timeout;
        if !ready_to_flush {
            return Ok(false);
        }

        let votes = self.queue.pop_batch(process_id, batch_size);
        self.pending_since.remove(&process_id);
        if votes.is_empty() {
            return Ok(false);
        }

        match self.aggregate(process_id, &votes).await {
            Ok(()) => Ok(true),
            Err(err) => {
                for vote in &votes {
                    self.queue.push(process_id, vote.clone());
                }
                tracing::warn!(
                    ?process_id,
                    error = %err,
                    "batch aggregation exhausted retries; votes released back to the queue"
                );
                Err(err)
            }
        }
    }

    async fn aggregate(&self, process_id: ProcessId, votes: &[VerifiedVote]) -> Result<(), AggregatorError> {
        let batch_size = self.context.config.batch_size;
        let process = self.load_process(process_id)?;

        let mut slots = Vec::with_capacity(batch_size);
        for vote in votes {
            slots.push(BatchSlot { valid: true, inputs_hash: inputs_hash(&process, &vote.vote) });
        }
        while slots.len() < batch_size {
            slots.push(BatchSlot::dummy());
        }

        let batch_num = self.reserve_batch_num(process_id)?;
        let batch = Batch { process_id, batch_num, slots };

        let witness = AggregationWitness { batch: &batch, votes };
        let witness_bytes = codec::encode(&witness)?;

        // Proving retries are governed by `MaxProofAttempts`, not the
        // transient-network backoff policy: every attempt here is worth
        // retrying until the cap, regardless of the specific failure.
        let proof_policy = RetryPolicy {
            max_attempts: self.context.config.max_proof_attempts,
            initial_delay: self.context.config.retry_backoff_initial,
            ceiling: self.context.config.retry_backoff_ceiling,
        };
        let proof_bytes = retry(
            proof_policy,
            &self.context.cancellation,
            |_: &sequencer_proving::ProvingError| Classification::Transient,
            || self.prover.prove(Circuit::Aggregation, &witness_bytes),
        )
        .await
        .map_err(|e| match e {
            RetryError::Canceled => AggregatorError::Canceled,
            RetryError::Failed(err) => AggregatorError::Proving(err),
        })?;

        let record = BatchRecord {
            batch: batch.clone(),
            proof: AggregatedProof {
                proof: OpaqueProofBytes(proof_bytes),
                valid_count: votes.len() as u32,
                batch_hash: batch.batch_hash(),
            },
            manifest: votes.to_vec(),
        };

        let persist_policy = RetryPolicy::from_config(&self.context.config);
        retry(
            persist_policy,
            &self.context.cancellation,
            |err: &AggregatorError| ErrorKind::from(err).classification(),
            || self.persist_once(process_id, batch_num, &record),
        )
        .await
        .map_err(|e| match e {
            RetryError::Canceled => AggregatorError::Canceled,
            RetryError::Failed(err) => err,
        })?;

        self.ready.push(process_id, batch_num);
        Ok(())
    }

    async fn persist_once(
        &self,
        process_id: ProcessId,
        batch_num: u64,
        record: &BatchRecord,
    ) -> Result<(), AggregatorError> {
        let txn = self.context.storage.begin();
        let key = schema::batch_key(&process_id, batch_num);
        if txn.get(&key)?.is_some() {
            return Err(AggregatorError::Fatal(format!(
                "batch {batch_num} already recorded for process"
            )));
        }
        txn.put(&key, codec::encode(record)?)?;
        txn.commit()?;
        Ok(())
    }

    fn load_process(&self, process_id: ProcessId) -> Result<Process, AggregatorError> {
        let txn = self.context.storage.begin();
        let bytes = txn
            .get(&schema::process_key(&process_id))?
            .ok_or(AggregatorError::UnknownProcess)?;
        let process = codec::decode(&bytes)?;
        txn.rollback()?;
        Ok(process)
    }

    fn reserve_batch_num(&self, process_id: ProcessId) -> Result<u64, AggregatorError> {
        let txn = self.context.storage.begin();
        let existing = txn.iter_prefix(&schema::batch_prefix(&process_id))?;
        txn.rollback()?;
        Ok(existing.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::AffineRepr;
    use async_trait::async_trait;
    use sequencer_crypto::{Ciphertext, Point};
    use sequencer_proving::{FixtureProver, ProvingError};
    use sequencer_runtime::{ManualClock, SequencerConfig};
    use sequencer_types::{
        Address, BallotMode, CensusDescriptor, CensusOrigin, EncryptedBallot, Hash, ProcessStatus,
        VoteId, VoteSignature, Vote, Weight,
    };
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn ballot_mode() -> BallotMode {
        BallotMode {
            num_fields: 1,
            min_value: 0,
            max_value: 16,
            min_total_cost: None,
            max_total_cost: None,
            cost_exponent: 1,
            cost_from_weight: false,
            unique_values: false,
        }
    }

    fn process(id: ProcessId) -> Process {
        Process {
            id,
            organizer: Address::from_bytes([1u8; 20]),
            status: ProcessStatus::Ready,
            ballot_mode: ballot_mode(),
            encryption_key: Point::generator(),
            census: CensusDescriptor {
                origin: CensusOrigin::Merkle,
                root: [0u8; 32],
                uri: None,
                max_voters: 10,
            },
            state_root: [0u8; 32],
            vote_count: 0,
            overwrite_count: 0,
            add_acc: vec![Ciphertext::zero()],
            sub_acc: vec![Ciphertext::zero()],
        }
    }

    fn vote_for(process_id: ProcessId, voter: [u8; 20], tag: &[u8]) -> VerifiedVote {
        VerifiedVote {
            vote: Vote {
                process_id,
                voter: Address::from_bytes(voter),
                vote_id: VoteId::from_hash(Hash::from_bytes(tag)),
                ballot: EncryptedBallot::new(vec![Ciphertext {
                    c1: Point::generator(),
                    c2: Point::generator(),
                }]),
                client_proof: OpaqueProofBytes(vec![]),
                census_proof: OpaqueProofBytes(vec![]),
                signature: VoteSignature(vec![]),
            },
            weight: Weight::new(1),
        }
    }

    fn context_with_process(
        process: &Process,
        clock: Arc<ManualClock>,
        config: SequencerConfig,
    ) -> (tempfile::TempDir, Context) {
        let dir = tempfile::tempdir().unwrap();
        let storage = sequencer_storage::Storage::open(dir.path()).unwrap();
        let txn = storage.begin();
        txn.put(&schema::process_key(&process.id), codec::encode(process).unwrap())
            .unwrap();
        txn.commit().unwrap();

        let context = Context::new(storage, clock, config, CancellationToken::new());
        (dir, context)
    }

    struct AlwaysFailsProver;
    #[async_trait]
    impl Prover for AlwaysFailsProver {
        async fn prove(&self, _circuit: Circuit, _witness_bytes: &[u8]) -> Result<Vec<u8>, ProvingError> {
            Err(ProvingError::ProofSystem("boom".into()))
        }
    }

    #[tokio::test]
    async fn flushes_on_reaching_batch_size_without_waiting_for_timeout() {
        let process_id = ProcessId::from_bytes([3u8; 32]);
        let process = process(process_id);
        let clock = ManualClock::new();
        let mut config = SequencerConfig::default();
        config.batch_size = 2;
        let (_dir, context) = context_with_process(&process, clock, config);

        let queue = Arc::new(VoteIntakeQueue::new());
        queue.push(process_id, vote_for(process_id, [1u8; 20], b"a"));
        queue.push(process_id, vote_for(process_id, [2u8; 20], b"b"));

        let worker = AggregatorWorker::new(
            context,
            Arc::new(FixtureProver),
            queue,
            Arc::new(ReadyBatchQueue::new()),
        );

        let flushed = worker.tick(process_id).await.unwrap();
        assert!(flushed);
        assert_eq!(worker.ready_queue().pop(process_id), Some(0));
    }

    #[tokio::test]
    async fn does_not_flush_a_partial_batch_before_timeout() {
        let process_id = ProcessId::from_bytes([4u8; 32]);
        let process = process(process_id);
        let clock = ManualClock::new();
        let mut config = SequencerConfig::default();
        config.batch_size = 8;
        config.aggregator_timeout = Duration::from_secs(30);
        let (_dir, context) = context_with_process(&process, clock, config);

        let queue = Arc::new(VoteIntakeQueue::new());
        queue.push(process_id, vote_for(process_id, [1u8; 20], b"a"));

        let worker = AggregatorWorker::new(
            context,
            Arc::new(FixtureProver),
            queue,
            Arc::new(ReadyBatchQueue::new()),
        );

        assert!(!worker.tick(process_id).await.unwrap());
        assert!(worker.ready_queue().is_empty(process_id));
    }

    #[tokio::test]
    async fn flushes_a_partial_batch_after_timeout_with_dummy_padding() {
        let process_id = ProcessId::from_bytes([5u8; 32]);
        let process = process(process_id);
        let clock = ManualClock::new();
        let mut config = SequencerConfig::default();
        config.batch_size = 8;
        config.aggregator_timeout = Duration::from_millis(10);
        let (_dir, context) = context_with_process(&process, clock.clone(), config);

        let queue = Arc::new(VoteIntakeQueue::new());
        queue.push(process_id, vote_for(process_id, [1u8; 20], b"a"));

        let worker = AggregatorWorker::new(
            context.clone(),
            Arc::new(FixtureProver),
            queue,
            Arc::new(ReadyBatchQueue::new()),
        );

        assert!(!worker.tick(process_id).await.unwrap());

        clock.advance(Duration::from_millis(50));
        assert!(worker.tick(process_id).await.unwrap());

        let batch_num = worker.ready_queue().pop(process_id).unwrap();
        let txn = context.storage.begin();
        let bytes = txn.get(&schema::batch_key(&process_id, batch_num)).unwrap().unwrap();
        let record: BatchRecord = codec::decode(&bytes).unwrap();
        assert_eq!(record.batch.slots.len(), 8);
        assert_eq!(record.batch.valid_count(), 1);
        assert_eq!(record.proof.valid_count, 1);
    }

    #[tokio::test]
    async fn exhausted_proving_releases_votes_back_to_the_queue() {
        let process_id = ProcessId::from_bytes([6u8; 32]);
        let process = process(process_id);
        let clock = ManualClock::new();
        let mut config = SequencerConfig::default();
        config.batch_size = 1;
        config.max_proof_attempts = 2;
        config.retry_backoff_initial = Duration::from_millis(1);
        config.retry_backoff_ceiling = Duration::from_millis(2);
        let (_dir, context) = context_with_process(&process, clock, config);

        let queue = Arc::new(VoteIntakeQueue::new());
        queue.push(process_id, vote_for(process_id, [1u8; 20], b"a"));

        let worker = AggregatorWorker::new(
            context,
            Arc::new(AlwaysFailsProver),
            queue.clone(),
            Arc::new(ReadyBatchQueue::new()),
        );

        let result = worker.tick(process_id).await;
        assert!(matches!(result, Err(AggregatorError::Proving(_))));
        assert_eq!(queue.len(process_id), 1);
    }
}
