//! The `ResultsWorker`: spec.md §4.7's decrypt-and-prove step that runs
//! once a process has stopped accepting ballots.

use std::sync::Arc;

use ark_ec::{AffineRepr, CurveGroup};
use ark_serialize::CanonicalSerialize;
use serde::Serialize;
use sequencer_crypto::{decrypt_point, prove_decryption, Fr, Point, Scalar};
use sequencer_proving::{Circuit, Prover, ProvingError};
use sequencer_runtime::{retry::retry, Classification, Context, RetryError, RetryPolicy};
use sequencer_state_tree::{InclusionProof, ReservedKind, StateKey, StateTree, TransitionProof};
use sequencer_storage::{codec, schema};
use sequencer_submission::{SubmissionInbox, SubmissionItem};
use sequencer_types::{OpaqueProofBytes, Process, ProcessId, ProcessStatus, ResultsRecord};

use crate::error::ResultsError;
use crate::keys::DecryptionKeyProvider;

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

fn scalar_bytes(value: Scalar) -> Vec<u8> {
    let mut bytes = Vec::new();
    value
        .serialize_compressed(&mut bytes)
        .expect("scalar serialization is infallible");
    bytes
}

fn point_bytes(point: Point) -> (Vec<u8>, Vec<u8>) {
    (fr_bytes(point.x), fr_bytes(point.y))
}

/// Fold a tally vector into the single field element the `Results` reserved
/// leaf commits to, under the same length-prefixed hash-chain
/// `EncryptedBallot::leaf_value` uses for ciphertext vectors.
fn tallies_leaf(tallies: &[u64]) -> Fr {
    use sequencer_crypto::hash2;
    let mut acc = Fr::from(tallies.len() as u64);
    for &tally in tallies {
        acc = hash2(acc, Fr::from(tally));
    }
    acc
}

#[derive(Serialize)]
struct InclusionWitness {
    root: Vec<u8>,
    key: Vec<u8>,
    leaf_hash: Vec<u8>,
    siblings: Vec<Vec<u8>>,
}

fn inclusion_witness(proof: &InclusionProof) -> InclusionWitness {
    InclusionWitness {
        root: fr_bytes(proof.root),
        key: fr_bytes(proof.key),
        leaf_hash: fr_bytes(proof.leaf_hash),
        siblings: proof.siblings.iter().map(|s| fr_bytes(*s)).collect(),
    }
}

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
struct DecryptionWitness {
    t1: (Vec<u8>, Vec<u8>),
    t2: (Vec<u8>, Vec<u8>),
    s: Vec<u8>,
}

#[derive(Serialize)]
struct ResultsWitness {
    process_id: [u8; 32],
    old_root: Vec<u8>,
    new_root: Vec<u8>,
    add_inclusion: InclusionWitness,
    sub_inclusion: InclusionWitness,
    results_slot: SlotWitness,
    decryption_proofs: Vec<DecryptionWitness>,
    tallies: Vec<u64>,
}

/// Decrypts a process's final `addAcc`/`subAcc` accumulators to per-field
/// tallies and proves the decryption correct, once per process. Mirrors
/// `sequencer_transition::TransitionWorker`'s retry/persist/quarantine shape
/// for the proving step, with no per-process lease since only one tick can
/// ever do useful work (idempotent on `Process::status`).
pub struct ResultsWorker {
    context: Context,
    prover: Arc<dyn Prover>,
    keys: Arc<dyn DecryptionKeyProvider>,
    inbox: Arc<SubmissionInbox>,
}

impl ResultsWorker {
    /// Build a `ResultsWorker` from its injected collaborators.
    pub fn new(
        context: Context,
        prover: Arc<dyn Prover>,
        keys: Arc<dyn DecryptionKeyProvider>,
        inbox: Arc<SubmissionInbox>,
    ) -> Self {
        Self { context, prover, keys, inbox }
    }

    /// The inbox this worker feeds the Submission Manager through.
    pub fn inbox(&self) -> &Arc<SubmissionInbox> {
        &self.inbox
    }

    /// Compute and persist `process_id`'s results if it has ended and has
    /// none yet. Returns whether this call did the work (`false` means the
    /// process either isn't `Ended` or already has published results).
    pub async fn tick(&self, process_id: ProcessId) -> Result<bool, ResultsError> {
        let txn = self.context.storage.begin();

        let process_bytes = txn
            .get(&schema::process_key(&process_id))?
            .ok_or(ResultsError::UnknownProcess)?;
        let mut process: Process = codec::decode(&process_bytes)?;

        if !matches!(process.status, ProcessStatus::Ended) {
            return Ok(false);
        }

        let secret_key = self.keys.secret_key(process_id).await?;
        let bound = process.ballot_mode.max_value.saturating_mul(process.census.max_voters);

        let tree = StateTree::new(&txn, process_id);
        let old_root = tree.root()?;

        let mut tallies = Vec::with_capacity(process.add_acc.len());
        let mut decryption_proofs = Vec::with_capacity(process.add_acc.len());
        for (field, (add, sub)) in process.add_acc.iter().zip(process.sub_acc.iter()).enumerate() {
            let combined = add.add(&sub.neg());
            let plaintext_point = decrypt_point(&combined, secret_key);
            let tally = sequencer_crypto::baby_step_giant_step(plaintext_point, bound)
                .ok_or(ResultsError::TallyOutOfRange { field })?;

            let public_key = process.encryption_key;
            let pub2 = (combined.c2.into_group() - plaintext_point).into_affine();
            let proof = prove_decryption(public_key, combined.c1, pub2, secret_key, &mut rand::rngs::OsRng);
            decryption_proofs.push(DecryptionWitness {
                t1: point_bytes(proof.t1),
                t2: point_bytes(proof.t2),
                s: scalar_bytes(proof.s),
            });
            tallies.push(tally);
        }

        let add_key = StateKey::Reserved(ReservedKind::AddAcc).to_field();
        let add_inclusion = tree.inclusion_proof(
            add_key,
            Some(sequencer_types::EncryptedBallot::new(process.add_acc.clone()).leaf_value()),
        )?;
        let sub_key = StateKey::Reserved(ReservedKind::SubAcc).to_field();
        let sub_inclusion = tree.inclusion_proof(
            sub_key,
            Some(sequencer_types::EncryptedBallot::new(process.sub_acc.clone()).leaf_value()),
        )?;

        let results_key = StateKey::Reserved(ReservedKind::Results).to_field();
        let results_transition = tree.apply_transition(results_key, None, tallies_leaf(&tallies))?;
        let new_root = tree.root()?;

        let witness = ResultsWitness {
            process_id: *process_id.as_bytes(),
            old_root: fr_bytes(old_root),
            new_root: fr_bytes(new_root),
            add_inclusion: inclusion_witness(&add_inclusion),
            sub_inclusion: inclusion_witness(&sub_inclusion),
            results_slot: slot_witness(&results_transition),
            decryption_proofs,
            tallies: tallies.clone(),
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
            || self.prover.prove(Circuit::Results, &witness_bytes),
        )
        .await
        {
            Ok(bytes) => bytes,
            Err(RetryError::Canceled) => {
                txn.rollback()?;
                return Err(ResultsError::Canceled);
            }
            Err(RetryError::Failed(err)) => {
                txn.rollback()?;
                self.quarantine(process_id, &err)?;
                return Err(ResultsError::Proving(err));
            }
        };

        let record = ResultsRecord {
            process_id,
            tallies,
            proof: OpaqueProofBytes(proof_bytes),
        };

        process.status = ProcessStatus::Results;
        process.state_root = fr_to_bytes32(new_root);

        txn.put(&schema::process_key(&process_id), codec::encode(&process)?)?;
        txn.put(&schema::results_key(&process_id), codec::encode(&record)?)?;
        txn.commit()?;

        self.inbox.push(SubmissionItem::Results(record));

        Ok(true)
    }

    /// Route a process whose results proof could not be produced to the
    /// dead letter; `Process::status` is left at `Ended` so a later tick
    /// can retry once the underlying proving failure is resolved.
    fn quarantine(&self, process_id: ProcessId, err: &ProvingError) -> Result<(), ResultsError> {
        #[derive(Serialize)]
        struct Quarantined {
            process_id: [u8; 32],
            reason: String,
        }

        let txn = self.context.storage.begin();
        txn.put(
            &schema::deadletter_results_key(&process_id),
            codec::encode(&Quarantined { process_id: *process_id.as_bytes(), reason: err.to_string() })?,
        )?;
        txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::AffineRepr;
    use async_trait::async_trait;
    use sequencer_crypto::{encrypt, Point as Pt};
    use sequencer_proving::FixtureProver;
    use sequencer_runtime::{ManualClock, SequencerConfig};
    use sequencer_types::{Address, BallotMode, CensusDescriptor, CensusOrigin};
    use tokio_util::sync::CancellationToken;

    fn ballot_mode() -> BallotMode {
        BallotMode {
            num_fields: 2,
            min_value: 0,
            max_value: 10,
            min_total_cost: None,
            max_total_cost: None,
            cost_exponent: 1,
            cost_from_weight: false,
            unique_values: false,
        }
    }

    fn process_with_tallies(id: ProcessId, secret_key: Scalar, tallies: &[u64]) -> Process {
        let public_key = (Pt::generator() * secret_key).into_affine();
        let add_acc: Vec<_> = tallies
            .iter()
            .map(|&v| encrypt(public_key, v, Scalar::from(7u64)))
            .collect();
        let sub_acc = vec![sequencer_crypto::Ciphertext::zero(); tallies.len()];

        Process {
            id,
            organizer: Address::from_bytes([1u8; 20]),
            status: ProcessStatus::Ended,
            ballot_mode: ballot_mode(),
            encryption_key: public_key,
            census: CensusDescriptor {
                origin: CensusOrigin::Merkle,
                root: [0u8; 32],
                uri: None,
                max_voters: 100,
            },
            state_root: [0u8; 32],
            vote_count: tallies.len() as u64,
            overwrite_count: 0,
            add_acc,
            sub_acc,
        }
    }

    fn context_with(process: &Process) -> (tempfile::TempDir, Context) {
        let dir = tempfile::tempdir().unwrap();
        let storage = sequencer_storage::Storage::open(dir.path()).unwrap();
        let txn = storage.begin();
        txn.put(&schema::process_key(&process.id), codec::encode(process).unwrap()).unwrap();
        txn.commit().unwrap();

        let context = Context::new(
            storage,
            ManualClock::new(),
            SequencerConfig::default(),
            CancellationToken::new(),
        );
        (dir, context)
    }

    struct AlwaysFailsProver;
    #[async_trait]
    impl Prover for AlwaysFailsProver {
        async fn prove(&self, _circuit: Circuit, _witness_bytes: &[u8]) -> Result<Vec<u8>, ProvingError> {
            Err(ProvingError::ProofSystem("boom".into()))
        }
    }

    fn worker(context: Context, prover: Arc<dyn Prover>, secret_key: Scalar) -> ResultsWorker {
        ResultsWorker::new(
            context,
            prover,
            Arc::new(crate::keys::FixtureKeyProvider::new(secret_key)),
            Arc::new(SubmissionInbox::new()),
        )
    }

    #[tokio::test]
    async fn not_ended_is_a_no_op() {
        let secret_key = Scalar::from(5u64);
        let process_id = ProcessId::from_bytes([1u8; 32]);
        let mut process = process_with_tallies(process_id, secret_key, &[3, 7]);
        process.status = ProcessStatus::Ready;
        let (_dir, context) = context_with(&process);

        let worker = worker(context, Arc::new(FixtureProver), secret_key);
        assert!(!worker.tick(process_id).await.unwrap());
    }

    #[tokio::test]
    async fn decrypts_and_publishes_results() {
        let secret_key = Scalar::from(11u64);
        let process_id = ProcessId::from_bytes([2u8; 32]);
        let process = process_with_tallies(process_id, secret_key, &[3, 7]);
        let (_dir, context) = context_with(&process);

        let worker = worker(context.clone(), Arc::new(FixtureProver), secret_key);
        assert!(worker.tick(process_id).await.unwrap());

        let txn = context.storage.begin();
        let bytes = txn.get(&schema::process_key(&process_id)).unwrap().unwrap();
        let updated: Process = codec::decode(&bytes).unwrap();
        assert!(matches!(updated.status, ProcessStatus::Results));
        assert_ne!(updated.state_root, [0u8; 32]);

        let record_bytes = txn.get(&schema::results_key(&process_id)).unwrap().unwrap();
        let record: ResultsRecord = codec::decode(&record_bytes).unwrap();
        assert_eq!(record.tallies, vec![3, 7]);

        let inbox_item = worker.inbox().pop(process_id);
        assert!(matches!(inbox_item, Some(SubmissionItem::Results(_))));

        assert!(!worker.tick(process_id).await.unwrap());
    }

    #[tokio::test]
    async fn proving_exhaustion_quarantines_and_leaves_status_ended() {
        let secret_key = Scalar::from(4u64);
        let process_id = ProcessId::from_bytes([3u8; 32]);
        let process = process_with_tallies(process_id, secret_key, &[1, 2]);
        let (_dir, context) = context_with(&process);

        let mut config = SequencerConfig::default();
        config.max_proof_attempts = 1;
        let context = Context::new(context.storage, context.clock, config, context.cancellation);

        let worker = worker(context.clone(), Arc::new(AlwaysFailsProver), secret_key);
        let result = worker.tick(process_id).await;
        assert!(matches!(result, Err(ResultsError::Proving(_))));

        let txn = context.storage.begin();
        let bytes = txn.get(&schema::process_key(&process_id)).unwrap().unwrap();
        let unchanged: Process = codec::decode(&bytes).unwrap();
        assert!(matches!(unchanged.status, ProcessStatus::Ended));

        let deadletter = txn.get(&schema::deadletter_results_key(&process_id)).unwrap();
        assert!(deadletter.is_some());
    }
}
