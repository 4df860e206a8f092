//! The `ProcessMonitor`: spec.md §4.2's registry poll and idempotent
//! process initialization.

use std::sync::Arc;

use ark_ff::PrimeField;
use ark_serialize::CanonicalSerialize;
use sequencer_crypto::{hash2, Fr, Point};
use sequencer_runtime::{retry::retry, Classification, Context, RetryError, RetryPolicy};
use sequencer_state_tree::{ReservedKind, StateKey, StateTree};
use sequencer_storage::{codec, schema};
use sequencer_types::{BallotMode, Process, ProcessStatus};

use crate::error::MonitorError;
use crate::registry::{RegistryClient, RegistryProcess};

fn fr_to_bytes32(value: Fr) -> [u8; 32] {
    let mut bytes = Vec::new();
    value
        .serialize_compressed(&mut bytes)
        .expect("field element serialization is infallible");
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    out
}

fn point_leaf(point: Point) -> Fr {
    hash2(point.x, point.y)
}

fn census_root_leaf(root: [u8; 32]) -> Fr {
    Fr::from_le_bytes_mod_order(&root)
}

fn ballot_mode_leaf(mode: &BallotMode) -> Fr {
    let mut acc = Fr::from(mode.num_fields as u64);
    acc = hash2(acc, Fr::from(mode.min_value));
    acc = hash2(acc, Fr::from(mode.max_value));
    acc = hash2(acc, Fr::from(mode.min_total_cost.unwrap_or(u64::MAX)));
    acc = hash2(acc, Fr::from(mode.max_total_cost.unwrap_or(u64::MAX)));
    acc = hash2(acc, Fr::from(mode.cost_exponent as u64));
    acc = hash2(acc, Fr::from(mode.cost_from_weight as u64));
    acc = hash2(acc, Fr::from(mode.unique_values as u64));
    acc
}

fn validate_ballot_mode(mode: &BallotMode) -> Result<(), MonitorError> {
    if mode.num_fields == 0 {
        return Err(MonitorError::InvalidBallotMode("num_fields must be at least 1".into()));
    }
    if mode.min_value > mode.max_value {
        return Err(MonitorError::InvalidBallotMode("min_value exceeds max_value".into()));
    }
    if let (Some(min_total), Some(max_total)) = (mode.min_total_cost, mode.max_total_cost) {
        if min_total > max_total {
            return Err(MonitorError::InvalidBallotMode(
                "min_total_cost exceeds max_total_cost".into(),
            ));
        }
    }
    Ok(())
}

fn classify(err: &MonitorError) -> Classification {
    match err {
        MonitorError::Registry(_) => Classification::Transient,
        _ => Classification::Permanent,
    }
}

/// Polls the L1 process registry and keeps the local `proc/` namespace in
/// sync: new processes are initialized with an empty, reserved-key-only
/// state tree in one transaction; known processes have their status
/// mirrored (this is how a process reaching `Ended` becomes visible to the
/// Results Worker).
pub struct ProcessMonitor {
    context: Context,
    registry: Arc<dyn RegistryClient>,
}

impl ProcessMonitor {
    /// Build a `ProcessMonitor` from its injected collaborators.
    pub fn new(context: Context, registry: Arc<dyn RegistryClient>) -> Self {
        Self { context, registry }
    }

    /// Poll the registry once and sync every process it reports. Returns
    /// how many local process records were created or updated.
    pub async fn tick(&self) -> Result<usize, MonitorError> {
        let policy = RetryPolicy::from_config(&self.context.config);
        let registry = Arc::clone(&self.registry);
        let processes = retry(policy, &self.context.cancellation, classify, || {
            let registry = Arc::clone(&registry);
            async move { registry.list_processes().await }
        })
        .await
        .map_err(|err| match err {
            RetryError::Canceled => MonitorError::Canceled,
            RetryError::Failed(err) => err,
        })?;

        let mut touched = 0usize;
        for remote in &processes {
            match self.sync_one(remote) {
                Ok(true) => touched += 1,
                Ok(false) => {}
                Err(err @ MonitorError::InvalidBallotMode(_)) => {
                    tracing::warn!(process = %remote.id, error = %err, "skipping process");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(touched)
    }

    /// Idempotently reconcile one process's local record against its
    /// registry snapshot. Returns whether the local record changed.
    fn sync_one(&self, remote: &RegistryProcess) -> Result<bool, MonitorError> {
        let txn = self.context.storage.begin();
        let key = schema::process_key(&remote.id);

        match txn.get(&key)? {
            Some(bytes) => {
                let mut process: Process = codec::decode(&bytes)?;
                if process.status == remote.status {
                    return Ok(false);
                }
                process.status = remote.status;
                txn.put(&key, codec::encode(&process)?)?;
                txn.commit()?;
                Ok(true)
            }
            None => {
                validate_ballot_mode(&remote.ballot_mode)?;

                let tree = StateTree::new(&txn, remote.id);
                let (add_acc, sub_acc) = Process::zero_accumulators(remote.ballot_mode.num_fields);

                tree.apply_transition(
                    StateKey::Reserved(ReservedKind::CensusRoot).to_field(),
                    None,
                    census_root_leaf(remote.census.root),
                )?;
                tree.apply_transition(
                    StateKey::Reserved(ReservedKind::EncryptionKey).to_field(),
                    None,
                    point_leaf(remote.encryption_key),
                )?;
                tree.apply_transition(
                    StateKey::Reserved(ReservedKind::BallotMode).to_field(),
                    None,
                    ballot_mode_leaf(&remote.ballot_mode),
                )?;
                tree.apply_transition(
                    StateKey::Reserved(ReservedKind::AddAcc).to_field(),
                    None,
                    sequencer_types::EncryptedBallot::new(add_acc.clone()).leaf_value(),
                )?;
                tree.apply_transition(
                    StateKey::Reserved(ReservedKind::SubAcc).to_field(),
                    None,
                    sequencer_types::EncryptedBallot::new(sub_acc.clone()).leaf_value(),
                )?;
                let root = tree.root()?;

                let process = Process {
                    id: remote.id,
                    organizer: remote.organizer,
                    status: remote.status,
                    ballot_mode: remote.ballot_mode.clone(),
                    encryption_key: remote.encryption_key,
                    census: remote.census.clone(),
                    state_root: fr_to_bytes32(root),
                    vote_count: 0,
                    overwrite_count: 0,
                    add_acc,
                    sub_acc,
                };

                txn.put(&key, codec::encode(&process)?)?;
                txn.commit()?;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FixtureRegistryClient;
    use ark_ec::AffineRepr;
    use sequencer_runtime::{ManualClock, SequencerConfig};
    use sequencer_types::{Address, CensusDescriptor, CensusOrigin, ProcessId};
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

    fn registry_process(id: ProcessId, status: ProcessStatus) -> RegistryProcess {
        RegistryProcess {
            id,
            organizer: Address::from_bytes([1u8; 20]),
            status,
            ballot_mode: ballot_mode(),
            encryption_key: Point::generator(),
            census: CensusDescriptor {
                origin: CensusOrigin::Merkle,
                root: [7u8; 32],
                uri: None,
                max_voters: 50,
            },
        }
    }

    fn context() -> (tempfile::TempDir, Context) {
        let dir = tempfile::tempdir().unwrap();
        let storage = sequencer_storage::Storage::open(dir.path()).unwrap();
        let context = Context::new(
            storage,
            ManualClock::new(),
            SequencerConfig::default(),
            CancellationToken::new(),
        );
        (dir, context)
    }

    #[tokio::test]
    async fn initializes_a_newly_observed_process() {
        let (_dir, context) = context();
        let process_id = ProcessId::from_bytes([1u8; 32]);
        let registry = Arc::new(FixtureRegistryClient::new(vec![registry_process(
            process_id,
            ProcessStatus::Ready,
        )]));
        let monitor = ProcessMonitor::new(context.clone(), registry);

        assert_eq!(monitor.tick().await.unwrap(), 1);

        let txn = context.storage.begin();
        let bytes = txn.get(&schema::process_key(&process_id)).unwrap().unwrap();
        let process: Process = codec::decode(&bytes).unwrap();
        assert!(matches!(process.status, ProcessStatus::Ready));
        assert_eq!(process.add_acc.len(), 2);
        assert_ne!(process.state_root, [0u8; 32]);
    }

    #[tokio::test]
    async fn re_observing_an_unchanged_process_is_a_no_op() {
        let (_dir, context) = context();
        let process_id = ProcessId::from_bytes([2u8; 32]);
        let registry = Arc::new(FixtureRegistryClient::new(vec![registry_process(
            process_id,
            ProcessStatus::Ready,
        )]));
        let monitor = ProcessMonitor::new(context.clone(), registry);

        assert_eq!(monitor.tick().await.unwrap(), 1);
        assert_eq!(monitor.tick().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mirrors_a_status_change_to_ended() {
        let (_dir, context) = context();
        let process_id = ProcessId::from_bytes([3u8; 32]);
        let registry = Arc::new(FixtureRegistryClient::new(vec![registry_process(
            process_id,
            ProcessStatus::Ready,
        )]));
        let monitor = ProcessMonitor::new(context.clone(), registry.clone());
        monitor.tick().await.unwrap();

        registry.set(vec![registry_process(process_id, ProcessStatus::Ended)]);
        assert_eq!(monitor.tick().await.unwrap(), 1);

        let txn = context.storage.begin();
        let bytes = txn.get(&schema::process_key(&process_id)).unwrap().unwrap();
        let process: Process = codec::decode(&bytes).unwrap();
        assert!(matches!(process.status, ProcessStatus::Ended));
    }

    #[tokio::test]
    async fn invalid_ballot_mode_is_skipped_not_fatal() {
        let (_dir, context) = context();
        let process_id = ProcessId::from_bytes([4u8; 32]);
        let mut bad = registry_process(process_id, ProcessStatus::Ready);
        bad.ballot_mode.num_fields = 0;
        let registry = Arc::new(FixtureRegistryClient::new(vec![bad]));
        let monitor = ProcessMonitor::new(context.clone(), registry);

        assert_eq!(monitor.tick().await.unwrap(), 0);

        let txn = context.storage.begin();
        assert!(txn.get(&schema::process_key(&process_id)).unwrap().is_none());
    }
}
