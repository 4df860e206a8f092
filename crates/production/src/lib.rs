//! Wiring for the `sequencer-node` binary: constructs every worker crate
//! against one shared [`sequencer_runtime::Context`] and drives each
//! worker's tick loop, per spec.md's Design Notes ("inject a context...
//! into each worker at startup; avoid global mutable state").
//!
//! The chain/registry/proving/KZG collaborators each worker is injected
//! with are out of scope per spec.md §1 and only specified as traits
//! (`sequencer_proving::Prover`, `sequencer_monitor::RegistryClient`,
//! `sequencer_submission::ChainClient`, `sequencer_submission::BlobCommitter`,
//! `sequencer_results::DecryptionKeyProvider`); this binary wires their
//! fixture stand-ins by default and is the place a real deployment swaps
//! them for concrete implementations.

pub mod config;
pub mod genesis;
pub mod metrics;
pub mod telemetry;
pub mod wiring;

use sequencer_storage::Storage;
use sequencer_types::ProcessId;

/// Every process the local store currently knows about, in storage-key
/// order. Workers are ticked for each one in turn; a worker with nothing to
/// do for a process returns immediately (see each crate's `tick`/`admit`).
pub fn known_process_ids(storage: &Storage) -> Vec<ProcessId> {
    let txn = storage.begin();
    let entries = txn
        .iter_prefix(b"proc/")
        .expect("iterating the proc/ prefix cannot fail outside of storage engine corruption");
    let _ = txn.rollback();
    entries
        .into_iter()
        .filter_map(|(key, _)| {
            let id_bytes: [u8; 32] = key.strip_prefix(b"proc/")?.try_into().ok()?;
            Some(ProcessId::from_bytes(id_bytes))
        })
        .collect()
}

/// Sanity check that [`known_process_ids`] agrees with
/// [`sequencer_storage::schema::process_key`]'s own layout.
#[cfg(test)]
mod tests {
    use super::*;
    use sequencer_storage::{codec, schema};
    use sequencer_types::{
        Address, BallotMode, CensusDescriptor, CensusOrigin, Process, ProcessStatus,
    };

    fn dummy_process(id: ProcessId) -> Process {
        Process {
            id,
            organizer: Address::from_bytes([1u8; 20]),
            status: ProcessStatus::Ready,
            ballot_mode: BallotMode {
                num_fields: 1,
                min_value: 0,
                max_value: 1,
                min_total_cost: None,
                max_total_cost: None,
                cost_exponent: 0,
                cost_from_weight: false,
                unique_values: false,
            },
            encryption_key: {
                use ark_ff::Zero;
                sequencer_crypto::Point::zero()
            },
            census: CensusDescriptor {
                origin: CensusOrigin::Merkle,
                root: [0u8; 32],
                uri: None,
                max_voters: 1,
            },
            state_root: [0u8; 32],
            vote_count: 0,
            overwrite_count: 0,
            add_acc: vec![],
            sub_acc: vec![],
        }
    }

    #[test]
    fn lists_every_process_key_under_the_proc_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let a = ProcessId::from_bytes([1u8; 32]);
        let b = ProcessId::from_bytes([2u8; 32]);

        let txn = storage.begin();
        txn.put(&schema::process_key(&a), codec::encode(&dummy_process(a)).unwrap()).unwrap();
        txn.put(&schema::process_key(&b), codec::encode(&dummy_process(b)).unwrap()).unwrap();
        txn.commit().unwrap();

        let mut ids = known_process_ids(&storage);
        ids.sort_by_key(|id| *id.as_bytes());
        assert_eq!(ids, vec![a, b]);
    }
}
