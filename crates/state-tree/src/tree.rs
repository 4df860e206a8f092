//! Fixed-depth sparse Merkle tree over Poseidon.
//!
//! The tree only ever stores node hashes, addressed by `(level, index)`
//! within a process's namespace; the key→value content a leaf commits to is
//! owned by the caller (the `Process` record for reserved keys, the `vote/`
//! records for voter keys) and supplied back in whenever a proof is needed.
//! This keeps the tree itself a pure commitment structure, matching how the
//! fixed circuits consume it: `key` and `value` are circuit public inputs,
//! never tree-resident state.

use crate::error::StateTreeError;
use crate::proof::{InclusionProof, Operation, TransitionProof};
use ark_ff::{BigInteger, PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use sequencer_crypto::{hash2, hash3, Fr};
use sequencer_storage::{schema, Transaction};
use sequencer_types::ProcessId;

/// Maximum depth of the tree, per `StateTreeMaxLevels`.
pub const MAX_LEVELS: u8 = 32;

/// The Poseidon hash of an unoccupied leaf slot.
pub fn empty_leaf_hash() -> Fr {
    Fr::zero()
}

/// `H(key, value, 1)`, the leaf hash for an occupied slot.
pub fn leaf_hash(key: Fr, value: Fr) -> Fr {
    hash3(key, value, Fr::from(1u64))
}

/// A handle to one process's tree, scoped to a single storage transaction.
pub struct StateTree<'a, 'txn> {
    txn: &'a Transaction<'txn>,
    process_id: ProcessId,
}

impl<'a, 'txn> StateTree<'a, 'txn> {
    /// Open the tree for `process_id` within `txn`.
    pub fn new(txn: &'a Transaction<'txn>, process_id: ProcessId) -> Self {
        Self { txn, process_id }
    }

    /// The current root. Reading an untouched tree yields the all-default
    /// root for a tree of depth [`MAX_LEVELS`].
    pub fn root(&self) -> Result<Fr, StateTreeError> {
        self.read_node(MAX_LEVELS, 0)
    }

    /// Build an inclusion proof for `key` holding `value` (or `None` if the
    /// slot is claimed to be empty).
    pub fn inclusion_proof(
        &self,
        key: Fr,
        value: Option<Fr>,
    ) -> Result<InclusionProof, StateTreeError> {
        let leaf_index = path_index(key);
        let siblings = self.read_siblings(leaf_index)?;
        let hash = match value {
            Some(v) => leaf_hash(key, v),
            None => empty_leaf_hash(),
        };
        Ok(InclusionProof {
            root: self.root()?,
            siblings,
            key,
            leaf_hash: hash,
        })
    }

    /// Apply an insert-or-update at `key`, writing the new leaf and every
    /// ancestor hash along its path, and return the transition proof.
    ///
    /// `old_value` must match what is currently committed at `key`: the
    /// caller is the source of truth for leaf contents, so a mismatch here
    /// means the caller's bookkeeping has drifted from the tree.
    pub fn apply_transition(
        &self,
        key: Fr,
        old_value: Option<Fr>,
        new_value: Fr,
    ) -> Result<TransitionProof, StateTreeError> {
        let leaf_index = path_index(key);
        let siblings = self.read_siblings(leaf_index)?;
        let old_root = self.root()?;

        let old_leaf_hash = match old_value {
            Some(v) => leaf_hash(key, v),
            None => empty_leaf_hash(),
        };
        let committed_hash = self.read_node(0, leaf_index)?;
        if committed_hash != old_leaf_hash {
            return Err(if old_value.is_none() {
                StateTreeError::AlreadyOccupied
            } else {
                StateTreeError::NotOccupied
            });
        }
        let operation = if old_value.is_none() {
            Operation::Insert
        } else {
            Operation::Update
        };
        let new_leaf_hash = leaf_hash(key, new_value);

        self.write_node(0, leaf_index, new_leaf_hash)?;
        let mut current = new_leaf_hash;
        for level in 0..MAX_LEVELS {
            let sibling = siblings[level as usize];
            let direction = (leaf_index >> level) & 1;
            current = if direction == 0 {
                hash2(current, sibling)
            } else {
                hash2(sibling, current)
            };
            self.write_node(level + 1, leaf_index >> (level + 1), current)?;
        }
        let new_root = current;

        Ok(TransitionProof {
            old_root,
            new_root,
            siblings,
            key,
            old_leaf_hash,
            new_leaf_hash,
            is_old0: old_value.is_none(),
            operation,
        })
    }

    fn read_siblings(&self, leaf_index: u64) -> Result<Vec<Fr>, StateTreeError> {
        (0..MAX_LEVELS)
            .map(|level| {
                let sibling_index = (leaf_index >> level) ^ 1;
                self.read_node(level, sibling_index)
            })
            .collect()
    }

    fn read_node(&self, level: u8, index: u64) -> Result<Fr, StateTreeError> {
        let node_key = schema::tree_node_key(&self.process_id, &encode_address(level, index));
        match self.txn.get(&node_key)? {
            Some(bytes) => decode_fr(&bytes),
            None => Ok(default_hash(level)),
        }
    }

    fn write_node(&self, level: u8, index: u64, value: Fr) -> Result<(), StateTreeError> {
        let node_key = schema::tree_node_key(&self.process_id, &encode_address(level, index));
        self.txn.put(&node_key, encode_fr(value))?;
        Ok(())
    }
}

/// The truncated leaf index a key addresses: its lowest [`MAX_LEVELS`] bits,
/// taken as an unsigned integer.
fn path_index(key: Fr) -> u64 {
    let bits = key.into_bigint().to_bits_le();
    let mut index: u64 = 0;
    for level in 0..MAX_LEVELS as usize {
        if bits[level] {
            index |= 1u64 << level;
        }
    }
    index
}

fn encode_address(level: u8, index: u64) -> [u8; 9] {
    let mut bytes = [0u8; 9];
    bytes[0] = level;
    bytes[1..].copy_from_slice(&index.to_be_bytes());
    bytes
}

/// The hash of an all-empty subtree rooted at `level`, computed bottom-up.
fn default_hash(level: u8) -> Fr {
    let mut hash = empty_leaf_hash();
    for _ in 0..level {
        hash = hash2(hash, hash);
    }
    hash
}

fn encode_fr(value: Fr) -> Vec<u8> {
    let mut bytes = Vec::new();
    value
        .serialize_compressed(&mut bytes)
        .expect("field element serialization is infallible");
    bytes
}

fn decode_fr(bytes: &[u8]) -> Result<Fr, StateTreeError> {
    Fr::deserialize_compressed(bytes)
        .map_err(|e| StateTreeError::CorruptNode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequencer_storage::Storage;

    fn open_temp() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        (dir, storage)
    }

    #[test]
    fn empty_tree_root_is_the_all_default_root() {
        let (_dir, storage) = open_temp();
        let txn = storage.begin();
        let tree = StateTree::new(&txn, ProcessId::from_bytes([0u8; 32]));
        assert_eq!(tree.root().unwrap(), default_hash(MAX_LEVELS));
    }

    #[test]
    fn insert_changes_the_root_and_proof_verifies() {
        let (_dir, storage) = open_temp();
        let txn = storage.begin();
        let tree = StateTree::new(&txn, ProcessId::from_bytes([1u8; 32]));

        let key = Fr::from(42u64);
        let value = Fr::from(7u64);
        let before = tree.root().unwrap();
        let transition = tree.apply_transition(key, None, value).unwrap();

        assert_eq!(transition.old_root, before);
        assert_ne!(transition.new_root, before);
        assert!(transition.is_old0);
        assert!(matches!(transition.operation, Operation::Insert));
        assert!(crate::proof::verify_transition(&transition));

        let proof = tree.inclusion_proof(key, Some(value)).unwrap();
        assert_eq!(proof.root, transition.new_root);
        assert!(crate::proof::verify_inclusion(&proof));
    }

    #[test]
    fn update_replaces_a_live_leaf() {
        let (_dir, storage) = open_temp();
        let txn = storage.begin();
        let tree = StateTree::new(&txn, ProcessId::from_bytes([2u8; 32]));

        let key = Fr::from(9u64);
        tree.apply_transition(key, None, Fr::from(1u64)).unwrap();
        let update = tree
            .apply_transition(key, Some(Fr::from(1u64)), Fr::from(2u64))
            .unwrap();

        assert!(!update.is_old0);
        assert!(matches!(update.operation, Operation::Update));
        assert!(crate::proof::verify_transition(&update));

        let proof = tree.inclusion_proof(key, Some(Fr::from(2u64))).unwrap();
        assert_eq!(proof.root, update.new_root);
        assert!(crate::proof::verify_inclusion(&proof));
    }

    #[test]
    fn distinct_keys_do_not_disturb_each_others_proofs() {
        let (_dir, storage) = open_temp();
        let txn = storage.begin();
        let tree = StateTree::new(&txn, ProcessId::from_bytes([3u8; 32]));

        tree.apply_transition(Fr::from(1u64), None, Fr::from(10u64))
            .unwrap();
        let root_after_first = tree.root().unwrap();
        let first_proof = tree.inclusion_proof(Fr::from(1u64), Some(Fr::from(10u64))).unwrap();
        assert!(crate::proof::verify_inclusion(&first_proof));

        tree.apply_transition(Fr::from(2u64), None, Fr::from(20u64))
            .unwrap();
        assert_ne!(tree.root().unwrap(), root_after_first);

        let first_proof_again = tree.inclusion_proof(Fr::from(1u64), Some(Fr::from(10u64))).unwrap();
        assert!(crate::proof::verify_inclusion(&first_proof_again));
    }
}
