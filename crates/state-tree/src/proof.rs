//! Inclusion and transition proofs over the sparse Merkle tree.

use crate::tree::MAX_LEVELS;
use sequencer_crypto::{hash2, Fr};

/// Which operation a [`TransitionProof`] records, encoded in the fixed
/// circuit as the `(fnc0, fnc1)` pair. `Delete` is part of the circuit's
/// operation space but unused by this sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `(fnc0, fnc1) = (1, 0)`: insertion into a previously empty slot.
    Insert,
    /// `(fnc0, fnc1) = (0, 1)`: replacement of a live leaf.
    Update,
}

impl Operation {
    /// The `(fnc0, fnc1)` encoding the fixed circuit expects.
    pub fn fnc(self) -> (u8, u8) {
        match self {
            Operation::Insert => (1, 0),
            Operation::Update => (0, 1),
        }
    }
}

/// Proof that `key` commits to `leaf_hash` under `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionProof {
    /// The tree root this proof is anchored to.
    pub root: Fr,
    /// Sibling hashes from the leaf (index 0) to just below the root.
    pub siblings: Vec<Fr>,
    /// The key this proof covers.
    pub key: Fr,
    /// `H(key, value, 1)`, or the empty-leaf sentinel if claiming absence.
    pub leaf_hash: Fr,
}

/// Proof that applying an insert/update at `key` moves the tree from
/// `old_root` to `new_root` along one sibling path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionProof {
    /// Root before the transition.
    pub old_root: Fr,
    /// Root after the transition.
    pub new_root: Fr,
    /// Sibling hashes shared by both the old and new path (only the leaf's
    /// own ancestors change; its siblings at each level do not).
    pub siblings: Vec<Fr>,
    /// The key being transitioned.
    pub key: Fr,
    /// Leaf hash before the transition (the empty sentinel for an insert).
    pub old_leaf_hash: Fr,
    /// Leaf hash after the transition.
    pub new_leaf_hash: Fr,
    /// Whether the slot was empty before this transition.
    pub is_old0: bool,
    /// The operation this transition performs.
    pub operation: Operation,
}

/// Recompute the Merkle path for `key` from `leaf` up through `siblings`,
/// returning the resulting root.
fn recompute_root(key: Fr, leaf: Fr, siblings: &[Fr]) -> Fr {
    use ark_ff::{BigInteger, PrimeField};
    let bits = key.into_bigint().to_bits_le();
    let mut current = leaf;
    for level in 0..MAX_LEVELS as usize {
        let sibling = siblings[level];
        current = if bits[level] {
            hash2(sibling, current)
        } else {
            hash2(current, sibling)
        };
    }
    current
}

/// Verify an [`InclusionProof`] by recomputing its path and comparing roots.
pub fn verify_inclusion(proof: &InclusionProof) -> bool {
    if proof.siblings.len() != MAX_LEVELS as usize {
        return false;
    }
    recompute_root(proof.key, proof.leaf_hash, &proof.siblings) == proof.root
}

/// Verify a [`TransitionProof`] by recomputing both the old and new path
/// along the shared sibling set.
pub fn verify_transition(proof: &TransitionProof) -> bool {
    if proof.siblings.len() != MAX_LEVELS as usize {
        return false;
    }
    let old_ok = recompute_root(proof.key, proof.old_leaf_hash, &proof.siblings) == proof.old_root;
    let new_ok = recompute_root(proof.key, proof.new_leaf_hash, &proof.siblings) == proof.new_root;
    old_ok && new_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::leaf_hash;

    #[test]
    fn single_level_path_matches_manual_hash() {
        let key = Fr::from(0u64); // bit 0 = 0, so leaf is the left child
        let leaf = leaf_hash(key, Fr::from(5u64));
        let siblings: Vec<Fr> = (0..MAX_LEVELS).map(|i| Fr::from(i as u64 + 1)).collect();

        let expected = {
            let mut current = leaf;
            for sibling in &siblings {
                current = hash2(current, *sibling);
            }
            current
        };

        assert_eq!(recompute_root(key, leaf, &siblings), expected);
    }

    #[test]
    fn tampered_leaf_fails_verification() {
        let key = Fr::from(3u64);
        let leaf = leaf_hash(key, Fr::from(5u64));
        let siblings: Vec<Fr> = (0..MAX_LEVELS).map(|i| Fr::from(i as u64 + 1)).collect();
        let root = recompute_root(key, leaf, &siblings);

        let proof = InclusionProof {
            root,
            siblings,
            key,
            leaf_hash: leaf_hash(key, Fr::from(6u64)),
        };
        assert!(!verify_inclusion(&proof));
    }
}
