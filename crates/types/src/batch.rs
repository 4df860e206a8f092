//! Batches, aggregated proofs, and state transitions: the units the
//! Aggregator and State-Transition workers pass between each other.

use crate::ballot::{OpaqueProofBytes, VerifiedVote};
use crate::identifiers::ProcessId;
use sequencer_crypto::{Ciphertext, Fr};
use serde::{Deserialize, Serialize};

/// A single slot in a batch: either a real verified vote's inputs-hash, or a
/// dummy placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSlot {
    /// Whether this slot holds a real vote (`index < valid_count`) or a
    /// dummy filler.
    pub valid: bool,
    /// Poseidon digest of the slot's public inputs. Dummy slots carry the
    /// placeholder `[1, 0, 0, ...]` so the recursive verifier can select on
    /// `valid` rather than branch on content.
    #[serde(with = "crate::serde_support::fr")]
    pub inputs_hash: Fr,
}

impl BatchSlot {
    /// The deterministic dummy slot: `valid = false`, placeholder
    /// inputs-hash with `limb[0] = 1`.
    pub fn dummy() -> Self {
        Self {
            valid: false,
            inputs_hash: Fr::from(1u64),
        }
    }
}

/// An ordered tuple of up to `N` verified votes, padded with dummy slots.
///
/// Content-addressed by a Poseidon hash over the `N` inputs-hashes (see
/// [`Batch::batch_hash`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// The process this batch belongs to.
    pub process_id: ProcessId,
    /// Monotonic batch number within the process.
    pub batch_num: u64,
    /// Fixed-size slot list (length equals the configured batch size).
    pub slots: Vec<BatchSlot>,
}

impl Batch {
    /// Number of real (non-dummy) slots.
    pub fn valid_count(&self) -> usize {
        self.slots.iter().filter(|s| s.valid).count()
    }

    /// Poseidon hash over the `N` inputs-hashes, padded with ones for unused
    /// capacity beyond `slots.len()` (there should be none in a well-formed
    /// batch, but this keeps the binding total over the configured arity).
    pub fn batch_hash(&self) -> Fr {
        let inputs: Vec<Fr> = self.slots.iter().map(|s| s.inputs_hash).collect();
        poseidon_fold(&inputs)
    }
}

/// Fold an arbitrary-length slice of field elements into one digest by
/// chaining arity-2 Poseidon hashes. Used when a batch's width exceeds the
/// native Poseidon arity `light_poseidon` supports directly.
fn poseidon_fold(inputs: &[Fr]) -> Fr {
    use sequencer_crypto::hash2;
    let mut acc = Fr::from(0u64);
    for input in inputs {
        acc = hash2(acc, *input);
    }
    acc
}

/// A recursive proof attesting that all `N` inner proofs verify and that the
/// batch hash binds them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedProof {
    /// The opaque recursive proof bytes.
    pub proof: OpaqueProofBytes,
    /// Number of valid (non-dummy) slots the proof attests to.
    pub valid_count: u32,
    /// The batch hash the proof binds.
    #[serde(with = "crate::serde_support::fr")]
    pub batch_hash: Fr,
}

/// One per-voter transition applied during a state-transition batch:
/// either an insertion (voter had no live ballot) or an update (overwrite).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BallotTransitionKind {
    /// The voter had no live ballot; this is a fresh insertion.
    Insert,
    /// The voter had a live ballot which is replaced; its per-field
    /// ciphertexts move into `subAcc`.
    Update {
        /// The ciphertexts of the ballot being overwritten, one per field.
        #[serde(with = "crate::serde_support::ciphertext_vec")]
        previous: Vec<Ciphertext>,
    },
}

/// The result of applying one aggregated batch to the state tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    /// The process this transition applies to.
    pub process_id: ProcessId,
    /// State root before this transition.
    pub old_root: [u8; 32],
    /// State root after this transition.
    pub new_root: [u8; 32],
    /// The proof of correct application, over the fixed state-transition
    /// circuit.
    pub proof: OpaqueProofBytes,
    /// The homomorphic addition accumulator after this transition, one
    /// ciphertext per ballot field.
    #[serde(with = "crate::serde_support::ciphertext_vec")]
    pub add_acc: Vec<Ciphertext>,
    /// The homomorphic subtraction accumulator after this transition, one
    /// ciphertext per ballot field.
    #[serde(with = "crate::serde_support::ciphertext_vec")]
    pub sub_acc: Vec<Ciphertext>,
    /// The batch hash this transition applies.
    #[serde(with = "crate::serde_support::fr")]
    pub batch_hash: Fr,
}

/// The stored content of a `batch/` record: the slot layout, the
/// aggregated proof binding it, and the manifest of real votes (in slot
/// order, dummies omitted) the State-Transition Worker replays against the
/// tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecord {
    /// The batch's slot layout (real + dummy).
    pub batch: Batch,
    /// The recursive proof binding every slot.
    pub proof: AggregatedProof,
    /// The real (non-dummy) votes, in the same order they occupy slots.
    pub manifest: Vec<VerifiedVote>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_slot_has_placeholder_inputs_hash() {
        let slot = BatchSlot::dummy();
        assert!(!slot.valid);
        assert_eq!(slot.inputs_hash, Fr::from(1u64));
    }

    #[test]
    fn valid_count_counts_only_real_slots() {
        let batch = Batch {
            process_id: crate::identifiers::ProcessId::from_bytes([0u8; 32]),
            batch_num: 0,
            slots: vec![
                BatchSlot { valid: true, inputs_hash: Fr::from(7u64) },
                BatchSlot::dummy(),
                BatchSlot::dummy(),
            ],
        };
        assert_eq!(batch.valid_count(), 1);
    }

    #[test]
    fn batch_hash_is_deterministic_and_order_sensitive() {
        let make = |order: [u64; 2]| Batch {
            process_id: crate::identifiers::ProcessId::from_bytes([0u8; 32]),
            batch_num: 0,
            slots: order
                .iter()
                .map(|&v| BatchSlot { valid: true, inputs_hash: Fr::from(v) })
                .collect(),
        };
        let a = make([1, 2]);
        let b = make([2, 1]);
        assert_eq!(a.batch_hash(), a.batch_hash());
        assert_ne!(a.batch_hash(), b.batch_hash());
    }
}
