//! Encrypted ballots, submitted votes, and verified votes.

use crate::identifiers::{Address, ProcessId, VoteId, Weight};
use sequencer_crypto::{hash2, Ciphertext, Fr};
use serde::{Deserialize, Serialize};

/// An ordered sequence of ElGamal ciphertexts, one per ballot field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBallot {
    #[serde(with = "crate::serde_support::ciphertext_vec")]
    fields: Vec<Ciphertext>,
}

impl EncryptedBallot {
    /// Wrap an ordered sequence of per-field ciphertexts.
    pub fn new(fields: Vec<Ciphertext>) -> Self {
        Self { fields }
    }

    /// The per-field ciphertexts, in field order.
    pub fn fields(&self) -> &[Ciphertext] {
        &self.fields
    }

    /// Number of fields in this ballot.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether this ballot carries no fields (always invalid; present for
    /// the `is_empty` clippy lint pairing with `len`).
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fold this ballot's per-field ciphertext coordinates into the single
    /// field element a state-tree leaf commits to (spec.md §4.5: "the hash
    /// of multiple elements for multi-value leaves").
    pub fn leaf_value(&self) -> Fr {
        let mut acc = Fr::from(self.fields.len() as u64);
        for ciphertext in &self.fields {
            acc = hash2(acc, ciphertext.c1.x);
            acc = hash2(acc, ciphertext.c1.y);
            acc = hash2(acc, ciphertext.c2.x);
            acc = hash2(acc, ciphertext.c2.y);
        }
        acc
    }
}

/// Opaque bytes for a client-generated proof (ballot proof, census proof).
///
/// The proving circuit and verifying key are collaborators outside this
/// spec's scope; the sequencer treats the bytes as opaque input to a
/// `verify(proof, public_inputs) -> bool` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueProofBytes(pub Vec<u8>);

/// A raw signature over a vote ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSignature(pub Vec<u8>);

/// A vote as submitted by a client, before any verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    /// The process this vote targets.
    pub process_id: ProcessId,
    /// The submitting voter's claimed address.
    pub voter: Address,
    /// Collision-resistant unique tag for this vote.
    pub vote_id: VoteId,
    /// The encrypted ballot.
    pub ballot: EncryptedBallot,
    /// Client-side zero-knowledge proof (ballot-mode constraints, encryption
    /// correctness, commitment/nullifier derivation, inputs-hash).
    pub client_proof: OpaqueProofBytes,
    /// Proof of census membership (Merkle inclusion or CSP signature,
    /// depending on the process's `CensusOrigin`).
    pub census_proof: OpaqueProofBytes,
    /// Signature over `vote_id`, verifiable against `voter`.
    pub signature: VoteSignature,
}

/// A voter's currently-applied ballot, as stored at the `live/` key: the
/// ciphertext fields the state tree's leaf hash binds, plus the census
/// weight that was in effect when this ballot was applied. The weight rides
/// along so a later overwrite can re-derive the exact weighted ciphertexts
/// this ballot contributed to `addAcc`, to fold them into `subAcc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveBallot {
    /// The applied ballot.
    pub ballot: EncryptedBallot,
    /// The voter's census weight at the time this ballot was applied.
    pub weight: Weight,
}

impl LiveBallot {
    /// This ballot's per-field ciphertexts scaled by its weight, the form
    /// folded into `addAcc`/`subAcc`.
    pub fn weighted_fields(&self) -> Vec<Ciphertext> {
        let scalar = sequencer_crypto::Scalar::from(self.weight.get());
        self.ballot.fields().iter().map(|c| c.scale(scalar)).collect()
    }
}

/// A `Vote` whose client proof and census proof have been checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedVote {
    /// The original vote.
    pub vote: Vote,
    /// The voting weight attributed to this voter by the census.
    pub weight: Weight,
}

impl VerifiedVote {
    /// Convenience accessor for the underlying ballot.
    pub fn ballot(&self) -> &EncryptedBallot {
        &self.vote.ballot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::AffineRepr;
    use sequencer_crypto::Point;

    #[test]
    fn ballot_length_matches_fields() {
        let ballot = EncryptedBallot::new(vec![
            Ciphertext {
                c1: Point::generator(),
                c2: Point::generator(),
            };
            3
        ]);
        assert_eq!(ballot.len(), 3);
        assert!(!ballot.is_empty());
    }

    #[test]
    fn leaf_value_is_deterministic_and_content_bound() {
        let a = EncryptedBallot::new(vec![Ciphertext {
            c1: Point::generator(),
            c2: Point::generator(),
        }]);
        let b = EncryptedBallot::new(vec![Ciphertext {
            c1: Point::generator(),
            c2: (Point::generator() + Point::generator()).into(),
        }]);
        assert_eq!(a.leaf_value(), a.leaf_value());
        assert_ne!(a.leaf_value(), b.leaf_value());
    }

    #[test]
    fn serde_round_trips_ballot() {
        let ballot = EncryptedBallot::new(vec![Ciphertext {
            c1: Point::generator(),
            c2: Point::generator(),
        }]);
        let bytes = serde_json::to_vec(&ballot).unwrap();
        let back: EncryptedBallot = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(ballot, back);
    }
}
