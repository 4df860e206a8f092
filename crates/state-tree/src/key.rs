//! Total mapping from logical state keys to tree-addressable field elements.
//!
//! Rather than mixing process-wide fields and per-voter ballots by subtype,
//! the tree reserves a handful of fixed small keys for process-wide state
//! and derives every other key from a voter address, domain-separated so a
//! voter can never land on a reserved slot.

use ark_ff::PrimeField;
use sequencer_crypto::{hash2, Fr};
use sequencer_types::Address;

/// Process-wide fields held at fixed reserved keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedKind {
    /// Root of the process's census (Merkle root, or CSP public-key digest).
    CensusRoot,
    /// The process's ElGamal public encryption key.
    EncryptionKey,
    /// Ballot-mode parameters, bound as a single digest.
    BallotMode,
    /// Homomorphic accumulator of live ballots.
    AddAcc,
    /// Homomorphic accumulator of overwritten ballots.
    SubAcc,
    /// Published results digest, set once by the Results Worker.
    Results,
}

impl ReservedKind {
    const ALL: [ReservedKind; 6] = [
        ReservedKind::CensusRoot,
        ReservedKind::EncryptionKey,
        ReservedKind::BallotMode,
        ReservedKind::AddAcc,
        ReservedKind::SubAcc,
        ReservedKind::Results,
    ];

    fn index(self) -> u64 {
        Self::ALL.iter().position(|&k| k == self).expect("exhaustive") as u64
    }
}

/// Domain tag mixed into every voter key so it can never collide with a
/// reserved key's small index.
const VOTER_DOMAIN: u64 = 0x766f_7465_725f_6b65; // "voter_ke" as bytes

/// A key into the state tree: either one of the fixed reserved slots, or a
/// per-voter slot derived from their address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKey {
    /// A process-wide reserved field.
    Reserved(ReservedKind),
    /// The slot holding a voter's latest live ballot.
    Voter(Address),
}

impl StateKey {
    /// Map this key to the field element the tree actually indexes by.
    pub fn to_field(self) -> Fr {
        match self {
            StateKey::Reserved(kind) => Fr::from(kind.index()),
            StateKey::Voter(address) => {
                let address_fr = Fr::from_le_bytes_mod_order(address.as_bytes());
                hash2(Fr::from(VOTER_DOMAIN), address_fr)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_keys_are_pairwise_distinct() {
        let fields: Vec<Fr> = ReservedKind::ALL
            .iter()
            .map(|&kind| StateKey::Reserved(kind).to_field())
            .collect();
        for i in 0..fields.len() {
            for j in (i + 1)..fields.len() {
                assert_ne!(fields[i], fields[j]);
            }
        }
    }

    #[test]
    fn voter_keys_are_deterministic() {
        let address = Address::from_bytes([3u8; 20]);
        let a = StateKey::Voter(address).to_field();
        let b = StateKey::Voter(address).to_field();
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_voters_get_distinct_keys() {
        let a = StateKey::Voter(Address::from_bytes([1u8; 20])).to_field();
        let b = StateKey::Voter(Address::from_bytes([2u8; 20])).to_field();
        assert_ne!(a, b);
    }

    #[test]
    fn voter_key_never_collides_with_a_reserved_key() {
        let voter = StateKey::Voter(Address::from_bytes([9u8; 20])).to_field();
        for &kind in ReservedKind::ALL.iter() {
            assert_ne!(voter, StateKey::Reserved(kind).to_field());
        }
    }
}
