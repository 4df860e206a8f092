//! Domain-specific identifier types.

use crate::hash::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Globally unique process identifier.
///
/// 32 bytes: 20-byte organizer address || 4-byte chain/version tag ||
/// 8-byte nonce.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessId([u8; 32]);

impl ProcessId {
    /// Build a `ProcessId` from its three components.
    pub fn new(organizer: [u8; 20], chain_tag: [u8; 4], nonce: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..20].copy_from_slice(&organizer);
        bytes[20..24].copy_from_slice(&chain_tag);
        bytes[24..32].copy_from_slice(&nonce.to_be_bytes());
        Self(bytes)
    }

    /// Wrap a raw 32-byte identifier without validating its structure.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The organizer address component (first 20 bytes).
    pub fn organizer(&self) -> [u8; 20] {
        self.0[..20].try_into().expect("20 bytes")
    }

    /// The chain/version tag component (bytes 20..24).
    pub fn chain_tag(&self) -> [u8; 4] {
        self.0[20..24].try_into().expect("4 bytes")
    }

    /// The nonce component (last 8 bytes, big-endian).
    pub fn nonce(&self) -> u64 {
        u64::from_be_bytes(self.0[24..32].try_into().expect("8 bytes"))
    }

    /// Render as a storage key prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A 20-byte account address (voter or organizer).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address([u8; 20]);

impl Address {
    /// Wrap raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Render as hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{}..)", &self.to_hex()[..8])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

/// A unique, collision-resistant tag for a submitted vote, derived
/// client-side (e.g. from a nullifier-style commitment). Opaque to the
/// sequencer beyond uniqueness and signature verification.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoteId(Hash);

impl VoteId {
    /// Wrap a precomputed digest as a vote ID.
    pub fn from_hash(hash: Hash) -> Self {
        Self(hash)
    }

    /// The underlying digest.
    pub fn as_hash(&self) -> Hash {
        self.0
    }
}

impl fmt::Debug for VoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VoteId({:?})", self.0)
    }
}

/// Voting weight (stake / credential weight), always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Weight(pub u64);

impl Weight {
    /// The minimum weight.
    pub const MIN: Self = Weight(1);

    /// Construct a weight, clamped to at least 1.
    pub fn new(weight: u64) -> Self {
        Weight(weight.max(1))
    }

    /// The raw value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic arrival sequence number within a process's vote queue.
///
/// Used as the third component of the `vote/` storage key
/// (`processID || voterAddr || seq`) and to define batch ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sequence(pub u64);

impl Sequence {
    /// The first sequence number issued for a process.
    pub const FIRST: Self = Sequence(0);

    /// The next sequence number.
    pub fn next(self) -> Self {
        Sequence(self.0 + 1)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_id_round_trips_components() {
        let organizer = [7u8; 20];
        let tag = [0, 0, 0, 1];
        let id = ProcessId::new(organizer, tag, 42);
        assert_eq!(id.organizer(), organizer);
        assert_eq!(id.chain_tag(), tag);
        assert_eq!(id.nonce(), 42);
    }

    #[test]
    fn weight_is_clamped_to_minimum() {
        assert_eq!(Weight::new(0).get(), 1);
        assert_eq!(Weight::new(5).get(), 5);
    }

    #[test]
    fn sequence_increments() {
        let seq = Sequence::FIRST;
        assert_eq!(seq.next(), Sequence(1));
        assert_eq!(seq.next().next(), Sequence(2));
    }
}
