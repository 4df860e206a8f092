//! The `Process` entity and its ballot-mode / census parameters.

use crate::identifiers::{Address, ProcessId};
use sequencer_crypto::{Ciphertext, Point};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a voting process.
///
/// `Created -> Ready -> (Paused <-> Ready)? -> Ended -> Results`, with
/// `Canceled` reachable from any pre-`Ended` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessStatus {
    /// Accepting ballots.
    Ready,
    /// Temporarily not accepting ballots; may return to `Ready`.
    Paused,
    /// No longer accepting ballots; awaiting results computation.
    Ended,
    /// Terminated without producing results.
    Canceled,
    /// Results have been computed and published.
    Results,
}

impl ProcessStatus {
    /// Whether ballots may currently be submitted.
    pub fn accepts_ballots(&self) -> bool {
        matches!(self, ProcessStatus::Ready)
    }
}

/// Constants governing the admissibility of a ballot's field tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotMode {
    /// Number of encrypted fields per ballot.
    pub num_fields: u8,
    /// Minimum value allowed for any single field.
    pub min_value: u64,
    /// Maximum value allowed for any single field.
    pub max_value: u64,
    /// Minimum allowed sum across all fields (if bounded).
    pub min_total_cost: Option<u64>,
    /// Maximum allowed sum across all fields (if bounded).
    pub max_total_cost: Option<u64>,
    /// Exponent applied when `cost_from_weight` pricing is used.
    pub cost_exponent: u32,
    /// Whether field cost is scaled by voter weight.
    pub cost_from_weight: bool,
    /// Whether all field values in a ballot must be pairwise distinct.
    pub unique_values: bool,
}

impl BallotMode {
    /// Validate a plaintext field tuple against this mode's constraints.
    ///
    /// Only checks the constraints that do not require the encrypted,
    /// in-circuit view (those are the client proof's job); this mirrors
    /// what the sequencer can and must re-check out of band.
    pub fn validate_fields(&self, fields: &[u64]) -> Result<(), BallotModeViolation> {
        if fields.len() != self.num_fields as usize {
            return Err(BallotModeViolation::WrongFieldCount {
                expected: self.num_fields,
                actual: fields.len(),
            });
        }

        for &value in fields {
            if value < self.min_value || value > self.max_value {
                return Err(BallotModeViolation::FieldOutOfRange {
                    value,
                    min: self.min_value,
                    max: self.max_value,
                });
            }
        }

        if self.unique_values {
            let mut seen = fields.to_vec();
            seen.sort_unstable();
            if seen.windows(2).any(|pair| pair[0] == pair[1]) {
                return Err(BallotModeViolation::DuplicateValues);
            }
        }

        let sum: u64 = fields.iter().sum();
        if let Some(min_total) = self.min_total_cost {
            if sum < min_total {
                return Err(BallotModeViolation::SumOutOfRange { sum, min_total, max_total: self.max_total_cost });
            }
        }
        if let Some(max_total) = self.max_total_cost {
            if sum > max_total {
                return Err(BallotModeViolation::SumOutOfRange { sum, min_total: self.min_total_cost, max_total: Some(max_total) });
            }
        }

        Ok(())
    }
}

/// Why a plaintext field tuple was rejected by [`BallotMode::validate_fields`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BallotModeViolation {
    /// The ballot did not carry the expected number of fields.
    #[error("expected {expected} fields, got {actual}")]
    WrongFieldCount {
        /// Fields required by the ballot mode.
        expected: u8,
        /// Fields actually present.
        actual: usize,
    },
    /// A field value fell outside `[min_value, max_value]`.
    #[error("field value {value} out of range [{min}, {max}]")]
    FieldOutOfRange {
        /// The offending value.
        value: u64,
        /// Lower bound.
        min: u64,
        /// Upper bound.
        max: u64,
    },
    /// `unique_values` was set but two fields matched.
    #[error("ballot mode requires unique field values")]
    DuplicateValues,
    /// The sum of fields fell outside the configured bounds.
    #[error("field sum {sum} out of range [{min_total:?}, {max_total:?}]")]
    SumOutOfRange {
        /// The computed sum.
        sum: u64,
        /// Lower bound, if any.
        min_total: Option<u64>,
        /// Upper bound, if any.
        max_total: Option<u64>,
    },
}

/// How a process's census membership is proven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CensusOrigin {
    /// Membership via Merkle inclusion proof against `root`.
    Merkle,
    /// Membership via a Credential Service Provider signature scheme; the
    /// census root is effectively the CSP's public key.
    Csp(CspScheme),
}

/// Supported CSP-origin signature schemes.
///
/// Unknown/unsupported CSP schemes must be refused rather than silently
/// accepted (spec Open Question): see `sequencer-intake`'s `CensusOrigin`
/// handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CspScheme {
    /// EdDSA over BN254 (matches the ballot curve's embedding field).
    EdDsaBn254,
    /// BLS12-377 signatures.
    Bls12_377,
}

/// Describes the authoritative voter set for a process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CensusDescriptor {
    /// Merkle tree vs. CSP signature scheme.
    pub origin: CensusOrigin,
    /// Merkle root, or the CSP public key digest.
    pub root: [u8; 32],
    /// Optional URI to fetch the full census dump (Merkle-origin only).
    pub uri: Option<String>,
    /// Maximum number of voters this census can hold.
    pub max_voters: u64,
}

/// A voting process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    /// Globally unique identifier.
    pub id: ProcessId,
    /// Organizer's address.
    pub organizer: Address,
    /// Current lifecycle status.
    pub status: ProcessStatus,
    /// Ballot admissibility constants.
    pub ballot_mode: BallotMode,
    /// ElGamal public key for this process (curve point, standard form).
    #[serde(with = "crate::serde_support::point")]
    pub encryption_key: Point,
    /// Voter-set descriptor.
    pub census: CensusDescriptor,
    /// Current state tree root (Poseidon field element, little-endian bytes).
    pub state_root: [u8; 32],
    /// Number of distinct voters with a live ballot.
    pub vote_count: u64,
    /// Number of ballots that have been overwritten at least once.
    pub overwrite_count: u64,
    /// Homomorphic accumulator of live ballots, one ciphertext per field.
    /// The value committed at the tree's `AddAcc` reserved key; the tree
    /// leaf itself only ever stores the hash, so the State-Transition
    /// Worker carries the authoritative vector here, exactly as it does for
    /// `encryption_key` and `census`.
    #[serde(with = "crate::serde_support::ciphertext_vec")]
    pub add_acc: Vec<Ciphertext>,
    /// Homomorphic accumulator of overwritten ballots, one ciphertext per
    /// field. Committed at the tree's `SubAcc` reserved key.
    #[serde(with = "crate::serde_support::ciphertext_vec")]
    pub sub_acc: Vec<Ciphertext>,
}

impl Process {
    /// Whether the process currently accepts ballot submissions.
    pub fn accepts_ballots(&self) -> bool {
        self.status.accepts_ballots()
    }

    /// A zeroed accumulator pair sized to this process's `numFields`, for
    /// the Process Monitor's initial record.
    pub fn zero_accumulators(num_fields: u8) -> (Vec<Ciphertext>, Vec<Ciphertext>) {
        let zeros = vec![Ciphertext::zero(); num_fields as usize];
        (zeros.clone(), zeros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode() -> BallotMode {
        BallotMode {
            num_fields: 2,
            min_value: 0,
            max_value: 16,
            min_total_cost: None,
            max_total_cost: None,
            cost_exponent: 1,
            cost_from_weight: false,
            unique_values: false,
        }
    }

    #[test]
    fn accepts_in_range_fields() {
        assert!(mode().validate_fields(&[3, 5]).is_ok());
    }

    #[test]
    fn rejects_field_exceeding_max_value() {
        let err = mode().validate_fields(&[3, 17]).unwrap_err();
        assert!(matches!(err, BallotModeViolation::FieldOutOfRange { .. }));
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = mode().validate_fields(&[3]).unwrap_err();
        assert!(matches!(err, BallotModeViolation::WrongFieldCount { .. }));
    }

    #[test]
    fn rejects_duplicate_values_when_required() {
        let mut m = mode();
        m.unique_values = true;
        let err = m.validate_fields(&[3, 3]).unwrap_err();
        assert!(matches!(err, BallotModeViolation::DuplicateValues));
    }

    #[test]
    fn process_status_gates_ballot_acceptance() {
        assert!(ProcessStatus::Ready.accepts_ballots());
        assert!(!ProcessStatus::Paused.accepts_ballots());
        assert!(!ProcessStatus::Ended.accepts_ballots());
    }
}
