//! The published output of the Results Worker.

use crate::ballot::OpaqueProofBytes;
use crate::identifiers::ProcessId;
use serde::{Deserialize, Serialize};

/// Decrypted per-field tallies plus the proof binding them to the process's
/// final `addAcc`/`subAcc` accumulators, ready for on-chain submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsRecord {
    /// The process these results belong to.
    pub process_id: ProcessId,
    /// `decrypt(addAcc) - decrypt(subAcc)`, one entry per ballot field, in
    /// field order.
    pub tallies: Vec<u64>,
    /// The results circuit's proof: per-field Chaum-Pedersen decryption
    /// correctness plus inclusion proofs for the accumulators, aggregated.
    pub proof: OpaqueProofBytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_round_trips() {
        let record = ResultsRecord {
            process_id: ProcessId::from_bytes([1u8; 32]),
            tallies: vec![3, 7],
            proof: OpaqueProofBytes(vec![9, 9, 9]),
        };
        let bytes = serde_json::to_vec(&record).unwrap();
        let back: ResultsRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(record.tallies, back.tallies);
    }
}
