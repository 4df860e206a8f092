//! EIP-4844 blob packing and KZG commitment, per spec.md §6: "Field elements
//! are packed 32B big-endian; padding 1s to fill 4096 slots per blob... one
//! blob per batch; multiple blobs chunked if oversized."

use std::path::Path;

use alloy_consensus::BlobTransactionSidecar;
use alloy_eips::eip4844::{Blob, FIELD_ELEMENTS_PER_BLOB};
use alloy_primitives::B256;
use sha2::{Digest, Sha256};

use crate::error::SubmissionError;

/// A 32-byte big-endian field element, the unit blobs are packed from.
pub type FieldElement = [u8; 32];

/// The deterministic padding element: `1` as a 32-byte big-endian field
/// element, matching `sequencer_types::BatchSlot::dummy`'s placeholder
/// convention.
fn padding_element() -> FieldElement {
    let mut bytes = [0u8; 32];
    bytes[31] = 1;
    bytes
}

/// Chunk `elements` into one or more blobs of `FIELD_ELEMENTS_PER_BLOB`
/// slots each, padding the final blob's unused slots with [`padding_element`].
pub fn pack_blobs(elements: &[FieldElement]) -> Vec<Blob> {
    let pad = padding_element();
    elements
        .chunks(FIELD_ELEMENTS_PER_BLOB)
        .map(|chunk| {
            let mut raw = [0u8; alloy_eips::eip4844::BYTES_PER_BLOB];
            for (slot, element) in raw.chunks_mut(32).zip(chunk.iter().chain(std::iter::repeat(&pad))) {
                slot.copy_from_slice(element);
            }
            Blob::from(raw)
        })
        .collect()
}

/// Split an arbitrary byte string into 32-byte big-endian field elements,
/// zero-padding the final element. This is how a witness's CBOR encoding
/// becomes the slot sequence [`pack_blobs`] chunks into blobs, distinct
/// from blob-level padding, which uses [`padding_element`] instead of zero.
pub fn field_elements_from_bytes(bytes: &[u8]) -> Vec<FieldElement> {
    bytes
        .chunks(32)
        .map(|chunk| {
            let mut element = [0u8; 32];
            element[..chunk.len()].copy_from_slice(chunk);
            element
        })
        .collect()
}

/// Computes KZG commitments and proofs for a set of blobs and assembles the
/// EIP-4844 sidecar. An opaque collaborator from this crate's point of view,
/// the same shape as `sequencer_proving::Prover`, so tests can substitute a
/// fixture instead of loading a real trusted setup.
pub trait BlobCommitter: Send + Sync {
    /// Build a [`BlobTransactionSidecar`] for `blobs`: one KZG commitment
    /// and one KZG proof per blob.
    fn build_sidecar(&self, blobs: Vec<Blob>) -> Result<BlobTransactionSidecar, SubmissionError>;
}

/// KZG context: a loaded trusted setup plus the commitment/proof/sidecar
/// machinery built on top of it.
pub struct KzgContext {
    settings: c_kzg::KzgSettings,
}

impl KzgContext {
    /// Load the trusted setup from `path` (the standard `.txt` KZG ceremony
    /// output format `c-kzg` expects).
    pub fn load(path: &Path) -> Result<Self, SubmissionError> {
        let settings = c_kzg::KzgSettings::load_trusted_setup_file(path)
            .map_err(|e| SubmissionError::Kzg(e.to_string()))?;
        Ok(Self { settings })
    }
}

impl BlobCommitter for KzgContext {
    fn build_sidecar(&self, blobs: Vec<Blob>) -> Result<BlobTransactionSidecar, SubmissionError> {
        let mut commitments = Vec::with_capacity(blobs.len());
        let mut proofs = Vec::with_capacity(blobs.len());

        for blob in &blobs {
            let c_blob = c_kzg::Blob::from_bytes(blob.as_slice())
                .map_err(|e| SubmissionError::Kzg(e.to_string()))?;
            let commitment = c_kzg::KzgCommitment::blob_to_kzg_commitment(&c_blob, &self.settings)
                .map_err(|e| SubmissionError::Kzg(e.to_string()))?;
            let proof =
                c_kzg::KzgProof::compute_blob_kzg_proof(&c_blob, &commitment.to_bytes(), &self.settings)
                    .map_err(|e| SubmissionError::Kzg(e.to_string()))?;

            commitments.push(commitment.to_bytes().into_inner().into());
            proofs.push(proof.to_bytes().into_inner().into());
        }

        Ok(BlobTransactionSidecar::new(blobs, commitments, proofs))
    }
}

/// A [`BlobCommitter`] standing in for a real trusted setup in tests:
/// produces correctly-shaped but cryptographically meaningless commitments
/// and proofs, mirroring `sequencer_proving::FixtureProver`.
#[cfg(any(test, feature = "test-util"))]
pub struct FixtureBlobCommitter;

#[cfg(any(test, feature = "test-util"))]
impl BlobCommitter for FixtureBlobCommitter {
    fn build_sidecar(&self, blobs: Vec<Blob>) -> Result<BlobTransactionSidecar, SubmissionError> {
        let commitments = vec![[0u8; 48].into(); blobs.len()];
        let proofs = vec![[0u8; 48].into(); blobs.len()];
        Ok(BlobTransactionSidecar::new(blobs, commitments, proofs))
    }
}

/// The versioned hash an EIP-4844 transaction commits to on-chain:
/// `0x01 || sha256(commitment)[1..]`.
pub fn versioned_hash(commitment: &[u8; 48]) -> B256 {
    let digest = Sha256::digest(commitment);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    hash[0] = 0x01;
    B256::from(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_blobs_fills_unused_slots_with_the_padding_element() {
        let elements = vec![[7u8; 32]];
        let blobs = pack_blobs(&elements);
        assert_eq!(blobs.len(), 1);
        let raw = blobs[0].as_slice();
        assert_eq!(&raw[0..32], &[7u8; 32]);
        assert_eq!(&raw[32..64], padding_element().as_slice());
    }

    #[test]
    fn pack_blobs_spills_into_a_second_blob_when_oversized() {
        let elements = vec![[1u8; 32]; FIELD_ELEMENTS_PER_BLOB + 1];
        let blobs = pack_blobs(&elements);
        assert_eq!(blobs.len(), 2);
        assert_eq!(&blobs[1].as_slice()[0..32], &[1u8; 32]);
        assert_eq!(&blobs[1].as_slice()[32..64], padding_element().as_slice());
    }

    #[test]
    fn versioned_hash_always_starts_with_the_blob_version_byte() {
        let hash = versioned_hash(&[9u8; 48]);
        assert_eq!(hash.as_slice()[0], 0x01);
    }

    #[test]
    fn field_elements_from_bytes_zero_pads_the_final_chunk() {
        let elements = field_elements_from_bytes(&[1u8, 2, 3]);
        assert_eq!(elements.len(), 1);
        assert_eq!(&elements[0][..3], &[1, 2, 3]);
        assert_eq!(&elements[0][3..], &[0u8; 29]);
    }
}
