//! Census-membership verification: Merkle inclusion for Merkle-origin
//! processes, CSP signature for CSP-origin processes.
//!
//! Per spec.md §9's Open Question, the mapping from a CSP scheme to its
//! in-circuit witness is scheme-dependent; unsupported schemes are refused
//! rather than silently accepted.

use sequencer_types::{Address, CensusDescriptor, CensusOrigin, CspScheme, OpaqueProofBytes, Weight};

use crate::error::IntakeError;

/// Verifies a voter's census-membership proof against a process's
/// [`CensusDescriptor`], returning the voter's weight if membership holds.
pub trait CensusVerifier: Send + Sync {
    /// Check `proof` as evidence that `voter` belongs to `descriptor`'s
    /// census, returning the attributed voting weight.
    fn verify(
        &self,
        descriptor: &CensusDescriptor,
        voter: &Address,
        proof: &OpaqueProofBytes,
    ) -> Result<Weight, IntakeError>;
}

/// One sibling step of a Merkle census proof: the sibling hash and which
/// side it sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CensusSibling {
    /// The sibling's hash.
    pub hash: [u8; 32],
    /// Whether the sibling is the right child (our node is the left child).
    pub sibling_is_right: bool,
}

/// A parsed Merkle census proof: weight leaf plus its sibling path.
#[derive(Debug, Clone)]
pub struct MerkleCensusProof {
    /// The weight attributed to this voter by the leaf.
    pub weight: Weight,
    /// Sibling path from the leaf up to the root.
    pub siblings: Vec<CensusSibling>,
}

impl MerkleCensusProof {
    /// Parse the canonical wire encoding: `weight (8B BE) || siblings`,
    /// where each sibling is `side (1B) || hash (32B)`.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 8 || (bytes.len() - 8) % 33 != 0 {
            return None;
        }
        let weight = u64::from_be_bytes(bytes[..8].try_into().ok()?);
        let mut siblings = Vec::new();
        for chunk in bytes[8..].chunks(33) {
            let sibling_is_right = chunk[0] != 0;
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&chunk[1..]);
            siblings.push(CensusSibling { hash, sibling_is_right });
        }
        Some(Self { weight: Weight::new(weight), siblings })
    }

    fn leaf_hash(&self, voter: &Address) -> [u8; 32] {
        hash_leaf(voter, self.weight)
    }
}

fn hash_leaf(voter: &Address, weight: Weight) -> [u8; 32] {
    sequencer_types::Hash::from_parts(&[voter.as_bytes().as_slice(), &weight.get().to_be_bytes()])
        .to_bytes()
}

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    sequencer_types::Hash::from_parts(&[left, right]).to_bytes()
}

/// Verifies Merkle-origin census proofs and refuses every CSP scheme
/// (callers needing CSP support should layer [`CspSignatureVerifier`]
/// alongside this one via [`CompositeCensusVerifier`]).
#[derive(Debug, Default, Clone, Copy)]
pub struct MerkleCensusVerifier;

impl CensusVerifier for MerkleCensusVerifier {
    fn verify(
        &self,
        descriptor: &CensusDescriptor,
        voter: &Address,
        proof: &OpaqueProofBytes,
    ) -> Result<Weight, IntakeError> {
        if !matches!(descriptor.origin, CensusOrigin::Merkle) {
            return Err(IntakeError::CensusRejected(
                "census is not Merkle-origin".into(),
            ));
        }
        let parsed = MerkleCensusProof::decode(&proof.0)
            .ok_or_else(|| IntakeError::CensusRejected("malformed Merkle census proof".into()))?;

        let mut current = parsed.leaf_hash(voter);
        for sibling in &parsed.siblings {
            current = if sibling.sibling_is_right {
                hash_pair(&current, &sibling.hash)
            } else {
                hash_pair(&sibling.hash, &current)
            };
        }

        if current == descriptor.root {
            Ok(parsed.weight)
        } else {
            Err(IntakeError::CensusRejected("Merkle root mismatch".into()))
        }
    }
}

/// Verifies CSP-origin census proofs for the `EdDsaBn254` scheme only;
/// `Bls12_377` and any future scheme are refused rather than silently
/// accepted (spec.md §9's Open Question).
#[derive(Debug, Default, Clone, Copy)]
pub struct CspSignatureVerifier;

impl CensusVerifier for CspSignatureVerifier {
    fn verify(
        &self,
        descriptor: &CensusDescriptor,
        voter: &Address,
        proof: &OpaqueProofBytes,
    ) -> Result<Weight, IntakeError> {
        let CensusOrigin::Csp(scheme) = descriptor.origin else {
            return Err(IntakeError::CensusRejected("census is not CSP-origin".into()));
        };
        match scheme {
            CspScheme::EdDsaBn254 => verify_eddsa_credential(descriptor, voter, proof),
            CspScheme::Bls12_377 => Err(IntakeError::CensusRejected(
                "BLS12-377 CSP scheme is not supported by this deployment".into(),
            )),
        }
    }
}

/// `proof` is `weight (8B BE) || eddsa signature (64B)` over
/// `H(censusRoot, voterAddress)`, verified with the CSP public key
/// (`descriptor.root` doubles as the key digest per spec.md's data model).
fn verify_eddsa_credential(
    descriptor: &CensusDescriptor,
    voter: &Address,
    proof: &OpaqueProofBytes,
) -> Result<Weight, IntakeError> {
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    if proof.0.len() != 8 + 64 {
        return Err(IntakeError::CensusRejected("malformed CSP credential".into()));
    }
    let weight = u64::from_be_bytes(proof.0[..8].try_into().unwrap());
    let sig_bytes: [u8; 64] = proof.0[8..]
        .try_into()
        .map_err(|_| IntakeError::CensusRejected("malformed CSP signature".into()))?;
    let signature = Signature::from_bytes(&sig_bytes);

    let verifying_key = VerifyingKey::from_bytes(&descriptor.root)
        .map_err(|_| IntakeError::CensusRejected("CSP public key is not a valid EdDSA key".into()))?;

    let mut message = Vec::with_capacity(52);
    message.extend_from_slice(&descriptor.root);
    message.extend_from_slice(voter.as_bytes());

    verifying_key
        .verify(&message, &signature)
        .map_err(|_| IntakeError::CensusRejected("CSP signature does not verify".into()))?;

    Ok(Weight::new(weight))
}

/// Dispatches to [`MerkleCensusVerifier`] or [`CspSignatureVerifier`]
/// depending on the process's declared [`CensusOrigin`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CompositeCensusVerifier {
    merkle: MerkleCensusVerifier,
    csp: CspSignatureVerifier,
}

impl CensusVerifier for CompositeCensusVerifier {
    fn verify(
        &self,
        descriptor: &CensusDescriptor,
        voter: &Address,
        proof: &OpaqueProofBytes,
    ) -> Result<Weight, IntakeError> {
        match descriptor.origin {
            CensusOrigin::Merkle => self.merkle.verify(descriptor, voter, proof),
            CensusOrigin::Csp(_) => self.csp.verify(descriptor, voter, proof),
        }
    }
}
