//! Verifying a vote's signature over its voteID against the claimed voter
//! address.
//!
//! Voter addresses are 20-byte Ethereum-style addresses (spec.md §3); the
//! signature scheme is therefore secp256k1 ECDSA, verified by recovering
//! the signer's address from the signature and comparing it to the claim,
//! exactly as the Submission Manager's own `alloy` stack would for an
//! on-chain transaction.

use alloy_primitives::{Address as AlloySignerAddress, Signature as EcdsaSignature, B256};
use sequencer_types::{Address, VoteId, VoteSignature};

/// Verifies a [`VoteSignature`] against a claimed [`Address`].
pub trait SignatureVerifier: Send + Sync {
    /// Whether `signature` over `vote_id` was produced by `voter`.
    fn verify(&self, vote_id: &VoteId, voter: &Address, signature: &VoteSignature) -> bool;
}

/// Recovers the signer address from a 65-byte `(r, s, v)` ECDSA signature
/// over the voteID and compares it to the claim.
#[derive(Debug, Default, Clone, Copy)]
pub struct EcdsaVoteSignatureVerifier;

impl SignatureVerifier for EcdsaVoteSignatureVerifier {
    fn verify(&self, vote_id: &VoteId, voter: &Address, signature: &VoteSignature) -> bool {
        let Ok(sig) = EcdsaSignature::try_from(signature.0.as_slice()) else {
            return false;
        };
        let prehash = B256::from(*vote_id.as_hash().as_bytes());
        let Ok(recovered) = sig.recover_address_from_prehash(&prehash) else {
            return false;
        };
        recovered.as_slice() == voter.as_bytes().as_slice()
    }
}

/// Convert our [`Address`] into the `alloy` type, for callers that need to
/// compare against a recovered signer directly.
pub fn to_alloy_address(address: &Address) -> AlloySignerAddress {
    AlloySignerAddress::from_slice(address.as_bytes().as_slice())
}
