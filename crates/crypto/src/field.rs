//! Field element and curve point aliases.
//!
//! Ballots are encrypted on the Baby-Jubjub twisted Edwards curve, embedded
//! in the BN254 scalar field so that in-circuit arithmetic stays native.
//! `Fr` is that base field (the same field Poseidon and the recursive
//! verification circuits operate over); `Scalar` is the curve's own scalar
//! field, used only for secret keys and encryption randomness.

use ark_ed_on_bn254::EdwardsAffine;

/// A field element. Used for Poseidon inputs, batch hashes, and state-tree
/// keys/values, in addition to curve point coordinates.
pub type Fr = ark_ed_on_bn254::Fq;

/// The curve's scalar field (secret keys, encryption randomness).
pub type Scalar = ark_ed_on_bn254::Fr;

/// A point on the ballot encryption curve.
pub type Point = EdwardsAffine;
