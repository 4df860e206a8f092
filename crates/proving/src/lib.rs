//! Opaque proving-artifact loading and Groth16 verification.
//!
//! Per spec.md §9: "Proving keys, verifying keys, and constraint systems are
//! loaded from disk (content-hash-verified against a manifest). Treat them
//! as opaque blobs with two operations: `prove(witness) -> proof` and
//! `verify(proof, publicInputs) -> bool`." This crate supplies exactly
//! those two operations and the artifact loading they depend on; it never
//! builds a constraint system itself.

mod artifact;
mod circuit;
mod error;
mod prover;
mod verify;

pub use artifact::{ArtifactStore, Manifest, ManifestEntry};
pub use circuit::Circuit;
pub use error::ProvingError;
pub use prover::{FixtureProver, Prover};
pub use verify::verify as verify_proof;
