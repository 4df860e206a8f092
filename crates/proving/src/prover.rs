//! The opaque `prove` side of spec.md §9's "two operations" contract.
//!
//! `verify` (see [`crate::verify`]) is concrete: a real Groth16 check
//! against a loaded verifying key. `prove` is not: the actual constraint
//! systems (the recursive aggregation circuit, the state-transition
//! circuit, the results circuit) are collaborators outside this
//! specification's scope, so callers depend on this trait rather than a
//! concrete prover, and are injected with whichever implementation the
//! deployment's proving backend provides.

use crate::circuit::Circuit;
use crate::error::ProvingError;
use async_trait::async_trait;

/// Produces proofs for the protocol's fixed circuits from an
/// already-assembled witness.
///
/// Implementations may shell out to an external proving service, invoke an
/// in-process constraint-system prover, or (in tests) fabricate a
/// deterministic stand-in; this crate only specifies the contract.
#[async_trait]
pub trait Prover: Send + Sync {
    /// Produce a proof for `circuit` from `witness_bytes` (a
    /// caller-defined, circuit-specific serialization of the witness).
    ///
    /// Proving is CPU-bound and potentially long-running; per spec.md §5,
    /// proof tasks are uninterruptible once started, so implementations are
    /// not expected to honor cancellation mid-proof, only before starting.
    async fn prove(&self, circuit: Circuit, witness_bytes: &[u8]) -> Result<Vec<u8>, ProvingError>;
}

/// A deterministic stand-in prover for tests and local development: it
/// never fails and "proves" by hashing the witness, so pipeline tests can
/// exercise the full flush -> prove -> verify-shaped-bytes path without a
/// real proving key.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureProver;

#[async_trait]
impl Prover for FixtureProver {
    async fn prove(&self, _circuit: Circuit, witness_bytes: &[u8]) -> Result<Vec<u8>, ProvingError> {
        Ok(blake3::hash(witness_bytes).as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_prover_is_deterministic() {
        let prover = FixtureProver;
        let a = prover.prove(Circuit::Aggregation, b"witness").await.unwrap();
        let b = prover.prove(Circuit::Aggregation, b"witness").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn fixture_prover_distinguishes_witnesses() {
        let prover = FixtureProver;
        let a = prover.prove(Circuit::Aggregation, b"witness-a").await.unwrap();
        let b = prover.prove(Circuit::Aggregation, b"witness-b").await.unwrap();
        assert_ne!(a, b);
    }
}
