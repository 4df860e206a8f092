//! Groth16 proof verification against a loaded, content-checked verifying
//! key.
//!
//! The constraint systems themselves (the ballot proof, the recursive
//! aggregation circuit, the state-transition circuit, the results circuit)
//! are collaborators this crate never builds: only their verifying keys,
//! loaded by [`crate::artifact::ArtifactStore`], and this one operation.

use crate::circuit::Circuit;
use crate::error::ProvingError;
use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof};
use ark_serialize::CanonicalDeserialize;
use ark_snark::SNARK;

/// Verify `proof_bytes` against `vk` and `public_inputs` for `circuit`.
///
/// Returns `Ok(false)` for a structurally valid proof that does not verify;
/// `Err` only for malformed bytes or a proof-system-level failure (a
/// meaningfully different outcome: the former is an adversarial/garbled
/// input, the latter is "no opinion was reached").
pub fn verify(
    circuit: Circuit,
    vk: &PreparedVerifyingKey<Bn254>,
    proof_bytes: &[u8],
    public_inputs: &[Fr],
) -> Result<bool, ProvingError> {
    let proof = Proof::<Bn254>::deserialize_compressed(proof_bytes).map_err(|e| {
        ProvingError::Malformed {
            path: format!("{circuit:?} proof"),
            reason: e.to_string(),
        }
    })?;

    Groth16::<Bn254>::verify_with_processed_vk(vk, public_inputs, &proof)
        .map_err(|e| ProvingError::ProofSystem(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_groth16::prepare_verifying_key;
    use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
    use ark_serialize::CanonicalSerialize;
    use ark_snark::CircuitSpecificSetupSNARK;
    use ark_std::test_rng;

    #[derive(Clone)]
    struct KnowsSquareRoot {
        x: Option<Fr>,
    }

    impl ConstraintSynthesizer<Fr> for KnowsSquareRoot {
        fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> ark_relations::r1cs::Result<()> {
            let x = cs.new_witness_variable(|| self.x.ok_or(SynthesisError::AssignmentMissing))?;
            let x_squared_var =
                cs.new_input_variable(|| self.x.map(|v| v * v).ok_or(SynthesisError::AssignmentMissing))?;
            cs.enforce_constraint(
                ark_relations::lc!() + x,
                ark_relations::lc!() + x,
                ark_relations::lc!() + x_squared_var,
            )
        }
    }

    fn setup() -> (ark_groth16::ProvingKey<Bn254>, PreparedVerifyingKey<Bn254>) {
        let mut rng = test_rng();
        let (pk, vk) = Groth16::<Bn254>::setup(KnowsSquareRoot { x: None }, &mut rng).unwrap();
        (pk, prepare_verifying_key(&vk))
    }

    fn proof_for(pk: &ark_groth16::ProvingKey<Bn254>, x: Fr) -> Vec<u8> {
        let mut rng = test_rng();
        let proof = Groth16::<Bn254>::prove(pk, KnowsSquareRoot { x: Some(x) }, &mut rng).unwrap();
        let mut bytes = Vec::new();
        proof.serialize_compressed(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn valid_proof_verifies_true() {
        let (pk, pvk) = setup();
        let x = Fr::from(3u64);
        let bytes = proof_for(&pk, x);
        assert!(verify(Circuit::Ballot, &pvk, &bytes, &[x * x]).unwrap());
    }

    #[test]
    fn wrong_public_input_verifies_false() {
        let (pk, pvk) = setup();
        let bytes = proof_for(&pk, Fr::from(3u64));
        assert!(!verify(Circuit::Ballot, &pvk, &bytes, &[Fr::from(100u64)]).unwrap());
    }

    #[test]
    fn garbled_bytes_are_malformed_not_false() {
        let (_pk, pvk) = setup();
        let result = verify(Circuit::Ballot, &pvk, &[0xff; 4], &[Fr::from(1u64)]);
        assert!(matches!(result, Err(ProvingError::Malformed { .. })));
    }
}
