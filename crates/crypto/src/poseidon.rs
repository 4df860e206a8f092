//! Poseidon hashing over the ballot curve's base field.
//!
//! Used for state-tree leaf/node hashes, batch-hash binding of aggregated
//! proofs, and vote inputs-hashes: anywhere the result must be cheap to
//! re-derive inside a proving circuit.

use crate::field::Fr;
use light_poseidon::{Poseidon, PoseidonError, PoseidonHasher};

/// Hash up to 12 field elements with Poseidon.
///
/// `light_poseidon`'s BN254 parameter set supports arities 2 through 12;
/// callers with more inputs should chain calls (as the state tree does for
/// its sibling paths) rather than call this with an oversized slice.
pub fn poseidon_hash(inputs: &[Fr]) -> Result<Fr, PoseidonError> {
    let mut hasher: Poseidon<Fr> = Poseidon::<Fr>::new_circom(inputs.len())?;
    hasher.hash(inputs)
}

/// Hash two field elements. The common case: Merkle sibling pairs.
pub fn hash2(a: Fr, b: Fr) -> Fr {
    poseidon_hash(&[a, b]).expect("arity 2 is always supported")
}

/// Hash three field elements. Used for leaf hashes: `H(key, value, 1)`.
pub fn hash3(a: Fr, b: Fr, c: Fr) -> Fr {
    poseidon_hash(&[a, b, c]).expect("arity 3 is always supported")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::Zero;

    #[test]
    fn deterministic() {
        let a = Fr::from(1u64);
        let b = Fr::from(2u64);
        assert_eq!(hash2(a, b), hash2(a, b));
    }

    #[test]
    fn order_sensitive() {
        let a = Fr::from(1u64);
        let b = Fr::from(2u64);
        assert_ne!(hash2(a, b), hash2(b, a));
    }

    #[test]
    fn not_identically_zero() {
        assert_ne!(hash2(Fr::zero(), Fr::zero()), Fr::zero());
    }
}
