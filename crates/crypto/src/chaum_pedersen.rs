//! Chaum-Pedersen proof of correct ElGamal decryption.
//!
//! The Results Worker must prove that a published plaintext tally really is
//! `decrypt(addAcc) - decrypt(subAcc)` without revealing the process's
//! private decryption key. This is an equality-of-discrete-logs proof:
//! `log_G(PK) == log_C1(C2 - M)`, made non-interactive with Fiat-Shamir.

use crate::field::{Fr, Point, Scalar};
use crate::poseidon::poseidon_hash;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{BigInteger, PrimeField};
use ark_std::UniformRand;
use rand::RngCore;

/// A non-interactive Chaum-Pedersen proof for one decrypted field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionProof {
    /// Commitment `k*G`.
    pub t1: Point,
    /// Commitment `k*C1`.
    pub t2: Point,
    /// Response `k + e*sk` in the curve's scalar field.
    pub s: Scalar,
}

/// Prove that `plaintext_point = ciphertext.c2 - secret_key * ciphertext.c1`
/// is the correct decryption under the key matching `public_key`.
pub fn prove<R: RngCore + ?Sized>(
    public_key: Point,
    c1: Point,
    c2_minus_plaintext: Point,
    secret_key: Scalar,
    rng: &mut R,
) -> DecryptionProof {
    let k = Scalar::rand(rng);
    let generator = Point::generator();
    let t1 = (generator * k).into_affine();
    let t2 = (c1 * k).into_affine();

    let e = challenge(public_key, c1, c2_minus_plaintext, t1, t2);
    let s = k + e * secret_key;

    DecryptionProof { t1, t2, s }
}

/// Verify a [`DecryptionProof`] against the claimed public key, ciphertext
/// component `c1`, and `c2 - plaintext_point`.
pub fn verify(
    public_key: Point,
    c1: Point,
    c2_minus_plaintext: Point,
    proof: &DecryptionProof,
) -> bool {
    let e = challenge(public_key, c1, c2_minus_plaintext, proof.t1, proof.t2);
    let generator = Point::generator();

    let lhs1 = (generator * proof.s).into_affine();
    let rhs1 = (proof.t1 + public_key * e).into_affine();

    let lhs2 = (c1 * proof.s).into_affine();
    let rhs2 = (proof.t2 + c2_minus_plaintext * e).into_affine();

    lhs1 == rhs1 && lhs2 == rhs2
}

fn challenge(public_key: Point, c1: Point, pub2: Point, t1: Point, t2: Point) -> Scalar {
    let inputs = [
        public_key.x, public_key.y, c1.x, c1.y, pub2.x, pub2.y, t1.x, t1.y, t2.x, t2.y,
    ];
    let digest = poseidon_hash(&inputs).expect("arity 10 is supported");
    hash_to_scalar(digest)
}

/// Reduce a base-field element into the (smaller) scalar field by
/// reinterpreting its canonical byte representation modulo the scalar
/// field's order.
fn hash_to_scalar(value: Fr) -> Scalar {
    let bytes = value.into_bigint().to_bytes_le();
    Scalar::from_le_bytes_mod_order(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elgamal::{decrypt_point, encrypt_fresh};
    use ark_std::test_rng;

    #[test]
    fn valid_proof_verifies() {
        let mut rng = test_rng();
        let sk = Scalar::rand(&mut rng);
        let pk = (Point::generator() * sk).into_affine();

        let ct = encrypt_fresh(pk, 11, &mut rng);
        let plaintext_point = decrypt_point(&ct, sk);
        let pub2 = (ct.c2.into_group() - plaintext_point).into_affine();

        let proof = prove(pk, ct.c1, pub2, sk, &mut rng);
        assert!(verify(pk, ct.c1, pub2, &proof));
    }

    #[test]
    fn wrong_plaintext_fails() {
        let mut rng = test_rng();
        let sk = Scalar::rand(&mut rng);
        let pk = (Point::generator() * sk).into_affine();

        let ct = encrypt_fresh(pk, 11, &mut rng);
        let plaintext_point = decrypt_point(&ct, sk);
        let pub2 = (ct.c2.into_group() - plaintext_point).into_affine();

        let proof = prove(pk, ct.c1, pub2, sk, &mut rng);

        let wrong_pub2 = (pub2.into_group() + Point::generator()).into_affine();
        assert!(!verify(pk, ct.c1, wrong_pub2, &proof));
    }
}
