//! ElGamal ballot encryption over the curve's additive group.
//!
//! Each ballot field is encrypted independently as `(C1, C2) = (r*G, v*G +
//! r*PK)`. Plaintexts are restricted to small non-negative integers (vote
//! field values times voter weight), which keeps the homomorphically
//! accumulated tally within the baby-step/giant-step horizon the Results
//! Worker decrypts over (see [`crate::dlog`]).

use crate::field::{Point, Scalar};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::Zero;
use ark_std::UniformRand;
use rand::RngCore;

/// An ElGamal ciphertext for a single ballot field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ciphertext {
    /// Ephemeral component, `r*G`.
    pub c1: Point,
    /// Masked plaintext, `v*G + r*PK`.
    pub c2: Point,
}

impl Ciphertext {
    /// The additive identity: the encryption of zero under randomness zero.
    ///
    /// Used as the initial value when folding a batch's ciphertexts into an
    /// accumulator.
    pub fn zero() -> Self {
        Self {
            c1: Point::zero(),
            c2: Point::zero(),
        }
    }

    /// Homomorphically add two ciphertexts.
    ///
    /// `Enc(v1, r1) + Enc(v2, r2) = Enc(v1 + v2, r1 + r2)` under the same
    /// public key. This is how `addAcc`/`subAcc` are maintained incrementally
    /// as ballots are applied to the state tree.
    pub fn add(&self, other: &Ciphertext) -> Ciphertext {
        Ciphertext {
            c1: (self.c1 + other.c1).into_affine(),
            c2: (self.c2 + other.c2).into_affine(),
        }
    }

    /// Negate a ciphertext (used to express subtraction as addition of the
    /// negation when moving an overwritten ballot from `addAcc` to `subAcc`).
    pub fn neg(&self) -> Ciphertext {
        Ciphertext {
            c1: -self.c1,
            c2: -self.c2,
        }
    }

    /// Scale a ciphertext by a scalar: `k * Enc(v, r) = Enc(k*v, k*r)`.
    ///
    /// Used to weight a ballot's per-field ciphertexts by the voter's census
    /// weight before folding them into `addAcc`/`subAcc`.
    pub fn scale(&self, scalar: Scalar) -> Ciphertext {
        Ciphertext {
            c1: (self.c1 * scalar).into_affine(),
            c2: (self.c2 * scalar).into_affine(),
        }
    }
}

/// Encrypt a small non-negative plaintext value under `public_key`, using
/// `randomness` as the ephemeral scalar.
///
/// The plaintext is embedded as `value * G`; recovering `value` from the
/// decrypted point requires solving a discrete log, which is why plaintexts
/// (and their weighted, accumulated sums) must stay within a small horizon.
pub fn encrypt(public_key: Point, value: u64, randomness: Scalar) -> Ciphertext {
    let generator = Point::generator();
    let c1 = (generator * randomness).into_affine();
    let masked = (generator * Scalar::from(value)) + (public_key * randomness);
    Ciphertext {
        c1,
        c2: masked.into_affine(),
    }
}

/// Encrypt using fresh randomness drawn from `rng`.
pub fn encrypt_fresh<R: RngCore + ?Sized>(
    public_key: Point,
    value: u64,
    rng: &mut R,
) -> Ciphertext {
    let randomness = Scalar::rand(rng);
    encrypt(public_key, value, randomness)
}

/// Recover the plaintext curve point `v*G` from a ciphertext, given the
/// process's private decryption key.
///
/// The returned point still needs `crate::dlog::baby_step_giant_step` to
/// recover `v` itself.
pub fn decrypt_point(ciphertext: &Ciphertext, secret_key: Scalar) -> Point {
    let masked = ciphertext.c2.into_group();
    let shared_secret = ciphertext.c1 * secret_key;
    (masked - shared_secret).into_affine()
}
