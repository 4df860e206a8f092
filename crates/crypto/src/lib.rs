//! Cryptographic primitives for the ballot protocol.
//!
//! Curve arithmetic, Poseidon hashing, ElGamal encryption and the
//! Chaum-Pedersen decryption-correctness proof used by the Results Worker.
//! Proving-circuit internals (the ballot proof, the recursive aggregation
//! circuit, the state-transition circuit) are out of scope; this crate only
//! supplies the primitives the sequencer itself needs to run outside of any
//! circuit.

mod chaum_pedersen;
mod curve;
mod dlog;
mod elgamal;
mod field;
mod poseidon;

pub use chaum_pedersen::{prove as prove_decryption, verify as verify_decryption, DecryptionProof};
pub use curve::{curve_scalar, to_reduced, to_standard};
pub use dlog::baby_step_giant_step;
pub use elgamal::{decrypt_point, encrypt, encrypt_fresh, Ciphertext};
pub use field::{Fr, Point, Scalar};
pub use poseidon::{hash2, hash3, poseidon_hash};
