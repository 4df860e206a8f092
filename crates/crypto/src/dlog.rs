//! Baby-step/giant-step discrete log recovery over a small horizon.
//!
//! The Results Worker decrypts `addAcc`/`subAcc` to curve points, then must
//! recover the scalar `v` such that `point == v*G`. Because tallies are
//! bounded (`maxValue * numVoters`), an exhaustive-but-sublinear search
//! suffices; full discrete-log hardness is preserved for any other use of
//! the curve.

use crate::field::{Point, Scalar};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::Zero;
use std::collections::HashMap;

/// Recover `v` in `[0, bound]` such that `v*generator == point`, or `None`
/// if no such `v` exists in range.
///
/// Runs in `O(sqrt(bound))` group operations and memory.
pub fn baby_step_giant_step(point: Point, bound: u64) -> Option<u64> {
    if point.is_zero() {
        return Some(0);
    }

    let m = (bound as f64).sqrt().ceil() as u64 + 1;
    let generator = Point::generator();

    // Baby steps: table of j*G for j in [0, m).
    let mut table = HashMap::with_capacity(m as usize);
    let mut acc = Point::zero().into_group();
    for j in 0..m {
        table.entry(affine_key(acc.into_affine())).or_insert(j);
        acc += generator;
    }

    // Giant steps: point - i*m*G for i in [0, m], looking for a baby-step hit.
    let factor = (generator * Scalar::from(m)).into_affine();
    let mut giant = point.into_group();
    for i in 0..=m {
        if let Some(&j) = table.get(&affine_key(giant.into_affine())) {
            let candidate = i * m + j;
            if candidate <= bound {
                return Some(candidate);
            }
        }
        giant -= factor;
    }

    None
}

fn affine_key(p: Point) -> (Vec<u8>, Vec<u8>) {
    use ark_serialize::CanonicalSerialize;
    let mut x = Vec::new();
    let mut y = Vec::new();
    p.x.serialize_compressed(&mut x).expect("serialize x");
    p.y.serialize_compressed(&mut y).expect("serialize y");
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_for(v: u64) -> Point {
        (Point::generator() * Scalar::from(v)).into_affine()
    }

    #[test]
    fn recovers_zero() {
        assert_eq!(baby_step_giant_step(point_for(0), 1000), Some(0));
    }

    #[test]
    fn recovers_small_values() {
        for v in [1u64, 7, 42, 999] {
            assert_eq!(baby_step_giant_step(point_for(v), 1000), Some(v));
        }
    }

    #[test]
    fn out_of_bound_returns_none() {
        assert_eq!(baby_step_giant_step(point_for(2000), 1000), None);
    }
}
