//! Minimum-image reduction for periodic displacement vectors.
//!
//! For an orthogonal cell the minimum image of a displacement is found by
//! rounding each fractional component toward zero displacement. General
//! triclinic cells need more: a displacement can be shortened by a
//! combination of cell edges that no per-axis wrap reaches. The reducer
//! therefore derives a set of lattice "transform vectors" (the edges plus
//! selected pair and triplet combinations) once per cell, and sweeps a
//! displacement against that set until no vector triggers a correction.

use crate::hma::error::Error;
use crate::model::cell::Cell;
use crate::model::vec::{dot, Vec3};

/// Projection threshold for triggering a correction and for the
/// redundancy test. Slightly above one half so displacements exactly on
/// a half-cell boundary are left alone.
const HALF_TOL: f64 = 0.50000001;

/// Dot products with magnitude below this are treated as orthogonal.
const ORTHO_EPS: f64 = 1e-10;

/// Minimum-image engine for one simulation cell.
///
/// Owns the precomputed transform-vector basis. Construction runs once
/// per trajectory; [`reduce`](Self::reduce) is pure and may be called any
/// number of times afterward.
#[derive(Debug)]
pub struct LatticeReducer {
    transforms: Vec<Vec3>,
    norms_sq: Vec<f64>,
}

impl LatticeReducer {
    /// Builds the transform-vector set for a cell.
    ///
    /// The three edge vectors seed the set. For each non-orthogonal edge
    /// pair, the sum or difference (whichever opposes the pair's overlap)
    /// is offered as a candidate, and for each sign combination of the
    /// three pairwise dot products with a net negative sum, the
    /// corresponding signed triplet combination is offered. Candidates
    /// carrying a near-full component of an already accepted vector are
    /// redundant images and are rejected.
    pub fn new(cell: &Cell) -> Self {
        let [a0, a1, a2] = *cell.rows();

        let mut reducer = Self {
            transforms: Vec::with_capacity(10),
            norms_sq: Vec::with_capacity(10),
        };
        reducer.accept(a0);
        reducer.accept(a1);
        reducer.accept(a2);

        let d01 = dot(a0, a1);
        let d02 = dot(a0, a2);
        let d12 = dot(a1, a2);

        let pairs = [(a0, a1, d01), (a0, a2, d02), (a1, a2, d12)];
        for (u, v, d) in pairs {
            if d < -ORTHO_EPS {
                reducer.offer([u[0] + v[0], u[1] + v[1], u[2] + v[2]]);
            } else if d > ORTHO_EPS {
                reducer.offer([u[0] - v[0], u[1] - v[1], u[2] - v[2]]);
            }
        }

        // Signs (s1, s2) applied to a1 and a2 with a0 held positive; the
        // pairwise dot-product sum for that combination is
        // s1·d01 + s2·d02 + s1·s2·d12.
        for (s1, s2) in [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)] {
            let sum = s1 * d01 + s2 * d02 + s1 * s2 * d12;
            if sum < -ORTHO_EPS {
                reducer.offer([
                    a0[0] + s1 * a1[0] + s2 * a2[0],
                    a0[1] + s1 * a1[1] + s2 * a2[1],
                    a0[2] + s1 * a1[2] + s2 * a2[2],
                ]);
            }
        }

        reducer
    }

    /// Number of transform vectors in the reduction basis.
    #[inline]
    pub fn transform_count(&self) -> usize {
        self.transforms.len()
    }

    /// Appends a vector and caches its squared norm, without testing.
    fn accept(&mut self, v: Vec3) {
        self.norms_sq.push(dot(v, v));
        self.transforms.push(v);
    }

    /// Half-vector redundancy test: a candidate whose half-vector
    /// projects more than `1 - HALF_TOL` of an accepted vector onto that
    /// vector is a near-duplicate image and is discarded.
    fn offer(&mut self, v: Vec3) {
        let half = [0.5 * v[0], 0.5 * v[1], 0.5 * v[2]];
        for (u, &u_sq) in self.transforms.iter().zip(self.norms_sq.iter()) {
            if dot(half, *u).abs() / u_sq > 1.0 - HALF_TOL {
                return;
            }
        }
        self.accept(v);
    }

    /// Reduces a displacement vector to its shortest periodic image.
    ///
    /// Pure: the input is taken by value and the reduced vector is
    /// returned. Internally the transform-vector set is swept repeatedly;
    /// a pass subtracts `round(proj)` multiples of every vector whose
    /// normalized projection exceeds the half-cell threshold, and the
    /// sweep stops at the first pass that makes no correction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReductionStalled`] if no fixed point is reached
    /// within `4 ×` the transform-vector count passes, which indicates a
    /// degenerate cell basis.
    pub fn reduce(&self, mut dr: Vec3) -> Result<Vec3, Error> {
        let max_passes = 4 * self.transforms.len();
        for _ in 0..max_passes {
            if !self.reduce_once(&mut dr) {
                return Ok(dr);
            }
        }
        Err(Error::ReductionStalled { passes: max_passes })
    }

    /// One full sweep over the transform vectors. Returns `true` if any
    /// correction was applied.
    fn reduce_once(&self, dr: &mut Vec3) -> bool {
        let mut corrected = false;
        for (t, &t_sq) in self.transforms.iter().zip(self.norms_sq.iter()) {
            let proj = dot(*t, *dr) / t_sq;
            if proj.abs() > HALF_TOL {
                let shift = proj.round();
                dr[0] -= shift * t[0];
                dr[1] -= shift * t[1];
                dr[2] -= shift * t[2];
                corrected = true;
            }
        }
        corrected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::vec::norm;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    fn cubic(l: f64) -> Cell {
        Cell::new([[l, 0.0, 0.0], [0.0, l, 0.0], [0.0, 0.0, l]])
    }

    fn sheared() -> Cell {
        Cell::new([[10.0, 0.0, 0.0], [6.0, 10.0, 0.0], [0.0, 0.0, 10.0]])
    }

    #[test]
    fn orthogonal_cell_keeps_only_edge_vectors() {
        let reducer = LatticeReducer::new(&cubic(10.0));
        assert_eq!(reducer.transform_count(), 3);
    }

    #[test]
    fn sheared_cell_adds_pair_vector_and_rejects_redundant_triplets() {
        // a0·a1 = 60, so the pair difference a0 - a1 = [4, -10, 0] joins
        // the basis. Both triplet candidates [4, -10, ±10] project
        // exactly half of a2 onto it and are rejected as redundant.
        let reducer = LatticeReducer::new(&sheared());
        assert_eq!(reducer.transform_count(), 4);
        assert_eq!(reducer.transforms[3], [4.0, -10.0, 0.0]);
    }

    #[test]
    fn cubic_reduction_matches_componentwise_rounding() {
        let l = 10.0;
        let reducer = LatticeReducer::new(&cubic(l));
        let samples = [
            [0.0, 0.0, 0.0],
            [4.9, -4.9, 2.0],
            [5.1, 0.0, 0.0],
            [-5.1, 10.0, -15.1],
            [23.4, -17.8, 9.9],
            [250.0, -250.0, 125.5],
        ];
        for dr in samples {
            let reduced = reducer.reduce(dr).unwrap();
            for k in 0..3 {
                let expected = dr[k] - l * (dr[k] / l).round();
                assert!(
                    approx_eq(reduced[k], expected, 1e-9),
                    "component {k} of {dr:?}: got {}, expected {expected}",
                    reduced[k]
                );
            }
        }
    }

    #[test]
    fn reduction_is_idempotent() {
        let reducer = LatticeReducer::new(&sheared());
        let samples = [
            [1.0, 2.0, 3.0],
            [12.0, -7.5, 4.9],
            [-8.8, 19.2, -31.0],
            [5.0, 5.0, 5.0],
        ];
        for dr in samples {
            let once = reducer.reduce(dr).unwrap();
            let twice = reducer.reduce(once).unwrap();
            assert_eq!(once, twice, "reduce({dr:?}) is not a fixed point");
        }
    }

    #[test]
    fn reduction_is_translation_invariant() {
        let cell = sheared();
        let reducer = LatticeReducer::new(&cell);
        let [a0, a1, a2] = *cell.rows();
        let dr = [1.3, -2.1, 0.7];
        let base = reducer.reduce(dr).unwrap();
        for (n0, n1, n2) in [(1.0, 0.0, 0.0), (-2.0, 1.0, 0.0), (3.0, -1.0, 2.0)] {
            let shifted = [
                dr[0] + n0 * a0[0] + n1 * a1[0] + n2 * a2[0],
                dr[1] + n0 * a0[1] + n1 * a1[1] + n2 * a2[1],
                dr[2] + n0 * a0[2] + n1 * a1[2] + n2 * a2[2],
            ];
            let reduced = reducer.reduce(shifted).unwrap();
            for k in 0..3 {
                assert!(
                    approx_eq(reduced[k], base[k], 1e-9),
                    "lattice shift ({n0},{n1},{n2}) changed the image: {reduced:?} vs {base:?}"
                );
            }
        }
    }

    #[test]
    fn sheared_cell_beats_naive_per_axis_wrapping() {
        // [6.1, 10, 0] is one a1 plus a small x offset; per-axis
        // wrapping against the edge lengths would leave a long vector.
        let reducer = LatticeReducer::new(&sheared());
        let reduced = reducer.reduce([6.1, 10.0, 0.0]).unwrap();
        assert!(approx_eq(reduced[0], 0.1, 1e-9));
        assert!(approx_eq(reduced[1], 0.0, 1e-9));
        assert!(approx_eq(reduced[2], 0.0, 1e-9));
    }

    #[test]
    fn reduced_vector_never_longer_than_input() {
        let reducer = LatticeReducer::new(&sheared());
        let samples = [
            [9.0, 9.0, 9.0],
            [-14.0, 3.0, 22.0],
            [7.3, -7.3, 0.0],
            [100.0, 100.0, -100.0],
        ];
        for dr in samples {
            let reduced = reducer.reduce(dr).unwrap();
            assert!(
                norm(reduced) <= norm(dr) + 1e-12,
                "reduction lengthened {dr:?} to {reduced:?}"
            );
        }
    }

    #[test]
    fn half_boundary_is_left_alone() {
        // proj = 0.5 exactly, which does not exceed HALF_TOL.
        let reducer = LatticeReducer::new(&cubic(10.0));
        let reduced = reducer.reduce([5.0, 0.0, 0.0]).unwrap();
        assert_eq!(reduced, [5.0, 0.0, 0.0]);
    }

    #[test]
    fn stalled_reduction_reports_pass_cap() {
        // A poisoned basis whose cached norm is far smaller than the
        // actual vector makes every correction overshoot and diverge.
        let reducer = LatticeReducer {
            transforms: vec![[1.0, 0.0, 0.0]],
            norms_sq: vec![0.01],
        };
        let err = reducer.reduce([0.1, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, Error::ReductionStalled { passes: 4 }));
    }
}
