//! Periodic simulation cell geometry.

use super::vec::{dot, Vec3};

/// Coordinate convention for stored atomic positions.
///
/// VASP writes fractional (direct) coordinates into `vasprun.xml` and
/// Cartesian Ångströms into the OUTCAR force blocks; a [`Trajectory`]
/// carries this tag so consumers know whether a conversion is needed.
///
/// [`Trajectory`]: super::trajectory::Trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinates {
    /// Fractional coordinates relative to the cell row vectors.
    Direct,
    /// Cartesian coordinates in Ångströms.
    Cartesian,
}

/// Periodic simulation box defined by three row vectors in Ångströms.
///
/// The cell may be non-orthogonal (triclinic). It is immutable once
/// constructed and assumed time-invariant over a trajectory; constant
/// NpT runs where the box fluctuates are not supported.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    rows: [Vec3; 3],
}

impl Cell {
    /// Creates a cell from three lattice row vectors.
    pub fn new(rows: [Vec3; 3]) -> Self {
        Self { rows }
    }

    /// The three lattice row vectors.
    #[inline]
    pub fn rows(&self) -> &[Vec3; 3] {
        &self.rows
    }

    /// Cell volume in Å³ (absolute value of the scalar triple product).
    pub fn volume(&self) -> f64 {
        let [a, b, c] = self.rows;
        let bxc = [
            b[1] * c[2] - b[2] * c[1],
            b[2] * c[0] - b[0] * c[2],
            b[0] * c[1] - b[1] * c[0],
        ];
        dot(a, bxc).abs()
    }

    /// Converts fractional (direct) coordinates to Cartesian Ångströms.
    ///
    /// Row-vector convention: `r = x₀·a₀ + x₁·a₁ + x₂·a₂` where `aᵢ` are
    /// the cell rows.
    pub fn direct_to_cart(&self, x: Vec3) -> Vec3 {
        let [a, b, c] = self.rows;
        [
            x[0] * a[0] + x[1] * b[0] + x[2] * c[0],
            x[0] * a[1] + x[1] * b[1] + x[2] * c[1],
            x[0] * a[2] + x[1] * b[2] + x[2] * c[2],
        ]
    }
}
