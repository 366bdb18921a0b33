//! In-memory trajectory record consumed by the estimators.

use crate::constants::{A3_TO_M3, EV_TO_JOULE, KB_EV, PA_TO_GPA};

use super::cell::{Cell, Coordinates};
use super::vec::Vec3;

/// One simulation's worth of MD data.
///
/// Step 0 is, by convention, the relaxed lattice reference configuration;
/// every anharmonic quantity is measured against it. Fields are plain
/// data: shape checks and the step-0 force precondition are enforced when
/// an [`AnharmonicEstimator`](crate::AnharmonicEstimator) is constructed,
/// so a `Trajectory` can be assembled incrementally by readers.
#[derive(Debug, Clone)]
pub struct Trajectory {
    /// Periodic simulation cell in Å, time-invariant.
    pub cell: Cell,
    /// Number of atoms `N`.
    pub num_atoms: usize,
    /// MD timestep in femtoseconds.
    pub timestep: f64,
    /// Set (thermostat) temperature in Kelvin.
    pub temperature: f64,
    /// Volume per atom in Å³.
    pub volume_atom: f64,
    /// Reference positions of the minimized lattice, one per atom.
    pub basis: Vec<Vec3>,
    /// Per-step atomic positions, indexed `position[step][atom]`.
    pub position: Vec<Vec<Vec3>>,
    /// Per-step atomic forces in eV/Å, indexed like `position`.
    pub force: Vec<Vec<Vec3>>,
    /// Per-step potential energy in eV/atom.
    pub energy: Vec<f64>,
    /// Per-step virial pressure in GPa (no ideal-gas contribution).
    pub pressure_vir: Vec<f64>,
    /// Whether `basis` and `position` are fractional or Cartesian.
    pub coordinates: Coordinates,
}

impl Trajectory {
    /// Number of recorded MD steps.
    #[inline]
    pub fn steps(&self) -> usize {
        self.energy.len()
    }

    /// Ideal-gas pressure `kB·T / v` in GPa, with `v` the per-atom volume.
    pub fn pressure_ig(&self) -> f64 {
        KB_EV * self.temperature * EV_TO_JOULE / (self.volume_atom * A3_TO_M3) * PA_TO_GPA
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_trajectory() -> Trajectory {
        let cell = Cell::new([[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]]);
        Trajectory {
            cell,
            num_atoms: 2,
            timestep: 2.0,
            temperature: 100.0,
            volume_atom: 500.0,
            basis: vec![[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]],
            position: vec![vec![[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]]],
            force: vec![vec![[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]]],
            energy: vec![-3.0],
            pressure_vir: vec![1.0],
            coordinates: Coordinates::Direct,
        }
    }

    #[test]
    fn step_count_follows_energy_series() {
        let mut traj = make_trajectory();
        assert_eq!(traj.steps(), 1);
        traj.energy.push(-2.9);
        assert_eq!(traj.steps(), 2);
    }

    #[test]
    fn ideal_gas_pressure() {
        let traj = make_trajectory();
        // kB·T·eV→J / (500 Å³ · 1e-30 m³/Å³) · 1e-9 GPa/Pa
        let expected = 8.61733063733830e-5 * 100.0 * 1.602176634e-19 / (500.0 * 1.0e-30) * 1.0e-9;
        assert_eq!(traj.pressure_ig(), expected);
        // Order of magnitude: a few MPa at 100 K and 500 Å³/atom.
        assert!(traj.pressure_ig() > 1e-3 && traj.pressure_ig() < 1e-2);
    }
}
