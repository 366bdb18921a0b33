//! Conventional and harmonically-mapped anharmonic estimators.
//!
//! Both estimators measure how far a crystal's energy and pressure
//! deviate from the harmonic reference defined by the step-0 lattice
//! configuration. The conventional (Conv) route subtracts the analytic
//! harmonic-oscillator contribution directly; the HMA route replaces part
//! of the raw fluctuation with a force-displacement correlation against
//! the lattice basis, which is the method's variance-reduction trick.

use crate::constants::{EV_TO_JOULE, KB_EV};
use crate::hma::error::Error;
use crate::hma::image::LatticeReducer;
use crate::model::cell::Coordinates;
use crate::model::trajectory::Trajectory;
use crate::model::vec::{dot, norm, sub, Vec3};

/// Unit in which anharmonic energies are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnergyUnit {
    /// Electronvolts per atom.
    #[default]
    Ev,
    /// Millielectronvolts per atom.
    Mev,
}

impl EnergyUnit {
    /// Multiplicative factor applied to energies stored in eV.
    #[inline]
    pub fn scale(self) -> f64 {
        match self {
            EnergyUnit::Ev => 1.0,
            EnergyUnit::Mev => 1.0e3,
        }
    }

    /// Short unit label for reports.
    pub fn label(self) -> &'static str {
        match self {
            EnergyUnit::Ev => "eV",
            EnergyUnit::Mev => "meV",
        }
    }
}

/// Tunable parameters for [`AnharmonicEstimator`].
#[derive(Debug, Clone)]
pub struct EstimatorOptions {
    /// Quasiharmonic pressure in GPa, supplied by a separate normal-mode
    /// calculation; centers the HMA pressure estimator.
    pub pressure_qh: f64,
    /// Unit for reported energies.
    pub energy_unit: EnergyUnit,
    /// Maximum allowed per-atom force magnitude (eV/Å) in the step-0
    /// reference configuration.
    pub force_tol: f64,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            pressure_qh: 0.0,
            energy_unit: EnergyUnit::Ev,
            force_tol: 1.0e-3,
        }
    }
}

/// Output of the two estimators for one MD step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    /// Conventional anharmonic energy per atom.
    pub e_ah_conv: f64,
    /// HMA anharmonic energy per atom.
    pub e_ah_hma: f64,
    /// Conventional anharmonic pressure in GPa.
    pub p_ah_conv: f64,
    /// HMA anharmonic pressure in GPa.
    pub p_ah_hma: f64,
}

/// Per-step evaluator of the Conv and HMA anharmonic estimators.
///
/// Construction validates the trajectory shape and the step-0 force
/// precondition, builds the minimum-image reducer for the cell, and
/// converts the lattice basis to Cartesian once. After that,
/// [`process`](Self::process) performs a single pass over the recorded
/// steps.
#[derive(Debug)]
pub struct AnharmonicEstimator {
    trajectory: Trajectory,
    options: EstimatorOptions,
    reducer: LatticeReducer,
    basis_cart: Vec<Vec3>,
}

impl AnharmonicEstimator {
    /// Creates an estimator over a trajectory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedTrajectory`] if the step-indexed arrays
    /// disagree in shape, and [`Error::LatticeNotMinimized`] if any atom
    /// of the step-0 configuration carries a force magnitude above
    /// `options.force_tol`.
    pub fn new(trajectory: Trajectory, options: EstimatorOptions) -> Result<Self, Error> {
        validate_shape(&trajectory)?;
        check_minimized(&trajectory.force[0], options.force_tol)?;

        let reducer = LatticeReducer::new(&trajectory.cell);
        let basis_cart = match trajectory.coordinates {
            Coordinates::Direct => trajectory
                .basis
                .iter()
                .map(|&x| trajectory.cell.direct_to_cart(x))
                .collect(),
            Coordinates::Cartesian => trajectory.basis.clone(),
        };

        Ok(Self {
            trajectory,
            options,
            reducer,
            basis_cart,
        })
    }

    /// The trajectory this estimator was built over.
    #[inline]
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// The options this estimator was built with.
    #[inline]
    pub fn options(&self) -> &EstimatorOptions {
        &self.options
    }

    /// Lattice potential energy `energy[0]` in eV/atom.
    #[inline]
    pub fn lattice_energy(&self) -> f64 {
        self.trajectory.energy[0]
    }

    /// Lattice virial pressure `pressure_vir[0]` in GPa.
    #[inline]
    pub fn lattice_pressure(&self) -> f64 {
        self.trajectory.pressure_vir[0]
    }

    /// Harmonic-oscillator reference energy `1.5·kB·T·(N-1)/N` in eV/atom.
    pub fn harmonic_energy(&self) -> f64 {
        let n = self.trajectory.num_atoms as f64;
        1.5 * KB_EV * self.trajectory.temperature * (n - 1.0) / n
    }

    /// Evaluates both estimators for steps `0..steps_tot`.
    ///
    /// `steps_tot` defaults to the full recorded range. Step 0 is the
    /// lattice reference and is processed like any other step (its Conv
    /// energy comes out at the negated harmonic reference, its HMA
    /// energy at zero), so the output series aligns index-for-index
    /// with the trajectory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStepRange`] if `steps_tot` exceeds the
    /// recorded step count, and [`Error::ReductionStalled`] if the
    /// minimum-image sweep fails to converge for some displacement.
    pub fn process(&self, steps_tot: Option<usize>) -> Result<Vec<StepResult>, Error> {
        let available = self.trajectory.steps();
        let steps_tot = steps_tot.unwrap_or(available);
        if steps_tot > available {
            return Err(Error::InvalidStepRange {
                requested: steps_tot,
                available,
            });
        }

        let traj = &self.trajectory;
        let n = traj.num_atoms as f64;
        let kt_joule = KB_EV * traj.temperature * EV_TO_JOULE;
        let pressure_ig = traj.pressure_ig();
        let energy_lat = traj.energy[0];
        let pressure_lat = traj.pressure_vir[0];
        let e_harm = self.harmonic_energy();
        // Couples the force·displacement sum (eV) to a pressure
        // correction (GPa per Joule).
        let f_v = (self.options.pressure_qh - pressure_ig) / (3.0 * (n - 1.0) * kt_joule);
        let fac = self.options.energy_unit.scale();

        let mut out = Vec::with_capacity(steps_tot);
        for step in 0..steps_tot {
            let fdr = self.force_displacement_sum(step)?;

            out.push(StepResult {
                e_ah_conv: fac * (traj.energy[step] - energy_lat - e_harm),
                e_ah_hma: fac * (traj.energy[step] + 0.5 * fdr / n - energy_lat),
                p_ah_conv: traj.pressure_vir[step] + pressure_ig
                    - pressure_lat
                    - self.options.pressure_qh,
                p_ah_hma: traj.pressure_vir[step] + f_v * fdr * EV_TO_JOULE - pressure_lat,
            });
        }
        Ok(out)
    }

    /// Sum of force · minimum-image displacement over all atoms for one
    /// step, measured against the lattice basis. Atom 0's displacement is
    /// the rigid-drift reference subtracted from every atom, so atom 0
    /// itself contributes zero and the loop starts at 1.
    fn force_displacement_sum(&self, step: usize) -> Result<f64, Error> {
        let positions = &self.trajectory.position[step];
        let forces = &self.trajectory.force[step];

        let drift = sub(self.to_cart(positions[0]), self.basis_cart[0]);

        let mut fdr = 0.0;
        for atom in 1..self.trajectory.num_atoms {
            let dr = sub(sub(self.to_cart(positions[atom]), self.basis_cart[atom]), drift);
            let dr = self.reducer.reduce(dr)?;
            fdr += dot(forces[atom], dr);
        }
        Ok(fdr)
    }

    #[inline]
    fn to_cart(&self, x: Vec3) -> Vec3 {
        match self.trajectory.coordinates {
            Coordinates::Direct => self.trajectory.cell.direct_to_cart(x),
            Coordinates::Cartesian => x,
        }
    }
}

fn validate_shape(traj: &Trajectory) -> Result<(), Error> {
    let n = traj.num_atoms;
    if n < 2 {
        return Err(Error::malformed(format!(
            "at least two atoms are required, got {n}"
        )));
    }
    if traj.basis.len() != n {
        return Err(Error::malformed(format!(
            "basis has {} entries for {} atoms",
            traj.basis.len(),
            n
        )));
    }

    let steps = traj.energy.len();
    if steps == 0 {
        return Err(Error::malformed("trajectory records no steps"));
    }
    if traj.position.len() != steps || traj.force.len() != steps || traj.pressure_vir.len() != steps
    {
        return Err(Error::malformed(format!(
            "step series disagree in length: {} positions, {} forces, {} energies, {} pressures",
            traj.position.len(),
            traj.force.len(),
            steps,
            traj.pressure_vir.len()
        )));
    }
    for (step, (pos, force)) in traj.position.iter().zip(traj.force.iter()).enumerate() {
        if pos.len() != n || force.len() != n {
            return Err(Error::malformed(format!(
                "step {step} has {} positions and {} forces for {} atoms",
                pos.len(),
                force.len(),
                n
            )));
        }
    }
    Ok(())
}

fn check_minimized(reference_forces: &[Vec3], tolerance: f64) -> Result<(), Error> {
    for (atom, &f) in reference_forces.iter().enumerate() {
        let magnitude = norm(f);
        if magnitude > tolerance {
            return Err(Error::LatticeNotMinimized {
                atom,
                magnitude,
                tolerance,
            });
        }
    }
    Ok(())
}
