//! A pure Rust post-processor for NVT ab initio molecular dynamics output that
//! computes anharmonic contributions to energy and pressure. It implements both
//! the conventional estimator and harmonically mapped averaging (HMA), which
//! measures fluctuations against the minimized lattice and converges orders of
//! magnitude faster for crystalline systems.
//!
//! # Features
//!
//! - **Two estimators** — conventional subtraction of the harmonic baseline and
//!   HMA force-displacement mapping, computed side by side for every step
//! - **Trajectory sources** — streamed `vasprun.xml`, OUTCAR logs, and a compact
//!   raw-file format for repeated analysis of the same run
//! - **Minimum-image reduction** — transform-vector scheme that stays exact for
//!   arbitrary triclinic cells
//! - **Block statistics** — averages, standard errors, and lag-1 correlations
//!   over production blocks, with the equilibration window cut away
//!
//! # Quick Start
//!
//! The pipeline has two stages: [`AnharmonicEstimator`] turns a [`Trajectory`]
//! into per-step [`StepResult`]s, and [`summarize`] reduces those to block
//! statistics:
//!
//! ```
//! use hma_post::{
//!     AnharmonicEstimator, Cell, Coordinates, EstimatorOptions, Trajectory, summarize,
//! };
//!
//! // Three recorded steps of a two-atom cubic crystal at 100 K. The first
//! // step is the minimized lattice itself.
//! let trajectory = Trajectory {
//!     cell: Cell::new([[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]]),
//!     num_atoms: 2,
//!     timestep: 2.0,
//!     temperature: 100.0,
//!     volume_atom: 500.0,
//!     basis: vec![[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]],
//!     position: vec![
//!         vec![[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]],
//!         vec![[0.0, 0.0, 0.0], [0.502, 0.5, 0.5]],
//!         vec![[0.0, 0.0, 0.0], [0.498, 0.5, 0.5]],
//!     ],
//!     force: vec![
//!         vec![[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
//!         vec![[0.04, 0.0, 0.0], [-0.04, 0.0, 0.0]],
//!         vec![[-0.04, 0.0, 0.0], [0.04, 0.0, 0.0]],
//!     ],
//!     energy: vec![-3.6, -3.5991, -3.5993],
//!     pressure_vir: vec![1.2, 1.23, 1.21],
//!     coordinates: Coordinates::Direct,
//! };
//!
//! let estimator = AnharmonicEstimator::new(trajectory, EstimatorOptions::default())?;
//! let results = estimator.process(None)?;
//! assert_eq!(results.len(), 3);
//!
//! // The lattice step maps onto itself, so its HMA anharmonic energy is zero.
//! assert_eq!(results[0].e_ah_hma, 0.0);
//!
//! // Discard the lattice step as equilibration, then average the rest in
//! // blocks of one step each.
//! let summary = summarize(&results, 1, 1)?;
//! assert_eq!(summary.production_steps, 2);
//! assert_eq!(summary.blocks, 2);
//! assert!((summary.e_ah_hma.avg - 6.0e-4).abs() < 1e-10);
//! # Ok::<(), hma_post::EstimatorError>(())
//! ```
//!
//! # Module Organization
//!
//! - [`io`] — Trajectory readers (vasprun.xml, OUTCAR, raw files) and writers
//!   (raw files, per-step time series)
//! - [`AnharmonicEstimator`] — Per-step conventional and HMA estimates
//! - [`summarize`] — Block averages, errors, and correlations
//!
//! # Data Types
//!
//! ## Input Structures
//!
//! - [`Trajectory`] — Complete NVT run: cell, reference configuration, and the
//!   per-step positions, forces, energies, and virial pressures
//! - [`Cell`] — Simulation cell as three row vectors
//! - [`Coordinates`] — Whether positions are direct (fractional) or Cartesian
//! - [`Vec3`] — Plain `[f64; 3]` used throughout
//!
//! ## Output Structures
//!
//! - [`StepResult`] — Conventional and HMA anharmonic energy and pressure of
//!   one step
//! - [`Summary`] — Block statistics of all four observables
//! - [`Stats`] — Average, standard error, and lag-1 correlation of one
//!   observable
//!
//! ## Configuration
//!
//! - [`EstimatorOptions`] — Harmonic pressure, output unit, force tolerance
//! - [`EnergyUnit`] — eV or meV per atom
//! - [`LatticeReducer`] — Minimum-image reduction, reusable on its own

mod constants;
mod hma;
mod model;

pub mod io;

pub use model::cell::{Cell, Coordinates};
pub use model::trajectory::Trajectory;
pub use model::vec::Vec3;

pub use hma::{
    AnharmonicEstimator, EnergyUnit, EstimatorOptions, LatticeReducer, Stats, StepResult, Summary,
    summarize,
};

pub use hma::Error as EstimatorError;
