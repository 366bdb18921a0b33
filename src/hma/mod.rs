//! Anharmonic property estimation pipeline.
//!
//! The pipeline runs in two stages over a read-only
//! [`Trajectory`](crate::model::Trajectory):
//!
//! 1. [`AnharmonicEstimator::process`] evaluates the conventional and
//!    harmonically-mapped estimators for every recorded step, using
//!    [`LatticeReducer`] to fold per-atom displacements back into the
//!    minimum periodic image.
//! 2. [`summarize`] turns the per-step series into block-averaged
//!    ensemble statistics with uncertainties and a correlation
//!    diagnostic.

mod error;
mod estimator;
mod image;
mod stats;

pub use error::Error;
pub use estimator::{AnharmonicEstimator, EnergyUnit, EstimatorOptions, StepResult};
pub use image::LatticeReducer;
pub use stats::{summarize, Stats, Summary};
