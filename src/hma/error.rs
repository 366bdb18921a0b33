//! Error types for anharmonic property estimation.
//!
//! This module defines the error type used throughout the hma module.
//! Errors are categorized by pipeline stage: trajectory preconditions,
//! step-range selection, block statistics, and minimum-image reduction.

use thiserror::Error;

/// Errors that can occur during anharmonic property estimation.
///
/// This enum covers all failure modes of the estimation pipeline, from
/// constructing an [`AnharmonicEstimator`](super::AnharmonicEstimator)
/// through [`summarize`](super::summarize). Every variant carries the
/// offending parameters so callers can report or recover; none of them
/// panics or produces partial results.
#[derive(Debug, Error)]
pub enum Error {
    /// The step-0 reference configuration is not force-minimized.
    ///
    /// Both estimators measure fluctuations about the lattice minimum; a
    /// residual force on any atom invalidates every downstream quantity,
    /// so the run aborts before any step is processed.
    #[error(
        "reference configuration is not an energy minimum: atom {atom} carries a force of {magnitude:.6} eV/Å (tolerance {tolerance:.6})"
    )]
    LatticeNotMinimized {
        /// Index of the first offending atom.
        atom: usize,
        /// Force magnitude on that atom in eV/Å.
        magnitude: f64,
        /// Tolerance the magnitude was checked against.
        tolerance: f64,
    },

    /// A requested step window does not fit the recorded data.
    ///
    /// Raised when more steps are requested than the trajectory records,
    /// or when the equilibration cut leaves no production samples.
    /// Over-requests are rejected rather than silently clamped.
    #[error("invalid step range: requested {requested} step(s) with {available} recorded")]
    InvalidStepRange {
        /// The requested step count (or equilibration cut).
        requested: usize,
        /// Number of steps actually available.
        available: usize,
    },

    /// Fewer than two full blocks remain after the equilibration cut.
    ///
    /// Block-standard-error estimation divides by `n_blocks - 1`; with
    /// fewer than two blocks the variance is undefined, so the request
    /// is rejected instead of returning NaN.
    #[error(
        "insufficient data for block statistics: {blocks} full block(s) of {blocksize} step(s); at least 2 are required"
    )]
    InsufficientBlocks {
        /// Number of full blocks available.
        blocks: usize,
        /// Requested block size in steps.
        blocksize: usize,
    },

    /// Step-indexed arrays disagree in shape.
    #[error("malformed trajectory: {details}")]
    MalformedTrajectory {
        /// Description of the shape mismatch.
        details: String,
    },

    /// Minimum-image reduction failed to reach a fixed point.
    ///
    /// With a well-formed cell the sweep converges in a handful of
    /// passes; hitting the pass cap indicates a degenerate or
    /// near-singular lattice basis.
    #[error(
        "minimum-image reduction did not converge within {passes} passes; the cell basis may be degenerate"
    )]
    ReductionStalled {
        /// Number of sweep passes attempted.
        passes: usize,
    },
}

impl Error {
    /// Creates a [`MalformedTrajectory`](Error::MalformedTrajectory) error.
    pub(crate) fn malformed(details: impl Into<String>) -> Self {
        Self::MalformedTrajectory {
            details: details.into(),
        }
    }
}
