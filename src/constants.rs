//! Physical constants shared across the crate.
//!
//! Every estimator formula and unit conversion pulls from this module so
//! that the numeric values appear in exactly one place. The values must
//! not be rounded or reformatted: downstream results are compared against
//! reference data at full double precision.

/// Boltzmann constant in eV/K.
pub const KB_EV: f64 = 8.61733063733830e-5;

/// One electronvolt in Joules (exact since the 2019 SI redefinition).
pub const EV_TO_JOULE: f64 = 1.602176634e-19;

/// One cubic Ångström in cubic metres.
pub const A3_TO_M3: f64 = 1.0e-30;

/// One Pascal in Gigapascals.
pub const PA_TO_GPA: f64 = 1.0e-9;
