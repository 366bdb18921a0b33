//! Reading and writing of trajectory data.
//!
//! Two VASP sources are supported: the structured `vasprun.xml` output
//! ([`vasprun`]) and the free-text OUTCAR log ([`outcar`]). Either can be
//! split across several files from consecutive restart runs; the readers
//! concatenate them in the order given. The [`raw`] module round-trips a
//! parsed trajectory through four flat intermediate files so repeated
//! analyses can skip the VASP output entirely, and [`series`] writes the
//! per-step estimator results as plain-text time series.

use std::fmt;

use crate::model::cell::{Cell, Coordinates};
use crate::model::trajectory::Trajectory;
use crate::model::vec::Vec3;

pub mod outcar;
pub mod raw;
pub mod series;
pub mod vasprun;

mod error;

pub use error::Error;

/// Supported trajectory input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// VASP `vasprun.xml` structured output.
    Vasprun,
    /// VASP OUTCAR free-text log.
    Outcar,
    /// Flat intermediate files written by [`raw::write_raw`].
    Raw,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Vasprun => write!(f, "vasprun.xml"),
            Format::Outcar => write!(f, "OUTCAR"),
            Format::Raw => write!(f, "raw"),
        }
    }
}

/// Everything one input file contributes toward a [`Trajectory`].
///
/// Geometry fields are optional because restart files repeat them and a
/// damaged file may lack them; [`assemble`] enforces presence across the
/// whole file list.
#[derive(Debug, Default)]
pub(crate) struct FilePayload {
    pub timestep: Option<f64>,
    pub temperature: Option<f64>,
    pub num_atoms: Option<usize>,
    pub volume: Option<f64>,
    pub cell: Option<[Vec3; 3]>,
    pub basis: Option<Vec<Vec3>>,
    pub steps: Vec<StepRecord>,
}

/// One complete recorded MD step.
#[derive(Debug)]
pub(crate) struct StepRecord {
    pub position: Vec<Vec3>,
    pub force: Vec<Vec3>,
    pub energy: f64,
    pub pressure_vir: f64,
}

/// Merges per-file payloads into one trajectory.
///
/// Geometry (atom count, cell, volume, basis) comes from the first file
/// that provides it; `POTIM`/`TEBEG` take the last value seen, matching
/// how VASP restarts override control parameters; steps are concatenated
/// in file order.
pub(crate) fn assemble(
    files: Vec<FilePayload>,
    coordinates: Coordinates,
    format: Format,
) -> Result<Trajectory, Error> {
    let mut timestep = None;
    let mut temperature = None;
    let mut num_atoms = None;
    let mut volume = None;
    let mut cell = None;
    let mut basis = None;
    let mut steps = Vec::new();

    for file in files {
        num_atoms = num_atoms.or(file.num_atoms);
        volume = volume.or(file.volume);
        cell = cell.or(file.cell);
        basis = basis.or(file.basis);
        timestep = file.timestep.or(timestep);
        temperature = file.temperature.or(temperature);
        steps.extend(file.steps);
    }

    let num_atoms =
        num_atoms.ok_or_else(|| Error::missing(format, "atom count never appeared"))?;
    if num_atoms == 0 {
        return Err(Error::invalid(format, "atom count is zero"));
    }
    let volume = volume.ok_or_else(|| Error::missing(format, "cell volume never appeared"))?;
    let cell = Cell::new(
        cell.ok_or_else(|| Error::missing(format, "lattice vectors never appeared"))?,
    );
    let basis =
        basis.ok_or_else(|| Error::missing(format, "reference positions never appeared"))?;
    let timestep = timestep.ok_or_else(|| {
        Error::missing(format, "POTIM (MD timestep) never appeared")
    })?;
    let temperature = temperature.ok_or_else(|| {
        Error::missing(format, "TEBEG (set temperature) never appeared")
    })?;

    let mut trajectory = Trajectory {
        cell,
        num_atoms,
        timestep,
        temperature,
        volume_atom: volume / num_atoms as f64,
        basis,
        position: Vec::with_capacity(steps.len()),
        force: Vec::with_capacity(steps.len()),
        energy: Vec::with_capacity(steps.len()),
        pressure_vir: Vec::with_capacity(steps.len()),
        coordinates,
    };
    for step in steps {
        trajectory.position.push(step.position);
        trajectory.force.push(step.force);
        trajectory.energy.push(step.energy);
        trajectory.pressure_vir.push(step.pressure_vir);
    }
    Ok(trajectory)
}
