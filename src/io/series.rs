//! Plain-text time series of the per-step estimator output.
//!
//! Two files per run, one for energies and one for pressures. Each row
//! holds the simulation time in fs and the conventional and HMA values
//! for that step, in fixed columns so the files feed straight into
//! gnuplot or numpy.loadtxt.

use std::io::Write;

use crate::hma::StepResult;
use crate::io::error::Error;

/// Default file name for the anharmonic-energy series.
pub const ENERGY_SERIES_FILE: &str = "e_anharmonic.dat";

/// Default file name for the anharmonic-pressure series.
pub const PRESSURE_SERIES_FILE: &str = "p_anharmonic.dat";

/// Writes the anharmonic-energy time series.
///
/// Rows are `time_fs  e_ah_conv  e_ah_hma` with time running as
/// `step · timestep`.
pub fn write_energy_series<W: Write>(
    writer: W,
    timestep: f64,
    results: &[StepResult],
) -> Result<(), Error> {
    write_series(writer, timestep, results, |r| (r.e_ah_conv, r.e_ah_hma))
}

/// Writes the anharmonic-pressure time series.
///
/// Rows are `time_fs  p_ah_conv  p_ah_hma` with time running as
/// `step · timestep`.
pub fn write_pressure_series<W: Write>(
    writer: W,
    timestep: f64,
    results: &[StepResult],
) -> Result<(), Error> {
    write_series(writer, timestep, results, |r| (r.p_ah_conv, r.p_ah_hma))
}

fn write_series<W: Write>(
    mut writer: W,
    timestep: f64,
    results: &[StepResult],
    fields: impl Fn(&StepResult) -> (f64, f64),
) -> Result<(), Error> {
    for (step, result) in results.iter().enumerate() {
        let (conv, hma) = fields(result);
        writeln!(
            writer,
            "{:10.1}  {:10.5}  {:10.5}",
            step as f64 * timestep,
            conv,
            hma
        )?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_results() -> Vec<StepResult> {
        vec![
            StepResult {
                e_ah_conv: -0.01293,
                e_ah_hma: 0.00071,
                p_ah_conv: 0.031,
                p_ah_hma: 0.0285,
            },
            StepResult {
                e_ah_conv: 0.00411,
                e_ah_hma: 0.00069,
                p_ah_conv: -0.012,
                p_ah_hma: 0.0291,
            },
        ]
    }

    #[test]
    fn energy_rows_use_fixed_columns() {
        let mut out = Vec::new();
        write_energy_series(&mut out, 2.0, &make_results()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "       0.0    -0.01293     0.00071");
        assert_eq!(lines[1], "       2.0     0.00411     0.00069");
    }

    #[test]
    fn pressure_rows_pick_pressure_fields() {
        let mut out = Vec::new();
        write_pressure_series(&mut out, 0.5, &make_results()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().next().unwrap().contains("0.03100"));
        assert!(text.contains("0.02910"));
    }

    #[test]
    fn empty_series_writes_nothing() {
        let mut out = Vec::new();
        write_energy_series(&mut out, 2.0, &[]).unwrap();
        assert!(out.is_empty());
    }
}
