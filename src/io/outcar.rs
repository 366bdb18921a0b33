//! OUTCAR reader.
//!
//! OUTCAR is a free-form log rather than a structured document, so the
//! reader scans for the handful of marker lines that carry trajectory
//! data. Header quantities (ion count, POTIM, TEBEG, cell volume,
//! lattice vectors, reference positions) are taken from their first
//! occurrence; per-step quantities accumulate in file order:
//!
//! - `TOTAL-FORCE` opens a block of `x y z fx fy fz` rows that runs to
//!   the `total drift:` line. Positions here are Cartesian.
//! - `energy(sigma->0)` carries the step's E0 as its last token.
//! - `external pressure` carries the virial pressure in kBar.
//!
//! A run killed mid-write leaves the last step partially recorded, so
//! the per-step series are truncated to the shortest complete one and
//! an unterminated force block is dropped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::io::{FilePayload, Format, StepRecord, assemble, error::Error};
use crate::model::{Coordinates, Trajectory, vec::Vec3};

/// Reads one or more OUTCAR files into a single trajectory.
///
/// Later files are treated as restart continuations: their steps are
/// appended in order, the reference configuration comes from the first
/// file that records one, and POTIM/TEBEG come from the last file that
/// records them.
///
/// # Errors
///
/// Returns an error if no files are given, a file cannot be read, a
/// marker line cannot be parsed, or a quantity the trajectory needs
/// never appears.
pub fn read_files<P: AsRef<Path>>(paths: &[P]) -> Result<Trajectory, Error> {
    if paths.is_empty() {
        return Err(Error::missing(Format::Outcar, "no input files given"));
    }
    let mut payloads = Vec::with_capacity(paths.len());
    for path in paths {
        payloads.push(parse_file(path.as_ref())?);
    }
    assemble(payloads, Coordinates::Cartesian, Format::Outcar)
}

fn parse_file(path: &Path) -> Result<FilePayload, Error> {
    parse_reader(BufReader::new(File::open(path)?))
}

fn parse_reader<R: BufRead>(reader: R) -> Result<FilePayload, Error> {
    let lines = collect_lines(reader)?;

    let mut payload = FilePayload::default();
    let mut blocks: Vec<(Vec<Vec3>, Vec<Vec3>)> = Vec::new();
    let mut energies: Vec<f64> = Vec::new();
    let mut pressures: Vec<f64> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let (ln, line) = &lines[i];

        if payload.num_atoms.is_none() && line.contains("NIONS =") {
            let count = last_token(line)
                .and_then(|token| token.parse::<usize>().ok())
                .ok_or_else(|| Error::parse(Format::Outcar, *ln, "invalid ion count"))?;
            payload.num_atoms = Some(count);
        } else if payload.timestep.is_none() && line.contains("POTIM") {
            payload.timestep = nth_token_f64(line, 2);
        } else if payload.temperature.is_none() && line.contains("TEBEG") {
            payload.temperature = line
                .split_whitespace()
                .nth(2)
                .and_then(|token| token.trim_end_matches(';').parse::<f64>().ok());
        } else if payload.volume.is_none() && line.contains("volume of cell :") {
            let volume = last_token(line)
                .and_then(|token| token.parse::<f64>().ok())
                .ok_or_else(|| Error::parse(Format::Outcar, *ln, "invalid cell volume"))?;
            payload.volume = Some(volume);
        } else if payload.cell.is_none() && line.contains("direct lattice vectors") {
            payload.cell = Some(parse_lattice_rows(&lines, i)?);
            i += 3;
        } else if payload.basis.is_none()
            && line.contains("position of ions in cartesian coordinates")
        {
            let (basis, next) = parse_position_rows(&lines, i + 1)?;
            payload.basis = Some(basis);
            i = next;
            continue;
        } else if line.contains("TOTAL-FORCE") {
            let (block, next) = parse_force_block(&lines, i + 1)?;
            if let Some(block) = block {
                blocks.push(block);
            }
            i = next;
            continue;
        } else if line.contains("energy(sigma->0)") {
            let energy = last_token(line)
                .and_then(|token| token.parse::<f64>().ok())
                .ok_or_else(|| Error::parse(Format::Outcar, *ln, "invalid step energy"))?;
            energies.push(energy);
        } else if line.contains("external pressure") {
            let kbar = nth_token_f64(line, 3)
                .ok_or_else(|| Error::parse(Format::Outcar, *ln, "invalid external pressure"))?;
            pressures.push(kbar / 10.0);
        }

        i += 1;
    }

    let steps = blocks.len().min(energies.len()).min(pressures.len());
    if steps > 0 {
        let num_atoms = payload
            .num_atoms
            .ok_or_else(|| Error::missing(Format::Outcar, "number of ions (NIONS)"))?;
        payload.steps.reserve(steps);
        for ((position, force), (energy, pressure_vir)) in blocks
            .drain(..steps)
            .zip(energies.iter().zip(&pressures).take(steps))
        {
            if position.len() != num_atoms {
                return Err(Error::invalid(
                    Format::Outcar,
                    format!(
                        "force block lists {} ions where {num_atoms} were declared",
                        position.len()
                    ),
                ));
            }
            payload.steps.push(StepRecord {
                position,
                force,
                energy: energy / num_atoms as f64,
                pressure_vir: *pressure_vir,
            });
        }
    }

    Ok(payload)
}

fn parse_lattice_rows(lines: &[(usize, String)], marker: usize) -> Result<[Vec3; 3], Error> {
    if marker + 3 >= lines.len() {
        return Err(Error::parse(
            Format::Outcar,
            lines[marker].0,
            "file ended inside the lattice vector table",
        ));
    }
    let mut rows = [[0.0; 3]; 3];
    for (k, row) in rows.iter_mut().enumerate() {
        let (ln, raw) = &lines[marker + 1 + k];
        *row = first_three_f64(raw)
            .ok_or_else(|| Error::parse(Format::Outcar, *ln, "invalid lattice vector row"))?;
    }
    Ok(rows)
}

fn parse_position_rows(
    lines: &[(usize, String)],
    start: usize,
) -> Result<(Vec<Vec3>, usize), Error> {
    let mut rows = Vec::new();
    let mut i = start;
    while i < lines.len() {
        let (ln, raw) = &lines[i];
        if raw.trim().is_empty() {
            break;
        }
        let row = first_three_f64(raw)
            .ok_or_else(|| Error::parse(Format::Outcar, *ln, "invalid ion position row"))?;
        rows.push(row);
        i += 1;
    }
    Ok((rows, i))
}

type ForceBlock = (Vec<Vec3>, Vec<Vec3>);

/// Returns `Ok((None, _))` when the file ends before `total drift:`,
/// which happens when a run is killed mid-step.
fn parse_force_block(
    lines: &[(usize, String)],
    start: usize,
) -> Result<(Option<ForceBlock>, usize), Error> {
    let mut position = Vec::new();
    let mut force = Vec::new();
    let mut i = start;
    while i < lines.len() {
        let (ln, raw) = &lines[i];
        if raw.contains("total drift:") {
            return Ok((Some((position, force)), i + 1));
        }
        if !raw.contains("---") && !raw.trim().is_empty() {
            let tokens: Vec<_> = raw.split_whitespace().collect();
            if tokens.len() < 6 {
                return Err(Error::parse(
                    Format::Outcar,
                    *ln,
                    "position/force row must contain six components",
                ));
            }
            let mut row = [0.0; 6];
            for (slot, token) in row.iter_mut().zip(&tokens) {
                *slot = token.parse::<f64>().map_err(|_| {
                    Error::parse(Format::Outcar, *ln, "invalid position/force component")
                })?;
            }
            position.push([row[0], row[1], row[2]]);
            force.push([row[3], row[4], row[5]]);
        }
        i += 1;
    }
    Ok((None, i))
}

fn collect_lines<R: BufRead>(reader: R) -> Result<Vec<(usize, String)>, Error> {
    let mut lines = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        lines.push((i + 1, line?));
    }
    Ok(lines)
}

fn last_token(line: &str) -> Option<&str> {
    line.split_whitespace().next_back()
}

fn nth_token_f64(line: &str, n: usize) -> Option<f64> {
    line.split_whitespace()
        .nth(n)
        .and_then(|token| token.parse::<f64>().ok())
}

fn first_three_f64(line: &str) -> Option<Vec3> {
    let mut tokens = line.split_whitespace();
    let mut out = [0.0; 3];
    for slot in &mut out {
        *slot = tokens.next()?.parse::<f64>().ok()?;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "\
   number of dos      NEDOS =    301   number of ions     NIONS =      2
   POTIM  =      2.0000    time-step for ionic-motion
   TEBEG  =    100.0;   TEEND  =   100.0  temperature during run
  volume of cell :      463.13
 direct lattice vectors                 reciprocal lattice vectors
     7.740000000  0.000000000  0.000000000     0.129198966  0.000000000  0.000000000
     0.000000000  7.740000000  0.000000000     0.000000000  0.129198966  0.000000000
     0.000000000  0.000000000  7.740000000     0.000000000  0.000000000  0.129198966

 position of ions in cartesian coordinates  (Angst):
     0.00000000  0.00000000  0.00000000
     3.87000000  3.87000000  3.87000000

";

    fn step(positions: &[[f64; 3]], forces: &[[f64; 3]], e0: f64, kbar: f64) -> String {
        let mut text = String::new();
        text.push_str(
            " POSITION                                       TOTAL-FORCE (eV/Angst)\n",
        );
        text.push_str(" -----------------------------------------------------------------------\n");
        for (r, f) in positions.iter().zip(forces) {
            text.push_str(&format!(
                "   {:10.5}   {:10.5}   {:10.5}     {:10.6}   {:10.6}   {:10.6}\n",
                r[0], r[1], r[2], f[0], f[1], f[2]
            ));
        }
        text.push_str(" -----------------------------------------------------------------------\n");
        text.push_str("    total drift:                        0.000000   0.000000   0.000000\n");
        text.push_str(&format!(
            "  energy  without entropy=  {e0:14.8}  energy(sigma->0) =  {e0:14.8}\n"
        ));
        text.push_str(&format!(
            "  external pressure =  {kbar:10.2} kB  Pullay stress =  0.00 kB\n"
        ));
        text
    }

    fn make_outcar() -> String {
        let mut text = String::from(HEADER);
        text.push_str(&step(
            &[[0.0, 0.0, 0.0], [3.87, 3.87, 3.87]],
            &[[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
            -36.2,
            12.0,
        ));
        text.push_str(&step(
            &[[0.01, 0.0, 0.0], [3.87, 3.87, 3.87]],
            &[[0.02, 0.0, 0.0], [-0.02, 0.0, 0.0]],
            -36.1911,
            12.3,
        ));
        text
    }

    #[test]
    fn header_markers_are_extracted_once() {
        let payload = parse_reader(make_outcar().as_bytes()).unwrap();
        assert_eq!(payload.num_atoms, Some(2));
        assert_eq!(payload.timestep, Some(2.0));
        assert_eq!(payload.temperature, Some(100.0));
        assert_eq!(payload.volume, Some(463.13));
        let cell = payload.cell.unwrap();
        assert_eq!(cell[0], [7.74, 0.0, 0.0]);
        assert_eq!(cell[2], [0.0, 0.0, 7.74]);
        let basis = payload.basis.unwrap();
        assert_eq!(basis.len(), 2);
        assert_eq!(basis[1], [3.87, 3.87, 3.87]);
    }

    #[test]
    fn steps_collect_forces_energy_and_pressure() {
        let payload = parse_reader(make_outcar().as_bytes()).unwrap();
        assert_eq!(payload.steps.len(), 2);
        let step = &payload.steps[1];
        assert_eq!(step.position[0], [0.01, 0.0, 0.0]);
        assert_eq!(step.force[1], [-0.02, 0.0, 0.0]);
        // E0 is stored per atom, external pressure converted kBar -> GPa.
        assert!((step.energy - (-36.1911 / 2.0)).abs() < 1e-12);
        assert!((step.pressure_vir - 1.23).abs() < 1e-12);
    }

    #[test]
    fn unterminated_force_block_is_dropped() {
        let mut text = make_outcar();
        text.push_str(" POSITION                                       TOTAL-FORCE (eV/Angst)\n");
        text.push_str(" ---------------------------------------------------------------------\n");
        text.push_str("   0.02000   0.00000   0.00000     0.03000   0.00000   0.00000\n");
        let payload = parse_reader(text.as_bytes()).unwrap();
        assert_eq!(payload.steps.len(), 2);
    }

    #[test]
    fn series_truncate_to_complete_steps() {
        // Energy line for the second step never made it to disk.
        let text = make_outcar();
        let cut = text.rfind("  energy  without entropy=").unwrap();
        let payload = parse_reader(text[..cut].as_bytes()).unwrap();
        assert_eq!(payload.steps.len(), 1);
    }

    #[test]
    fn mismatched_ion_count_is_rejected() {
        let text = make_outcar().replace("NIONS =      2", "NIONS =      3");
        let err = parse_reader(text.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
    }

    #[test]
    fn files_assemble_into_a_cartesian_trajectory() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(make_outcar().as_bytes()).unwrap();

        let trajectory = read_files(&[file.path()]).unwrap();
        assert_eq!(trajectory.num_atoms, 2);
        assert_eq!(trajectory.coordinates, Coordinates::Cartesian);
        assert_eq!(trajectory.steps(), 2);
        assert_eq!(trajectory.timestep, 2.0);
        assert_eq!(trajectory.temperature, 100.0);
        assert!((trajectory.volume_atom - 463.13 / 2.0).abs() < 1e-12);
        assert_eq!(trajectory.cell.rows()[0], [7.74, 0.0, 0.0]);
    }

    #[test]
    fn no_input_files_is_an_error() {
        let err = read_files::<&Path>(&[]).unwrap_err();
        assert!(matches!(err, Error::MissingData { .. }));
    }
}
