//! Raw-file trajectory layer.
//!
//! A parsed trajectory can be dumped into four plain-text files inside a
//! directory and read back later, so the expensive XML pass over a large
//! `vasprun.xml` runs only once:
//!
//! - `poscar_eq.dat`: lattice vectors, atom count, coordinate mode, and
//!   the minimized reference configuration, laid out like a POSCAR.
//! - `posfor.dat`: per step, a bare step-index line followed by one
//!   `x y z    fx fy fz` row per atom.
//! - `energy.dat`: one potential energy per step (eV/atom).
//! - `pressure_vir.dat`: one virial pressure per step (GPa).
//!
//! Reading tolerates an interrupted writer: a trailing partial step block
//! is dropped, and the series are truncated to the shortest complete one.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::io::{Format, error::Error};
use crate::model::{Cell, Coordinates, Trajectory, vec::Vec3};

/// File name of the reference-configuration header.
pub const POSCAR_EQ_FILE: &str = "poscar_eq.dat";

/// File name of the per-step position/force blocks.
pub const POSFOR_FILE: &str = "posfor.dat";

/// File name of the per-step energy series.
pub const ENERGY_FILE: &str = "energy.dat";

/// File name of the per-step virial-pressure series.
pub const PRESSURE_VIR_FILE: &str = "pressure_vir.dat";

/// Writes a trajectory as the four raw files inside `dir`.
///
/// The directory must already exist. Existing raw files are overwritten.
///
/// # Errors
///
/// Returns [`Error::Io`] if any of the files cannot be created or written.
pub fn write_raw(dir: &Path, trajectory: &Trajectory) -> Result<(), Error> {
    write_poscar_eq(create(dir, POSCAR_EQ_FILE)?, trajectory)?;
    write_posfor(create(dir, POSFOR_FILE)?, trajectory)?;
    write_scalars(create(dir, ENERGY_FILE)?, &trajectory.energy)?;
    write_scalars(create(dir, PRESSURE_VIR_FILE)?, &trajectory.pressure_vir)?;
    Ok(())
}

/// Reads the four raw files from `dir` back into a trajectory.
///
/// The raw files do not record the MD timestep or the thermostat
/// temperature, so both must be supplied by the caller.
///
/// # Errors
///
/// Returns [`Error::Io`] if a file is missing or unreadable, and a parse
/// error when a line cannot be interpreted.
pub fn read_raw(dir: &Path, timestep: f64, temperature: f64) -> Result<Trajectory, Error> {
    let header = read_poscar_eq(open(dir, POSCAR_EQ_FILE)?)?;
    let (mut position, mut force) = read_posfor(open(dir, POSFOR_FILE)?, header.num_atoms)?;
    let mut energy = read_scalars(open(dir, ENERGY_FILE)?, "energy")?;
    let mut pressure_vir = read_scalars(open(dir, PRESSURE_VIR_FILE)?, "virial pressure")?;

    let steps = position.len().min(energy.len()).min(pressure_vir.len());
    position.truncate(steps);
    force.truncate(steps);
    energy.truncate(steps);
    pressure_vir.truncate(steps);

    let volume_atom = header.cell.volume() / header.num_atoms as f64;
    Ok(Trajectory {
        cell: header.cell,
        num_atoms: header.num_atoms,
        timestep,
        temperature,
        volume_atom,
        basis: header.basis,
        position,
        force,
        energy,
        pressure_vir,
        coordinates: header.coordinates,
    })
}

fn create(dir: &Path, name: &str) -> Result<BufWriter<File>, Error> {
    Ok(BufWriter::new(File::create(dir.join(name))?))
}

fn open(dir: &Path, name: &str) -> Result<BufReader<File>, Error> {
    Ok(BufReader::new(File::open(dir.join(name))?))
}

fn write_poscar_eq<W: Write>(mut writer: W, trajectory: &Trajectory) -> Result<(), Error> {
    writeln!(writer, "Lattice vectors")?;
    writeln!(writer, "1.0 scaling factor")?;
    for row in trajectory.cell.rows() {
        writeln!(writer, "{:12.8} {:12.8} {:12.8}", row[0], row[1], row[2])?;
    }
    writeln!(writer, "{}  atoms (total)", trajectory.num_atoms)?;
    let mode = match trajectory.coordinates {
        Coordinates::Direct => "Direct",
        Coordinates::Cartesian => "Cartesian",
    };
    writeln!(writer, "{mode}")?;
    for site in &trajectory.basis {
        writeln!(writer, "{:12.8} {:12.8} {:12.8}", site[0], site[1], site[2])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_posfor<W: Write>(mut writer: W, trajectory: &Trajectory) -> Result<(), Error> {
    for (step, (positions, forces)) in trajectory
        .position
        .iter()
        .zip(&trajectory.force)
        .enumerate()
    {
        writeln!(writer, "{step}")?;
        for (r, f) in positions.iter().zip(forces) {
            writeln!(
                writer,
                "{:12.8} {:12.8} {:12.8}    {:12.8} {:12.8} {:12.8}",
                r[0], r[1], r[2], f[0], f[1], f[2]
            )?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn write_scalars<W: Write>(mut writer: W, values: &[f64]) -> Result<(), Error> {
    for value in values {
        writeln!(writer, "{value:12.8}")?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug)]
struct RawHeader {
    cell: Cell,
    num_atoms: usize,
    coordinates: Coordinates,
    basis: Vec<Vec3>,
}

fn read_poscar_eq<R: BufRead>(reader: R) -> Result<RawHeader, Error> {
    let lines = collect_lines(reader)?;
    if lines.len() < 7 {
        return Err(Error::parse(
            Format::Raw,
            lines.last().map(|(ln, _)| *ln).unwrap_or(1),
            "poscar_eq.dat ended before the coordinate mode line",
        ));
    }

    let scale = first_token_f64(&lines[1], "scaling factor")?;
    let mut rows = [[0.0; 3]; 3];
    for (i, row) in rows.iter_mut().enumerate() {
        let v = parse_vec3(&lines[2 + i], "lattice vector")?;
        *row = [v[0] * scale, v[1] * scale, v[2] * scale];
    }

    let (count_ln, count_line) = &lines[5];
    let num_atoms = count_line
        .split_whitespace()
        .next()
        .and_then(|token| token.parse::<usize>().ok())
        .ok_or_else(|| Error::parse(Format::Raw, *count_ln, "invalid atom count"))?;
    if num_atoms == 0 {
        return Err(Error::invalid(Format::Raw, "atom count must be positive"));
    }

    let (mode_ln, mode_line) = &lines[6];
    let coordinates = match mode_line.trim().chars().next() {
        Some('d' | 'D') => Coordinates::Direct,
        Some('c' | 'C' | 'k' | 'K') => Coordinates::Cartesian,
        _ => {
            return Err(Error::parse(
                Format::Raw,
                *mode_ln,
                "coordinate mode must be Direct or Cartesian",
            ));
        }
    };

    if lines.len() < 7 + num_atoms {
        return Err(Error::parse(
            Format::Raw,
            lines.last().map(|(ln, _)| *ln).unwrap_or(*mode_ln),
            "poscar_eq.dat ended before all reference sites were listed",
        ));
    }
    let mut basis = Vec::with_capacity(num_atoms);
    for line in &lines[7..7 + num_atoms] {
        basis.push(parse_vec3(line, "reference site")?);
    }

    Ok(RawHeader {
        cell: Cell::new(rows),
        num_atoms,
        coordinates,
        basis,
    })
}

fn read_posfor<R: BufRead>(
    reader: R,
    num_atoms: usize,
) -> Result<(Vec<Vec<Vec3>>, Vec<Vec<Vec3>>), Error> {
    let lines = collect_lines(reader)?;
    let mut position = Vec::new();
    let mut force = Vec::new();
    let mut cursor = 0;
    while cursor < lines.len() {
        if lines[cursor].1.trim().is_empty() {
            cursor += 1;
            continue;
        }
        if cursor + num_atoms >= lines.len() {
            // Trailing partial block from an interrupted writer.
            break;
        }

        let (header_ln, header) = &lines[cursor];
        header
            .split_whitespace()
            .next()
            .and_then(|token| token.parse::<usize>().ok())
            .ok_or_else(|| Error::parse(Format::Raw, *header_ln, "invalid step index line"))?;

        let mut pos_step = Vec::with_capacity(num_atoms);
        let mut for_step = Vec::with_capacity(num_atoms);
        for line in &lines[cursor + 1..cursor + 1 + num_atoms] {
            let (r, f) = parse_posfor_row(line)?;
            pos_step.push(r);
            for_step.push(f);
        }
        position.push(pos_step);
        force.push(for_step);
        cursor += 1 + num_atoms;
    }
    Ok((position, force))
}

fn read_scalars<R: BufRead>(reader: R, what: &str) -> Result<Vec<f64>, Error> {
    let lines = collect_lines(reader)?;
    let mut values = Vec::with_capacity(lines.len());
    for (ln, raw) in &lines {
        if raw.trim().is_empty() {
            continue;
        }
        let value = raw
            .split_whitespace()
            .next()
            .and_then(|token| token.parse::<f64>().ok())
            .ok_or_else(|| Error::parse(Format::Raw, *ln, format!("invalid {what} value")))?;
        values.push(value);
    }
    Ok(values)
}

fn collect_lines<R: BufRead>(reader: R) -> Result<Vec<(usize, String)>, Error> {
    let mut lines = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        lines.push((i + 1, line?));
    }
    Ok(lines)
}

fn first_token_f64((ln, raw): &(usize, String), what: &str) -> Result<f64, Error> {
    raw.split_whitespace()
        .next()
        .and_then(|token| token.parse::<f64>().ok())
        .ok_or_else(|| Error::parse(Format::Raw, *ln, format!("invalid {what}")))
}

fn parse_vec3((ln, raw): &(usize, String), what: &str) -> Result<Vec3, Error> {
    let tokens: Vec<_> = raw.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(Error::parse(
            Format::Raw,
            *ln,
            format!("{what} line must contain three components"),
        ));
    }
    let mut out = [0.0; 3];
    for (slot, token) in out.iter_mut().zip(&tokens) {
        *slot = token
            .parse::<f64>()
            .map_err(|_| Error::parse(Format::Raw, *ln, format!("invalid {what} component")))?;
    }
    Ok(out)
}

fn parse_posfor_row((ln, raw): &(usize, String)) -> Result<(Vec3, Vec3), Error> {
    let tokens: Vec<_> = raw.split_whitespace().collect();
    if tokens.len() < 6 {
        return Err(Error::parse(
            Format::Raw,
            *ln,
            "position/force line must contain six components",
        ));
    }
    let mut row = [0.0; 6];
    for (slot, token) in row.iter_mut().zip(&tokens) {
        *slot = token
            .parse::<f64>()
            .map_err(|_| Error::parse(Format::Raw, *ln, "invalid position/force component"))?;
    }
    Ok(([row[0], row[1], row[2]], [row[3], row[4], row[5]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_trajectory() -> Trajectory {
        let cell = Cell::new([[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]]);
        let volume_atom = cell.volume() / 2.0;
        Trajectory {
            cell,
            num_atoms: 2,
            timestep: 2.0,
            temperature: 100.0,
            volume_atom,
            basis: vec![[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]],
            position: vec![
                vec![[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]],
                vec![[0.0, 0.0, 0.0], [0.502, 0.5, 0.5]],
            ],
            force: vec![
                vec![[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
                vec![[0.04, 0.0, 0.0], [-0.04, 0.0, 0.0]],
            ],
            energy: vec![-3.6, -3.5991],
            pressure_vir: vec![1.2, 1.23],
            coordinates: Coordinates::Direct,
        }
    }

    #[test]
    fn round_trip_preserves_trajectory() {
        let dir = tempfile::tempdir().unwrap();
        let original = make_trajectory();
        write_raw(dir.path(), &original).unwrap();

        let restored = read_raw(dir.path(), 2.0, 100.0).unwrap();
        assert_eq!(restored.num_atoms, 2);
        assert_eq!(restored.coordinates, Coordinates::Direct);
        assert_eq!(restored.cell.rows(), original.cell.rows());
        assert_eq!(restored.basis, original.basis);
        assert_eq!(restored.position, original.position);
        assert_eq!(restored.force, original.force);
        assert_eq!(restored.energy, original.energy);
        assert_eq!(restored.pressure_vir, original.pressure_vir);
        assert_eq!(restored.timestep, 2.0);
        assert_eq!(restored.temperature, 100.0);
    }

    #[test]
    fn poscar_eq_layout_matches_reference_format() {
        let mut out = Vec::new();
        write_poscar_eq(&mut out, &make_trajectory()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Lattice vectors");
        assert_eq!(lines[1], "1.0 scaling factor");
        assert_eq!(lines[2], " 10.00000000   0.00000000   0.00000000");
        assert_eq!(lines[5], "2  atoms (total)");
        assert_eq!(lines[6], "Direct");
        assert_eq!(lines[8], "  0.50000000   0.50000000   0.50000000");
    }

    #[test]
    fn series_truncate_to_shortest_file() {
        let dir = tempfile::tempdir().unwrap();
        write_raw(dir.path(), &make_trajectory()).unwrap();
        // Drop the last energy line, as if the writer died mid-step.
        std::fs::write(dir.path().join(ENERGY_FILE), " -3.60000000\n").unwrap();

        let restored = read_raw(dir.path(), 2.0, 100.0).unwrap();
        assert_eq!(restored.energy.len(), 1);
        assert_eq!(restored.position.len(), 1);
        assert_eq!(restored.pressure_vir.len(), 1);
    }

    #[test]
    fn partial_trailing_posfor_block_is_dropped() {
        let text = "0\n\
                      0.00000000   0.00000000   0.00000000     0.00000000   0.00000000   0.00000000\n\
                      0.50000000   0.50000000   0.50000000     0.00000000   0.00000000   0.00000000\n\
                    1\n\
                      0.00000000   0.00000000   0.00000000     0.04000000   0.00000000   0.00000000\n";
        let (position, force) = read_posfor(text.as_bytes(), 2).unwrap();
        assert_eq!(position.len(), 1);
        assert_eq!(force.len(), 1);
    }

    #[test]
    fn bad_lattice_row_reports_line_number() {
        let text = "Lattice vectors\n\
                    1.0 scaling factor\n\
                     10.0 oops 0.0\n\
                     0.0 10.0 0.0\n\
                     0.0 0.0 10.0\n\
                    1  atoms (total)\n\
                    Direct\n\
                     0.0 0.0 0.0\n";
        let err = read_poscar_eq(text.as_bytes()).unwrap_err();
        match err {
            Error::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cartesian_mode_is_recognized() {
        let text = "Lattice vectors\n\
                    1.0 scaling factor\n\
                     10.0 0.0 0.0\n\
                     0.0 10.0 0.0\n\
                     0.0 0.0 10.0\n\
                    1  atoms (total)\n\
                    Cartesian\n\
                     0.0 0.0 0.0\n";
        let header = read_poscar_eq(text.as_bytes()).unwrap();
        assert_eq!(header.coordinates, Coordinates::Cartesian);
        assert_eq!(header.num_atoms, 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_raw(dir.path(), 2.0, 100.0).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
