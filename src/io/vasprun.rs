//! vasprun.xml reader.
//!
//! Streams the document with `quick-xml` instead of loading a DOM, since
//! an AIMD vasprun.xml routinely runs to hundreds of megabytes. The
//! reader pulls out exactly the elements the estimator needs:
//!
//! - `<incar>`: POTIM (timestep, fs) and TEBEG (temperature, K). These
//!   must come from `<incar>` and not from `<parameters>`, which repeats
//!   the same names with filled-in defaults.
//! - `<atominfo>`: total atom count.
//! - `<structure name="initialpos">`: lattice vectors, cell volume, and
//!   the reference positions in direct coordinates.
//! - each `<calculation>`: positions, forces, the stress tensor, and the
//!   E0 energy of the last `<scstep>`. The `<energy>` block that closes a
//!   calculation repeats `e_0_energy` with a bogus value in several VASP
//!   versions, so it is deliberately not read.
//!
//! A step is committed only when its `</calculation>` tag is reached with
//! all four quantities present, so a file truncated by an interrupted run
//! simply contributes the steps it completed.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::io::{FilePayload, Format, StepRecord, assemble, error::Error};
use crate::model::{Coordinates, Trajectory, vec::Vec3};

/// Reads one or more vasprun.xml files into a single trajectory.
///
/// Later files are treated as restart continuations: their steps are
/// appended in order, the reference configuration comes from the first
/// file that records one, and POTIM/TEBEG come from the last file that
/// records them.
///
/// # Errors
///
/// Returns an error if no files are given, a file cannot be read or is
/// not well-formed XML, a value cannot be parsed, or a quantity the
/// trajectory needs never appears.
pub fn read_files<P: AsRef<Path>>(paths: &[P]) -> Result<Trajectory, Error> {
    if paths.is_empty() {
        return Err(Error::missing(Format::Vasprun, "no input files given"));
    }
    let mut payloads = Vec::with_capacity(paths.len());
    for path in paths {
        payloads.push(parse_file(path.as_ref())?);
    }
    assemble(payloads, Coordinates::Direct, Format::Vasprun)
}

fn parse_file(path: &Path) -> Result<FilePayload, Error> {
    parse_reader(BufReader::new(File::open(path)?))
}

fn parse_reader<R: BufRead>(source: R) -> Result<FilePayload, Error> {
    let mut reader = Reader::from_reader(source);
    reader.trim_text(true);

    let mut payload = FilePayload::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"incar" => parse_incar(&mut reader, &mut payload)?,
                b"atoms" => {
                    let text = read_element_text(&mut reader, b"atoms")?;
                    let count = text.trim().parse::<usize>().map_err(|_| {
                        Error::invalid(Format::Vasprun, "atom count is not an integer")
                    })?;
                    payload.num_atoms = Some(count);
                }
                b"structure" if name_attr(&e).as_deref() == Some("initialpos") => {
                    parse_initial_structure(&mut reader, &mut payload)?;
                }
                b"calculation" => parse_calculation(&mut reader, &mut payload)?,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(payload)
}

fn parse_incar<R: BufRead>(reader: &mut Reader<R>, payload: &mut FilePayload) -> Result<(), Error> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"i" => {
                let name = name_attr(&e);
                let text = read_element_text(reader, b"i")?;
                match name.as_deref() {
                    Some("POTIM") => {
                        payload.timestep = Some(parse_f64(&text, "POTIM")?);
                    }
                    Some("TEBEG") => {
                        payload.temperature = Some(parse_f64(&text, "TEBEG")?);
                    }
                    _ => {}
                }
            }
            Event::End(e) if e.name().as_ref() == b"incar" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn parse_initial_structure<R: BufRead>(
    reader: &mut Reader<R>,
    payload: &mut FilePayload,
) -> Result<(), Error> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"crystal" => parse_crystal(reader, payload)?,
                b"varray" if name_attr(&e).as_deref() == Some("positions") => {
                    payload.basis = Some(read_varray_rows(reader)?);
                }
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"structure" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn parse_crystal<R: BufRead>(
    reader: &mut Reader<R>,
    payload: &mut FilePayload,
) -> Result<(), Error> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"varray" if name_attr(&e).as_deref() == Some("basis") => {
                    let rows = read_varray_rows(reader)?;
                    if rows.len() != 3 {
                        return Err(Error::invalid(
                            Format::Vasprun,
                            "lattice basis must contain three vectors",
                        ));
                    }
                    payload.cell = Some([rows[0], rows[1], rows[2]]);
                }
                b"i" if name_attr(&e).as_deref() == Some("volume") => {
                    let text = read_element_text(reader, b"i")?;
                    payload.volume = Some(parse_f64(&text, "cell volume")?);
                }
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"crystal" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn parse_calculation<R: BufRead>(
    reader: &mut Reader<R>,
    payload: &mut FilePayload,
) -> Result<(), Error> {
    let mut positions: Option<Vec<Vec3>> = None;
    let mut forces: Option<Vec<Vec3>> = None;
    let mut energy: Option<f64> = None;
    let mut pressure_vir: Option<f64> = None;
    let mut in_scstep = false;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"scstep" => in_scstep = true,
                b"structure" => positions = parse_step_positions(reader)?,
                b"varray" => match name_attr(&e).as_deref() {
                    Some("forces") => forces = Some(read_varray_rows(reader)?),
                    Some("stress") => {
                        let rows = read_varray_rows(reader)?;
                        if rows.len() != 3 {
                            return Err(Error::invalid(
                                Format::Vasprun,
                                "stress tensor must contain three rows",
                            ));
                        }
                        let trace = rows[0][0] + rows[1][1] + rows[2][2];
                        pressure_vir = Some(trace / 3.0 / 10.0);
                    }
                    _ => {}
                },
                // The last converged scstep carries the step's E0. The
                // calculation-level <energy> repeats the name with a bad
                // value, hence the in_scstep gate.
                b"i" if in_scstep && name_attr(&e).as_deref() == Some("e_0_energy") => {
                    let text = read_element_text(reader, b"i")?;
                    energy = Some(parse_f64(&text, "e_0_energy")?);
                }
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"scstep" => in_scstep = false,
                b"calculation" => break,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let (Some(position), Some(force), Some(energy), Some(pressure_vir)) =
        (positions, forces, energy, pressure_vir)
    {
        let num_atoms = payload
            .num_atoms
            .ok_or_else(|| Error::missing(Format::Vasprun, "atom count (<atominfo>)"))?;
        if position.len() != num_atoms {
            return Err(Error::invalid(
                Format::Vasprun,
                format!(
                    "step lists {} positions where {num_atoms} atoms were declared",
                    position.len()
                ),
            ));
        }
        payload.steps.push(StepRecord {
            position,
            force,
            energy: energy / num_atoms as f64,
            pressure_vir,
        });
    }
    Ok(())
}

fn parse_step_positions<R: BufRead>(reader: &mut Reader<R>) -> Result<Option<Vec<Vec3>>, Error> {
    let mut positions = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e)
                if e.name().as_ref() == b"varray"
                    && name_attr(&e).as_deref() == Some("positions") =>
            {
                positions = Some(read_varray_rows(reader)?);
            }
            Event::End(e) if e.name().as_ref() == b"structure" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(positions)
}

fn read_varray_rows<R: BufRead>(reader: &mut Reader<R>) -> Result<Vec<Vec3>, Error> {
    let mut rows = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"v" => {
                let text = read_element_text(reader, b"v")?;
                rows.push(parse_vec3_text(&text)?);
            }
            Event::End(e) if e.name().as_ref() == b"varray" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

fn read_element_text<R: BufRead>(reader: &mut Reader<R>, end: &[u8]) -> Result<String, Error> {
    let mut text = String::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape().unwrap_or_default()),
            Event::End(e) if e.name().as_ref() == end => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

fn name_attr(e: &BytesStart) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"name" {
            return Some(String::from_utf8_lossy(&attr.value).to_string());
        }
    }
    None
}

fn parse_f64(text: &str, what: &str) -> Result<f64, Error> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| Error::invalid(Format::Vasprun, format!("{what} is not a number")))
}

fn parse_vec3_text(text: &str) -> Result<Vec3, Error> {
    let mut tokens = text.split_whitespace();
    let mut out = [0.0; 3];
    for slot in &mut out {
        *slot = tokens
            .next()
            .and_then(|token| token.parse::<f64>().ok())
            .ok_or_else(|| {
                Error::invalid(Format::Vasprun, "vector row must contain three numbers")
            })?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn preamble(potim: f64, tebeg: f64) -> String {
        format!(
            r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<modeling>
 <incar>
  <i type="string" name="SYSTEM">test</i>
  <i name="POTIM">      {potim:.8}</i>
  <i name="TEBEG">    {tebeg:.8}</i>
 </incar>
 <atominfo>
  <atoms>       2 </atoms>
  <types>       1 </types>
 </atominfo>
 <structure name="initialpos" >
  <crystal>
   <varray name="basis" >
    <v>      10.00000000       0.00000000       0.00000000 </v>
    <v>       0.00000000      10.00000000       0.00000000 </v>
    <v>       0.00000000       0.00000000      10.00000000 </v>
   </varray>
   <i name="volume">   1000.00000000 </i>
   <varray name="rec_basis" >
    <v>       0.10000000       0.00000000       0.00000000 </v>
    <v>       0.00000000       0.10000000       0.00000000 </v>
    <v>       0.00000000       0.00000000       0.10000000 </v>
   </varray>
  </crystal>
  <varray name="positions" >
   <v>       0.00000000       0.00000000       0.00000000 </v>
   <v>       0.50000000       0.50000000       0.50000000 </v>
  </varray>
 </structure>
"#
        )
    }

    fn calculation(x1: f64, e0: f64, diag: f64) -> String {
        format!(
            r#" <calculation>
  <scstep>
   <energy>
    <i name="e_0_energy">    -99.00000000 </i>
   </energy>
  </scstep>
  <scstep>
   <energy>
    <i name="e_0_energy">    {e0:.8} </i>
   </energy>
  </scstep>
  <structure>
   <crystal>
    <varray name="basis" >
     <v>      10.00000000       0.00000000       0.00000000 </v>
     <v>       0.00000000      10.00000000       0.00000000 </v>
     <v>       0.00000000       0.00000000      10.00000000 </v>
    </varray>
   </crystal>
   <varray name="positions" >
    <v>       0.00000000       0.00000000       0.00000000 </v>
    <v>       {x1:.8}       0.50000000       0.50000000 </v>
   </varray>
  </structure>
  <varray name="forces" >
   <v>       0.04000000       0.00000000       0.00000000 </v>
   <v>      -0.04000000       0.00000000       0.00000000 </v>
  </varray>
  <varray name="stress" >
   <v>      {diag:.8}       0.00000000       0.00000000 </v>
   <v>       0.00000000      {diag:.8}       0.00000000 </v>
   <v>       0.00000000       0.00000000      {diag:.8} </v>
  </varray>
  <energy>
   <i name="e_fr_energy">    {e0:.8} </i>
   <i name="e_0_energy">     -0.00000000 </i>
  </energy>
 </calculation>
"#
        )
    }

    fn make_vasprun() -> String {
        let mut xml = preamble(2.0, 100.0);
        xml.push_str(&calculation(0.5, -36.2, 12.0));
        xml.push_str(&calculation(0.502, -36.1911, 12.3));
        xml.push_str("</modeling>\n");
        xml
    }

    #[test]
    fn header_and_reference_structure_are_extracted() {
        let payload = parse_reader(make_vasprun().as_bytes()).unwrap();
        assert_eq!(payload.num_atoms, Some(2));
        assert_eq!(payload.timestep, Some(2.0));
        assert_eq!(payload.temperature, Some(100.0));
        assert_eq!(payload.volume, Some(1000.0));
        let cell = payload.cell.unwrap();
        assert_eq!(cell[1], [0.0, 10.0, 0.0]);
        let basis = payload.basis.unwrap();
        assert_eq!(basis, vec![[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]]);
    }

    #[test]
    fn energy_comes_from_the_last_scstep() {
        // Neither the first scstep (-99.0) nor the bogus e_0_energy in the
        // closing <energy> block (-0.0) may win.
        let payload = parse_reader(make_vasprun().as_bytes()).unwrap();
        assert_eq!(payload.steps.len(), 2);
        assert!((payload.steps[0].energy - (-36.2 / 2.0)).abs() < 1e-12);
        assert!((payload.steps[1].energy - (-36.1911 / 2.0)).abs() < 1e-12);
    }

    #[test]
    fn stress_trace_converts_to_gpa() {
        let payload = parse_reader(make_vasprun().as_bytes()).unwrap();
        assert!((payload.steps[0].pressure_vir - 1.2).abs() < 1e-12);
        assert!((payload.steps[1].pressure_vir - 1.23).abs() < 1e-12);
    }

    #[test]
    fn step_positions_and_forces_are_collected() {
        let payload = parse_reader(make_vasprun().as_bytes()).unwrap();
        let step = &payload.steps[1];
        assert_eq!(step.position[1], [0.502, 0.5, 0.5]);
        assert_eq!(step.force[0], [0.04, 0.0, 0.0]);
    }

    #[test]
    fn truncated_trailing_calculation_is_dropped() {
        let mut xml = preamble(2.0, 100.0);
        xml.push_str(&calculation(0.5, -36.2, 12.0));
        let full = calculation(0.502, -36.1911, 12.3);
        // Keep the second calculation only up to its forces varray.
        let cut = full.find("<varray name=\"stress\"").unwrap();
        xml.push_str(&full[..cut]);

        let payload = parse_reader(xml.as_bytes()).unwrap();
        assert_eq!(payload.steps.len(), 1);
    }

    #[test]
    fn parameters_section_does_not_override_incar() {
        let mut xml = preamble(2.0, 100.0);
        xml.push_str(
            r#" <parameters>
  <separator name="ionic" >
   <i name="POTIM">     99.00000000</i>
   <i name="TEBEG">    999.00000000</i>
  </separator>
 </parameters>
</modeling>
"#,
        );
        let payload = parse_reader(xml.as_bytes()).unwrap();
        assert_eq!(payload.timestep, Some(2.0));
        assert_eq!(payload.temperature, Some(100.0));
    }

    #[test]
    fn position_row_mismatch_is_rejected() {
        // Drop the second atom from one step's positions varray.
        let broken_step = calculation(0.5, -36.2, 12.0).replacen(
            "    <v>       0.50000000       0.50000000       0.50000000 </v>\n",
            "",
            1,
        );
        let mut xml = preamble(2.0, 100.0);
        xml.push_str(&broken_step);
        xml.push_str("</modeling>\n");

        let err = parse_reader(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
    }

    #[test]
    fn restart_files_assemble_in_order() {
        let mut first = tempfile::NamedTempFile::new().unwrap();
        first.write_all(make_vasprun().as_bytes()).unwrap();

        let mut continuation = preamble(2.0, 120.0);
        continuation.push_str(&calculation(0.504, -36.1902, 12.1));
        continuation.push_str("</modeling>\n");
        let mut second = tempfile::NamedTempFile::new().unwrap();
        second.write_all(continuation.as_bytes()).unwrap();

        let trajectory = read_files(&[first.path(), second.path()]).unwrap();
        assert_eq!(trajectory.steps(), 3);
        assert_eq!(trajectory.coordinates, Coordinates::Direct);
        // Thermostat settings follow the restart, the reference the first file.
        assert_eq!(trajectory.temperature, 120.0);
        assert_eq!(trajectory.basis[1], [0.5, 0.5, 0.5]);
        assert_eq!(trajectory.position[2][1], [0.504, 0.5, 0.5]);
        assert!((trajectory.volume_atom - 500.0).abs() < 1e-12);
    }
}
