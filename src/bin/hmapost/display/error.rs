use std::io::{self, Write};

use anyhow::Error;

use crate::util::text::wrap;

#[rustfmt::skip]
pub fn print_error(err: &Error) {
    let mut stderr = io::stderr().lock();

    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "   ╔══════════════════════════════════════════════════════════════╗");
    let _ = writeln!(stderr, "   ║  ✗ Error                                                     ║");
    let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");

    let msg = err.to_string();
    for line in wrap(&msg, 59) {
        let _ = writeln!(stderr, "   ║  {:<59} ║", line);
    }

    let mut source = err.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Caused by:                                                  ║");
        for line in wrap(&cause.to_string(), 59) {
            let _ = writeln!(stderr, "   ║    {:<57} ║", line);
        }
        source = cause.source();
    }

    if let Some(hints) = HintCollector::collect(err) {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Hints:                                                      ║");
        for hint in hints {
            let wrapped = wrap(&hint, 55);
            if let Some((first, rest)) = wrapped.split_first() {
                let _ = writeln!(stderr, "   ║    • {:<55} ║", first);
                for line in rest {
                    let _ = writeln!(stderr, "   ║      {:<55} ║", line);
                }
            }
        }
    }

    let _ = writeln!(stderr, "   ╚══════════════════════════════════════════════════════════════╝");
    let _ = writeln!(stderr);
}

struct HintCollector {
    hints: Vec<String>,
    has_typed_hints: bool,
}

impl HintCollector {
    fn new() -> Self {
        Self {
            hints: Vec::new(),
            has_typed_hints: false,
        }
    }

    fn collect(err: &Error) -> Option<Vec<String>> {
        let mut collector = Self::new();

        collector.collect_io_hints(err);
        collector.collect_estimator_hints(err);

        if !collector.has_typed_hints {
            collector.collect_fallback_hints(err);
        }

        if collector.hints.is_empty() {
            None
        } else {
            Some(collector.hints)
        }
    }

    fn add(&mut self, hint: impl Into<String>) {
        self.hints.push(hint.into());
    }

    fn mark_typed(&mut self) {
        self.has_typed_hints = true;
    }

    fn collect_io_hints(&mut self, err: &Error) {
        use hma_post::io::Error as IoError;

        let Some(io_err) = err.downcast_ref::<IoError>() else {
            return;
        };

        self.mark_typed();

        match io_err {
            IoError::Io { source } => {
                self.collect_std_io_hints(source);
            }

            IoError::Xml { .. } => {
                self.add("The vasprun.xml stream is not well-formed XML");
                self.add("A run killed mid-write can leave a torn tag at the very end");
                self.add("Calculation blocks recorded before the tear remain usable");
            }

            IoError::Parse { format, line, .. } => {
                self.add(format!(
                    "Parser stopped near line {} of the {} input",
                    line, format
                ));
                self.add("Inspect the file around that line for malformed entries");
                self.add("Try specifying --infmt to ensure correct format detection");
                self.add_format_specific_parse_hints(*format);
            }

            IoError::InvalidValue { format, .. } => {
                self.add(format!(
                    "The {} input parsed but contained an unusable value",
                    format
                ));
                self.add("Check that position and force blocks cover every atom");
            }

            IoError::MissingData { details, .. } => {
                if details.contains("POTIM") || details.contains("TEBEG") {
                    self.add("MD control parameters come from the INCAR section");
                    self.add("A static or damaged run may never record them");
                    self.add("Check that the first file of the series is complete");
                } else {
                    self.add("A restart series needs one complete file with the cell geometry");
                    self.add("Pass the files in run order, first run first");
                }
            }
        }
    }

    fn collect_std_io_hints(&mut self, source: &std::io::Error) {
        use std::io::ErrorKind;

        match source.kind() {
            ErrorKind::NotFound => {
                self.add("File or directory not found");
                self.add("Check the path spelling and ensure the file exists");
                self.add("Raw input names a directory holding the four .dat files");
            }

            ErrorKind::PermissionDenied => {
                self.add("Permission denied accessing the file");
                self.add("Check file permissions with `ls -la`");
                self.add("Ensure you have read/write access as needed");
            }

            ErrorKind::InvalidData => {
                self.add("File contains invalid or corrupt data");
                self.add("Verify the file is not truncated or corrupted");
            }

            ErrorKind::UnexpectedEof => {
                self.add("Unexpected end of file encountered");
                self.add("The file may be truncated or incomplete");
            }

            ErrorKind::WriteZero => {
                self.add("Failed to write data (disk full?)");
                self.add("Check available disk space");
            }

            ErrorKind::BrokenPipe => {
                self.add("Broken pipe — output consumer terminated");
                self.add("This may occur when piping to commands like `head`");
            }

            _ => {
                self.add("I/O operation failed");
                self.add("Check file path, permissions, and disk space");
            }
        }
    }

    fn add_format_specific_parse_hints(&mut self, format: hma_post::io::Format) {
        use hma_post::io::Format;

        match format {
            Format::Vasprun => {
                self.add("vasprun: Check numeric <v> fields inside the named varray");
            }

            Format::Outcar => {
                self.add("OUTCAR: Marker lines vary between VASP versions");
                self.add("OUTCAR: Check the lattice/position/force blocks near that line");
            }

            Format::Raw => {
                self.add(
                    "Raw: The four-file layout is fixed; regenerate it with `hmapost extract`",
                );
            }
        }
    }

    fn collect_estimator_hints(&mut self, err: &Error) {
        use hma_post::EstimatorError;

        let Some(est_err) = err.downcast_ref::<EstimatorError>() else {
            return;
        };

        self.mark_typed();

        match est_err {
            EstimatorError::LatticeNotMinimized {
                atom,
                magnitude,
                tolerance,
            } => {
                self.add(format!(
                    "Force on atom {} is {:.3e} eV/Å against a tolerance of {:.1e}",
                    atom, magnitude, tolerance
                ));
                self.add("HMA needs the first recorded configuration to be the relaxed lattice");
                self.add("Re-relax the structure before the MD run");
                self.add("Or raise --force-tol if the residual is acceptable");
            }

            EstimatorError::InvalidStepRange {
                requested,
                available,
            } => {
                self.add(format!(
                    "Requested {} step(s) but the trajectory records {}",
                    requested, available
                ));
                self.add("Lower --steps or --equilibration");
                self.add("Check that every restart file of the series was passed");
            }

            EstimatorError::InsufficientBlocks { .. } => {
                self.add("The production window is shorter than two full blocks");
                self.add("Reduce --blocksize or --equilibration, or analyze more steps");
            }

            EstimatorError::MalformedTrajectory { .. } => {
                self.add("Step-indexed arrays disagree in length");
                self.add("Check that all raw files come from the same extraction");
            }

            EstimatorError::ReductionStalled { .. } => {
                self.add("Minimum-image reduction did not reach a fixed point");
                self.add("Check the lattice vectors for a degenerate or extremely skewed cell");
            }
        }
    }

    fn collect_fallback_hints(&mut self, err: &Error) {
        let msg = error_chain_text(err);

        if msg.contains("no such file") || msg.contains("not found") {
            self.add("Check that the file path is correct");
            self.add("Verify the file exists and is readable");
            return;
        }

        if msg.contains("permission denied") {
            self.add("Check file permissions with `ls -la`");
            self.add("Ensure you have the required access rights");
            return;
        }

        if msg.contains("settings file") {
            self.add("Settings files are TOML; compare against the built-in defaults");
            self.add(
                "Keys: temperature, timestep, steps_tot, pressure_qh, steps_eq, \
                 blocksize, force_tol, mev",
            );
        }
    }
}

fn error_chain_text(err: &Error) -> String {
    let mut text = String::new();

    text.push_str(&err.to_string());

    let mut source = err.source();
    while let Some(cause) = source {
        text.push('\n');
        text.push_str(&cause.to_string());
        source = cause.source();
    }

    text.to_lowercase()
}
