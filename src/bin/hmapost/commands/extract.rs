use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use hma_post::Trajectory;
use hma_post::io::raw::{ENERGY_FILE, POSCAR_EQ_FILE, POSFOR_FILE, PRESSURE_VIR_FILE, write_raw};
use hma_post::io::{Format, outcar, vasprun};

use crate::cli::{ExtractArgs, InputFormat};
use crate::config::resolve_controls;
use crate::display::{Context as DisplayContext, Progress, print_trajectory_info};
use crate::io::infer_input_format;

const TOTAL_STEPS: u8 = 2;

pub fn run_extract(args: ExtractArgs, ctx: DisplayContext) -> Result<()> {
    let controls = resolve_controls(&args.trajectory, args.io.config.as_deref())?;
    let format = resolve_input_format(args.input_format, &args.io.inputs)?;

    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    progress.step("Reading trajectory");
    let mut trajectory = read_vasp_trajectory(&args.io.inputs, format)?;
    if let Some(t) = controls.temperature {
        trajectory.temperature = t;
    }
    if let Some(dt) = controls.timestep {
        trajectory.timestep = dt;
    }

    let read_substeps = build_read_substeps(format, args.io.inputs.len(), &trajectory);
    let read_substeps_ref: Vec<&str> = read_substeps.iter().map(|s| s.as_str()).collect();
    progress.complete_step("Reading trajectory", &read_substeps_ref);

    if ctx.interactive {
        print_trajectory_info(&trajectory);
    }

    progress.step("Writing raw files");
    fs::create_dir_all(&args.io.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            args.io.output_dir.display()
        )
    })?;
    write_raw(&args.io.output_dir, &trajectory).context("Failed to write raw files")?;

    let write_substeps = build_write_substeps();
    let write_substeps_ref: Vec<&str> = write_substeps.iter().map(|s| s.as_str()).collect();
    progress.complete_step("Writing raw files", &write_substeps_ref);

    progress.finish();

    Ok(())
}

fn build_read_substeps(format: Format, n_files: usize, trajectory: &Trajectory) -> Vec<String> {
    let parse_step = match format {
        Format::Vasprun => format!("Parse {} vasprun.xml file(s)", n_files),
        Format::Outcar => format!("Parse {} OUTCAR file(s)", n_files),
        Format::Raw => "Load raw trajectory files".to_string(),
    };

    vec![
        parse_step,
        format!(
            "{} atoms, {} steps to convert",
            trajectory.num_atoms,
            trajectory.steps()
        ),
    ]
}

fn build_write_substeps() -> Vec<String> {
    vec![
        format!("Write reference cell → {}", POSCAR_EQ_FILE),
        format!("Write step blocks → {}", POSFOR_FILE),
        format!(
            "Write scalar series → {}, {}",
            ENERGY_FILE, PRESSURE_VIR_FILE
        ),
    ]
}

fn resolve_input_format(explicit: Option<InputFormat>, inputs: &[PathBuf]) -> Result<Format> {
    if let Some(fmt) = explicit {
        return Ok(fmt.into());
    }

    let first = match inputs.first() {
        Some(p) => p,
        None => bail!("No input given. Use -i/--input."),
    };
    if let Some(fmt) = infer_input_format(first) {
        return Ok(fmt);
    }
    bail!(
        "Cannot infer format from '{}'. Use --infmt to specify.",
        first.display()
    );
}

fn read_vasp_trajectory(inputs: &[PathBuf], format: Format) -> Result<Trajectory> {
    match format {
        Format::Vasprun => vasprun::read_files(inputs).context("Failed to read vasprun.xml input"),
        Format::Outcar => outcar::read_files(inputs).context("Failed to read OUTCAR input"),
        Format::Raw => bail!("Input is already in the raw layout; nothing to extract."),
    }
}
