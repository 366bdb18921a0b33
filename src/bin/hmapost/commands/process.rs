use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use hma_post::io::series::{
    ENERGY_SERIES_FILE, PRESSURE_SERIES_FILE, write_energy_series, write_pressure_series,
};
use hma_post::io::{Format, outcar, raw, vasprun};
use hma_post::{AnharmonicEstimator, EnergyUnit, Stats, StepResult, Summary, Trajectory, summarize};

use crate::cli::{InputFormat, ProcessArgs};
use crate::config::{Analysis, resolve_analysis};
use crate::display::{
    Context as DisplayContext, Progress, print_block_info, print_reference_info, print_statistics,
    print_trajectory_info,
};
use crate::io::infer_input_format;

const TOTAL_STEPS: u8 = 3;

pub fn run_process(args: ProcessArgs, ctx: DisplayContext) -> Result<()> {
    let analysis = resolve_analysis(&args.trajectory, &args.analysis, args.io.config.as_deref())?;
    let format = resolve_input_format(args.input_format, &args.io.inputs)?;

    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    progress.step("Reading trajectory");
    let trajectory = read_trajectory(&args.io.inputs, format, &analysis)?;

    let read_substeps = build_read_substeps(format, args.io.inputs.len(), &trajectory);
    let read_substeps_ref: Vec<&str> = read_substeps.iter().map(|s| s.as_str()).collect();
    progress.complete_step("Reading trajectory", &read_substeps_ref);

    if ctx.interactive {
        print_trajectory_info(&trajectory);
    }

    progress.step("Computing anharmonic estimators");
    let estimator = AnharmonicEstimator::new(trajectory, analysis.estimator_options())
        .context("Reference configuration check failed")?;
    let results = estimator
        .process(analysis.steps_tot)
        .context("Estimator evaluation failed")?;
    let summary = summarize(&results, analysis.steps_eq, analysis.blocksize)
        .context("Block statistics failed")?;

    let compute_substeps = build_compute_substeps(&results, &summary, &analysis);
    let compute_substeps_ref: Vec<&str> = compute_substeps.iter().map(|s| s.as_str()).collect();
    progress.complete_step("Computing anharmonic estimators", &compute_substeps_ref);

    if ctx.interactive {
        print_reference_info(&estimator);
        print_block_info(&summary, analysis.steps_eq, analysis.blocksize);
    }

    progress.step("Writing time series");
    write_series(&args.io.output_dir, estimator.trajectory().timestep, &results)?;

    let write_substeps = build_write_substeps(&args.io.output_dir);
    let write_substeps_ref: Vec<&str> = write_substeps.iter().map(|s| s.as_str()).collect();
    progress.complete_step("Writing time series", &write_substeps_ref);

    if ctx.interactive {
        print_statistics(&summary, estimator.options().energy_unit);
    }

    progress.finish();

    print_summary_lines(&summary, estimator.options().energy_unit);

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
            "{} atoms, {} recorded steps",
            trajectory.num_atoms,
            trajectory.steps()
        ),
    ]
}

fn build_compute_substeps(
    results: &[StepResult],
    summary: &Summary,
    analysis: &Analysis,
) -> Vec<String> {
    vec![
        format!(
            "Check reference forces (tol {:.1e} eV/Å)",
            analysis.force_tol
        ),
        format!(
            "Evaluate Conv and HMA estimators over {} steps",
            results.len()
        ),
        format!(
            "Average {} production steps in {} blocks",
            summary.production_steps, summary.blocks
        ),
    ]
}

fn build_write_substeps(dir: &Path) -> Vec<String> {
    vec![
        format!(
            "Write energy series → {}",
            dir.join(ENERGY_SERIES_FILE).display()
        ),
        format!(
            "Write pressure series → {}",
            dir.join(PRESSURE_SERIES_FILE).display()
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

fn read_trajectory(inputs: &[PathBuf], format: Format, analysis: &Analysis) -> Result<Trajectory> {
    let mut trajectory = match format {
        Format::Vasprun => {
            vasprun::read_files(inputs).context("Failed to read vasprun.xml input")?
        }
        Format::Outcar => outcar::read_files(inputs).context("Failed to read OUTCAR input")?,
        Format::Raw => {
            let dir = match inputs {
                [dir] => dir,
                _ => bail!(
                    "Raw input takes exactly one directory ({} paths given)",
                    inputs.len()
                ),
            };
            let (timestep, temperature) = match (analysis.timestep, analysis.temperature) {
                (Some(dt), Some(t)) => (dt, t),
                _ => bail!(
                    "Raw input carries no control parameters.\n\nPass --timestep and --temperature, or set them in a settings file."
                ),
            };
            raw::read_raw(dir, timestep, temperature).context("Failed to read raw input")?
        }
    };

    // For VASP input the flags beat whatever POTIM/TEBEG the files recorded.
    if let Some(t) = analysis.temperature {
        trajectory.temperature = t;
    }
    if let Some(dt) = analysis.timestep {
        trajectory.timestep = dt;
    }

    Ok(trajectory)
}

fn write_series(dir: &Path, timestep: f64, results: &[StepResult]) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let energy_path = dir.join(ENERGY_SERIES_FILE);
    let energy_file = File::create(&energy_path)
        .with_context(|| format!("Failed to create output file: {}", energy_path.display()))?;
    write_energy_series(BufWriter::new(energy_file), timestep, results)
        .context("Failed to write energy series")?;

    let pressure_path = dir.join(PRESSURE_SERIES_FILE);
    let pressure_file = File::create(&pressure_path)
        .with_context(|| format!("Failed to create output file: {}", pressure_path.display()))?;
    write_pressure_series(BufWriter::new(pressure_file), timestep, results)
        .context("Failed to write pressure series")?;

    Ok(())
}

fn print_summary_lines(summary: &Summary, unit: EnergyUnit) {
    let e_label = format!("{}/atom", unit.label());
    println!();
    print_stat_line("e_ah_conv", &e_label, &summary.e_ah_conv);
    print_stat_line("e_ah_hma", &e_label, &summary.e_ah_hma);
    print_stat_line("p_ah_conv", "GPa", &summary.p_ah_conv);
    print_stat_line("p_ah_hma", "GPa", &summary.p_ah_hma);
}

fn print_stat_line(name: &str, unit: &str, stats: &Stats) {
    println!(
        " {:<9} ({:>8}): {:10.5} +/- {:9.1e}    cor: {:5.2}",
        name, unit, stats.avg, stats.err, stats.cor
    );
}
