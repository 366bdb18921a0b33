use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use hma_post::{EnergyUnit, EstimatorOptions};

use crate::cli::{AnalysisOptions, TrajectoryOptions};

const DEFAULT_ANALYSIS_TOML: &str = include_str!("../../../../resources/default.analysis.toml");

static DEFAULT_ANALYSIS: OnceLock<AnalysisFile> = OnceLock::new();

/// Analysis settings as they appear in a TOML settings file.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisFile {
    pub temperature: Option<f64>,
    pub timestep: Option<f64>,
    pub steps_tot: Option<usize>,
    #[serde(default = "default_pressure_qh")]
    pub pressure_qh: f64,
    #[serde(default = "default_steps_eq")]
    pub steps_eq: usize,
    #[serde(default = "default_blocksize")]
    pub blocksize: usize,
    #[serde(default = "default_force_tol")]
    pub force_tol: f64,
    #[serde(default)]
    pub mev: bool,
}

fn default_pressure_qh() -> f64 {
    0.0
}
fn default_steps_eq() -> usize {
    0
}
fn default_blocksize() -> usize {
    10
}
fn default_force_tol() -> f64 {
    1.0e-3
}

impl Default for AnalysisFile {
    fn default() -> Self {
        Self {
            temperature: None,
            timestep: None,
            steps_tot: None,
            pressure_qh: default_pressure_qh(),
            steps_eq: default_steps_eq(),
            blocksize: default_blocksize(),
            force_tol: default_force_tol(),
            mev: false,
        }
    }
}

/// Fully resolved analysis settings.
///
/// Precedence: command-line flags, then the settings file, then the
/// built-in defaults.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub temperature: Option<f64>,
    pub timestep: Option<f64>,
    pub steps_tot: Option<usize>,
    pub pressure_qh: f64,
    pub steps_eq: usize,
    pub blocksize: usize,
    pub force_tol: f64,
    pub mev: bool,
}

impl Analysis {
    pub fn estimator_options(&self) -> EstimatorOptions {
        EstimatorOptions {
            pressure_qh: self.pressure_qh,
            energy_unit: if self.mev {
                EnergyUnit::Mev
            } else {
                EnergyUnit::Ev
            },
            force_tol: self.force_tol,
        }
    }
}

/// Control-parameter overrides for commands that only read and convert.
#[derive(Debug, Clone, Copy)]
pub struct Controls {
    pub temperature: Option<f64>,
    pub timestep: Option<f64>,
}

pub fn resolve_analysis(
    trajectory: &TrajectoryOptions,
    analysis: &AnalysisOptions,
    config: Option<&Path>,
) -> Result<Analysis> {
    let file = load_analysis_file(config)?;
    Ok(Analysis {
        temperature: trajectory.temperature.or(file.temperature),
        timestep: trajectory.timestep.or(file.timestep),
        steps_tot: analysis.steps.or(file.steps_tot),
        pressure_qh: analysis.pressure_qh.unwrap_or(file.pressure_qh),
        steps_eq: analysis.equilibration.unwrap_or(file.steps_eq),
        blocksize: analysis.blocksize.unwrap_or(file.blocksize),
        force_tol: analysis.force_tol.unwrap_or(file.force_tol),
        mev: analysis.mev || file.mev,
    })
}

pub fn resolve_controls(
    trajectory: &TrajectoryOptions,
    config: Option<&Path>,
) -> Result<Controls> {
    let file = load_analysis_file(config)?;
    Ok(Controls {
        temperature: trajectory.temperature.or(file.temperature),
        timestep: trajectory.timestep.or(file.timestep),
    })
}

fn load_analysis_file(path: Option<&Path>) -> Result<AnalysisFile> {
    match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read settings file: {}", p.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("Failed to parse settings file: {}", p.display()))
        }
        None => Ok(default_analysis().clone()),
    }
}

fn default_analysis() -> &'static AnalysisFile {
    DEFAULT_ANALYSIS.get_or_init(|| {
        toml::from_str(DEFAULT_ANALYSIS_TOML)
            .expect("Failed to parse embedded default analysis settings. This is a bug.")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_cli_trajectory() -> TrajectoryOptions {
        TrajectoryOptions {
            temperature: None,
            timestep: None,
        }
    }

    fn no_cli_analysis() -> AnalysisOptions {
        AnalysisOptions {
            pressure_qh: None,
            equilibration: None,
            blocksize: None,
            steps: None,
            force_tol: None,
            mev: false,
        }
    }

    #[test]
    fn embedded_defaults_parse() {
        let defaults = default_analysis();
        assert_eq!(defaults.pressure_qh, 0.0);
        assert_eq!(defaults.steps_eq, 0);
        assert_eq!(defaults.blocksize, 10);
        assert_eq!(defaults.force_tol, 1.0e-3);
        assert!(!defaults.mev);
        assert!(defaults.temperature.is_none());
        assert!(defaults.timestep.is_none());
        assert!(defaults.steps_tot.is_none());
    }

    #[test]
    fn partial_file_fills_missing_keys_from_defaults() {
        let file: AnalysisFile = toml::from_str("blocksize = 25\nmev = true\n").unwrap();
        assert_eq!(file.blocksize, 25);
        assert!(file.mev);
        assert_eq!(file.steps_eq, 0);
        assert_eq!(file.force_tol, 1.0e-3);
    }

    #[test]
    fn cli_flags_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.toml");
        std::fs::write(
            &path,
            "temperature = 300.0\nblocksize = 25\npressure_qh = 4.5\n",
        )
        .unwrap();

        let trajectory = TrajectoryOptions {
            temperature: Some(500.0),
            timestep: None,
        };
        let analysis = AnalysisOptions {
            blocksize: Some(50),
            ..no_cli_analysis()
        };

        let resolved = resolve_analysis(&trajectory, &analysis, Some(&path)).unwrap();
        assert_eq!(resolved.temperature, Some(500.0));
        assert_eq!(resolved.blocksize, 50);
        assert_eq!(resolved.pressure_qh, 4.5);
        assert_eq!(resolved.steps_eq, 0);
    }

    #[test]
    fn without_file_cli_merges_into_defaults() {
        let analysis = AnalysisOptions {
            equilibration: Some(100),
            mev: true,
            ..no_cli_analysis()
        };

        let resolved = resolve_analysis(&no_cli_trajectory(), &analysis, None).unwrap();
        assert_eq!(resolved.steps_eq, 100);
        assert_eq!(resolved.blocksize, 10);
        assert!(resolved.mev);
        assert!(resolved.temperature.is_none());
    }

    #[test]
    fn mev_selects_energy_unit() {
        let resolved = resolve_analysis(
            &no_cli_trajectory(),
            &AnalysisOptions {
                mev: true,
                ..no_cli_analysis()
            },
            None,
        )
        .unwrap();
        assert_eq!(resolved.estimator_options().energy_unit, EnergyUnit::Mev);
    }

    #[test]
    fn malformed_settings_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.toml");
        std::fs::write(&path, "blocksize = \"ten\"\n").unwrap();

        let err = resolve_analysis(&no_cli_trajectory(), &no_cli_analysis(), Some(&path))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings file"));
    }
}
