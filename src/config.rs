use std::fs;
use std::path::{Path, PathBuf};

use ctsx::{GeometryError, ModelFamily, Specimen};
use serde::Deserialize;

use crate::cli::{Cli, CliError};

/// Simulation settings read from a JSON file. Missing fields fall back to
/// the standard CTS setup.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub pin_vertical_distance: Option<f64>,
    pub pin_horizontal_distance: Option<f64>,
    pub pin_diameter: Option<f64>,
    pub precrack: Option<f64>,
    pub theta: Option<f64>,
    pub increment: Option<f64>,
    pub model: Option<String>,
    pub models_dir: Option<PathBuf>,
    pub max_steps: Option<usize>,
}

impl SimulationConfig {
    /// Read a configuration file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| CliError::ConfigFormat {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fully resolved inputs for one crack-path prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub specimen: Specimen,
    /// Loading direction angle theta in degrees.
    pub theta: f64,
    /// Crack growth increment in millimetres.
    pub increment: f64,
    pub model: ModelFamily,
    pub models_dir: PathBuf,
    /// Fixed iteration bound; `None` lets the propagator size it from the geometry.
    pub max_steps: Option<usize>,
}

impl Simulation {
    /// Combine defaults, the optional config file and command-line flags, in
    /// increasing order of precedence.
    pub fn resolve(cli: &Cli, file: SimulationConfig) -> Result<Self, CliError> {
        let defaults = Specimen::default();
        let specimen = Specimen::new(
            cli.length.or(file.length).unwrap_or(defaults.length()),
            cli.width.or(file.width).unwrap_or(defaults.width()),
            cli.pin_vertical_distance
                .or(file.pin_vertical_distance)
                .unwrap_or(defaults.pin_vertical_distance()),
            cli.pin_horizontal_distance
                .or(file.pin_horizontal_distance)
                .unwrap_or(defaults.pin_horizontal_distance()),
            cli.pin_diameter
                .or(file.pin_diameter)
                .unwrap_or(defaults.pin_diameter()),
            cli.precrack.or(file.precrack).unwrap_or(defaults.precrack()),
        )?;
        let increment = cli.increment.or(file.increment).unwrap_or(2.0);
        if !(increment > 0.0) {
            return Err(GeometryError::NonPositiveIncrement(increment).into());
        }
        let model = match (cli.model, file.model) {
            (Some(model), _) => model,
            (None, Some(name)) => name.parse()?,
            (None, None) => ModelFamily::NeuralNetwork,
        };
        Ok(Self {
            specimen,
            theta: cli.theta.or(file.theta).unwrap_or(45.0),
            increment,
            model,
            models_dir: cli
                .models_dir
                .clone()
                .or(file.models_dir)
                .unwrap_or_else(|| PathBuf::from("MODELS")),
            max_steps: cli.max_steps.or(file.max_steps),
        })
    }
}
