use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use ctsx::{CrackPathPropagator, GeometryError, ModelError, ModelFamily, ModelStore, PropagationError};
use thiserror::Error;
use tracing::info;

use crate::config::{Simulation, SimulationConfig};
use crate::report::{render_json, render_table, PathReport};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file {path}: {source}")]
    ConfigFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid specimen: {0}")]
    Geometry(#[from] GeometryError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("crack path prediction failed: {0}")]
    Propagation(#[from] PropagationError),

    #[error("cannot encode report: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One row per point.
    Table,
    /// Machine-readable JSON document.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "ctsx",
    about = "Predict the crack path of a Compact-Tension-Shear specimen with a pretrained model",
    version
)]
pub struct Cli {
    /// JSON file with simulation settings; flags override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Length of the specimen L [mm] (default 71.4).
    #[arg(long)]
    pub length: Option<f64>,

    /// Width of the specimen W [mm] (default 42).
    #[arg(long)]
    pub width: Option<f64>,

    /// Vertical distance between pins 2c [mm] (default 50.4).
    #[arg(long)]
    pub pin_vertical_distance: Option<f64>,

    /// Horizontal distance between the external pins b [mm] (default 25.2).
    #[arg(long)]
    pub pin_horizontal_distance: Option<f64>,

    /// Pin diameter d [mm] (default 6.3).
    #[arg(long)]
    pub pin_diameter: Option<f64>,

    /// Initial crack length a [mm] (default 19).
    #[arg(long)]
    pub precrack: Option<f64>,

    /// Loading direction angle theta [deg] (default 45).
    #[arg(long, allow_negative_numbers = true)]
    pub theta: Option<f64>,

    /// Crack growth increment [mm] (default 2).
    #[arg(long)]
    pub increment: Option<f64>,

    /// Model family: DNN, XGBoost or TabNet (default DNN).
    #[arg(long)]
    pub model: Option<ModelFamily>,

    /// Directory holding the model artifacts (default MODELS).
    #[arg(long)]
    pub models_dir: Option<PathBuf>,

    /// Give up after this many propagation steps (default: 100 times the
    /// steps a straight crack needs).
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Report points in the display frame (mirrored, offset to mid-height).
    #[arg(long)]
    pub display: bool,

    /// Log every propagation step to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn run(cli: &Cli) -> Result<String, CliError> {
    let file = match &cli.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    let simulation = Simulation::resolve(cli, file)?;
    info!(
        model = %simulation.model,
        theta = simulation.theta,
        increment = simulation.increment,
        "predicting crack path"
    );

    let predictor = ModelStore::new(&simulation.models_dir).angle_predictor(simulation.model)?;
    let (origin, tip) = simulation.specimen.seed_points();
    let mut propagator = CrackPathPropagator::new();
    if let Some(max_steps) = simulation.max_steps {
        propagator = propagator.with_max_steps(max_steps);
    }
    let path = propagator.generate(
        origin,
        tip,
        simulation.theta,
        simulation.specimen.width(),
        simulation.specimen.length(),
        simulation.increment,
        &predictor,
    )?;

    let report = PathReport::new(&simulation, &path, cli.display);
    match cli.format {
        OutputFormat::Table => Ok(render_table(&report)),
        OutputFormat::Json => Ok(render_json(&report)?),
    }
}
