#![warn(clippy::all)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod errors;
mod geometry;
pub mod models;
mod predictor;
mod propagator;

pub use errors::{GeometryError, ModelError, PropagationError};
pub use geometry::{point, CrackPath, PinHole, Point, Specimen};
pub use models::{ModelFamily, ModelStore};
pub use predictor::{
    from_fn, AngleFeatures, AngleModel, FnPredictor, TurnAnglePredictor, FEATURE_COUNT,
    RIGHT_ANGLE_DEG,
};
pub use propagator::{
    generate_path, next_point, step_budget, CrackPathPropagator, Step, STEP_BUDGET_FACTOR,
};
