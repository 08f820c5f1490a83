//! Error types produced while describing specimens, evaluating models or
//! propagating crack paths.

use std::path::PathBuf;

use thiserror::Error;

use crate::geometry::Point;

/// Error returned when a specimen description is not physically meaningful.
///
/// # Examples
///
/// ```
/// use ctsx::{GeometryError, Specimen};
///
/// let error = Specimen::new(71.4, 0.0, 50.4, 25.2, 6.3, 19.0)
///     .expect_err("zero width is rejected");
/// assert_eq!(
///     error,
///     GeometryError::NonPositiveDimension { name: "width", value: 0.0 }
/// );
/// ```
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum GeometryError {
    /// Returned when a specimen dimension is zero or negative.
    #[error("{name} must be positive (received {value})")]
    NonPositiveDimension {
        /// Name of the offending dimension.
        name: &'static str,
        /// Rejected value in millimetres.
        value: f64,
    },
    /// Returned when the initial crack already reaches the far edge.
    #[error("precrack length {precrack} must be shorter than the specimen width {width}")]
    PrecrackOutsideSpecimen {
        /// Initial crack length in millimetres.
        precrack: f64,
        /// Specimen width in millimetres.
        width: f64,
    },
    /// Returned when the propagation increment is zero or negative.
    #[error("increment must be positive (received {0})")]
    NonPositiveIncrement(f64),
}

/// Error returned by a regression model, a feature scaler or an artifact loader.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Returned when a model receives a feature vector of the wrong length.
    #[error("expected {expected} features, received {found}")]
    FeatureCount {
        /// Number of features the model was fitted with.
        expected: usize,
        /// Number of features supplied.
        found: usize,
    },
    /// Returned when a model artifact cannot be read.
    #[error("cannot read model artifact {path}: {source}")]
    Io {
        /// Location of the artifact.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Returned when a model artifact is not valid JSON for its model type.
    #[error("malformed model artifact {path}: {source}")]
    Format {
        /// Location of the artifact.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// Returned when a model is structurally inconsistent.
    #[error("invalid model: {0}")]
    InvalidModel(String),
    /// Returned when an out-of-process inference service fails.
    #[error("external model failed: {0}")]
    External(String),
    /// Returned when a model produces NaN or an infinite value.
    #[error("model produced a non-finite prediction ({0})")]
    NonFinite(f64),
    /// Returned when a model family name is not recognised.
    #[error("unknown model family `{0}` (expected DNN, XGBoost or TabNet)")]
    UnknownFamily(String),
}

/// Error returned when a crack path cannot be generated.
#[derive(Debug, Error)]
pub enum PropagationError {
    /// The predictor failed; the model error is passed through untouched.
    #[error(transparent)]
    Predictor(#[from] ModelError),
    /// The path did not reach the far edge within the iteration bound.
    #[error("crack path did not reach the specimen edge within {max_steps} steps (tip at {tip})")]
    DidNotTerminate {
        /// Iteration bound that was exhausted.
        max_steps: usize,
        /// Last point generated before giving up.
        tip: Point,
    },
    /// A step produced a NaN or infinite crack tip.
    #[error("step {step} moved the crack tip to a non-finite position {tip}")]
    NonFiniteTip {
        /// One-based index of the offending step.
        step: usize,
        /// The rejected point.
        tip: Point,
    },
}
