//! Regression models that can drive the crack-path propagator.
//!
//! Three model families are supported, mirroring the families the turning
//! angle models were trained with: a feed-forward neural network behind a
//! standard scaler, a gradient-boosted tree ensemble, and an attention-based
//! tabular model that is served out of process.

mod external;
mod network;
mod scaler;
mod store;
mod trees;

use std::fmt;
use std::str::FromStr;

pub use external::ExternalModel;
pub use network::{Activation, DenseLayer, DenseNetwork};
pub use scaler::StandardScaler;
pub use store::ModelStore;
pub use trees::{Tree, TreeEnsemble, TreeNode};

use crate::errors::ModelError;

/// A fitted regression model with a scalar output.
pub trait Regressor {
    /// Predict a single value from `features`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] when the input has the wrong length or the model
    /// cannot be evaluated.
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError>;

    /// Number of features the model was fitted with.
    fn input_len(&self) -> usize;
}

/// A fitted transform applied to features before inference.
pub trait FeatureScaler {
    /// Transform `features` into the model's input space.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::FeatureCount`] when the input has the wrong length.
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ModelError>;

    /// Number of features the scaler was fitted with.
    fn input_len(&self) -> usize;
}

impl<T: Regressor + ?Sized> Regressor for Box<T> {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        (**self).predict(features)
    }

    fn input_len(&self) -> usize {
        (**self).input_len()
    }
}

/// A model that requires its inputs to be scaled first.
#[derive(Clone, Debug)]
pub struct Scaled<S, R> {
    /// Scaler fitted on the training features.
    scaler: S,
    /// Model fitted on the scaled features.
    model: R,
}

impl<S: FeatureScaler, R: Regressor> Scaled<S, R> {
    /// Compose a scaler with the model it was fitted for.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::FeatureCount`] when the two disagree on the
    /// number of features.
    pub fn new(scaler: S, model: R) -> Result<Self, ModelError> {
        if scaler.input_len() != model.input_len() {
            return Err(ModelError::FeatureCount {
                expected: model.input_len(),
                found: scaler.input_len(),
            });
        }
        Ok(Self { scaler, model })
    }
}

impl<S: FeatureScaler, R: Regressor> Regressor for Scaled<S, R> {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        let scaled = self.scaler.transform(features)?;
        self.model.predict(&scaled)
    }

    fn input_len(&self) -> usize {
        self.scaler.input_len()
    }
}

/// Check that a feature slice matches the fitted input length.
pub(crate) fn check_len(expected: usize, features: &[f64]) -> Result<(), ModelError> {
    if features.len() == expected {
        Ok(())
    } else {
        Err(ModelError::FeatureCount {
            expected,
            found: features.len(),
        })
    }
}

/// The model families available for turning-angle prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    /// Feed-forward neural network with a standard scaler in front.
    NeuralNetwork,
    /// Gradient-boosted decision trees.
    GradientBoosting,
    /// Attention-based tabular network, evaluated out of process.
    TabNet,
}

impl ModelFamily {
    /// All families in the order they are offered to users.
    pub const ALL: [ModelFamily; 3] = [
        ModelFamily::NeuralNetwork,
        ModelFamily::GradientBoosting,
        ModelFamily::TabNet,
    ];

    /// Short name used on the command line and in reports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ModelFamily::NeuralNetwork => "DNN",
            ModelFamily::GradientBoosting => "XGBoost",
            ModelFamily::TabNet => "TabNet",
        }
    }

    /// Version of the released turning-angle model for this family.
    #[must_use]
    pub fn angle_model_version(self) -> u32 {
        match self {
            ModelFamily::NeuralNetwork => 5,
            ModelFamily::GradientBoosting => 8,
            ModelFamily::TabNet => 6,
        }
    }

    /// File name of the turning-angle model artifact.
    #[must_use]
    pub fn angle_model_file(self) -> String {
        let version = self.angle_model_version();
        match self {
            ModelFamily::NeuralNetwork => format!("model_angle_nn_optuna_ver{version}.json"),
            ModelFamily::GradientBoosting => format!("model_angle_XGBoost_ver{version}.json"),
            ModelFamily::TabNet => format!("model_angle_tabnet_ver{version}.json"),
        }
    }

    /// File name of the feature scaler, for families that use one.
    #[must_use]
    pub fn angle_scaler_file(self) -> Option<String> {
        match self {
            ModelFamily::NeuralNetwork => Some(format!(
                "scaler_angle_nn_optuna_ver{}.json",
                self.angle_model_version()
            )),
            ModelFamily::GradientBoosting | ModelFamily::TabNet => None,
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelFamily {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelFamily::ALL
            .into_iter()
            .find(|family| family.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::UnknownFamily(s.to_string()))
    }
}
