use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use super::{DenseNetwork, ExternalModel, ModelFamily, Scaled, StandardScaler, TreeEnsemble};
use crate::errors::ModelError;
use crate::predictor::{AngleModel, TurnAnglePredictor};

/// Directory of released model artifacts.
///
/// Artifacts are JSON files named after the model family and version, see
/// [`ModelFamily::angle_model_file`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelStore {
    /// Directory holding the artifacts.
    root: PathBuf,
}

impl ModelStore {
    /// Open a store rooted at `root`. Nothing is read until a model is requested.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the artifacts.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the turning-angle predictor of `family`.
    ///
    /// The neural network is composed with its fitted scaler; the other
    /// families consume raw features.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] when an artifact is missing, malformed, or
    /// fitted on a feature layout other than the four angle features.
    pub fn angle_predictor(
        &self,
        family: ModelFamily,
    ) -> Result<Box<dyn TurnAnglePredictor>, ModelError> {
        let model_path = self.root.join(family.angle_model_file());
        debug!(%family, path = %model_path.display(), "loading turning-angle model");
        let predictor: Box<dyn TurnAnglePredictor> = match family {
            ModelFamily::NeuralNetwork => {
                let network: DenseNetwork = read_artifact(&model_path)?;
                let scaler_file = family.angle_scaler_file().ok_or_else(|| {
                    ModelError::InvalidModel(format!("{family} has no scaler artifact"))
                })?;
                let scaler: StandardScaler = read_artifact(&self.root.join(scaler_file))?;
                Box::new(AngleModel::new(Scaled::new(scaler, network)?)?)
            }
            ModelFamily::GradientBoosting => {
                let ensemble: TreeEnsemble = read_artifact(&model_path)?;
                Box::new(AngleModel::new(ensemble)?)
            }
            ModelFamily::TabNet => {
                let service: ExternalModel = read_artifact(&model_path)?;
                Box::new(AngleModel::new(service)?)
            }
        };
        Ok(predictor)
    }
}

/// Read and deserialize a JSON artifact.
fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let text = fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ModelError::Format {
        path: path.to_path_buf(),
        source,
    })
}
