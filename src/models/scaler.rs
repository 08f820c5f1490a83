use serde::Deserialize;

use super::{check_len, FeatureScaler};
use crate::errors::ModelError;

/// Standardizes features as `(x - mean) / scale`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RawScaler")]
pub struct StandardScaler {
    /// Per-feature mean of the training data.
    mean: Vec<f64>,
    /// Per-feature standard deviation of the training data.
    scale: Vec<f64>,
}

/// Serialized form, validated through [`StandardScaler::new`].
#[derive(Deserialize)]
struct RawScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl TryFrom<RawScaler> for StandardScaler {
    type Error = ModelError;

    fn try_from(raw: RawScaler) -> Result<Self, Self::Error> {
        StandardScaler::new(raw.mean, raw.scale)
    }
}

impl StandardScaler {
    /// Create a scaler from fitted statistics.
    ///
    /// A zero scale marks a constant training feature and is replaced by one,
    /// so that feature is only centred.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidModel`] when the vectors differ in length,
    /// are empty, or hold non-finite values.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ModelError> {
        if mean.is_empty() || mean.len() != scale.len() {
            return Err(ModelError::InvalidModel(format!(
                "scaler mean ({}) and scale ({}) must be non-empty and equally long",
                mean.len(),
                scale.len()
            )));
        }
        if mean.iter().chain(&scale).any(|value| !value.is_finite()) {
            return Err(ModelError::InvalidModel(
                "scaler statistics must be finite".to_string(),
            ));
        }
        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();
        Ok(Self { mean, scale })
    }
}

impl FeatureScaler for StandardScaler {
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_len(self.mean.len(), features)?;
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect())
    }

    fn input_len(&self) -> usize {
        self.mean.len()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn standardizes_each_feature() {
        let scaler = StandardScaler::new(vec![45.0, 30.0], vec![15.0, 0.0]).expect("valid");
        let scaled = scaler.transform(&[60.0, 35.0]).expect("two features");
        assert_relative_eq!(scaled[0], 1.0);
        assert_relative_eq!(scaled[1], 5.0);
    }

    #[test]
    fn rejects_wrong_feature_count() {
        let scaler = StandardScaler::new(vec![0.0; 4], vec![1.0; 4]).expect("valid");
        assert!(matches!(
            scaler.transform(&[1.0, 2.0]),
            Err(ModelError::FeatureCount {
                expected: 4,
                found: 2
            })
        ));
    }

    #[test]
    fn deserialization_validates_statistics() {
        let scaler: StandardScaler =
            serde_json::from_str(r#"{"mean": [1.0], "scale": [2.0]}"#).expect("valid json");
        assert_eq!(scaler.input_len(), 1);
        let mismatched = serde_json::from_str::<StandardScaler>(r#"{"mean": [1.0], "scale": []}"#);
        assert!(mismatched.is_err());
    }
}
