//! The local-angle predictor consumed by the crack-path propagator.
//!
//! Models that predict the crack turning angle were trained on a fixed
//! four-feature layout. [`AngleFeatures`] reproduces that layout and
//! [`TurnAnglePredictor`] is the single capability the propagator needs.

use crate::errors::ModelError;
use crate::geometry::Point;
use crate::models::Regressor;

/// Number of features every turning-angle model consumes.
pub const FEATURE_COUNT: usize = 4;

/// Reference angle in degrees from which the previous segment angle is
/// measured when it is fed to a model.
pub const RIGHT_ANGLE_DEG: f64 = 90.0;

/// Feature vector for one propagation step, in training order.
///
/// The order is `[90 - |segment angle in degrees|, loading angle, x / W, y / L]`.
/// Models trained on this convention only produce meaningful output when it
/// is reproduced exactly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AngleFeatures {
    /// `90 - |angle of the most recent segment|`, in degrees.
    pub prev_segment_angle: f64,
    /// Loading direction angle theta, in degrees.
    pub loading_angle: f64,
    /// Crack tip `x` divided by the specimen width.
    pub normalized_x: f64,
    /// Crack tip `y` divided by the specimen length.
    pub normalized_y: f64,
}

impl AngleFeatures {
    /// Build the features for the segment running from `previous` to `latest`.
    ///
    /// # Examples
    /// ```
    /// use ctsx::{point, AngleFeatures};
    ///
    /// let features =
    ///     AngleFeatures::from_segment(point(0.0, 0.0), point(21.0, 0.0), 45.0, 42.0, 71.4);
    /// assert_eq!(features.to_array(), [90.0, 45.0, 0.5, 0.0]);
    /// ```
    #[must_use]
    pub fn from_segment(
        previous: Point,
        latest: Point,
        loading_angle: f64,
        width: f64,
        length: f64,
    ) -> Self {
        let segment_angle = previous.angle_to(latest);
        Self {
            prev_segment_angle: RIGHT_ANGLE_DEG - segment_angle.to_degrees().abs(),
            loading_angle,
            normalized_x: latest.x / width,
            normalized_y: latest.y / length,
        }
    }

    /// The features as a slice-ready array in training order.
    #[must_use]
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.prev_segment_angle,
            self.loading_angle,
            self.normalized_x,
            self.normalized_y,
        ]
    }
}

/// A model that predicts the turning angle of the crack for one step.
///
/// The returned value is in degrees. Implementations are called once per
/// propagation step and must not depend on being called in any particular
/// order across different paths.
pub trait TurnAnglePredictor {
    /// Predict the turning angle in degrees for the given features.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] when inference fails.
    fn predict_turn_angle(&self, features: &AngleFeatures) -> Result<f64, ModelError>;
}

impl<T: TurnAnglePredictor + ?Sized> TurnAnglePredictor for &T {
    fn predict_turn_angle(&self, features: &AngleFeatures) -> Result<f64, ModelError> {
        (**self).predict_turn_angle(features)
    }
}

impl<T: TurnAnglePredictor + ?Sized> TurnAnglePredictor for Box<T> {
    fn predict_turn_angle(&self, features: &AngleFeatures) -> Result<f64, ModelError> {
        (**self).predict_turn_angle(features)
    }
}

/// Predictor backed by a plain closure.
#[derive(Clone, Copy, Debug)]
pub struct FnPredictor<F> {
    /// The wrapped closure.
    f: F,
}

/// Wrap a closure as an infallible [`TurnAnglePredictor`].
///
/// # Examples
/// ```
/// use ctsx::{from_fn, AngleFeatures, TurnAnglePredictor};
///
/// let straight = from_fn(|_: &AngleFeatures| 0.0);
/// let features = AngleFeatures {
///     prev_segment_angle: 90.0,
///     loading_angle: 0.0,
///     normalized_x: 0.5,
///     normalized_y: 0.0,
/// };
/// assert_eq!(straight.predict_turn_angle(&features).expect("infallible"), 0.0);
/// ```
pub fn from_fn<F>(f: F) -> FnPredictor<F>
where
    F: Fn(&AngleFeatures) -> f64,
{
    FnPredictor { f }
}

impl<F> TurnAnglePredictor for FnPredictor<F>
where
    F: Fn(&AngleFeatures) -> f64,
{
    fn predict_turn_angle(&self, features: &AngleFeatures) -> Result<f64, ModelError> {
        Ok((self.f)(features))
    }
}

/// Adapts a four-feature [`Regressor`] into a [`TurnAnglePredictor`].
#[derive(Clone, Debug)]
pub struct AngleModel<R> {
    /// The regression model, including any scaler composed in front of it.
    model: R,
}

impl<R: Regressor> AngleModel<R> {
    /// Wrap a model fitted on the four angle features.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::FeatureCount`] when the model expects a different
    /// number of inputs.
    pub fn new(model: R) -> Result<Self, ModelError> {
        if model.input_len() != FEATURE_COUNT {
            return Err(ModelError::FeatureCount {
                expected: FEATURE_COUNT,
                found: model.input_len(),
            });
        }
        Ok(Self { model })
    }

    /// Borrow the wrapped model.
    #[must_use]
    pub fn model(&self) -> &R {
        &self.model
    }
}

impl<R: Regressor> TurnAnglePredictor for AngleModel<R> {
    fn predict_turn_angle(&self, features: &AngleFeatures) -> Result<f64, ModelError> {
        let value = self.model.predict(&features.to_array())?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ModelError::NonFinite(value))
        }
    }
}
