//! Crack-path propagation driven by a turning-angle predictor.
//!
//! Starting from two seed points the propagator repeatedly asks the
//! predictor how far the crack turns, advances the tip by a fixed increment
//! and stops once the tip reaches the far edge of the specimen.
//!
//! Each step works on the last two points of the path:
//!
//! 1. `phi = atan2(dy, dx)` of the most recent segment.
//! 2. Features `[90 - |phi|deg, theta, x / W, y / L]` go to the predictor,
//!    which returns a turning angle `beta` in degrees.
//! 3. The heading is `psi = -beta + (pi/2 - |phi|)` in radians.
//! 4. The new tip is `(x + d sin|psi|, y - d cos|psi|)`.
//!
//! Taking `|psi|` before projecting folds both heading signs onto one side,
//! so the tip never moves up in the propagation frame. Models trained on
//! this convention depend on it.
//!
//! The loop stops once `tip.x >= W`. Unless overridden, the number of steps
//! is capped at [`STEP_BUDGET_FACTOR`] times the steps a straight crack would
//! need, see [`step_budget`].

use std::f64::consts::FRAC_PI_2;

use tracing::{debug, info, warn};

use crate::errors::{ModelError, PropagationError};
use crate::geometry::{CrackPath, Point};
use crate::predictor::{AngleFeatures, TurnAnglePredictor};

/// Multiple of the straight-crack step count allowed before a path is
/// declared non-terminating.
pub const STEP_BUDGET_FACTOR: usize = 100;

/// Default iteration bound for a crack whose tip is at `tip_x`.
///
/// A straight crack needs `ceil((width - tip_x) / increment)` steps; the
/// budget is [`STEP_BUDGET_FACTOR`] times that, and never less than
/// [`STEP_BUDGET_FACTOR`]. Non-finite or non-positive ratios, such as a zero
/// increment, also get the minimum.
///
/// # Examples
/// ```
/// use ctsx::{step_budget, STEP_BUDGET_FACTOR};
///
/// assert_eq!(step_budget(19.0, 42.0, 2.0), 12 * STEP_BUDGET_FACTOR);
/// assert_eq!(step_budget(19.0, 42.0, 0.0), STEP_BUDGET_FACTOR);
/// ```
#[must_use]
pub fn step_budget(tip_x: f64, width: f64, increment: f64) -> usize {
    let straight = ((width - tip_x) / increment).ceil();
    if straight.is_finite() && straight >= 1.0 {
        // Float to integer casts saturate.
        (straight as usize).saturating_mul(STEP_BUDGET_FACTOR)
    } else {
        STEP_BUDGET_FACTOR
    }
}

/// Outcome of a single propagation step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    /// The new crack tip.
    pub point: Point,
    /// Signed heading `psi` in radians, before its absolute value is taken.
    pub total_angle: f64,
}

/// Advance the crack tip by one increment.
///
/// `previous` and `latest` are the last two points of the path; `latest` is
/// the current tip.
///
/// # Errors
///
/// Returns the predictor's [`ModelError`] unchanged.
///
/// # Examples
/// ```
/// use ctsx::{from_fn, next_point, point, AngleFeatures};
///
/// let straight = from_fn(|_: &AngleFeatures| 0.0);
/// let step = next_point(point(0.0, 0.0), point(19.0, 0.0), 45.0, 42.0, 71.4, 2.0, &straight)
///     .expect("infallible predictor");
/// assert!((step.point.x - 21.0).abs() < 1.0e-12);
/// ```
pub fn next_point<P>(
    previous: Point,
    latest: Point,
    loading_angle: f64,
    width: f64,
    length: f64,
    increment: f64,
    predictor: &P,
) -> Result<Step, ModelError>
where
    P: TurnAnglePredictor + ?Sized,
{
    let segment_angle = previous.angle_to(latest);
    let features = AngleFeatures::from_segment(previous, latest, loading_angle, width, length);
    let turn_angle = predictor.predict_turn_angle(&features)?;
    let total_angle = -turn_angle.to_radians() + (FRAC_PI_2 - segment_angle.abs());
    let heading = total_angle.abs();
    let point = Point::new(
        latest.x + increment * heading.sin(),
        latest.y - increment * heading.cos(),
    );
    Ok(Step { point, total_angle })
}

/// Generates crack paths with a configurable iteration bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrackPathPropagator {
    /// Maximum number of generated points before giving up; `None` derives
    /// the bound from the geometry with [`step_budget`].
    max_steps: Option<usize>,
}

impl Default for CrackPathPropagator {
    fn default() -> Self {
        Self::new()
    }
}

impl CrackPathPropagator {
    /// Propagator bounded by [`step_budget`] for each path.
    #[must_use]
    pub fn new() -> Self {
        Self { max_steps: None }
    }

    /// Use a fixed iteration bound instead of [`step_budget`].
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// The fixed iteration bound, if one was set.
    #[must_use]
    pub fn max_steps(&self) -> Option<usize> {
        self.max_steps
    }

    /// Propagate a crack from two seed points until its tip reaches `width`.
    ///
    /// If `tip.x >= width` already, the seeds are returned unchanged and the
    /// predictor is never called. Dimensions are not validated; zero `width`
    /// or `length` yields non-finite features rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`PropagationError::Predictor`] as soon as the predictor fails,
    /// [`PropagationError::NonFiniteTip`] when a step produces NaN or an
    /// infinite coordinate, and [`PropagationError::DidNotTerminate`] when
    /// the iteration bound is exhausted without reaching the edge. No partial
    /// path is returned.
    #[allow(clippy::too_many_arguments)]
    pub fn generate<P>(
        &self,
        origin: Point,
        tip: Point,
        loading_angle: f64,
        width: f64,
        length: f64,
        increment: f64,
        predictor: &P,
    ) -> Result<CrackPath, PropagationError>
    where
        P: TurnAnglePredictor + ?Sized,
    {
        let max_steps = self
            .max_steps
            .unwrap_or_else(|| step_budget(tip.x, width, increment));
        let mut path = CrackPath::from_seeds(origin, tip);
        let mut steps = 0;
        // A NaN tip never satisfies `>= width`, so it cannot pass for a finished path.
        loop {
            if path.tip().x >= width {
                break;
            }
            if steps == max_steps {
                warn!(
                    max_steps,
                    tip = %path.tip(),
                    "crack path did not reach the specimen edge"
                );
                return Err(PropagationError::DidNotTerminate {
                    max_steps,
                    tip: path.tip(),
                });
            }
            let (previous, latest) = path.last_segment();
            let step = next_point(
                previous,
                latest,
                loading_angle,
                width,
                length,
                increment,
                predictor,
            )?;
            steps += 1;
            if !step.point.is_finite() {
                warn!(step = steps, tip = %step.point, "crack tip left the real plane");
                return Err(PropagationError::NonFiniteTip {
                    step: steps,
                    tip: step.point,
                });
            }
            debug!(
                step = steps,
                x = step.point.x,
                y = step.point.y,
                total_angle = step.total_angle,
                "advanced crack tip"
            );
            path.push(step.point);
        }
        info!(steps, tip = %path.tip(), "crack path reached the specimen edge");
        Ok(path)
    }
}

/// Propagate a crack with the default iteration bound.
///
/// See [`CrackPathPropagator::generate`].
///
/// # Errors
///
/// Returns [`PropagationError`] when the predictor fails, a step leaves the
/// real plane, or the path does not reach the edge within
/// [`step_budget`] steps.
///
/// # Examples
/// ```
/// use ctsx::{from_fn, generate_path, point, AngleFeatures};
///
/// let straight = from_fn(|_: &AngleFeatures| 0.0);
/// let path = generate_path(point(0.0, 0.0), point(19.0, 0.0), 45.0, 42.0, 71.4, 2.0, &straight)
///     .expect("straight crack terminates");
/// assert_eq!(path.generated().len(), 12);
/// ```
pub fn generate_path<P>(
    origin: Point,
    tip: Point,
    loading_angle: f64,
    width: f64,
    length: f64,
    increment: f64,
    predictor: &P,
) -> Result<CrackPath, PropagationError>
where
    P: TurnAnglePredictor + ?Sized,
{
    CrackPathPropagator::new().generate(
        origin,
        tip,
        loading_angle,
        width,
        length,
        increment,
        predictor,
    )
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_4, SQRT_2};

    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::point;
    use crate::predictor::from_fn;

    /// Predictor that fails on its `fail_on`-th call.
    struct Flaky {
        calls: Cell<usize>,
        fail_on: usize,
    }

    impl TurnAnglePredictor for Flaky {
        fn predict_turn_angle(&self, _: &AngleFeatures) -> Result<f64, ModelError> {
            self.calls.set(self.calls.get() + 1);
            if self.calls.get() == self.fail_on {
                Err(ModelError::External("inference server went away".to_string()))
            } else {
                Ok(0.0)
            }
        }
    }

    #[test]
    fn single_step_matches_closed_form() {
        let turn = from_fn(|_: &AngleFeatures| 45.0);
        let step = next_point(
            point(0.0, 0.0),
            point(19.0, 0.0),
            45.0,
            42.0,
            71.4,
            2.0,
            &turn,
        )
        .expect("infallible");
        assert_relative_eq!(step.total_angle, FRAC_PI_4, epsilon = 1.0e-12);
        assert_relative_eq!(step.point.x, 19.0 + 2.0 * FRAC_PI_4.sin(), epsilon = 1.0e-9);
        assert_relative_eq!(step.point.y, -2.0 * FRAC_PI_4.cos(), epsilon = 1.0e-9);
    }

    #[test]
    fn negative_heading_is_folded() {
        // Segment pointing straight down, turn of 45 degrees: psi = -pi/4.
        let turn = from_fn(|_: &AngleFeatures| 45.0);
        let step = next_point(
            point(1.0, 1.0),
            point(1.0, 0.0),
            0.0,
            42.0,
            71.4,
            2.0,
            &turn,
        )
        .expect("infallible");
        assert_relative_eq!(step.total_angle, -FRAC_PI_4, epsilon = 1.0e-12);
        assert_relative_eq!(step.point.x, 1.0 + SQRT_2, epsilon = 1.0e-9);
        assert_relative_eq!(step.point.y, -SQRT_2, epsilon = 1.0e-9);
    }

    #[test]
    fn straight_crack_reaches_edge_in_expected_steps() {
        let straight = from_fn(|_: &AngleFeatures| 0.0);
        let path = generate_path(
            point(0.0, 0.0),
            point(19.0, 0.0),
            45.0,
            42.0,
            71.4,
            2.0,
            &straight,
        )
        .expect("terminates");
        // ceil((42 - 19) / 2) steps of exactly two millimetres.
        assert_eq!(path.generated().len(), 12);
        for (index, generated) in path.generated().iter().enumerate() {
            assert_relative_eq!(generated.x, 19.0 + 2.0 * (index as f64 + 1.0), epsilon = 1.0e-9);
            assert!(generated.y.abs() < 1.0e-9);
        }
        assert!(path.tip().x >= 42.0);
        assert!(path.points()[path.len() - 2].x < 42.0);
    }

    #[test]
    fn constant_turn_zigzags_towards_edge() {
        let turn = from_fn(|_: &AngleFeatures| 45.0);
        let path = generate_path(
            point(0.0, 0.0),
            point(19.0, 0.0),
            45.0,
            42.0,
            71.4,
            2.0,
            &turn,
        )
        .expect("terminates");
        let generated = path.generated();
        assert_relative_eq!(generated[0].x, 19.0 + SQRT_2, epsilon = 1.0e-9);
        assert_relative_eq!(generated[0].y, -SQRT_2, epsilon = 1.0e-9);
        // The second step turns straight down, the third diagonally again.
        assert_relative_eq!(generated[1].x, generated[0].x, epsilon = 1.0e-9);
        assert_relative_eq!(generated[1].y, generated[0].y - 2.0, epsilon = 1.0e-9);
        assert_relative_eq!(generated[2].x, generated[1].x + 2.0 * FRAC_1_SQRT_2, epsilon = 1.0e-9);
        assert!(path.tip().x >= 42.0);
    }

    #[test]
    fn tip_beyond_edge_skips_prediction() {
        let calls = Cell::new(0);
        let counting = from_fn(|_: &AngleFeatures| {
            calls.set(calls.get() + 1);
            0.0
        });
        let path = generate_path(
            point(0.0, 0.0),
            point(42.0, 0.0),
            45.0,
            42.0,
            71.4,
            2.0,
            &counting,
        )
        .expect("nothing to do");
        assert_eq!(path.points(), &[point(0.0, 0.0), point(42.0, 0.0)]);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn features_use_unscaled_tip_coordinates() {
        let seen = RefCell::new(Vec::new());
        let recording = from_fn(|features: &AngleFeatures| {
            seen.borrow_mut().push(*features);
            10.0
        });
        let path = generate_path(
            point(0.0, 0.0),
            point(19.0, 0.0),
            30.0,
            42.0,
            71.4,
            1.5,
            &recording,
        )
        .expect("terminates");
        let seen = seen.into_inner();
        assert_eq!(seen.len(), path.generated().len());
        for (features, window) in seen.iter().zip(path.points().windows(2)) {
            let tip = window[1];
            assert_eq!(features.normalized_x, tip.x / 42.0);
            assert_eq!(features.normalized_y, tip.y / 71.4);
            assert_eq!(features.loading_angle, 30.0);
            assert_eq!(
                features.prev_segment_angle,
                90.0 - window[0].angle_to(tip).to_degrees().abs()
            );
        }
    }

    #[test]
    fn predictor_failure_aborts_without_partial_path() {
        let flaky = Flaky {
            calls: Cell::new(0),
            fail_on: 3,
        };
        let error = generate_path(
            point(0.0, 0.0),
            point(19.0, 0.0),
            45.0,
            42.0,
            71.4,
            2.0,
            &flaky,
        )
        .expect_err("third call fails");
        assert!(matches!(
            error,
            PropagationError::Predictor(ModelError::External(_))
        ));
        assert_eq!(flaky.calls.get(), 3);
    }

    #[test]
    fn stalled_crack_hits_iteration_bound() {
        // Cancelling the heading sends the tip straight down forever.
        let stall = from_fn(|features: &AngleFeatures| features.prev_segment_angle);
        let error = CrackPathPropagator::new()
            .with_max_steps(25)
            .generate(
                point(0.0, 0.0),
                point(19.0, 0.0),
                45.0,
                42.0,
                71.4,
                2.0,
                &stall,
            )
            .expect_err("never reaches the edge");
        match error {
            PropagationError::DidNotTerminate { max_steps, tip } => {
                assert_eq!(max_steps, 25);
                assert_relative_eq!(tip.x, 19.0, epsilon = 1.0e-9);
                assert_relative_eq!(tip.y, -50.0, epsilon = 1.0e-9);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_step_bound_still_honours_boundary() {
        let straight = from_fn(|_: &AngleFeatures| 0.0);
        let propagator = CrackPathPropagator::new().with_max_steps(0);
        assert_eq!(propagator.max_steps(), Some(0));
        assert!(propagator
            .generate(point(0.0, 0.0), point(50.0, 0.0), 0.0, 42.0, 71.4, 2.0, &straight)
            .is_ok());
        assert!(matches!(
            propagator.generate(point(0.0, 0.0), point(19.0, 0.0), 0.0, 42.0, 71.4, 2.0, &straight),
            Err(PropagationError::DidNotTerminate { .. })
        ));
    }

    #[test]
    fn nan_turn_angle_is_an_error() {
        let nan = from_fn(|_: &AngleFeatures| f64::NAN);
        let error = generate_path(
            point(0.0, 0.0),
            point(19.0, 0.0),
            45.0,
            42.0,
            71.4,
            2.0,
            &nan,
        )
        .expect_err("NaN never reaches the edge");
        match error {
            PropagationError::NonFiniteTip { step, tip } => {
                assert_eq!(step, 1);
                assert!(tip.x.is_nan());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_finite_tip_is_caught_after_valid_steps() {
        let calls = Cell::new(0);
        let late_blowup = from_fn(|_: &AngleFeatures| {
            calls.set(calls.get() + 1);
            if calls.get() == 4 {
                f64::INFINITY
            } else {
                0.0
            }
        });
        let error = generate_path(
            point(0.0, 0.0),
            point(19.0, 0.0),
            45.0,
            42.0,
            71.4,
            2.0,
            &late_blowup,
        )
        .expect_err("infinite turn");
        assert!(matches!(error, PropagationError::NonFiniteTip { step: 4, .. }));
    }

    #[test]
    fn nan_seed_tip_is_not_a_finished_path() {
        let straight = from_fn(|_: &AngleFeatures| 0.0);
        let error = generate_path(
            point(0.0, 0.0),
            point(f64::NAN, 0.0),
            45.0,
            42.0,
            71.4,
            2.0,
            &straight,
        )
        .expect_err("NaN seed");
        assert!(matches!(error, PropagationError::NonFiniteTip { step: 1, .. }));
    }

    #[test]
    fn step_budget_scales_with_geometry() {
        assert_eq!(step_budget(19.0, 42.0, 2.0), 12 * STEP_BUDGET_FACTOR);
        assert_eq!(step_budget(19.0, 42.0, 0.5), 46 * STEP_BUDGET_FACTOR);
        assert_eq!(step_budget(41.5, 42.0, 2.0), STEP_BUDGET_FACTOR);
        assert_eq!(step_budget(19.0, 42.0, 0.0), STEP_BUDGET_FACTOR);
        assert_eq!(step_budget(19.0, 42.0, -1.0), STEP_BUDGET_FACTOR);
        assert_eq!(step_budget(f64::NAN, 42.0, 2.0), STEP_BUDGET_FACTOR);
    }

    #[test]
    fn fine_increments_reach_the_edge() {
        let straight = from_fn(|_: &AngleFeatures| 0.0);
        let path = generate_path(
            point(0.0, 0.0),
            point(19.0, 0.0),
            45.0,
            42.0,
            71.4,
            0.002,
            &straight,
        )
        .expect("11 500 straight steps fit the default budget");
        // Accumulated rounding may add a final step.
        assert!((11_500..=11_501).contains(&path.generated().len()));
        assert!(path.tip().x >= 42.0);
    }

    #[test]
    fn stalled_crack_uses_geometric_budget_by_default() {
        let stall = from_fn(|features: &AngleFeatures| features.prev_segment_angle);
        let error = generate_path(
            point(0.0, 0.0),
            point(19.0, 0.0),
            45.0,
            42.0,
            71.4,
            2.0,
            &stall,
        )
        .expect_err("never reaches the edge");
        assert!(matches!(
            error,
            PropagationError::DidNotTerminate { max_steps, .. } if max_steps == 12 * STEP_BUDGET_FACTOR
        ));
    }
}
