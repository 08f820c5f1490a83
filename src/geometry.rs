//! Points, crack paths and the Compact-Tension-Shear specimen layout.
//!
//! Coordinates live in the propagation frame: millimetres, origin at the
//! crack mouth, `x` increasing towards the far edge of the specimen. Display
//! coordinates are produced only on request through [`Specimen::to_display`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::GeometryError;

/// Position in the specimen plane measured in millimetres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Distance along the crack-growth axis.
    pub x: f64,
    /// Distance across the crack-growth axis.
    pub y: f64,
}

impl Point {
    /// Create a [`Point`] with explicit coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Angle in radians of the segment running from `self` to `other`.
    ///
    /// # Examples
    /// ```
    /// use ctsx::point;
    ///
    /// let angle = point(0.0, 0.0).angle_to(point(1.0, 1.0));
    /// assert!((angle - std::f64::consts::FRAC_PI_4).abs() < 1.0e-12);
    /// ```
    #[must_use]
    pub fn angle_to(self, other: Point) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// `true` when both coordinates are neither NaN nor infinite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x, self.y)
    }
}

/// Convenience helper for creating [`Point`] instances.
///
/// # Examples
/// ```
/// use ctsx::point;
///
/// let tip = point(19.0, 0.0);
/// assert_eq!(tip.x, 19.0);
/// ```
#[must_use]
pub const fn point(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

/// Ordered trajectory of a simulated crack.
///
/// The first two points are the seeds (crack mouth and pre-crack tip); every
/// further point was appended by one propagation step. Points are never
/// removed or reordered.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CrackPath {
    /// Points in insertion order.
    points: Vec<Point>,
}

impl CrackPath {
    /// Start a path from its two seed points.
    pub(crate) fn from_seeds(origin: Point, tip: Point) -> Self {
        Self {
            points: vec![origin, tip],
        }
    }

    /// Append a generated point.
    pub(crate) fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    /// The two most recent points, oldest first.
    pub(crate) fn last_segment(&self) -> (Point, Point) {
        let n = self.points.len();
        (self.points[n - 2], self.points[n - 1])
    }

    /// All points in traversal order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of points including both seeds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; a path holds at least its two seeds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The crack-mouth origin and the initial pre-crack tip.
    #[must_use]
    pub fn seeds(&self) -> (Point, Point) {
        (self.points[0], self.points[1])
    }

    /// Points produced by propagation steps, excluding the seeds.
    #[must_use]
    pub fn generated(&self) -> &[Point] {
        &self.points[2..]
    }

    /// The current crack tip.
    #[must_use]
    pub fn tip(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    /// Iterate over the points in traversal order.
    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    /// Consume the path and return its points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }
}

impl<'a> IntoIterator for &'a CrackPath {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Circular pin hole of the loading fixture, in display coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PinHole {
    /// Centre of the hole.
    pub center: Point,
    /// Hole radius in millimetres.
    pub radius: f64,
}

/// Dimensions of a Compact-Tension-Shear specimen in millimetres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Specimen {
    /// Overall length `L`, measured across the crack.
    length: f64,
    /// Overall width `W`, measured along the crack.
    width: f64,
    /// Vertical distance between pin rows `2c`.
    pin_vertical_distance: f64,
    /// Horizontal distance between the outer pins `b`.
    pin_horizontal_distance: f64,
    /// Pin diameter `d`.
    pin_diameter: f64,
    /// Initial crack length `a`.
    precrack: f64,
}

impl Default for Specimen {
    fn default() -> Self {
        Self {
            length: 71.4,
            width: 42.0,
            pin_vertical_distance: 50.4,
            pin_horizontal_distance: 25.2,
            pin_diameter: 6.3,
            precrack: 19.0,
        }
    }
}

impl Specimen {
    /// Describe a specimen, rejecting non-physical dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::NonPositiveDimension`] when any dimension is not
    /// strictly positive and [`GeometryError::PrecrackOutsideSpecimen`] when the
    /// pre-crack already reaches the far edge.
    ///
    /// # Examples
    /// ```
    /// use ctsx::Specimen;
    ///
    /// let specimen = Specimen::new(71.4, 42.0, 50.4, 25.2, 6.3, 19.0).expect("valid");
    /// assert_eq!(specimen, Specimen::default());
    /// ```
    pub fn new(
        length: f64,
        width: f64,
        pin_vertical_distance: f64,
        pin_horizontal_distance: f64,
        pin_diameter: f64,
        precrack: f64,
    ) -> Result<Self, GeometryError> {
        for (name, value) in [
            ("length", length),
            ("width", width),
            ("pin vertical distance", pin_vertical_distance),
            ("pin horizontal distance", pin_horizontal_distance),
            ("pin diameter", pin_diameter),
            ("precrack", precrack),
        ] {
            // NaN fails this comparison as well.
            if !(value > 0.0) {
                return Err(GeometryError::NonPositiveDimension { name, value });
            }
        }
        if precrack >= width {
            return Err(GeometryError::PrecrackOutsideSpecimen { precrack, width });
        }
        Ok(Self {
            length,
            width,
            pin_vertical_distance,
            pin_horizontal_distance,
            pin_diameter,
            precrack,
        })
    }

    /// Overall length `L`.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Overall width `W`.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Vertical distance between the pin rows `2c`.
    #[must_use]
    pub fn pin_vertical_distance(&self) -> f64 {
        self.pin_vertical_distance
    }

    /// Horizontal distance between the outer pins `b`.
    #[must_use]
    pub fn pin_horizontal_distance(&self) -> f64 {
        self.pin_horizontal_distance
    }

    /// Pin diameter `d`.
    #[must_use]
    pub fn pin_diameter(&self) -> f64 {
        self.pin_diameter
    }

    /// Initial crack length `a`.
    #[must_use]
    pub fn precrack(&self) -> f64 {
        self.precrack
    }

    /// Crack-mouth origin and the tip of the initial pre-crack.
    #[must_use]
    pub fn seed_points(&self) -> (Point, Point) {
        (point(0.0, 0.0), point(self.precrack, 0.0))
    }

    /// The six loading pin holes, lower row first, in display coordinates.
    #[must_use]
    pub fn pin_holes(&self) -> Vec<PinHole> {
        let first_x = (self.width - self.pin_horizontal_distance) / 2.0;
        let radius = self.pin_diameter / 2.0;
        let mut holes = Vec::with_capacity(6);
        for row in [-1.0, 1.0] {
            let y = self.length / 2.0 + row * self.pin_vertical_distance / 2.0;
            for column in 0..3 {
                let x = first_x + f64::from(column) * self.pin_horizontal_distance / 2.0;
                holes.push(PinHole {
                    center: point(x, y),
                    radius,
                });
            }
        }
        holes
    }

    /// Map a propagation-frame point into display coordinates.
    ///
    /// The crack is drawn entering from the right-hand edge at mid-height, so
    /// `x` is mirrored about the width and `y` is offset by half the length.
    #[must_use]
    pub fn to_display(&self, point: Point) -> Point {
        Point::new(self.width - point.x, self.length / 2.0 + point.y)
    }
}
