//! Input polylines and classified output shapes.

use std::f64::consts::TAU;

use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::error::RegularizeError;

/// Number of samples used when an ellipse is turned back into points.
const ELLIPSE_OUTLINE_SAMPLES: usize = 64;

/// An ordered, non-empty sequence of points tracing a curve.
///
/// Order is meaningful. The curve may be open or implicitly closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Rejects empty input and NaN or infinite coordinates.
    pub fn new(points: Vec<Point>) -> Result<Self, RegularizeError> {
        if points.is_empty() {
            return Err(RegularizeError::EmptyPolyline);
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(RegularizeError::NonFinite { index });
        }
        Ok(Self(points))
    }

    /// Build from `(x, y)` pairs.
    pub fn from_xy(points: &[(f64, f64)]) -> Result<Self, RegularizeError> {
        Self::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    pub fn points(&self) -> &[Point] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Move-to followed by line-to per point, for vector export.
    pub fn to_bez_path(&self) -> kurbo::BezPath {
        let mut path = kurbo::BezPath::new();
        path.move_to(self.0[0]);
        for &p in &self.0[1..] {
            path.line_to(p);
        }
        path
    }
}

impl TryFrom<Vec<Point>> for Polyline {
    type Error = RegularizeError;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<Polyline> for Vec<Point> {
    fn from(polyline: Polyline) -> Self {
        polyline.0
    }
}

/// Discriminant of [`PrimitiveShape`], in cascade priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Line,
    Circle,
    Ellipse,
    Rectangle,
    RoundedRectangle,
    RegularPolygon,
    Star,
    Unclassified,
}

impl ShapeKind {
    /// Every kind a detector can report.
    pub const ALL: [ShapeKind; 7] = [
        ShapeKind::Line,
        ShapeKind::Circle,
        ShapeKind::Ellipse,
        ShapeKind::Rectangle,
        ShapeKind::RoundedRectangle,
        ShapeKind::RegularPolygon,
        ShapeKind::Star,
    ];

    /// Lines, circles and ellipses have no meaningful boolean symmetry result.
    pub fn supports_symmetry(self) -> bool {
        !matches!(self, ShapeKind::Line | ShapeKind::Circle | ShapeKind::Ellipse)
    }
}

/// Canonical primitive recognised from a polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrimitiveShape {
    Line {
        start: Point,
        end: Point,
    },
    Circle {
        center: Point,
        radius: f64,
        /// Uniformly spaced samples on the ideal circle.
        samples: Vec<Point>,
    },
    Ellipse {
        center: Point,
        semi_major: f64,
        semi_minor: f64,
        /// Angle of the major axis from +x, radians.
        rotation: f64,
    },
    Rectangle {
        corners: [Point; 4],
    },
    RoundedRectangle {
        corners: [Point; 4],
        /// Estimated corner radius; 0 when the corners look sharp.
        corner_radius: f64,
    },
    RegularPolygon {
        vertices: Vec<Point>,
    },
    /// Vertices alternate between convex tips and concave notches.
    Star {
        vertices: Vec<Point>,
    },
    Unclassified {
        points: Vec<Point>,
    },
}

impl PrimitiveShape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            PrimitiveShape::Line { .. } => ShapeKind::Line,
            PrimitiveShape::Circle { .. } => ShapeKind::Circle,
            PrimitiveShape::Ellipse { .. } => ShapeKind::Ellipse,
            PrimitiveShape::Rectangle { .. } => ShapeKind::Rectangle,
            PrimitiveShape::RoundedRectangle { .. } => ShapeKind::RoundedRectangle,
            PrimitiveShape::RegularPolygon { .. } => ShapeKind::RegularPolygon,
            PrimitiveShape::Star { .. } => ShapeKind::Star,
            PrimitiveShape::Unclassified { .. } => ShapeKind::Unclassified,
        }
    }

    /// Canonical vertex sequence of the shape.
    pub fn outline(&self) -> Vec<Point> {
        match self {
            PrimitiveShape::Line { start, end } => vec![*start, *end],
            PrimitiveShape::Circle { samples, .. } => samples.clone(),
            PrimitiveShape::Ellipse {
                center,
                semi_major,
                semi_minor,
                rotation,
            } => ellipse_samples(*center, *semi_major, *semi_minor, *rotation, ELLIPSE_OUTLINE_SAMPLES),
            PrimitiveShape::Rectangle { corners }
            | PrimitiveShape::RoundedRectangle { corners, .. } => corners.to_vec(),
            PrimitiveShape::RegularPolygon { vertices } | PrimitiveShape::Star { vertices } => {
                vertices.clone()
            }
            PrimitiveShape::Unclassified { points } => points.clone(),
        }
    }

    /// Whether the outline should be drawn as a closed loop.
    pub fn is_closed(&self) -> bool {
        !matches!(
            self,
            PrimitiveShape::Line { .. } | PrimitiveShape::Unclassified { .. }
        )
    }
}

/// `n` points at uniformly spaced angles on a circle.
pub fn circle_samples(center: Point, radius: f64, n: usize) -> Vec<Point> {
    ellipse_samples(center, radius, radius, 0.0, n)
}

/// `n` points at uniformly spaced parameter values on a rotated ellipse.
pub fn ellipse_samples(center: Point, a: f64, b: f64, rotation: f64, n: usize) -> Vec<Point> {
    let (sin_r, cos_r) = rotation.sin_cos();
    (0..n)
        .map(|i| {
            let t = TAU * i as f64 / n as f64;
            let (sin_t, cos_t) = t.sin_cos();
            let (px, py) = (a * cos_t, b * sin_t);
            Point::new(
                center.x + cos_r * px - sin_r * py,
                center.y + sin_r * px + cos_r * py,
            )
        })
        .collect()
}
