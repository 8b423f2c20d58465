//! Reflectional and rotational symmetry of ordered point sequences.
//!
//! Both boolean tests compare points by index, not by nearest neighbour,
//! so they assume the curve is consistently parameterized: the same
//! physical shape sampled from a different start point or in the other
//! direction can give a different answer. The axis is an independent
//! estimate from principal component analysis and is only approximate.

use std::f64::consts::FRAC_PI_2;

use kurbo::{Point, Vec2};
use log::warn;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::SymmetryConfig;
use crate::geom::{centroid, principal_axes};
use crate::shape::{Polyline, PrimitiveShape};

/// Candidate reflection axes tried by [`OrderedSymmetry`].
const REFLECTION_ANGLES: [f64; 2] = [0.0, FRAC_PI_2];

/// Symmetry verdict for one curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymmetryReport {
    pub has_reflectional: bool,
    pub has_rotational: bool,
    /// Unit direction of least variance. Approximate.
    pub axis: Vec2,
    pub centroid: Point,
}

/// Boolean symmetry tests over an ordered point sequence.
pub trait SymmetryTester {
    fn is_reflective(&self, points: &[Point]) -> bool;
    fn is_rotational(&self, points: &[Point]) -> bool;
}

/// Index-wise comparison under an absolute coordinate tolerance.
#[derive(Debug, Clone)]
pub struct OrderedSymmetry {
    pub tolerance: f64,
    pub max_points: usize,
    pub include_trivial_rotation: bool,
}

impl From<&SymmetryConfig> for OrderedSymmetry {
    fn from(config: &SymmetryConfig) -> Self {
        Self {
            tolerance: config.tolerance,
            max_points: config.max_points,
            include_trivial_rotation: config.include_trivial_rotation,
        }
    }
}

impl OrderedSymmetry {
    fn close(&self, a: Point, b: Point) -> bool {
        (a.x - b.x).abs() <= self.tolerance && (a.y - b.y).abs() <= self.tolerance
    }
}

impl SymmetryTester for OrderedSymmetry {
    /// Rotating the centered points onto the reversed sequence, about
    /// the horizontal or the vertical axis.
    fn is_reflective(&self, points: &[Point]) -> bool {
        if points.is_empty() {
            return false;
        }
        let c = centroid(points);
        REFLECTION_ANGLES.iter().any(|&angle| {
            let (sin_a, cos_a) = angle.sin_cos();
            points.iter().zip(points.iter().rev()).all(|(p, mirror)| {
                let d = *p - c;
                let rotated = Vec2::new(d.x * cos_a - d.y * sin_a, d.x * sin_a + d.y * cos_a);
                self.close(c + rotated, *mirror)
            })
        })
    }

    /// Some cyclic shift of the sequence matches the sequence itself.
    fn is_rotational(&self, points: &[Point]) -> bool {
        let n = points.len();
        if n < 3 {
            return false;
        }
        if n > self.max_points {
            warn!(
                "rotational test skipped: {} points exceeds limit of {}",
                n, self.max_points
            );
            return false;
        }
        let first = if self.include_trivial_rotation { 0 } else { 1 };
        (first..n).any(|shift| (0..n).all(|i| self.close(points[(i + shift) % n], points[i])))
    }
}

/// Analyze a polyline's symmetry.
pub fn analyze_symmetry(polyline: &Polyline, config: &SymmetryConfig) -> SymmetryReport {
    analyze_points(polyline.points(), &OrderedSymmetry::from(config))
}

/// Analyze the canonical outline of a classified shape.
///
/// `None` for lines, circles and ellipses, where the boolean result is
/// not meaningful.
pub fn analyze_shape(shape: &PrimitiveShape, config: &SymmetryConfig) -> Option<SymmetryReport> {
    if !shape.kind().supports_symmetry() {
        return None;
    }
    Some(analyze_points(&shape.outline(), &OrderedSymmetry::from(config)))
}

/// [`analyze_shape`] over many shapes in parallel, in input order.
pub fn analyze_batch(
    shapes: &[PrimitiveShape],
    config: &SymmetryConfig,
) -> Vec<Option<SymmetryReport>> {
    shapes
        .par_iter()
        .map(|shape| analyze_shape(shape, config))
        .collect()
}

/// Run any tester and attach the principal-axis estimate.
pub fn analyze_points<T: SymmetryTester>(points: &[Point], tester: &T) -> SymmetryReport {
    let (axis, center) = match principal_axes(points) {
        Some(axes) => (axes.minor, axes.centroid),
        None => (Vec2::new(1.0, 0.0), Point::ZERO),
    };
    SymmetryReport {
        has_reflectional: tester.is_reflective(points),
        has_rotational: tester.is_rotational(points),
        axis,
        centroid: center,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn polyline(xy: &[(f64, f64)]) -> Polyline {
        Polyline::from_xy(xy).unwrap()
    }

    fn strict_rotation() -> SymmetryConfig {
        SymmetryConfig {
            include_trivial_rotation: false,
            ..SymmetryConfig::default()
        }
    }

    #[test]
    fn unit_square_is_rotational_about_its_center() {
        let square = polyline(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let report = analyze_symmetry(&square, &SymmetryConfig::default());
        assert!(report.has_rotational);
        assert_abs_diff_eq!(report.centroid.x, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(report.centroid.y, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(report.axis.hypot(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn palindromic_stroke_reflects() {
        let stroke = polyline(&[(0.0, 0.0), (1.0, 2.0), (3.0, 1.0), (1.0, 2.0), (0.0, 0.0)]);
        assert!(analyze_symmetry(&stroke, &SymmetryConfig::default()).has_reflectional);
    }

    #[test]
    fn reparameterization_can_flip_reflection() {
        let stroke = [(0.0, 0.0), (1.0, 2.0), (3.0, 1.0), (1.0, 2.0), (0.0, 0.0)];
        let mut shifted = stroke.to_vec();
        shifted.rotate_left(1);
        let config = SymmetryConfig::default();
        assert!(analyze_symmetry(&polyline(&stroke), &config).has_reflectional);
        assert!(!analyze_symmetry(&polyline(&shifted), &config).has_reflectional);
    }

    #[test]
    fn periodic_sequence_has_nontrivial_rotation() {
        let zigzag = polyline(&[(0.0, 0.0), (1.0, 1.0), (0.0, 0.0), (1.0, 1.0)]);
        assert!(analyze_symmetry(&zigzag, &strict_rotation()).has_rotational);

        let square = polyline(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert!(!analyze_symmetry(&square, &strict_rotation()).has_rotational);
    }

    #[test]
    fn rotation_needs_three_points() {
        let pair = polyline(&[(0.0, 0.0), (0.0, 0.0)]);
        assert!(!analyze_symmetry(&pair, &SymmetryConfig::default()).has_rotational);
    }

    #[test]
    fn oversized_input_skips_rotation() {
        let config = SymmetryConfig {
            max_points: 3,
            ..SymmetryConfig::default()
        };
        let square = polyline(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert!(!analyze_symmetry(&square, &config).has_rotational);
    }

    #[test]
    fn tolerance_is_absolute() {
        let near = polyline(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0), (1.0, 1.0), (0.005, 0.0)]);
        let config = SymmetryConfig::default();
        assert!(analyze_symmetry(&near, &config).has_reflectional);

        let scaled: Vec<(f64, f64)> = near.points().iter().map(|p| (p.x * 10.0, p.y * 10.0)).collect();
        assert!(!analyze_symmetry(&polyline(&scaled), &config).has_reflectional);
    }

    #[test]
    fn curves_without_meaningful_result_are_skipped() {
        let config = SymmetryConfig::default();
        let line = PrimitiveShape::Line {
            start: Point::ZERO,
            end: Point::new(1.0, 0.0),
        };
        assert!(analyze_shape(&line, &config).is_none());

        let rect = PrimitiveShape::Rectangle {
            corners: [
                Point::new(0.0, 0.0),
                Point::new(2.0, 0.0),
                Point::new(2.0, 1.0),
                Point::new(0.0, 1.0),
            ],
        };
        let reports = analyze_batch(&[line, rect], &config);
        assert!(reports[0].is_none());
        assert!(reports[1].is_some_and(|r| r.has_rotational));
    }
}
