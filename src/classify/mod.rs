//! Shape classification.
//!
//! Two entry points over the shared fitting primitives in [`fit`]:
//!
//! 1. [`classify`]: one polyline, ordered fit-then-verify cascade, first
//!    accepting stage wins (line → circle → ellipse → rectangle →
//!    rounded rectangle → polygon → star).
//! 2. [`detect::detect_shapes`]: one raster image, every enabled test run on
//!    every contour, all matches collected per kind.

pub mod detect;
pub mod ellipse;
pub mod fit;

use kurbo::Point;
use log::debug;
use rayon::prelude::*;

use crate::config::RegularizeConfig;
use crate::error::FitError;
use crate::geom::{signed_area, EPSILON};
use crate::shape::{circle_samples, Polyline, PrimitiveShape, ShapeKind};

type Stage = fn(&[Point], &RegularizeConfig) -> Result<PrimitiveShape, FitError>;

/// Cascade stages in priority order.
const CASCADE: [(ShapeKind, Stage); 7] = [
    (ShapeKind::Line, line_stage),
    (ShapeKind::Circle, circle_stage),
    (ShapeKind::Ellipse, ellipse_stage),
    (ShapeKind::Rectangle, rectangle_stage),
    (ShapeKind::RoundedRectangle, rounded_rectangle_stage),
    (ShapeKind::RegularPolygon, polygon_stage),
    (ShapeKind::Star, star_stage),
];

/// Classify one polyline into its best-matching primitive.
///
/// Never fails: inputs too small or too degenerate for every stage come
/// back as [`PrimitiveShape::Unclassified`] carrying the original points.
pub fn classify(polyline: &Polyline, config: &RegularizeConfig) -> PrimitiveShape {
    let points = polyline.points();
    if points.len() >= 2 {
        for (kind, stage) in CASCADE {
            match stage(points, config) {
                Ok(shape) => {
                    debug!("{:?} accepted ({} points)", kind, points.len());
                    return shape;
                }
                Err(reason) => debug!("{:?} declined: {}", kind, reason),
            }
        }
    }
    PrimitiveShape::Unclassified {
        points: points.to_vec(),
    }
}

/// [`classify`] with default settings and the given geometric tolerance.
pub fn classify_with_tolerance(polyline: &Polyline, tolerance: f64) -> PrimitiveShape {
    classify(polyline, &RegularizeConfig::with_tolerance(tolerance))
}

/// Classify many polylines in parallel. Output order matches input order.
pub fn classify_batch(polylines: &[Polyline], config: &RegularizeConfig) -> Vec<PrimitiveShape> {
    polylines
        .par_iter()
        .map(|polyline| classify(polyline, config))
        .collect()
}

// ── Stages ───────────────────────────────────────────────

fn line_stage(points: &[Point], config: &RegularizeConfig) -> Result<PrimitiveShape, FitError> {
    let line = fit::fit_line(points)?;
    verify(line.residual, config.geometric_tolerance)?;
    Ok(PrimitiveShape::Line {
        start: line.start,
        end: line.end,
    })
}

fn circle_stage(points: &[Point], config: &RegularizeConfig) -> Result<PrimitiveShape, FitError> {
    let circle = fit::fit_circle(points)?;
    verify(circle.residual, config.geometric_tolerance)?;
    Ok(PrimitiveShape::Circle {
        center: circle.center,
        radius: circle.radius,
        samples: circle_samples(circle.center, circle.radius, points.len()),
    })
}

fn ellipse_stage(points: &[Point], config: &RegularizeConfig) -> Result<PrimitiveShape, FitError> {
    let ellipse = ellipse::fit_ellipse(points)?;
    if config.strict.ellipse {
        let worst = points
            .iter()
            .map(|p| ellipse.sampson_distance(*p))
            .fold(0.0, f64::max);
        verify(worst / ellipse.semi_minor, config.geometric_tolerance)?;
    }
    Ok(PrimitiveShape::Ellipse {
        center: ellipse.center,
        semi_major: ellipse.semi_major,
        semi_minor: ellipse.semi_minor,
        rotation: ellipse.rotation,
    })
}

fn rectangle_stage(points: &[Point], config: &RegularizeConfig) -> Result<PrimitiveShape, FitError> {
    let corners = fit::min_area_rect(points)?;
    if config.strict.rectangle {
        verify(fit::rect_residual(points, &corners)?, config.geometric_tolerance)?;
    }
    Ok(PrimitiveShape::Rectangle { corners })
}

fn rounded_rectangle_stage(
    points: &[Point],
    config: &RegularizeConfig,
) -> Result<PrimitiveShape, FitError> {
    let corners = fit::min_area_rect(points)?;
    let bound = fit::rounded_corner_bound(config.geometric_tolerance);
    let sharpest = fit::corner_angles(&corners)?
        .into_iter()
        .fold(f64::MAX, f64::min);
    if sharpest <= bound {
        return Err(FitError::Rejected {
            residual: std::f64::consts::FRAC_PI_2 - sharpest,
            tolerance: config.geometric_tolerance,
        });
    }
    if config.strict.rectangle {
        let rect_area = signed_area(&corners).abs();
        let fill = signed_area(points).abs() / rect_area;
        if fill < config.rounded_min_fill {
            return Err(FitError::Rejected {
                residual: fill,
                tolerance: config.rounded_min_fill,
            });
        }
    }
    Ok(PrimitiveShape::RoundedRectangle {
        corners,
        corner_radius: fit::corner_radius(points, &corners),
    })
}

fn polygon_stage(points: &[Point], config: &RegularizeConfig) -> Result<PrimitiveShape, FitError> {
    let vertices = approximate(points, config)?;
    FitError::require(3, vertices.len())?;
    if signed_area(&vertices).abs() < EPSILON {
        return Err(FitError::Degenerate("zero-area polygon"));
    }
    if config.strict.polygon && !fit::is_equiangular(&vertices, config.polygon_angle_tolerance)? {
        return Err(FitError::NoMatch("interior angles differ"));
    }
    Ok(PrimitiveShape::RegularPolygon { vertices })
}

fn star_stage(points: &[Point], config: &RegularizeConfig) -> Result<PrimitiveShape, FitError> {
    let vertices = approximate(points, config)?;
    let vertices = fit::fit_star(&vertices, config.star_area_ratio)?;
    Ok(PrimitiveShape::Star { vertices })
}

fn approximate(points: &[Point], config: &RegularizeConfig) -> Result<Vec<Point>, FitError> {
    let epsilon = fit::approx_epsilon(points, config.geometric_tolerance)?;
    Ok(fit::approx_ring(points, epsilon))
}

/// Residuals must stay strictly below the tolerance.
fn verify(residual: f64, tolerance: f64) -> Result<(), FitError> {
    if residual.is_finite() && residual < tolerance {
        Ok(())
    } else {
        Err(FitError::Rejected {
            residual,
            tolerance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ellipse_samples;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    fn polyline(points: Vec<Point>) -> Polyline {
        Polyline::new(points).unwrap()
    }

    fn rank(shape: &PrimitiveShape) -> usize {
        shape.kind() as usize
    }

    /// Closed polygon with `per_edge` samples along each edge.
    fn sampled_polygon(vertices: &[Point], per_edge: usize) -> Vec<Point> {
        let n = vertices.len();
        (0..n)
            .flat_map(|i| {
                let a = vertices[i];
                let b = vertices[(i + 1) % n];
                (0..per_edge).map(move |k| a.lerp(b, k as f64 / per_edge as f64))
            })
            .collect()
    }

    fn rounded_rect(width: f64, height: f64, r: f64) -> Vec<Point> {
        let mut points = Vec::new();
        let centers = [
            (Point::new(width - r, r), -FRAC_PI_2),
            (Point::new(width - r, height - r), 0.0),
            (Point::new(r, height - r), FRAC_PI_2),
            (Point::new(r, r), PI),
        ];
        for (center, start) in centers {
            for k in 0..=8 {
                let t = start + FRAC_PI_2 * k as f64 / 8.0;
                points.push(Point::new(center.x + r * t.cos(), center.y + r * t.sin()));
            }
        }
        points
    }

    #[test]
    fn twelve_point_circle() {
        let points: Vec<Point> = (0..12)
            .map(|i| {
                let t = TAU * i as f64 / 12.0;
                Point::new(10.0 * t.cos(), 10.0 * t.sin())
            })
            .collect();
        for tolerance in [0.01, 0.1, 1.0] {
            match classify_with_tolerance(&polyline(points.clone()), tolerance) {
                PrimitiveShape::Circle {
                    center,
                    radius,
                    samples,
                } => {
                    assert_abs_diff_eq!(center.x, 0.0, epsilon = 1e-9);
                    assert_abs_diff_eq!(center.y, 0.0, epsilon = 1e-9);
                    assert_abs_diff_eq!(radius, 10.0, epsilon = 1e-9);
                    assert_eq!(samples.len(), 12);
                }
                other => panic!("expected circle, got {:?}", other.kind()),
            }
        }
    }

    #[test]
    fn near_collinear_points_depend_on_tolerance() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.001),
            Point::new(2.0, 0.0),
        ];
        let loose = classify_with_tolerance(&polyline(points.clone()), 0.01);
        assert_eq!(loose.kind(), ShapeKind::Line);
        let tight = classify_with_tolerance(&polyline(points), 0.0001);
        assert_ne!(tight.kind(), ShapeKind::Line);
    }

    #[test]
    fn canonical_outputs_reclassify_to_same_kind() {
        let config = RegularizeConfig::default();
        let stroke = polyline(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.002),
            Point::new(2.0, 1.998),
            Point::new(3.0, 3.0),
        ]);
        let line = classify(&stroke, &config);
        assert_eq!(line.kind(), ShapeKind::Line);
        assert_eq!(classify(&polyline(line.outline()), &config).kind(), ShapeKind::Line);

        let ring = polyline(ellipse_samples(Point::new(3.0, 4.0), 5.0, 5.0, 0.0, 20));
        let circle = classify(&ring, &config);
        assert_eq!(circle.kind(), ShapeKind::Circle);
        assert_eq!(classify(&polyline(circle.outline()), &config).kind(), ShapeKind::Circle);
    }

    #[test]
    fn larger_tolerance_never_demotes() {
        let points: Vec<Point> = (0..36)
            .map(|i| {
                let t = TAU * i as f64 / 36.0;
                let r = 10.0 + 0.2 * (5.0 * t).sin();
                Point::new(r * t.cos(), r * t.sin())
            })
            .collect();
        let line = polyline(points);
        let ranks: Vec<usize> = [0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 50.0]
            .iter()
            .map(|&tolerance| rank(&classify_with_tolerance(&line, tolerance)))
            .collect();
        assert!(ranks.windows(2).all(|w| w[1] <= w[0]), "ranks {:?}", ranks);
        assert_eq!(ranks.last().copied(), Some(ShapeKind::Line as usize));
    }

    #[test]
    fn strict_triangle_never_demotes_as_tolerance_grows() {
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(5.0, 5.0 * 3f64.sqrt()),
        ];
        let line = polyline(sampled_polygon(&corners, 6));
        let mut config = RegularizeConfig::strict();
        let mut ranks = Vec::new();
        for tolerance in [0.05, 0.1, 0.25, 0.3, 0.35, 0.4, 0.6] {
            config.geometric_tolerance = tolerance;
            let shape = classify(&line, &config);
            assert_ne!(shape.kind(), ShapeKind::Unclassified, "tolerance {}", tolerance);
            ranks.push(rank(&shape));
        }
        assert!(ranks.windows(2).all(|w| w[1] <= w[0]), "ranks {:?}", ranks);
        assert!(ranks[3] <= ShapeKind::RegularPolygon as usize);
    }

    #[test]
    fn collinear_points_at_zero_tolerance_are_unclassified() {
        let line = polyline(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
        ]);
        assert_eq!(classify_with_tolerance(&line, 0.0).kind(), ShapeKind::Unclassified);
    }

    #[test]
    fn degenerate_inputs_stay_unclassified() {
        let config = RegularizeConfig::default();
        let single = polyline(vec![Point::new(1.0, 2.0)]);
        assert_eq!(
            classify(&single, &config),
            PrimitiveShape::Unclassified {
                points: vec![Point::new(1.0, 2.0)]
            }
        );
        let repeated = polyline(vec![Point::new(1.0, 1.0); 2]);
        assert_eq!(classify(&repeated, &config).kind(), ShapeKind::Unclassified);
    }

    #[test]
    fn default_cascade_accepts_ellipse_and_rectangle_fits() {
        let config = RegularizeConfig::default();
        let oval = polyline(ellipse_samples(Point::ZERO, 5.0, 3.0, 0.0, 20));
        match classify(&oval, &config) {
            PrimitiveShape::Ellipse {
                center,
                semi_major,
                semi_minor,
                ..
            } => {
                assert_abs_diff_eq!(center.x, 0.0, epsilon = 1e-6);
                assert_abs_diff_eq!(semi_major, 5.0, epsilon = 1e-6);
                assert_abs_diff_eq!(semi_minor, 3.0, epsilon = 1e-6);
            }
            other => panic!("expected ellipse, got {:?}", other.kind()),
        }

        let trapezoid = polyline(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(3.0, 2.0),
            Point::new(0.0, 2.0),
        ]);
        assert_eq!(classify(&trapezoid, &config).kind(), ShapeKind::Rectangle);
    }

    #[test]
    fn strict_rectangle() {
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 6.0),
            Point::new(0.0, 6.0),
        ];
        let shape = classify(&polyline(sampled_polygon(&corners, 4)), &RegularizeConfig::strict());
        assert_eq!(shape.kind(), ShapeKind::Rectangle);
    }

    #[test]
    fn strict_rounded_rectangle() {
        let shape = classify(&polyline(rounded_rect(20.0, 10.0, 2.0)), &RegularizeConfig::strict());
        match shape {
            PrimitiveShape::RoundedRectangle { corner_radius, .. } => {
                assert_abs_diff_eq!(corner_radius, 2.0, epsilon = 0.1);
            }
            other => panic!("expected rounded rectangle, got {:?}", other.kind()),
        }
    }

    #[test]
    fn strict_hexagon_is_regular_polygon() {
        let hexagon: Vec<Point> = (0..6)
            .map(|i| {
                let t = PI * i as f64 / 3.0;
                Point::new(10.0 * t.cos(), 10.0 * t.sin())
            })
            .collect();
        let shape = classify(&polyline(sampled_polygon(&hexagon, 5)), &RegularizeConfig::strict());
        match shape {
            PrimitiveShape::RegularPolygon { vertices } => assert_eq!(vertices.len(), 6),
            other => panic!("expected polygon, got {:?}", other.kind()),
        }
    }

    #[test]
    fn strict_star() {
        let star: Vec<Point> = (0..10)
            .map(|i| {
                let r = if i % 2 == 0 { 10.0 } else { 4.0 };
                let t = PI * i as f64 / 5.0 + FRAC_PI_2;
                Point::new(r * t.cos(), r * t.sin())
            })
            .collect();
        let shape = classify(&polyline(star), &RegularizeConfig::strict());
        match shape {
            PrimitiveShape::Star { vertices } => assert_eq!(vertices.len(), 10),
            other => panic!("expected star, got {:?}", other.kind()),
        }
    }

    #[test]
    fn batch_preserves_order() {
        let config = RegularizeConfig::default();
        let inputs = vec![
            polyline(vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0)]),
            polyline(ellipse_samples(Point::ZERO, 2.0, 2.0, 0.0, 16)),
            polyline(vec![Point::new(3.0, 3.0)]),
        ];
        let kinds: Vec<ShapeKind> = classify_batch(&inputs, &config)
            .iter()
            .map(PrimitiveShape::kind)
            .collect();
        assert_eq!(
            kinds,
            vec![ShapeKind::Line, ShapeKind::Circle, ShapeKind::Unclassified]
        );
    }
}
