//! Fit-then-verify building blocks shared by the cascade and the raster detector.
//!
//! Every function takes the raw points, fits its primitive, and either
//! returns the canonical parameters or a [`FitError`] naming why it declined.

use std::f64::consts::{FRAC_PI_2, PI};

use geo::{LineString, MinimumRotatedRect, Simplify};
use kurbo::Point;

use crate::error::FitError;
use crate::geom::{
    angle_between, closed_perimeter, convex_hull, interior_angles, point_segment_distance, principal_axes,
    signed_area, turn_signs, EPSILON,
};

/// Least-squares line with its extent along the points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub start: Point,
    pub end: Point,
    /// Max perpendicular distance of any point to the line.
    pub residual: f64,
}

/// Total-least-squares line through the centroid along the major axis.
///
/// Endpoints are the extreme projections of the points onto the line.
pub fn fit_line(points: &[Point]) -> Result<LineFit, FitError> {
    FitError::require(2, points.len())?;
    let axes = principal_axes(points).ok_or(FitError::Degenerate("no points"))?;
    if axes.major_variance < EPSILON {
        return Err(FitError::Degenerate("all points coincide"));
    }

    let mut t_min = f64::MAX;
    let mut t_max = f64::MIN;
    let mut residual: f64 = 0.0;
    for p in points {
        let d = *p - axes.centroid;
        let t = d.dot(axes.major);
        t_min = t_min.min(t);
        t_max = t_max.max(t);
        residual = residual.max(d.dot(axes.minor).abs());
    }
    Ok(LineFit {
        start: axes.centroid + axes.major * t_min,
        end: axes.centroid + axes.major * t_max,
        residual,
    })
}

/// Smallest circle containing every point.
///
/// Incremental Welzl construction; expected linear time on shuffled
/// input, cubic worst case on adversarial orderings.
pub fn min_enclosing_circle(points: &[Point]) -> Option<(Point, f64)> {
    let first = *points.first()?;
    let mut center = first;
    let mut radius = 0.0;
    let outside = |p: Point, c: Point, r: f64| p.distance(c) > r * (1.0 + 1e-12) + 1e-12;

    for i in 1..points.len() {
        if !outside(points[i], center, radius) {
            continue;
        }
        center = points[i];
        radius = 0.0;
        for j in 0..i {
            if !outside(points[j], center, radius) {
                continue;
            }
            center = points[i].midpoint(points[j]);
            radius = points[i].distance(points[j]) / 2.0;
            for k in 0..j {
                if !outside(points[k], center, radius) {
                    continue;
                }
                (center, radius) = circle_through(points[i], points[j], points[k]);
            }
        }
    }
    Some((center, radius))
}

/// Circumcircle of three points; for collinear points the circle on the
/// farthest pair.
fn circle_through(a: Point, b: Point, c: Point) -> (Point, f64) {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < EPSILON {
        let pairs = [(a, b), (a, c), (b, c)];
        let (p, q) = pairs
            .into_iter()
            .max_by(|x, y| x.0.distance(x.1).total_cmp(&y.0.distance(y.1)))
            .unwrap_or((a, b));
        return (p.midpoint(q), p.distance(q) / 2.0);
    }
    let a2 = a.to_vec2().hypot2();
    let b2 = b.to_vec2().hypot2();
    let c2 = c.to_vec2().hypot2();
    let center = Point::new(
        (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d,
        (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d,
    );
    (center, center.distance(a))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleFit {
    pub center: Point,
    pub radius: f64,
    /// Max `|distance − radius| / radius` over the points.
    pub residual: f64,
}

/// Minimum enclosing circle with its relative radial residual.
pub fn fit_circle(points: &[Point]) -> Result<CircleFit, FitError> {
    FitError::require(3, points.len())?;
    let (center, radius) =
        min_enclosing_circle(points).ok_or(FitError::Degenerate("no points"))?;
    if radius < EPSILON {
        return Err(FitError::Degenerate("zero radius"));
    }
    let residual = points
        .iter()
        .map(|p| (p.distance(center) - radius).abs() / radius)
        .fold(0.0, f64::max);
    Ok(CircleFit {
        center,
        radius,
        residual,
    })
}

/// Minimum-area bounding rectangle, corners in ring order.
pub fn min_area_rect(points: &[Point]) -> Result<[Point; 4], FitError> {
    FitError::require(2, points.len())?;
    let line: LineString<f64> = points.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>().into();
    let rect = line
        .minimum_rotated_rect()
        .ok_or(FitError::Degenerate("no bounding rectangle"))?;
    let coords: Vec<Point> = rect
        .exterior()
        .coords()
        .map(|c| Point::new(c.x, c.y))
        .collect();
    if coords.len() < 4 {
        return Err(FitError::Degenerate("bounding rectangle has fewer than 4 corners"));
    }
    if coords[0].distance(coords[1]) < EPSILON || coords[1].distance(coords[2]) < EPSILON {
        return Err(FitError::Degenerate("flat rectangle"));
    }
    Ok([coords[0], coords[1], coords[2], coords[3]])
}

/// Max distance from any point to the rectangle boundary, relative to
/// the rectangle's shorter side.
pub fn rect_residual(points: &[Point], corners: &[Point; 4]) -> Result<f64, FitError> {
    let short = corners[0]
        .distance(corners[1])
        .min(corners[1].distance(corners[2]));
    if short < EPSILON {
        return Err(FitError::Degenerate("flat rectangle"));
    }
    let worst = points
        .iter()
        .map(|&p| {
            (0..4)
                .map(|i| point_segment_distance(p, corners[i], corners[(i + 1) % 4]))
                .fold(f64::MAX, f64::min)
        })
        .fold(0.0, f64::max);
    Ok(worst / short)
}

/// Angle between consecutive edges at each rectangle corner.
pub fn corner_angles(corners: &[Point; 4]) -> Result<[f64; 4], FitError> {
    let mut angles = [0.0; 4];
    for (i, angle) in angles.iter_mut().enumerate() {
        let p1 = corners[i];
        let p2 = corners[(i + 1) % 4];
        let p3 = corners[(i + 2) % 4];
        *angle = angle_between(p2 - p1, p3 - p2)
            .ok_or(FitError::Degenerate("zero-length rectangle edge"))?;
    }
    Ok(angles)
}

/// Corner radius that explains the area a rounded rectangle is missing
/// relative to its bounding rectangle.
pub fn corner_radius(points: &[Point], corners: &[Point; 4]) -> f64 {
    let rect_area = signed_area(corners).abs();
    let deficit = (rect_area - signed_area(points).abs()).max(0.0);
    (deficit / (4.0 - PI)).sqrt()
}

/// Approximate a closed contour by a polygon (Ramer–Douglas–Peucker).
///
/// The ring is split at the point farthest from the first one and each
/// half simplified on its own, then vertices that ended up collinear
/// within `epsilon` are dropped.
pub fn approx_polygon(points: &[Point], epsilon: f64) -> Vec<Point> {
    let n = points.len();
    if n < 3 || epsilon <= 0.0 {
        return points.to_vec();
    }
    let first = points[0];
    let far = (1..n)
        .max_by(|&a, &b| first.distance(points[a]).total_cmp(&first.distance(points[b])))
        .unwrap_or(n - 1);

    let mut upper: Vec<Point> = points[..=far].to_vec();
    let mut lower: Vec<Point> = points[far..].to_vec();
    lower.push(first);
    upper = rdp(&upper, epsilon);
    lower = rdp(&lower, epsilon);

    // upper ends at `far`, lower starts at `far` and ends at `first`.
    upper.pop();
    lower.pop();
    upper.extend(lower);
    drop_collinear(upper, epsilon)
}

/// [`approx_polygon`] that never collapses a ring below a triangle.
///
/// When `epsilon` leaves fewer than 3 vertices, the largest smaller
/// epsilon (found by bisection) that keeps 3 is used instead. Inputs with
/// no such epsilon come back unchanged.
pub fn approx_ring(points: &[Point], epsilon: f64) -> Vec<Point> {
    let vertices = approx_polygon(points, epsilon);
    if vertices.len() >= 3 || points.len() < 3 {
        return vertices;
    }
    let (mut lo, mut hi) = (0.0, epsilon);
    let mut best = points.to_vec();
    for _ in 0..48 {
        let mid = 0.5 * (lo + hi);
        let candidate = approx_polygon(points, mid);
        if candidate.len() >= 3 {
            best = candidate;
            lo = mid;
        } else {
            hi = mid;
        }
    }
    best
}

fn rdp(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    LineString::from(points.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>())
        .simplify(&epsilon)
        .into_inner()
        .into_iter()
        .map(|coord| Point::new(coord.x, coord.y))
        .collect()
}

fn drop_collinear(mut vertices: Vec<Point>, epsilon: f64) -> Vec<Point> {
    let mut i = 0;
    while vertices.len() > 3 && i < vertices.len() {
        let n = vertices.len();
        let prev = vertices[(i + n - 1) % n];
        let next = vertices[(i + 1) % n];
        if point_segment_distance(vertices[i], prev, next) < epsilon {
            vertices.remove(i);
        } else {
            i += 1;
        }
    }
    vertices
}

/// Polygon-approximation epsilon: `tolerance` times the closed perimeter.
pub fn approx_epsilon(points: &[Point], tolerance: f64) -> Result<f64, FitError> {
    let perimeter = closed_perimeter(points);
    if perimeter < EPSILON {
        return Err(FitError::Degenerate("zero perimeter"));
    }
    Ok(tolerance * perimeter)
}

/// Convex with every interior angle within `angle_tolerance` of the mean.
pub fn is_equiangular(vertices: &[Point], angle_tolerance: f64) -> Result<bool, FitError> {
    let angles =
        interior_angles(vertices).ok_or(FitError::Degenerate("repeated polygon vertex"))?;
    let signs = turn_signs(vertices);
    let convex = signs.iter().all(|&s| s == signs[0] && s != 0);
    let mean = angles.iter().sum::<f64>() / angles.len() as f64;
    Ok(convex && angles.iter().all(|a| (a - mean).abs() <= angle_tolerance))
}

/// Polygon area as a fraction of its convex hull area.
pub fn hull_fill_ratio(contour: &[Point], polygon: &[Point]) -> Result<f64, FitError> {
    let hull_area = signed_area(&convex_hull(polygon)).abs();
    if hull_area < EPSILON {
        return Err(FitError::Degenerate("zero hull area"));
    }
    Ok(signed_area(contour).abs() / hull_area)
}

/// Star test: an even number (≥ 6) of vertices whose turn direction
/// strictly alternates, filling less than `area_ratio` of the hull.
pub fn fit_star(vertices: &[Point], area_ratio: f64) -> Result<Vec<Point>, FitError> {
    FitError::require(6, vertices.len())?;
    if signed_area(vertices).abs() < EPSILON {
        return Err(FitError::Degenerate("zero-area polygon"));
    }
    if vertices.len() % 2 != 0 {
        return Err(FitError::NoMatch("odd vertex count"));
    }
    let signs = turn_signs(vertices);
    let n = signs.len();
    let alternating = (0..n).all(|i| signs[i] != 0 && signs[i] == -signs[(i + 1) % n]);
    if !alternating {
        return Err(FitError::NoMatch("turn direction does not alternate"));
    }
    let ratio = hull_fill_ratio(vertices, vertices)?;
    if ratio >= area_ratio {
        return Err(FitError::Rejected {
            residual: ratio,
            tolerance: area_ratio,
        });
    }
    Ok(vertices.to_vec())
}

/// Lower bound on rectangle corner angles accepted as rounded.
pub fn rounded_corner_bound(tolerance: f64) -> f64 {
    FRAC_PI_2 - tolerance
}
