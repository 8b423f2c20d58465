//! Shared geometry utilities.

use geo::{ConvexHull, MultiPoint};
use kurbo::{Point, Vec2};
use nalgebra::{Matrix2, SymmetricEigen};

/// Lengths and areas below this are treated as zero.
pub const EPSILON: f64 = 1e-12;

/// Arithmetic mean of the points. `Point::ZERO` for an empty slice.
pub fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::ZERO;
    }
    let n = points.len() as f64;
    let sum = points.iter().fold(Vec2::ZERO, |acc, p| acc + p.to_vec2());
    (sum / n).to_point()
}

/// Signed area of a closed polygon via the shoelace formula.
///
/// Positive = counter-clockwise, negative = clockwise.
pub fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            points[i].x * points[j].y - points[j].x * points[i].y
        })
        .sum::<f64>()
        / 2.0
}

/// Perimeter of the polygon including the closing edge.
pub fn closed_perimeter(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    (0..n).map(|i| points[i].distance(points[(i + 1) % n])).sum()
}

/// Unsigned angle between two vectors, in radians [0, pi].
///
/// `None` when either vector has zero length.
pub fn angle_between(a: Vec2, b: Vec2) -> Option<f64> {
    if a.hypot() < EPSILON || b.hypot() < EPSILON {
        return None;
    }
    Some(a.cross(b).atan2(a.dot(b)).abs())
}

/// Interior angle at each vertex of a closed polygon.
///
/// `None` when two consecutive vertices coincide.
pub fn interior_angles(vertices: &[Point]) -> Option<Vec<f64>> {
    let n = vertices.len();
    (0..n)
        .map(|i| {
            let prev = vertices[(i + n - 1) % n];
            let here = vertices[i];
            let next = vertices[(i + 1) % n];
            angle_between(prev - here, next - here)
        })
        .collect()
}

/// Sign of the turn at each vertex of a closed polygon (+1 left, -1 right, 0 straight).
pub fn turn_signs(vertices: &[Point]) -> Vec<i8> {
    let n = vertices.len();
    (0..n)
        .map(|i| {
            let prev = vertices[(i + n - 1) % n];
            let here = vertices[i];
            let next = vertices[(i + 1) % n];
            let cross = (here - prev).cross(next - here);
            if cross > EPSILON {
                1
            } else if cross < -EPSILON {
                -1
            } else {
                0
            }
        })
        .collect()
}

/// Distance from `p` to the segment `a`-`b`.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq < EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Centroid and covariance eigen-directions of a point cloud.
#[derive(Debug, Clone, Copy)]
pub struct PrincipalAxes {
    pub centroid: Point,
    /// Unit direction of largest variance.
    pub major: Vec2,
    /// Unit direction of smallest variance.
    pub minor: Vec2,
    /// Variance along `major`.
    pub major_variance: f64,
}

/// Principal component analysis of the points.
///
/// `None` for an empty slice.
pub fn principal_axes(points: &[Point]) -> Option<PrincipalAxes> {
    if points.is_empty() {
        return None;
    }
    let c = centroid(points);
    let n = points.len() as f64;
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for p in points {
        let d = *p - c;
        sxx += d.x * d.x;
        sxy += d.x * d.y;
        syy += d.y * d.y;
    }
    let cov = Matrix2::new(sxx / n, sxy / n, sxy / n, syy / n);
    let eigen = SymmetricEigen::new(cov);

    let (lo, hi) = if eigen.eigenvalues[0] <= eigen.eigenvalues[1] {
        (0, 1)
    } else {
        (1, 0)
    };
    let column = |i: usize| {
        let v = eigen.eigenvectors.column(i);
        let v = Vec2::new(v[0], v[1]);
        let len = v.hypot();
        if len < EPSILON {
            Vec2::new(1.0, 0.0)
        } else {
            v / len
        }
    };
    Some(PrincipalAxes {
        centroid: c,
        major: column(hi),
        minor: column(lo),
        major_variance: eigen.eigenvalues[hi],
    })
}

/// Convex hull as an open counter-clockwise ring (no repeated endpoint).
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let multi: MultiPoint<f64> = points.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>().into();
    let hull = multi.convex_hull();
    let mut ring: Vec<Point> = hull
        .exterior()
        .coords()
        .map(|c| Point::new(c.x, c.y))
        .collect();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn unit_square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]
    }

    #[test]
    fn shoelace_orientation() {
        let square = unit_square();
        assert_abs_diff_eq!(signed_area(&square), 1.0);
        let reversed: Vec<Point> = square.into_iter().rev().collect();
        assert_abs_diff_eq!(signed_area(&reversed), -1.0);
    }

    #[test]
    fn perimeter_includes_closing_edge() {
        assert_abs_diff_eq!(closed_perimeter(&unit_square()), 4.0);
    }

    #[test]
    fn zero_vector_has_no_angle() {
        assert!(angle_between(Vec2::ZERO, Vec2::new(1.0, 0.0)).is_none());
        let right = angle_between(Vec2::new(1.0, 0.0), Vec2::new(0.0, 2.0)).unwrap();
        assert_abs_diff_eq!(right, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn principal_axes_of_horizontal_cloud() {
        let points: Vec<Point> = (0..10)
            .map(|i| Point::new(i as f64, if i % 2 == 0 { 0.1 } else { -0.1 }))
            .collect();
        let axes = principal_axes(&points).unwrap();
        assert_abs_diff_eq!(axes.major.x.abs(), 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(axes.minor.y.abs(), 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(axes.major_variance, 8.25, epsilon = 1e-3);
    }

    #[test]
    fn hull_drops_interior_points() {
        let mut points = unit_square();
        points.push(Point::new(0.5, 0.5));
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!(signed_area(&hull) > 0.0);
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let d = point_segment_distance(Point::new(3.0, 1.0), Point::ZERO, Point::new(2.0, 0.0));
        assert_abs_diff_eq!(d, 2f64.sqrt(), epsilon = 1e-12);
    }
}
