use kurbo::Point;
use rayon::prelude::*;

use crate::geom::convex_hull;

/// Close the gaps of a partially visible curve with its convex hull.
///
/// Returns the hull ring (counter-clockwise, no repeated endpoint) when
/// it has more than two vertices, otherwise the input unchanged. Only
/// correct for convex shapes whose missing part lies inside the hull of
/// the visible points; concave outlines are filled in.
pub fn complete_curve(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let hull = convex_hull(points);
    if hull.len() > 2 {
        hull
    } else {
        points.to_vec()
    }
}

/// [`complete_curve`] for many curves in parallel, in input order.
pub fn complete_curves(curves: &[Vec<Point>]) -> Vec<Vec<Point>> {
    curves.par_iter().map(|c| complete_curve(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn is_convex(ring: &[Point]) -> bool {
        let n = ring.len();
        let crosses: Vec<f64> = (0..n)
            .map(|i| {
                let a = ring[(i + 1) % n] - ring[i];
                let b = ring[(i + 2) % n] - ring[(i + 1) % n];
                a.cross(b)
            })
            .collect();
        crosses.iter().all(|&c| c > 0.0) || crosses.iter().all(|&c| c < 0.0)
    }

    #[test]
    fn arc_with_missing_part_becomes_convex_ring() {
        // Three quarters of a circle plus scattered interior noise.
        let mut points: Vec<Point> = (0..30)
            .map(|i| {
                let t = 0.75 * TAU * i as f64 / 29.0;
                Point::new(10.0 * t.cos(), 10.0 * t.sin())
            })
            .collect();
        points.extend([Point::new(1.0, 2.0), Point::new(-3.0, -1.5), Point::new(0.5, -4.0)]);

        let completed = complete_curve(&points);
        assert!(completed.len() >= 3);
        assert!(is_convex(&completed));
        assert!(completed.iter().all(|p| points.contains(p)));
    }

    #[test]
    fn zigzag_hull_is_convex() {
        let points: Vec<Point> = (0..12)
            .map(|i| {
                let x = i as f64;
                let y = if i % 2 == 0 { 0.0 } else { 5.0 - 0.1 * (x - 6.0).powi(2) };
                Point::new(x, y)
            })
            .collect();
        assert!(is_convex(&complete_curve(&points)));
    }

    #[test]
    fn collinear_input_is_returned_unchanged() {
        let points = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 2.0)];
        assert_eq!(complete_curve(&points), points);
    }

    #[test]
    fn short_input_is_returned_unchanged() {
        let points = vec![Point::new(0.0, 0.0), Point::new(5.0, 1.0)];
        assert_eq!(complete_curve(&points), points);
    }

    #[test]
    fn batch_preserves_order() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        let pair = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        let out = complete_curves(&[square, pair.clone()]);
        assert_eq!(out[0].len(), 4);
        assert_eq!(out[1], pair);
    }
}
