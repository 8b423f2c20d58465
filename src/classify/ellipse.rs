//! Direct least-squares ellipse fitting (Fitzgibbon et al., 1999).

use std::f64::consts::{FRAC_PI_2, SQRT_2};

use kurbo::Point;
use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};

use crate::error::FitError;
use crate::geom::EPSILON;

/// Geometric ellipse parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseFit {
    pub center: Point,
    pub semi_major: f64,
    pub semi_minor: f64,
    /// Major axis angle from +x, radians in (-π/2, π/2].
    pub rotation: f64,
    /// Conic `A x² + B xy + C y² + D x + E y + F = 0`.
    pub conic: [f64; 6],
}

impl EllipseFit {
    /// First-order (Sampson) distance from a point to the ellipse boundary.
    pub fn sampson_distance(&self, p: Point) -> f64 {
        let [a, b, c, d, e, f] = self.conic;
        let algebraic = a * p.x * p.x + b * p.x * p.y + c * p.y * p.y + d * p.x + e * p.y + f;
        let gx = 2.0 * a * p.x + b * p.y + d;
        let gy = b * p.x + 2.0 * c * p.y + e;
        let grad = (gx * gx + gy * gy).sqrt();
        if grad < EPSILON {
            algebraic.abs()
        } else {
            algebraic.abs() / grad
        }
    }
}

/// Fit an ellipse to at least five points.
///
/// Solves the constrained eigen-problem that enforces `4AC − B² > 0`,
/// on coordinates shifted to the centroid and scaled to mean radius √2.
pub fn fit_ellipse(points: &[Point]) -> Result<EllipseFit, FitError> {
    FitError::require(5, points.len())?;

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.x).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.x - mean_x).powi(2) + (p.y - mean_y).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist < EPSILON {
        return Err(FitError::Degenerate("all points coincide"));
    }
    let scale = SQRT_2 / mean_dist;

    // Scatter matrix S = Dᵀ D with D rows [x², xy, y², x, y, 1].
    let mut s = Matrix6::<f64>::zeros();
    for p in points {
        let x = (p.x - mean_x) * scale;
        let y = (p.y - mean_y) * scale;
        let row = Vector6::new(x * x, x * y, y * y, x, y, 1.0);
        s += row * row.transpose();
    }

    let s11 = s.fixed_view::<3, 3>(0, 0).into_owned();
    let s12 = s.fixed_view::<3, 3>(0, 3).into_owned();
    let s22 = s.fixed_view::<3, 3>(3, 3).into_owned();
    let s22_inv = s22
        .try_inverse()
        .ok_or(FitError::Degenerate("singular linear scatter block"))?;

    // C1⁻¹ (S11 − S12 S22⁻¹ S21) a1 = λ a1
    let c1_inv = Matrix3::new(0.0, 0.0, 0.5, 0.0, -1.0, 0.0, 0.5, 0.0, 0.0);
    let reduced = s11 - s12 * s22_inv * s12.transpose();
    let system = c1_inv * reduced;

    let a1 = constrained_eigenvector(&system).ok_or(FitError::NoMatch("no elliptic eigenvector"))?;
    let a2 = -s22_inv * s12.transpose() * a1;

    let conic = denormalize([a1[0], a1[1], a1[2], a2[0], a2[1], a2[2]], mean_x, mean_y, scale);
    conic_to_ellipse(conic).ok_or(FitError::Degenerate("conic is not a proper ellipse"))
}

/// Eigenvector of `system` satisfying the ellipse constraint `4 v0 v2 − v1² > 0`.
fn constrained_eigenvector(system: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let mut best: Option<(f64, Vector3<f64>)> = None;
    for ev in system.complex_eigenvalues().iter() {
        if ev.im.abs() > 1e-9 * (1.0 + ev.re.abs()) {
            continue;
        }
        let shifted = system - Matrix3::identity() * ev.re;
        let Some(v) = null_vector(&shifted) else {
            continue;
        };
        if 4.0 * v[0] * v[2] - v[1] * v[1] <= 0.0 {
            continue;
        }
        if best.as_ref().map_or(true, |(score, _)| ev.re.abs() < *score) {
            best = Some((ev.re.abs(), v));
        }
    }
    best.map(|(_, v)| v)
}

/// Null vector of a rank-2 3×3 matrix: the largest cross product of two rows.
fn null_vector(m: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let rows = [
        m.row(0).transpose(),
        m.row(1).transpose(),
        m.row(2).transpose(),
    ];
    let best = [
        rows[0].cross(&rows[1]),
        rows[0].cross(&rows[2]),
        rows[1].cross(&rows[2]),
    ]
    .into_iter()
    .max_by(|a, b| a.norm_squared().total_cmp(&b.norm_squared()))?;
    let norm = best.norm();
    if norm < 1e-15 {
        None
    } else {
        Some(best / norm)
    }
}

/// Undo `x' = s(x − mx), y' = s(y − my)` on conic coefficients.
fn denormalize(c: [f64; 6], mx: f64, my: f64, s: f64) -> [f64; 6] {
    let [a_, b_, c_, d_, e_, f_] = c;
    let s2 = s * s;
    let a = a_ * s2;
    let b = b_ * s2;
    let cc = c_ * s2;
    let d = -2.0 * a_ * s2 * mx - b_ * s2 * my + d_ * s;
    let e = -b_ * s2 * mx - 2.0 * c_ * s2 * my + e_ * s;
    let f = a_ * s2 * mx * mx + b_ * s2 * mx * my + c_ * s2 * my * my - d_ * s * mx - e_ * s * my + f_;
    [a, b, cc, d, e, f]
}

fn conic_to_ellipse(mut conic: [f64; 6]) -> Option<EllipseFit> {
    // Fix the overall sign so the quadratic part is positive definite.
    if conic[0] + conic[2] < 0.0 {
        conic.iter_mut().for_each(|k| *k = -*k);
    }
    let [a, b, c, d, e, f] = conic;
    let denom = 4.0 * a * c - b * b;
    if denom <= 0.0 {
        return None;
    }
    let cx = (b * e - 2.0 * c * d) / denom;
    let cy = (b * d - 2.0 * a * e) / denom;

    // Eigenvalues of the quadratic part [[A, B/2], [B/2, C]].
    let sum = a + c;
    let diff = ((a - c).powi(2) + b * b).sqrt();
    let lambda_hi = (sum + diff) / 2.0;
    let lambda_lo = (sum - diff) / 2.0;

    let f_center = a * cx * cx + b * cx * cy + c * cy * cy + d * cx + e * cy + f;
    if f_center.abs() < 1e-15 {
        return None;
    }
    let major_sq = -f_center / lambda_lo;
    let minor_sq = -f_center / lambda_hi;
    if major_sq <= 0.0 || minor_sq <= 0.0 {
        return None;
    }

    // Direction of the smaller eigenvalue is the major axis.
    let mut rotation = 0.5 * b.atan2(a - c) + FRAC_PI_2;
    if rotation > FRAC_PI_2 {
        rotation -= std::f64::consts::PI;
    }

    let fit = EllipseFit {
        center: Point::new(cx, cy),
        semi_major: major_sq.sqrt(),
        semi_minor: minor_sq.sqrt(),
        rotation,
        conic,
    };
    let finite = [fit.center.x, fit.center.y, fit.semi_major, fit.semi_minor, fit.rotation]
        .iter()
        .all(|v| v.is_finite());
    finite.then_some(fit)
}
