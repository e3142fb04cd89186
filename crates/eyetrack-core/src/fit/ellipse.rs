//! Direct least-squares ellipse fit (Fitzgibbon et al., 1999) using the
//! numerically stable block partitioning of Halíř and Flusser.

use nalgebra::{Matrix3, Point2, Vector3};

use super::eigen::{null_vector_3x3, real_eigenvalues_3x3};
use super::{FitError, FitResult};

pub(super) const MIN_POINTS: usize = 6;

/// Fit an ellipse to `points`.
///
/// Coordinates are normalized (centroid shift, mean distance √2) before the
/// scatter matrices are built, and the conic is mapped back afterwards.
/// Exactly circular input yields `axis1 == axis2` up to rounding.
pub fn fit_ellipse(points: &[Point2<f64>]) -> Result<FitResult, FitError> {
    let n = points.len();
    if n < MIN_POINTS {
        return Err(FitError::TooFewPoints {
            needed: MIN_POINTS,
            got: n,
        });
    }

    let (mx, my, s) = normalization(points);
    if is_collinear(points, mx, my) {
        return Err(FitError::Degenerate);
    }

    // Quadratic part D1 = [x², xy, y²], linear part D2 = [x, y, 1].
    let mut s1 = Matrix3::<f64>::zeros();
    let mut s2 = Matrix3::<f64>::zeros();
    let mut s3 = Matrix3::<f64>::zeros();
    for p in points {
        let x = (p.x - mx) * s;
        let y = (p.y - my) * s;
        let d1 = Vector3::new(x * x, x * y, y * y);
        let d2 = Vector3::new(x, y, 1.0);
        s1 += d1 * d1.transpose();
        s2 += d1 * d2.transpose();
        s3 += d2 * d2.transpose();
    }

    let s3_inv = s3.try_inverse().ok_or(FitError::Degenerate)?;
    let t = -s3_inv * s2.transpose();
    let m = s1 + s2 * t;

    // Premultiply by C1⁻¹ with C1 = [[0, 0, 2], [0, -1, 0], [2, 0, 0]].
    let reduced = Matrix3::new(
        m[(2, 0)] / 2.0,
        m[(2, 1)] / 2.0,
        m[(2, 2)] / 2.0,
        -m[(1, 0)],
        -m[(1, 1)],
        -m[(1, 2)],
        m[(0, 0)] / 2.0,
        m[(0, 1)] / 2.0,
        m[(0, 2)] / 2.0,
    );

    let mut best: Option<(f64, Vector3<f64>)> = None;
    for ev in real_eigenvalues_3x3(&reduced) {
        let Some(a1) = null_vector_3x3(&(reduced - Matrix3::identity() * ev)) else {
            continue;
        };
        if 4.0 * a1[0] * a1[2] - a1[1] * a1[1] <= 0.0 {
            continue;
        }
        if best.map(|(b, _)| ev.abs() < b).unwrap_or(true) {
            best = Some((ev.abs(), a1));
        }
    }
    let a1 = match best {
        Some((_, a1)) => a1,
        None => smallest_eigenvector(&m)
            .filter(|v| 4.0 * v[0] * v[2] - v[1] * v[1] > 0.0)
            .ok_or(FitError::Degenerate)?,
    };
    let a2 = t * a1;

    let conic = denormalize([a1[0], a1[1], a1[2], a2[0], a2[1], a2[2]], mx, my, s);
    conic_to_fit(conic).ok_or(FitError::Degenerate)
}

/// Algebraic fallback: eigenvector of the reduced scatter with the smallest
/// eigenvalue.
fn smallest_eigenvector(m: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let eig = m.symmetric_eigen();
    let (idx, _) = eig
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    Some(eig.eigenvectors.column(idx).into_owned())
}

/// Second-moment test: a (near) singular scatter means the points lie on
/// a line.
fn is_collinear(points: &[Point2<f64>], mx: f64, my: f64) -> bool {
    let (mut cxx, mut cyy, mut cxy) = (0.0, 0.0, 0.0);
    for p in points {
        let dx = p.x - mx;
        let dy = p.y - my;
        cxx += dx * dx;
        cyy += dy * dy;
        cxy += dx * dy;
    }
    let det = cxx * cyy - cxy * cxy;
    det <= 1e-10 * (cxx * cyy).max(f64::MIN_POSITIVE)
}

fn normalization(points: &[Point2<f64>]) -> (f64, f64, f64) {
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let my = points.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.x - mx).powi(2) + (p.y - my).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    (mx, my, s)
}

/// Map conic coefficients from normalized coordinates `x' = s(x − mx)`,
/// `y' = s(y − my)` back to frame coordinates.
fn denormalize(c: [f64; 6], mx: f64, my: f64, s: f64) -> [f64; 6] {
    let [a_, b_, c_, d_, e_, f_] = c;
    let s2 = s * s;
    let a = a_ * s2;
    let b = b_ * s2;
    let c = c_ * s2;
    let d = -2.0 * a_ * s2 * mx - b_ * s2 * my + d_ * s;
    let e = -b_ * s2 * mx - 2.0 * c_ * s2 * my + e_ * s;
    let f =
        a_ * s2 * mx * mx + b_ * s2 * mx * my + c_ * s2 * my * my - d_ * s * mx - e_ * s * my + f_;
    [a, b, c, d, e, f]
}

/// Geometric parameters of `A x² + B xy + C y² + D x + E y + F = 0`.
fn conic_to_fit(coeffs: [f64; 6]) -> Option<FitResult> {
    // The eigenvector sign is arbitrary; keep the quadratic part positive.
    let [a, b, c, d, e, f] = if coeffs[0] + coeffs[2] < 0.0 {
        coeffs.map(|v| -v)
    } else {
        coeffs
    };
    let denom = 4.0 * a * c - b * b;
    if denom <= 0.0 || !denom.is_finite() {
        return None;
    }
    let cx = (b * e - 2.0 * c * d) / denom;
    let cy = (b * d - 2.0 * a * e) / denom;

    let sum = a + c;
    let diff = ((a - c).powi(2) + b * b).sqrt();
    let lambda1 = (sum + diff) / 2.0;
    let lambda2 = (sum - diff) / 2.0;

    // Conic value at the center.
    let f0 = a * cx * cx + b * cx * cy + c * cy * cy + d * cx + e * cy + f;
    if f0.abs() < 1e-300 {
        return None;
    }
    let sq1 = -f0 / lambda1;
    let sq2 = -f0 / lambda2;
    if sq1 <= 0.0 || sq2 <= 0.0 {
        return None;
    }

    // λ1 >= λ2, so axis along λ1 is the shorter one.
    let minor = sq1.sqrt();
    let major = sq2.sqrt();
    let angle = if b == 0.0 && a == c {
        0.0
    } else {
        0.5 * b.atan2(a - c)
    };
    // `angle` points along the λ1 (minor) eigenvector; rotate to the major.
    let rotation = normalize_angle(angle + std::f64::consts::FRAC_PI_2);

    let fit = FitResult {
        center: Point2::new(cx, cy),
        axis1: major,
        axis2: minor,
        rotation: if (major - minor).abs() <= 1e-9 * major {
            0.0
        } else {
            rotation
        },
    };
    fit.is_finite().then_some(fit)
}

/// Wrap to `(-pi/2, pi/2]`.
fn normalize_angle(mut angle: f64) -> f64 {
    use std::f64::consts::PI;
    while angle > PI / 2.0 {
        angle -= PI;
    }
    while angle <= -PI / 2.0 {
        angle += PI;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ellipse_points(cx: f64, cy: f64, a: f64, b: f64, angle: f64, n: usize) -> Vec<Point2<f64>> {
        let (sin_a, cos_a) = angle.sin_cos();
        (0..n)
            .map(|i| {
                let t = std::f64::consts::TAU * i as f64 / n as f64;
                let px = a * t.cos();
                let py = b * t.sin();
                Point2::new(cx + cos_a * px - sin_a * py, cy + sin_a * px + cos_a * py)
            })
            .collect()
    }

    #[test]
    fn recovers_rotated_ellipse() {
        let pts = ellipse_points(100.0, 80.0, 30.0, 15.0, 0.3, 40);
        let fit = fit_ellipse(&pts).expect("fit");
        assert_abs_diff_eq!(fit.center.x, 100.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.center.y, 80.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.axis1, 30.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.axis2, 15.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.rotation, 0.3, epsilon = 1e-6);
    }

    #[test]
    fn vertical_major_axis_reports_half_pi() {
        let pts = ellipse_points(20.0, 20.0, 5.0, 9.0, 0.0, 32);
        let fit = fit_ellipse(&pts).expect("fit");
        assert_abs_diff_eq!(fit.axis1, 9.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.axis2, 5.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.rotation.abs(), std::f64::consts::FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn circle_reduces_to_equal_axes() {
        let pts = ellipse_points(64.0, 48.0, 11.0, 11.0, 0.0, 32);
        let fit = fit_ellipse(&pts).expect("fit");
        assert_abs_diff_eq!(fit.axis1, 11.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.axis2, 11.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.center.x, 64.0, epsilon = 1e-6);
    }

    #[test]
    fn collinear_points_fail() {
        let pts: Vec<Point2<f64>> = (0..8).map(|i| Point2::new(i as f64, 2.0 * i as f64)).collect();
        assert!(fit_ellipse(&pts).is_err());
    }

    #[test]
    fn too_few_points() {
        let pts = ellipse_points(0.0, 0.0, 3.0, 2.0, 0.0, 5);
        assert_eq!(
            fit_ellipse(&pts),
            Err(FitError::TooFewPoints { needed: 6, got: 5 })
        );
    }
}
