//! Small dense eigen helpers for the 3x3 reduced conic system.

use nalgebra::{Matrix3, Vector3};

/// Real eigenvalues of a (generally non-symmetric) 3x3 matrix, from the
/// characteristic polynomial.
pub(super) fn real_eigenvalues_3x3(a: &Matrix3<f64>) -> Vec<f64> {
    let tr = a.trace();
    let minor_sum = a[(0, 0)] * a[(1, 1)] - a[(0, 1)] * a[(1, 0)] + a[(0, 0)] * a[(2, 2)]
        - a[(0, 2)] * a[(2, 0)]
        + a[(1, 1)] * a[(2, 2)]
        - a[(1, 2)] * a[(2, 1)];
    let det = a.determinant();
    // λ³ − tr·λ² + minor_sum·λ − det = 0
    solve_cubic_real(-tr, minor_sum, -det)
}

/// Null vector of a rank-deficient 3x3 matrix: the adjugate row with the
/// largest norm, unit length.
pub(super) fn null_vector_3x3(m: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let r0 = m.row(0).transpose();
    let r1 = m.row(1).transpose();
    let r2 = m.row(2).transpose();
    let candidates = [r1.cross(&r2), r2.cross(&r0), r0.cross(&r1)];

    let best = candidates
        .iter()
        .max_by(|a, b| a.norm_squared().total_cmp(&b.norm_squared()))?;
    let norm = best.norm();
    if !norm.is_finite() || norm < 1e-15 {
        return None;
    }
    Some(best / norm)
}

/// Real roots of the monic cubic `x³ + b x² + c x + d`.
fn solve_cubic_real(b: f64, c: f64, d: f64) -> Vec<f64> {
    // Depressed form t³ + p t + q with x = t − b/3.
    let p = c - b * b / 3.0;
    let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;
    let shift = -b / 3.0;
    let disc = -4.0 * p * p * p - 27.0 * q * q;
    // Nearly repeated roots can push the discriminant just below zero.
    let tol = 1e-12 * (4.0 * p.abs().powi(3) + 27.0 * q * q);

    if disc >= -tol {
        let r = (-p / 3.0).max(0.0).sqrt();
        if r < 1e-300 {
            return vec![shift];
        }
        let cos_arg = (-q / (2.0 * r * r * r)).clamp(-1.0, 1.0);
        let theta = cos_arg.acos();
        let two_r = 2.0 * r;
        let tau = std::f64::consts::TAU;
        vec![
            two_r * (theta / 3.0).cos() + shift,
            two_r * ((theta + tau) / 3.0).cos() + shift,
            two_r * ((theta + 2.0 * tau) / 3.0).cos() + shift,
        ]
    } else {
        let sqrt_disc = (q * q / 4.0 + p * p * p / 27.0).sqrt();
        let u = (-q / 2.0 + sqrt_disc).cbrt();
        let v = (-q / 2.0 - sqrt_disc).cbrt();
        vec![u + v + shift]
    }
}
