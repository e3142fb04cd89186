//! Algebraic circle fit from centered moments (Kanatani–Rangarajan
//! "hyperfit" family).

use nalgebra::Point2;

use super::{FitError, FitResult};

pub(super) const MIN_POINTS: usize = 3;

/// `|det|` below this fraction of `Mxx * Myy` counts as collinear.
const DEGENERATE_REL_TOL: f64 = 1e-10;

/// Fit a circle to `points`.
///
/// Points are shifted to their centroid, the second and third order
/// moments are accumulated and the 2x2 system for the center offset is
/// solved in closed form. A vanishing determinant means the points are
/// collinear (or coincide) and yields [`FitError::Degenerate`].
pub fn fit_circle(points: &[Point2<f64>]) -> Result<FitResult, FitError> {
    let n = points.len();
    if n < MIN_POINTS {
        return Err(FitError::TooFewPoints {
            needed: MIN_POINTS,
            got: n,
        });
    }
    let nf = n as f64;
    let mean_x = points.iter().map(|p| p.x).sum::<f64>() / nf;
    let mean_y = points.iter().map(|p| p.y).sum::<f64>() / nf;

    let (mut mxx, mut myy, mut mxy, mut mxz, mut myz) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for p in points {
        let xi = p.x - mean_x;
        let yi = p.y - mean_y;
        let zi = xi * xi + yi * yi;
        mxx += xi * xi;
        myy += yi * yi;
        mxy += xi * yi;
        mxz += xi * zi;
        myz += yi * zi;
    }
    mxx /= nf;
    myy /= nf;
    mxy /= nf;
    mxz /= nf;
    myz /= nf;

    let det = 2.0 * (mxx * myy - mxy * mxy);
    let scale = (mxx * myy).abs().max(f64::MIN_POSITIVE);
    if !det.is_finite() || det.abs() <= DEGENERATE_REL_TOL * scale {
        return Err(FitError::Degenerate);
    }

    let xc = (mxz * myy - myz * mxy) / det;
    let yc = (myz * mxx - mxz * mxy) / det;
    let radius = (xc * xc + yc * yc + mxx + myy).sqrt();

    let fit = FitResult {
        center: Point2::new(xc + mean_x, yc + mean_y),
        axis1: radius,
        axis2: radius,
        rotation: 0.0,
    };
    if !fit.is_finite() {
        return Err(FitError::Degenerate);
    }
    Ok(fit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn circle_points(cx: f64, cy: f64, r: f64, n: usize) -> Vec<Point2<f64>> {
        (0..n)
            .map(|i| {
                let t = std::f64::consts::TAU * i as f64 / n as f64;
                Point2::new(cx + r * t.cos(), cy + r * t.sin())
            })
            .collect()
    }

    #[test]
    fn recovers_exact_circle() {
        let pts = circle_points(50.0, 50.0, 20.0, 16);
        let fit = fit_circle(&pts).expect("fit");
        assert_abs_diff_eq!(fit.center.x, 50.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.center.y, 50.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.axis1, 20.0, epsilon = 1e-6);
        assert_eq!(fit.axis1, fit.axis2);
        assert_eq!(fit.rotation, 0.0);
    }

    #[test]
    fn recovers_circle_from_partial_arc() {
        let pts: Vec<Point2<f64>> = (0..10)
            .map(|i| {
                let t = 0.1 * i as f64;
                Point2::new(-3.0 + 7.5 * t.cos(), 12.0 + 7.5 * t.sin())
            })
            .collect();
        let fit = fit_circle(&pts).expect("fit");
        assert_abs_diff_eq!(fit.center.x, -3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.center.y, 12.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.axis1, 7.5, epsilon = 1e-6);
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
            Point2::new(3.0, 3.0),
        ];
        assert_eq!(fit_circle(&pts), Err(FitError::Degenerate));

        let horizontal = [
            Point2::new(1.0, 5.0),
            Point2::new(4.0, 5.0),
            Point2::new(9.0, 5.0),
        ];
        assert_eq!(fit_circle(&horizontal), Err(FitError::Degenerate));
    }

    #[test]
    fn coincident_points_are_degenerate() {
        let pts = [Point2::new(2.0, 2.0); 5];
        assert_eq!(fit_circle(&pts), Err(FitError::Degenerate));
    }

    #[test]
    fn too_few_points() {
        let pts = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        assert_eq!(
            fit_circle(&pts),
            Err(FitError::TooFewPoints { needed: 3, got: 2 })
        );
    }
}
