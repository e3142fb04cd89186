//! Radial outlier rejection for pupil boundary points.

use nalgebra::Point2;

/// Upper band, in standard deviations above the mean distance.
const UPPER_BAND: f64 = 0.8;
/// Lower band, in standard deviations below the mean distance.
const LOWER_BAND: f64 = 1.0;

/// Keep points whose distance `d` to the centroid satisfies
/// `mean - std <= d < mean + 0.8 * std`.
///
/// Zero spread keeps every point.
pub fn reject_radial_outliers(points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if points.is_empty() {
        return Vec::new();
    }
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    let centroid = Point2::new(cx, cy);

    let dists: Vec<f64> = points.iter().map(|p| (p - centroid).norm()).collect();
    let mean = dists.iter().sum::<f64>() / n;
    let std = (dists.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std <= 1e-12 * mean.max(1.0) {
        return points.to_vec();
    }

    let lo = mean - LOWER_BAND * std;
    let hi = mean + UPPER_BAND * std;
    points
        .iter()
        .zip(&dists)
        .filter(|(_, &d)| d >= lo && d < hi)
        .map(|(p, _)| *p)
        .collect()
}
