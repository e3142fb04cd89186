//! Dark-disk candidate search used to re-acquire a lost pupil.

use eyetrack_core::{sample_bilinear, GrayImageView};
use nalgebra::Point2;
use serde::Serialize;

use super::RecoveryParams;

/// Disk samples sit at this fraction of the disk radius.
const DISK_SAMPLE_FRAC: f64 = 0.65;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RecoveryCandidate {
    pub center: Point2<f64>,
    /// Mean intensity inside the disk.
    pub disk_mean: f64,
    /// `ring - disk`; positive for a dark disk on a brighter surround.
    pub contrast: f64,
    /// Weighted distance + intensity score, lower is better.
    pub score: f64,
}

/// Best dark-disk candidate within `params.search_radius` of `last_center`,
/// or `None` when no grid position shows `params.min_contrast`.
///
/// `radius_hint` (typically the last fitted radius) overrides
/// `params.disk_radius`. Candidates are restricted to the frame.
pub fn find_dark_disk(
    frame: &GrayImageView<'_>,
    last_center: Point2<f64>,
    radius_hint: Option<f64>,
    params: &RecoveryParams,
) -> Option<RecoveryCandidate> {
    if frame.width == 0 || frame.height == 0 || params.samples == 0 {
        return None;
    }
    let radius = radius_hint
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or(params.disk_radius)
        .max(1.0);
    let lut = unit_circle_lut(params.samples);
    let stride = params.stride.max(1) as i64;
    let reach = params.search_radius.max(0.0);
    let steps = (reach / stride as f64).floor() as i64;

    let mut best: Option<RecoveryCandidate> = None;
    for j in -steps..=steps {
        for i in -steps..=steps {
            let c = Point2::new(
                last_center.x + (i * stride) as f64,
                last_center.y + (j * stride) as f64,
            );
            let dist = (c - last_center).norm();
            if dist > reach || !frame.contains(c.x, c.y) {
                continue;
            }
            let (disk_mean, ring_mean) =
                sample_disk_and_ring(frame, c, radius, params.ring_radius_mul, &lut);
            let contrast = ring_mean - disk_mean;
            if contrast < params.min_contrast {
                continue;
            }
            let norm_dist = if reach > 0.0 { dist / reach } else { 0.0 };
            let score =
                params.distance_weight * norm_dist + params.intensity_weight * disk_mean / 255.0;
            if best.map_or(true, |b| score < b.score) {
                best = Some(RecoveryCandidate {
                    center: c,
                    disk_mean,
                    contrast,
                    score,
                });
            }
        }
    }
    best
}

fn unit_circle_lut(samples: usize) -> Vec<(f64, f64)> {
    let step = std::f64::consts::TAU / samples as f64;
    (0..samples)
        .map(|k| {
            let (sin_t, cos_t) = (k as f64 * step).sin_cos();
            (cos_t, sin_t)
        })
        .collect()
}

fn sample_disk_and_ring(
    frame: &GrayImageView<'_>,
    c: Point2<f64>,
    radius: f64,
    ring_mul: f64,
    lut: &[(f64, f64)],
) -> (f64, f64) {
    let sample = |x: f64, y: f64| sample_bilinear(frame, x as f32, y as f32) as f64;
    let r_disk = DISK_SAMPLE_FRAC * radius;
    let r_ring = ring_mul * radius;
    let mut sum_disk = sample(c.x, c.y);
    let mut sum_ring = 0.0;
    for &(ux, uy) in lut {
        sum_disk += sample(c.x + r_disk * ux, c.y + r_disk * uy);
        sum_ring += sample(c.x + r_ring * ux, c.y + r_ring * uy);
    }
    (
        sum_disk / (lut.len() + 1) as f64,
        sum_ring / lut.len() as f64,
    )
}
