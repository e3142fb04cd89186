//! Ray-casting boundary search on binarized frames.
//!
//! Binarized frames mark target pixels 255 and background 0, whatever the
//! target polarity was in the raw frame. Rays start at the rounded current
//! center. The outermost rows and columns count as background, so every
//! boundary point lies inside the frame.

use eyetrack_core::GrayImageView;
use nalgebra::{Point2, Vector2};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Value of background pixels in a binarized frame.
pub const BACKGROUND: u8 = 0;

/// Multiplier applied to `rays * min_radius` to get the lost-track floor.
const LOST_TRACK_SLACK: f64 = 1.05;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum WalkoutError {
    #[error("lost track: ray sum {sum} below threshold {threshold:.1}")]
    LostTrack { sum: usize, threshold: f64 },
}

/// Ray set for pupils: 4 axis rays, 4 diagonals and the 1/2, 1/3 and 1/4
/// slope rays (both major axes, all quadrants). 32 rays.
///
/// Each ray advances one pixel along its major axis per step.
pub fn pupil_directions() -> Vec<Vector2<f64>> {
    let mut dirs = Vec::with_capacity(32);
    dirs.extend(axis_and_diagonal_directions());
    for slope in [0.5, 1.0 / 3.0, 0.25] {
        for sx in [1.0, -1.0] {
            for sy in [1.0, -1.0] {
                dirs.push(Vector2::new(sx, sy * slope));
                dirs.push(Vector2::new(sx * slope, sy));
            }
        }
    }
    dirs
}

/// Ray set for corneal reflections: 8 rays, one boundary point each.
///
/// There are four base directions: the horizontal axis, the vertical axis
/// and the two diagonals. Each is cast both ways, which covers all four
/// quadrants. The mirrored rays are listed explicitly rather than derived by
/// flipping the frame.
pub fn corneal_reflection_directions() -> Vec<Vector2<f64>> {
    axis_and_diagonal_directions().to_vec()
}

fn axis_and_diagonal_directions() -> [Vector2<f64>; 8] {
    [
        Vector2::new(1.0, 0.0),
        Vector2::new(0.0, 1.0),
        Vector2::new(-1.0, 0.0),
        Vector2::new(0.0, -1.0),
        Vector2::new(1.0, 1.0),
        Vector2::new(1.0, -1.0),
        Vector2::new(-1.0, 1.0),
        Vector2::new(-1.0, -1.0),
    ]
}

/// Sum of ray steps below which the target counts as lost.
pub fn lost_track_threshold(rays: usize, min_radius: usize) -> f64 {
    rays as f64 * min_radius as f64 * LOST_TRACK_SLACK
}

/// Find one boundary point per ray around `center`.
///
/// Pass 1 scans steps `min_radius..=max_radius` for the first background
/// pixel (falling back to `min_radius`). If the step sum is below
/// [`lost_track_threshold`] the center is assumed to sit outside the
/// target, and pass 2 walks each ray to the first target pixel and then on
/// to the next background pixel. A sum still below the threshold is
/// [`WalkoutError::LostTrack`].
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(binarized, directions), fields(rays = directions.len()))
)]
pub fn walkout(
    binarized: &GrayImageView<'_>,
    center: Point2<f64>,
    directions: &[Vector2<f64>],
    min_radius: usize,
    max_radius: usize,
) -> Result<Vec<Point2<f64>>, WalkoutError> {
    let cx = center.x.round();
    let cy = center.y.round();
    let origin = Point2::new(cx, cy);
    let last_x = binarized.width as i64 - 1;
    let last_y = binarized.height as i64 - 1;
    let is_background = |k: usize, dir: &Vector2<f64>| {
        let x = (cx + (k as f64 * dir.x).round()) as i64;
        let y = (cy + (k as f64 * dir.y).round()) as i64;
        if x <= 0 || y <= 0 || x >= last_x || y >= last_y {
            return true;
        }
        binarized
            .get_checked(x, y)
            .map_or(true, |v| v == BACKGROUND)
    };

    let mut steps: Vec<usize> = directions
        .iter()
        .map(|dir| {
            (min_radius..=max_radius)
                .find(|&k| is_background(k, dir))
                .unwrap_or(min_radius)
        })
        .collect();

    let threshold = lost_track_threshold(directions.len(), min_radius);
    let mut sum: usize = steps.iter().sum();

    if (sum as f64) < threshold {
        log::debug!("walkout sum {sum} below {threshold:.1}, retrying from target offset");
        // Any ray reaches the border within this many steps.
        let reach = binarized.width + binarized.height + 1;
        for (step, dir) in steps.iter_mut().zip(directions) {
            let Some(entry) = (1..=reach).find(|&k| !is_background(k, dir)) else {
                continue;
            };
            if let Some(exit) = (entry + 1..=reach + 1).find(|&k| is_background(k, dir)) {
                *step = exit;
            }
        }
        sum = steps.iter().sum();
        if (sum as f64) < threshold {
            return Err(WalkoutError::LostTrack { sum, threshold });
        }
    }

    Ok(steps
        .iter()
        .zip(directions)
        .map(|(&k, dir)| origin + dir * k as f64)
        .collect())
}
