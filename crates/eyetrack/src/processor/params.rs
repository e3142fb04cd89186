use eyetrack_core::FitModelKind;
use serde::{Deserialize, Serialize};

use super::TargetKind;

/// Binarization and search parameters of one target processor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorParams {
    /// Binarization threshold on the blurred frame. Negative means "not yet
    /// chosen"; the engine fills it from the first frame.
    pub threshold: f64,
    /// Gaussian aperture `(kx, ky)`; even values are bumped to the next
    /// odd size.
    pub blur: (usize, usize),
    pub min_radius: usize,
    pub max_radius: usize,
    pub model: FitModelKind,
}

impl ProcessorParams {
    pub fn pupil() -> Self {
        Self {
            threshold: -1.0,
            blur: (3, 3),
            min_radius: 2,
            max_radius: 100,
            model: FitModelKind::Elliptical,
        }
    }

    pub fn corneal_reflection() -> Self {
        Self {
            threshold: -1.0,
            blur: (3, 3),
            min_radius: 1,
            max_radius: 20,
            model: FitModelKind::Circular,
        }
    }

    pub fn for_kind(kind: TargetKind) -> Self {
        match kind {
            TargetKind::Pupil => Self::pupil(),
            TargetKind::CornealReflection => Self::corneal_reflection(),
        }
    }

    pub fn has_threshold(&self) -> bool {
        self.threshold >= 0.0
    }
}

impl Default for ProcessorParams {
    fn default() -> Self {
        Self::pupil()
    }
}

/// Candidate search used to re-acquire a lost pupil.
///
/// Candidates lie on a grid of `stride` pixels within `search_radius` of
/// the last center. Each is scored as a dark disk against a brighter ring;
/// lower `distance_weight * d / search_radius + intensity_weight * disk / 255`
/// wins.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryParams {
    pub search_radius: f64,
    pub stride: usize,
    /// Disk radius used when no previous fit is available.
    pub disk_radius: f64,
    /// Ring radius relative to the disk radius.
    pub ring_radius_mul: f64,
    /// Minimum `ring - disk` contrast (0..255).
    pub min_contrast: f64,
    /// Samples per circle.
    pub samples: usize,
    pub distance_weight: f64,
    pub intensity_weight: f64,
}

impl Default for RecoveryParams {
    fn default() -> Self {
        Self {
            search_radius: 60.0,
            stride: 4,
            disk_radius: 10.0,
            ring_radius_mul: 1.6,
            min_contrast: 10.0,
            samples: 32,
            distance_weight: 1.0,
            intensity_weight: 1.0,
        }
    }
}
