//! Per-target tracking: binarize, walk out, reject outliers, fit, recover.
//!
//! A [`TargetProcessor`] is inert until [`TargetProcessor::set_center`]
//! seeds it. After that every [`TargetProcessor::track`] call either
//! yields a fresh [`FitResult`] or runs the kind-specific recovery and
//! yields `None`; the seeded center always stays finite and inside the
//! frame.

mod auto;
mod outliers;
mod params;
mod recovery;

pub use auto::{initial_thresholds, InitialThresholds};
pub use outliers::reject_radial_outliers;
pub use params::{ProcessorParams, RecoveryParams};
pub use recovery::{find_dark_disk, RecoveryCandidate};

use eyetrack_core::{
    erode3x3_u8, gaussian_blur_u8, threshold_u8, Binarization, FitError, FitResult, GrayImage,
    GrayImageView,
};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::walkout::{
    corneal_reflection_directions, pupil_directions, walkout, WalkoutError, BACKGROUND,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// What a processor tracks. Kinds differ in binarization polarity, ray
/// set, outlier rejection and recovery.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Dark disc, inverse threshold after erosion.
    Pupil,
    /// Bright glint, direct threshold.
    CornealReflection,
}

/// Why a single `track` call produced no fit.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TrackError {
    #[error(transparent)]
    Walkout(#[from] WalkoutError),
    #[error("fit failed: {0}")]
    Fit(#[from] FitError),
    #[error("only {kept} boundary points survived outlier rejection (need {needed})")]
    TooFewInliers { kept: usize, needed: usize },
    #[error("fitted center ({x:.1}, {y:.1}) is outside the frame")]
    CenterOutOfFrame { x: f64, y: f64 },
    #[error("fitted center ({x:.1}, {y:.1}) lies on background")]
    CenterOnBackground { x: f64, y: f64 },
}

#[derive(Clone, Debug)]
pub struct TargetProcessor {
    kind: TargetKind,
    label: String,
    params: ProcessorParams,
    recovery: RecoveryParams,
    directions: Vec<Vector2<f64>>,
    active: bool,
    last_center: Option<Point2<f64>>,
    last_fit: Option<FitResult>,
    last_binarized: Option<GrayImage>,
}

impl TargetProcessor {
    pub fn new(
        kind: TargetKind,
        label: impl Into<String>,
        params: ProcessorParams,
        recovery: RecoveryParams,
    ) -> Self {
        let directions = match kind {
            TargetKind::Pupil => pupil_directions(),
            TargetKind::CornealReflection => corneal_reflection_directions(),
        };
        Self {
            kind,
            label: label.into(),
            params,
            recovery,
            directions,
            active: false,
            last_center: None,
            last_fit: None,
            last_binarized: None,
        }
    }

    /// Pupil processor with default search parameters.
    pub fn pupil(params: ProcessorParams) -> Self {
        Self::new(TargetKind::Pupil, "pupil", params, RecoveryParams::default())
    }

    /// Corneal-reflection processor `cr_<index>`.
    pub fn corneal_reflection(index: usize, params: ProcessorParams) -> Self {
        Self::new(
            TargetKind::CornealReflection,
            format!("cr_{index}"),
            params,
            RecoveryParams::default(),
        )
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Telemetry key (`pupil`, `cr_0`, `cr_1`).
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn params(&self) -> &ProcessorParams {
        &self.params
    }

    pub fn recovery_params(&self) -> &RecoveryParams {
        &self.recovery
    }

    pub fn set_recovery_params(&mut self, recovery: RecoveryParams) {
        self.recovery = recovery;
    }

    pub fn threshold(&self) -> f64 {
        self.params.threshold
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.params.threshold = threshold;
    }

    /// Nudge the binarization threshold, as the display's +/- keys do.
    pub fn adjust_threshold(&mut self, delta: f64) {
        self.params.threshold += delta;
        log::info!(
            "{} binarization threshold set to {:.1}",
            self.label,
            self.params.threshold
        );
    }

    pub fn blur(&self) -> (usize, usize) {
        self.params.blur
    }

    pub fn set_blur(&mut self, blur: (usize, usize)) {
        self.params.blur = (blur.0.max(1), blur.1.max(1));
    }

    /// Grow or shrink both blur apertures by `delta`; apertures never drop
    /// below 1.
    pub fn adjust_blur(&mut self, delta: isize) {
        let step = |k: usize| (k as isize + delta).max(1) as usize;
        self.params.blur = (step(self.params.blur.0), step(self.params.blur.1));
        log::info!("{} blur set to {:?}", self.label, self.params.blur);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Seed (or re-seed) the search center and activate the processor.
    pub fn set_center(&mut self, center: Point2<f64>) {
        self.last_center = Some(center);
        self.active = true;
        log::info!(
            "{} center set to ({:.1}, {:.1})",
            self.label,
            center.x,
            center.y
        );
    }

    /// Stop tracking until the next `set_center`.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn last_center(&self) -> Option<Point2<f64>> {
        self.last_center
    }

    pub fn last_fit(&self) -> Option<&FitResult> {
        self.last_fit.as_ref()
    }

    pub fn clear_fit(&mut self) {
        self.last_fit = None;
    }

    /// Binarized frame from the most recent `track` call.
    pub fn last_binarized(&self) -> Option<&GrayImage> {
        self.last_binarized.as_ref()
    }

    /// Binarize `frame` for this target: target pixels 255, background 0.
    pub fn binarize(&self, frame: &GrayImageView<'_>) -> GrayImage {
        let (kx, ky) = self.params.blur;
        match self.kind {
            TargetKind::Pupil => {
                let eroded = erode3x3_u8(frame);
                let blurred = gaussian_blur_u8(&eroded.view(), kx, ky);
                threshold_u8(&blurred.view(), self.params.threshold, Binarization::Inverse)
            }
            TargetKind::CornealReflection => {
                let blurred = gaussian_blur_u8(frame, kx, ky);
                threshold_u8(&blurred.view(), self.params.threshold, Binarization::Direct)
            }
        }
    }

    /// Track the target in `frame`.
    ///
    /// Returns `None` while inactive or when this frame failed; in the
    /// latter case the recovery step may have moved the search center.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(target = %self.label))
    )]
    pub fn track(&mut self, frame: &GrayImageView<'_>) -> Option<FitResult> {
        if !self.active {
            return None;
        }
        let center = self.last_center?;
        let binarized = self.binarize(frame);
        let outcome = self.locate(&binarized.view(), center);
        self.last_binarized = Some(binarized);

        match outcome {
            Ok(fit) => {
                self.last_fit = Some(fit);
                self.last_center = Some(fit.center);
                Some(fit)
            }
            Err(err) => {
                log::warn!("{}: {err}", self.label);
                self.recover(frame, center);
                None
            }
        }
    }

    fn locate(
        &self,
        binarized: &GrayImageView<'_>,
        center: Point2<f64>,
    ) -> Result<FitResult, TrackError> {
        let points = walkout(
            binarized,
            center,
            &self.directions,
            self.params.min_radius,
            self.params.max_radius,
        )?;
        let points = match self.kind {
            TargetKind::Pupil => reject_radial_outliers(&points),
            TargetKind::CornealReflection => points,
        };
        let needed = self.params.model.min_points();
        if points.len() < needed {
            return Err(TrackError::TooFewInliers {
                kept: points.len(),
                needed,
            });
        }
        let fit = self.params.model.fit(&points)?;
        if !fit.is_finite() || !binarized.contains(fit.center.x, fit.center.y) {
            return Err(TrackError::CenterOutOfFrame {
                x: fit.center.x,
                y: fit.center.y,
            });
        }
        // Rays that never met the target keep `min_radius` and can fit a
        // tiny shape around a center that sits on background.
        let cx = fit.center.x.round() as i64;
        let cy = fit.center.y.round() as i64;
        if binarized.get_checked(cx, cy).map_or(true, |v| v == BACKGROUND) {
            return Err(TrackError::CenterOnBackground {
                x: fit.center.x,
                y: fit.center.y,
            });
        }
        Ok(fit)
    }

    fn recover(&mut self, frame: &GrayImageView<'_>, center: Point2<f64>) {
        match self.kind {
            TargetKind::Pupil => {
                let hint = self.last_fit.map(|f| f.axis2);
                match find_dark_disk(frame, center, hint, &self.recovery) {
                    Some(cand) => {
                        log::debug!(
                            "{} re-acquired near ({:.1}, {:.1}), score {:.3}",
                            self.label,
                            cand.center.x,
                            cand.center.y,
                            cand.score
                        );
                        self.last_center = Some(cand.center);
                    }
                    None => {
                        self.last_center = Some(clamp_to_frame(frame, center));
                    }
                }
            }
            TargetKind::CornealReflection => {
                log::info!(
                    "{} lost; select it again or adjust its binarization",
                    self.label
                );
                self.last_center = Some(clamp_to_frame(frame, center));
            }
        }
    }
}

/// Nearest in-frame point; non-finite coordinates go to the frame center.
fn clamp_to_frame(frame: &GrayImageView<'_>, p: Point2<f64>) -> Point2<f64> {
    let max_x = (frame.width.max(1) - 1) as f64;
    let max_y = (frame.height.max(1) - 1) as f64;
    let x = if p.x.is_finite() { p.x.clamp(0.0, max_x) } else { max_x / 2.0 };
    let y = if p.y.is_finite() { p.y.clamp(0.0, max_y) } else { max_y / 2.0 };
    Point2::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use eyetrack_core::FitModelKind;

    fn frame_with_disc(w: usize, h: usize, bg: u8, fg: u8, cx: f64, cy: f64, r: f64) -> GrayImage {
        let mut img = GrayImage::new_fill(w, h, bg);
        for y in 0..h {
            for x in 0..w {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                if dx * dx + dy * dy <= r * r {
                    img.set(x, y, fg);
                }
            }
        }
        img
    }

    #[test]
    fn inactive_processor_yields_nothing() {
        let img = GrayImage::new_fill(32, 32, 100);
        let mut p = TargetProcessor::pupil(ProcessorParams::pupil());
        assert!(p.track(&img.view()).is_none());
        assert!(!p.is_active());
        assert!(p.last_binarized().is_none());
    }

    #[test]
    fn tracks_dark_pupil() {
        let img = frame_with_disc(160, 120, 120, 10, 80.0, 60.0, 14.0);
        let mut p = TargetProcessor::pupil(ProcessorParams {
            threshold: 60.0,
            ..ProcessorParams::pupil()
        });
        p.set_center(Point2::new(78.0, 62.0));
        let fit = p.track(&img.view()).expect("fit");
        assert_abs_diff_eq!(fit.center.x, 80.0, epsilon = 1.5);
        assert_abs_diff_eq!(fit.center.y, 60.0, epsilon = 1.5);
        assert_abs_diff_eq!(fit.axis1, 15.0, epsilon = 3.0);
        assert_eq!(p.last_center(), Some(fit.center));
        assert_eq!(p.last_fit(), Some(&fit));
    }

    #[test]
    fn tracks_bright_glint_with_circle() {
        let img = frame_with_disc(100, 100, 40, 250, 30.0, 70.0, 4.0);
        let mut p = TargetProcessor::corneal_reflection(
            0,
            ProcessorParams {
                threshold: 150.0,
                ..ProcessorParams::corneal_reflection()
            },
        );
        assert_eq!(p.label(), "cr_0");
        p.set_center(Point2::new(30.0, 70.0));
        let fit = p.track(&img.view()).expect("fit");
        assert_abs_diff_eq!(fit.center.x, 30.0, epsilon = 1.0);
        assert_abs_diff_eq!(fit.center.y, 70.0, epsilon = 1.0);
        assert_eq!(fit.axis1, fit.axis2);
        let bin = p.last_binarized().expect("binarized");
        assert_eq!(bin.get(30, 70), 255);
        assert_eq!(bin.get(0, 0), 0);
    }

    #[test]
    fn failure_keeps_center_inside_frame_and_stays_active() {
        let img = GrayImage::new_fill(64, 48, 90);
        let mut pupil = TargetProcessor::pupil(ProcessorParams {
            threshold: 30.0,
            ..ProcessorParams::pupil()
        });
        pupil.set_center(Point2::new(200.0, -5.0));
        assert!(pupil.track(&img.view()).is_none());
        assert!(pupil.is_active());
        let c = pupil.last_center().expect("center");
        assert!(img.view().contains(c.x, c.y));

        let mut cr = TargetProcessor::corneal_reflection(1, ProcessorParams {
            threshold: 200.0,
            ..ProcessorParams::corneal_reflection()
        });
        cr.set_center(Point2::new(f64::NAN, 10.0));
        assert!(cr.track(&img.view()).is_none());
        assert!(cr.is_active());
        let c = cr.last_center().expect("center");
        assert!(c.x.is_finite() && img.view().contains(c.x, c.y));
    }

    #[test]
    fn failure_keeps_previous_fit() {
        let img = frame_with_disc(120, 120, 120, 10, 60.0, 60.0, 12.0);
        let mut p = TargetProcessor::pupil(ProcessorParams {
            threshold: 60.0,
            model: FitModelKind::Circular,
            ..ProcessorParams::pupil()
        });
        p.set_center(Point2::new(60.0, 60.0));
        let first = p.track(&img.view()).expect("fit");

        let blank = GrayImage::new_fill(120, 120, 120);
        assert!(p.track(&blank.view()).is_none());
        assert_eq!(p.last_fit(), Some(&first));
    }

    #[test]
    fn lost_pupil_is_reacquired_on_the_next_frame() {
        let img = frame_with_disc(200, 200, 120, 10, 140.0, 128.0, 14.0);
        let mut p = TargetProcessor::pupil(ProcessorParams {
            threshold: 60.0,
            ..ProcessorParams::pupil()
        });
        p.set_recovery_params(RecoveryParams {
            distance_weight: 0.2,
            ..RecoveryParams::default()
        });
        p.set_center(Point2::new(100.0, 100.0));

        assert!(p.track(&img.view()).is_none());
        assert!(p.last_fit().is_none());
        let c = p.last_center().expect("center");
        let off = ((c.x - 140.0).powi(2) + (c.y - 128.0).powi(2)).sqrt();
        assert!(off < 8.0, "recovered center {c:?}");

        let fit = p.track(&img.view()).expect("fit after recovery");
        assert_abs_diff_eq!(fit.center.x, 140.0, epsilon = 2.0);
        assert_abs_diff_eq!(fit.center.y, 128.0, epsilon = 2.0);
        assert!(fit.axis2 > 10.0, "axis2 {}", fit.axis2);
    }

    #[test]
    fn background_center_fit_is_rejected() {
        // A single ray clipping a distant pupil must not yield a fit
        // around the empty seed.
        let img = frame_with_disc(200, 200, 120, 10, 140.0, 129.0, 7.0);
        let mut p = TargetProcessor::pupil(ProcessorParams {
            threshold: 60.0,
            ..ProcessorParams::pupil()
        });
        p.set_center(Point2::new(100.0, 100.0));
        assert!(p.track(&img.view()).is_none());
        assert!(p.last_fit().is_none());
        assert_ne!(p.last_center(), Some(Point2::new(100.0, 100.0)));
    }

    #[test]
    fn blur_and_threshold_adjustments() {
        let mut p = TargetProcessor::corneal_reflection(0, ProcessorParams::corneal_reflection());
        p.set_threshold(100.0);
        p.adjust_threshold(-1.0);
        assert_eq!(p.threshold(), 99.0);
        p.adjust_blur(2);
        assert_eq!(p.blur(), (5, 5));
        p.adjust_blur(-10);
        assert_eq!(p.blur(), (1, 1));
    }
}
