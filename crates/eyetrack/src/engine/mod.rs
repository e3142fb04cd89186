//! Frame-synchronous tracking engine.
//!
//! The engine owns one pupil processor, two corneal-reflection processors
//! and the blink calibrator. Each delivered frame goes through
//! [`Engine::on_frame`]:
//!
//! - `Record`: telemetry carries only the timestamp.
//! - `Track` while calibrating: the frame mean feeds the blink baseline.
//! - `Track` on a blink: `blink = 1`, all previous fits are cleared.
//! - `Track` otherwise: pupil, `cr_0` and `cr_1` are tracked in order.
//!
//! Extractors and the display see every frame regardless of branch.

mod error;
mod params;
mod telemetry;

pub use error::EngineError;
pub use params::EngineParams;
pub use telemetry::{EngineSnapshot, FrameTelemetry};

use std::path::{Path, PathBuf};

use eyetrack_core::{mean_intensity, rotate_nearest_u8, GrayImageView};
use serde::{Deserialize, Serialize};

use crate::blink::{BlinkCalibrator, BlinkObservation};
use crate::display::{Display, DisplayCommand, TargetId};
use crate::extractors::Extractor;
use crate::io::{self, TargetParams, TrackingParams};
use crate::processor::{initial_thresholds, TargetProcessor};
use crate::source::FrameSource;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Number of corneal-reflection processors.
pub const CORNEAL_REFLECTIONS: usize = 2;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// Timestamps only.
    Record,
    #[default]
    Track,
}

/// Everything the extractors may look at, kept apart from the extractor
/// list so both can be borrowed at once.
#[derive(Debug)]
struct Tracker {
    state: EngineState,
    active: bool,
    frame_index: u64,
    pupil: TargetProcessor,
    corneal_reflections: [TargetProcessor; CORNEAL_REFLECTIONS],
    blink: BlinkCalibrator,
    telemetry: FrameTelemetry,
}

impl Tracker {
    fn snapshot<'a>(&'a self, frame: Option<GrayImageView<'a>>) -> EngineSnapshot<'a> {
        EngineSnapshot {
            frame_index: self.frame_index,
            state: self.state,
            active: self.active,
            frame,
            telemetry: &self.telemetry,
            pupil: &self.pupil,
            corneal_reflections: &self.corneal_reflections,
            blink: &self.blink,
        }
    }

    fn clear_fits(&mut self) {
        self.pupil.clear_fit();
        for cr in &mut self.corneal_reflections {
            cr.clear_fit();
        }
    }
}

pub struct Engine {
    tracker: Tracker,
    extractors: Vec<Box<dyn Extractor>>,
    display: Option<Box<dyn Display>>,
    params: EngineParams,
    rotation_deg: f64,
    /// Thresholds were set explicitly and must not be replaced from the
    /// first frame.
    thresholds_fixed: bool,
}

impl Engine {
    pub fn new(params: EngineParams) -> Self {
        let mut pupil = TargetProcessor::pupil(params.pupil);
        pupil.set_recovery_params(params.recovery);
        let corneal_reflections =
            [0, 1].map(|i| TargetProcessor::corneal_reflection(i, params.corneal_reflection));
        let thresholds_fixed = params.pupil.has_threshold()
            && params.corneal_reflection.has_threshold();
        Self {
            tracker: Tracker {
                state: params.state,
                active: true,
                frame_index: 0,
                pupil,
                corneal_reflections,
                blink: BlinkCalibrator::new(),
                telemetry: FrameTelemetry::default(),
            },
            extractors: Vec::new(),
            display: None,
            params,
            rotation_deg: 0.0,
            thresholds_fixed,
        }
    }

    pub fn add_extractor(&mut self, extractor: Box<dyn Extractor>) {
        self.extractors.push(extractor);
    }

    pub fn set_display(&mut self, display: Box<dyn Display>) {
        self.display = Some(display);
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn state(&self) -> EngineState {
        self.tracker.state
    }

    pub fn set_state(&mut self, state: EngineState) {
        self.tracker.state = state;
    }

    /// Switch between `Record` and `Track`.
    pub fn toggle_record(&mut self) {
        self.tracker.state = match self.tracker.state {
            EngineState::Record => EngineState::Track,
            EngineState::Track => EngineState::Record,
        };
        log::info!("engine state: {:?}", self.tracker.state);
    }

    pub fn is_active(&self) -> bool {
        self.tracker.active
    }

    /// Frames delivered since construction.
    pub fn frame_index(&self) -> u64 {
        self.tracker.frame_index
    }

    /// Telemetry of the most recent frame.
    pub fn telemetry(&self) -> &FrameTelemetry {
        &self.tracker.telemetry
    }

    /// Snapshot without a frame.
    pub fn snapshot(&self) -> EngineSnapshot<'_> {
        self.tracker.snapshot(None)
    }

    pub fn pupil(&self) -> &TargetProcessor {
        &self.tracker.pupil
    }

    pub fn pupil_mut(&mut self) -> &mut TargetProcessor {
        &mut self.tracker.pupil
    }

    pub fn corneal_reflection(&self, index: usize) -> Option<&TargetProcessor> {
        self.tracker.corneal_reflections.get(index)
    }

    pub fn corneal_reflection_mut(&mut self, index: usize) -> Option<&mut TargetProcessor> {
        self.tracker.corneal_reflections.get_mut(index)
    }

    pub fn target_mut(&mut self, target: TargetId) -> Option<&mut TargetProcessor> {
        match target {
            TargetId::Pupil => Some(self.pupil_mut()),
            TargetId::CornealReflection(i) => self.corneal_reflection_mut(i),
        }
    }

    pub fn blink(&self) -> &BlinkCalibrator {
        &self.tracker.blink
    }

    /// Replace the blink baseline with stored samples.
    pub fn load_blink_calibration(&mut self, samples: Vec<f64>) -> Result<(), EngineError> {
        self.tracker.blink.reload(samples)?;
        log::info!(
            "blink calibration loaded, baseline mean {:.2}",
            self.tracker.blink.baseline_mean().unwrap_or_default()
        );
        Ok(())
    }

    /// Read a stored blink calibration file and load it.
    pub fn load_blink_calibration_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<(), EngineError> {
        let samples = io::load_blink_calibration(path)?;
        self.load_blink_calibration(samples)
    }

    /// Accumulated frame rotation in degrees.
    pub fn rotation(&self) -> f64 {
        self.rotation_deg
    }

    /// Add `degrees` to the rotation applied by [`Engine::run`].
    pub fn rotate_by(&mut self, degrees: f64) {
        self.rotation_deg = (self.rotation_deg + degrees) % 360.0;
        log::info!("frame rotation {:.1} deg", self.rotation_deg);
    }

    /// Current binarization settings of all three targets.
    pub fn tracking_params(&self) -> TrackingParams {
        let target = |p: &TargetProcessor| TargetParams {
            threshold: p.threshold(),
            blur: p.blur(),
        };
        let [cr_0, cr_1] = &self.tracker.corneal_reflections;
        TrackingParams {
            pupil: target(&self.tracker.pupil),
            cr_0: target(cr_0),
            cr_1: target(cr_1),
        }
    }

    /// Apply stored binarization settings; they also suppress the
    /// first-frame automatic thresholds.
    pub fn apply_tracking_params(&mut self, params: &TrackingParams) {
        let apply = |p: &mut TargetProcessor, t: &TargetParams| {
            p.set_threshold(t.threshold);
            p.set_blur(t.blur);
        };
        apply(&mut self.tracker.pupil, &params.pupil);
        let [cr_0, cr_1] = &mut self.tracker.corneal_reflections;
        apply(cr_0, &params.cr_0);
        apply(cr_1, &params.cr_1);
        self.thresholds_fixed = true;
        log::info!("binarization parameters loaded");
    }

    pub fn load_tracking_params(&mut self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let params = TrackingParams::load_json(path)?;
        self.apply_tracking_params(&params);
        Ok(())
    }

    /// Derive unset thresholds from a representative frame.
    pub fn prepare(&mut self, first: &GrayImageView<'_>) {
        if self.thresholds_fixed || !self.params.auto_threshold {
            return;
        }
        let Some(t) = initial_thresholds(first) else {
            log::warn!("no usable pixels for automatic thresholds");
            return;
        };
        if !self.tracker.pupil.params().has_threshold() {
            self.tracker.pupil.set_threshold(t.pupil);
        }
        for cr in &mut self.tracker.corneal_reflections {
            if !cr.params().has_threshold() {
                cr.set_threshold(t.corneal_reflection);
            }
        }
        log::info!(
            "initial thresholds: pupil {:.1}, corneal reflection {:.1}",
            t.pupil,
            t.corneal_reflection
        );
    }

    /// Call `activate` on every extractor; failures are logged.
    pub fn activate_extractors(&mut self) {
        for extractor in &mut self.extractors {
            if let Err(err) = extractor.activate() {
                log::warn!("extractor {} failed to activate: {err}", extractor.name());
            }
        }
    }

    /// Process one frame. Returns the frame's telemetry, or `None` once the
    /// engine has been released.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(frame = self.tracker.frame_index + 1))
    )]
    pub fn on_frame(&mut self, frame: &GrayImageView<'_>) -> Option<&FrameTelemetry> {
        if !self.tracker.active {
            return None;
        }
        self.tracker.frame_index += 1;
        let mut telemetry = FrameTelemetry::now();

        if self.tracker.state == EngineState::Track {
            match self.tracker.blink.observe(mean_intensity(frame)) {
                BlinkObservation::Calibrating { .. } => {}
                BlinkObservation::CalibrationComplete => self.save_blink_calibration(),
                BlinkObservation::Blink => {
                    telemetry.blink = Some(1);
                    self.tracker.clear_fits();
                }
                BlinkObservation::Open => {
                    telemetry.pupil = self.tracker.pupil.track(frame);
                    for (i, cr) in self.tracker.corneal_reflections.iter_mut().enumerate() {
                        telemetry.set_corneal_reflection(i, cr.track(frame));
                    }
                }
            }
        }
        self.tracker.telemetry = telemetry;

        let snapshot = self.tracker.snapshot(Some(*frame));
        for extractor in &mut self.extractors {
            if let Err(err) = extractor.fetch(&snapshot) {
                log::warn!("extractor {} failed: {err}", extractor.name());
            }
        }

        let commands = match self.display.as_mut() {
            Some(display) => display.update(frame, &self.tracker.telemetry),
            None => Vec::new(),
        };
        for command in commands {
            self.apply(command);
        }

        Some(&self.tracker.telemetry)
    }

    /// Execute one operator command.
    pub fn apply(&mut self, command: DisplayCommand) {
        match command {
            DisplayCommand::SetCenter { target, center } => {
                if let Some(p) = self.target_mut(target) {
                    p.set_center(center);
                }
            }
            DisplayCommand::AdjustThreshold { target, delta } => {
                if let Some(p) = self.target_mut(target) {
                    p.adjust_threshold(delta);
                }
            }
            DisplayCommand::AdjustBlur { target, delta } => {
                if let Some(p) = self.target_mut(target) {
                    p.adjust_blur(delta);
                }
            }
            DisplayCommand::Rotate(deg) => self.rotate_by(deg),
            DisplayCommand::ToggleRecord => self.toggle_record(),
            DisplayCommand::Release => self.release(),
        }
    }

    /// Drive `source` until it ends, `max_frames` is reached or the engine
    /// is released. Returns the number of frames processed.
    ///
    /// A source error releases the engine (saving parameters) and is
    /// returned.
    pub fn run(&mut self, source: &mut dyn FrameSource) -> Result<u64, EngineError> {
        let result = self.drive(source);
        if let Err(err) = &result {
            log::error!("{err}");
        }
        source.release();
        self.release();
        result
    }

    fn drive(&mut self, source: &mut dyn FrameSource) -> Result<u64, EngineError> {
        let start = self.tracker.frame_index;
        let ((w, h), first) = source.init()?;
        log::info!("source opened: {w}x{h}");
        self.prepare(&first.view());
        self.activate_extractors();

        let mut next = Some(first);
        while let Some(frame) = next.take() {
            if !self.tracker.active {
                break;
            }
            if self
                .params
                .max_frames
                .is_some_and(|max| self.tracker.frame_index - start >= max)
            {
                log::info!("frame limit reached");
                break;
            }
            if self.rotation_deg != 0.0 {
                let rotated = rotate_nearest_u8(&frame.view(), self.rotation_deg);
                self.on_frame(&rotated.view());
            } else {
                self.on_frame(&frame.view());
            }
            next = source.next_frame()?;
        }
        Ok(self.tracker.frame_index - start)
    }

    /// End the session: release extractors and display, persist
    /// parameters. Later frames are ignored. Idempotent.
    pub fn release(&mut self) {
        if !self.tracker.active {
            return;
        }
        self.tracker.active = false;

        let snapshot = self.tracker.snapshot(None);
        for extractor in &mut self.extractors {
            if let Err(err) = extractor.release(&snapshot) {
                log::warn!("extractor {} failed to release: {err}", extractor.name());
            }
        }
        if let Some(display) = self.display.as_mut() {
            display.release();
        }
        if let Some(path) = self.output_path("params") {
            match self.tracking_params().write_json(&path) {
                Ok(()) => log::info!("parameters saved to {}", path.display()),
                Err(err) => log::warn!("failed to save parameters: {err}"),
            }
        }
        log::info!("engine released after {} frames", self.tracker.frame_index);
    }

    fn save_blink_calibration(&self) {
        let Some(path) = self.output_path("blink_calibration") else {
            return;
        };
        match io::write_blink_calibration(&path, self.tracker.blink.samples()) {
            Ok(()) => log::info!("blink calibration saved to {}", path.display()),
            Err(err) => log::warn!("failed to save blink calibration: {err}"),
        }
    }

    fn output_path(&self, stem: &str) -> Option<PathBuf> {
        let dir = self.params.output_dir.as_deref()?;
        Some(io::timestamped_path(dir, stem, telemetry::unix_time()))
    }
}
