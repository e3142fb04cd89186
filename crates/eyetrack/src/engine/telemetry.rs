use std::time::{SystemTime, UNIX_EPOCH};

use eyetrack_core::{FitResult, GrayImageView};
use serde::{Deserialize, Serialize};

use crate::blink::BlinkCalibrator;
use crate::processor::TargetProcessor;

use super::EngineState;

/// One record per delivered frame.
///
/// Only `time` is always present. `blink` is `Some(1)` on blink frames;
/// target fields are present when that target produced a fit this frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameTelemetry {
    /// Seconds since the Unix epoch.
    pub time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blink: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pupil: Option<FitResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cr_0: Option<FitResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cr_1: Option<FitResult>,
}

impl FrameTelemetry {
    pub fn at(time: f64) -> Self {
        Self {
            time,
            ..Self::default()
        }
    }

    pub fn now() -> Self {
        Self::at(unix_time())
    }

    pub fn is_blink(&self) -> bool {
        self.blink.is_some()
    }

    /// Fit for a corneal reflection by index.
    pub fn corneal_reflection(&self, index: usize) -> Option<&FitResult> {
        match index {
            0 => self.cr_0.as_ref(),
            1 => self.cr_1.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn set_corneal_reflection(&mut self, index: usize, fit: Option<FitResult>) {
        match index {
            0 => self.cr_0 = fit,
            1 => self.cr_1 = fit,
            _ => {}
        }
    }
}

pub(crate) fn unix_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Read-only view of the engine handed to extractors.
#[derive(Clone, Copy, Debug)]
pub struct EngineSnapshot<'a> {
    /// Frames delivered so far, including the current one.
    pub frame_index: u64,
    pub state: EngineState,
    /// `false` once the engine has been released.
    pub active: bool,
    /// Frame just processed, after rotation. `None` outside frame delivery.
    pub frame: Option<GrayImageView<'a>>,
    pub telemetry: &'a FrameTelemetry,
    pub pupil: &'a TargetProcessor,
    pub corneal_reflections: &'a [TargetProcessor],
    pub blink: &'a BlinkCalibrator,
}
