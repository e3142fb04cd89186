//! Persistence of binarization parameters and blink calibrations.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ParamsIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Binarization settings of one target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetParams {
    pub threshold: f64,
    pub blur: (usize, usize),
}

/// Saved binarization settings, keyed like the telemetry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackingParams {
    pub pupil: TargetParams,
    pub cr_0: TargetParams,
    pub cr_1: TargetParams,
}

impl TrackingParams {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ParamsIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ParamsIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn corneal_reflection(&self, index: usize) -> Option<&TargetParams> {
        match index {
            0 => Some(&self.cr_0),
            1 => Some(&self.cr_1),
            _ => None,
        }
    }
}

/// Read a blink calibration stored as a flat JSON array of frame means.
pub fn load_blink_calibration(path: impl AsRef<Path>) -> Result<Vec<f64>, ParamsIoError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn write_blink_calibration(
    path: impl AsRef<Path>,
    samples: &[f64],
) -> Result<(), ParamsIoError> {
    fs::write(path, serde_json::to_string(samples)?)?;
    Ok(())
}

/// `<dir>/<stem>_<unix seconds>.json`
pub fn timestamped_path(dir: &Path, stem: &str, unix_time: f64) -> PathBuf {
    dir.join(format!("{stem}_{}.json", unix_time.max(0.0) as u64))
}
