//! Engine configuration and its JSON round trip.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::io::ParamsIoError;
use crate::processor::{ProcessorParams, RecoveryParams};

use super::EngineState;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// State at session start.
    pub state: EngineState,
    pub pupil: ProcessorParams,
    /// Shared by both corneal-reflection processors.
    pub corneal_reflection: ProcessorParams,
    pub recovery: RecoveryParams,
    /// Derive unset thresholds from the first frame.
    pub auto_threshold: bool,
    /// Where parameter bundles, blink calibrations and logs are written.
    pub output_dir: Option<PathBuf>,
    /// Stop `run` after this many frames.
    pub max_frames: Option<u64>,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            state: EngineState::Track,
            pupil: ProcessorParams::pupil(),
            corneal_reflection: ProcessorParams::corneal_reflection(),
            recovery: RecoveryParams::default(),
            auto_threshold: true,
            output_dir: None,
            max_frames: None,
        }
    }
}

impl EngineParams {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ParamsIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ParamsIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
