use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::EngineSnapshot;

use super::{Extractor, ExtractorError};

/// Saves every delivered frame as `frame_<index>.png` in a directory.
#[derive(Debug)]
pub struct FrameRecorder {
    dir: PathBuf,
    saved: u64,
}

impl FrameRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            saved: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn frames_saved(&self) -> u64 {
        self.saved
    }

    /// File written for the frame with this engine index.
    pub fn frame_path(&self, frame_index: u64) -> PathBuf {
        self.dir.join(format!("frame_{frame_index:06}.png"))
    }
}

impl Extractor for FrameRecorder {
    fn name(&self) -> &str {
        "frame_recorder"
    }

    fn activate(&mut self) -> Result<(), ExtractorError> {
        fs::create_dir_all(&self.dir)?;
        log::info!("saving frames to {}", self.dir.display());
        Ok(())
    }

    fn fetch(&mut self, snapshot: &EngineSnapshot<'_>) -> Result<(), ExtractorError> {
        let Some(frame) = snapshot.frame else {
            return Ok(());
        };
        let img = image::GrayImage::from_raw(
            frame.width as u32,
            frame.height as u32,
            frame.data.to_vec(),
        )
        .ok_or_else(|| {
            ExtractorError::Message(format!(
                "frame {} has an inconsistent buffer",
                snapshot.frame_index
            ))
        })?;
        img.save(self.frame_path(snapshot.frame_index))?;
        self.saved += 1;
        Ok(())
    }

    fn release(&mut self, _snapshot: &EngineSnapshot<'_>) -> Result<(), ExtractorError> {
        log::info!("saved {} frames to {}", self.saved, self.dir.display());
        Ok(())
    }
}
