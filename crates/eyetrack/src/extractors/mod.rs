//! Telemetry consumers invoked once per frame.
//!
//! Extractors are registered on the engine before the session starts.
//! Every hook receives an [`EngineSnapshot`]; an error from one extractor
//! is logged with its name and never stops the frame or other extractors.

mod fps;
#[cfg(feature = "image")]
mod frames;
mod json_log;

pub use fps::FpsExtractor;
#[cfg(feature = "image")]
pub use frames::FrameRecorder;
pub use json_log::JsonLogExtractor;

use crate::engine::EngineSnapshot;

#[derive(thiserror::Error, Debug)]
pub enum ExtractorError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "image")]
    #[error("failed to encode frame: {0}")]
    Image(#[from] image::ImageError),
    #[error("{0}")]
    Message(String),
}

pub trait Extractor {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Called once before the first frame.
    fn activate(&mut self) -> Result<(), ExtractorError> {
        Ok(())
    }

    /// Called after every frame with that frame's telemetry.
    fn fetch(&mut self, snapshot: &EngineSnapshot<'_>) -> Result<(), ExtractorError>;

    /// Called once when the engine is released.
    fn release(&mut self, _snapshot: &EngineSnapshot<'_>) -> Result<(), ExtractorError> {
        Ok(())
    }
}
