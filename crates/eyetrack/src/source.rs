//! Frame sources feeding [`crate::Engine::run`].

use std::collections::VecDeque;
#[cfg(feature = "image")]
use std::path::{Path, PathBuf};

use eyetrack_core::{GrayImage, ImageError};

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "image")]
    #[error("failed to decode frame: {0}")]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Frame(#[from] ImageError),
    #[error("source has no frames")]
    Empty,
    #[error("frame size changed from {expected:?} to {got:?}")]
    SizeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("{0}")]
    Message(String),
}

/// A blocking stream of grayscale frames.
pub trait FrameSource {
    /// Open the stream and return the frame size together with the first
    /// frame.
    fn init(&mut self) -> Result<((usize, usize), GrayImage), SourceError>;

    /// Next frame, or `None` at the end of the stream.
    fn next_frame(&mut self) -> Result<Option<GrayImage>, SourceError>;

    fn release(&mut self) {}
}

/// Frames held in memory.
#[derive(Clone, Debug, Default)]
pub struct FrameSequence {
    frames: VecDeque<GrayImage>,
    size: Option<(usize, usize)>,
}

impl FrameSequence {
    pub fn new(frames: impl IntoIterator<Item = GrayImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            size: None,
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for FrameSequence {
    fn init(&mut self) -> Result<((usize, usize), GrayImage), SourceError> {
        let first = self.frames.pop_front().ok_or(SourceError::Empty)?;
        let size = (first.width, first.height);
        self.size = Some(size);
        Ok((size, first))
    }

    fn next_frame(&mut self) -> Result<Option<GrayImage>, SourceError> {
        let Some(frame) = self.frames.pop_front() else {
            return Ok(None);
        };
        check_size(self.size, &frame)?;
        Ok(Some(frame))
    }
}

fn check_size(expected: Option<(usize, usize)>, frame: &GrayImage) -> Result<(), SourceError> {
    let got = (frame.width, frame.height);
    match expected {
        Some(expected) if expected != got => Err(SourceError::SizeMismatch { expected, got }),
        _ => Ok(()),
    }
}

/// Directory of still images replayed in file-name order.
#[cfg(feature = "image")]
#[derive(Clone, Debug)]
pub struct ImageSequenceSource {
    files: VecDeque<PathBuf>,
    size: Option<(usize, usize)>,
}

#[cfg(feature = "image")]
impl ImageSequenceSource {
    const EXTENSIONS: [&'static str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

    /// Collect image files in `dir`, sorted by name.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SourceError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && Self::is_image(p))
            .collect();
        if files.is_empty() {
            return Err(SourceError::Empty);
        }
        files.sort();
        log::info!(
            "{} frames found in {}",
            files.len(),
            dir.as_ref().display()
        );
        Ok(Self {
            files: files.into(),
            size: None,
        })
    }

    pub fn remaining(&self) -> usize {
        self.files.len()
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                Self::EXTENSIONS.contains(&e.as_str())
            })
            .unwrap_or(false)
    }

    fn read(path: &Path) -> Result<GrayImage, SourceError> {
        let luma = image::open(path)?.to_luma8();
        let (w, h) = luma.dimensions();
        Ok(GrayImage::from_raw(w as usize, h as usize, luma.into_raw())?)
    }
}

#[cfg(feature = "image")]
impl FrameSource for ImageSequenceSource {
    fn init(&mut self) -> Result<((usize, usize), GrayImage), SourceError> {
        let path = self.files.pop_front().ok_or(SourceError::Empty)?;
        let first = Self::read(&path)?;
        let size = (first.width, first.height);
        self.size = Some(size);
        Ok((size, first))
    }

    fn next_frame(&mut self) -> Result<Option<GrayImage>, SourceError> {
        let Some(path) = self.files.pop_front() else {
            return Ok(None);
        };
        let frame = Self::read(&path)?;
        check_size(self.size, &frame)?;
        Ok(Some(frame))
    }

    fn release(&mut self) {
        self.files.clear();
    }
}
