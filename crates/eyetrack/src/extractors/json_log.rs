use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::engine::EngineSnapshot;

use super::{Extractor, ExtractorError};

/// File name used inside an output directory.
pub const LOG_FILE_NAME: &str = "output.json";

/// Writes each frame's telemetry as one JSON object per line.
#[derive(Debug)]
pub struct JsonLogExtractor {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    lines: u64,
}

impl JsonLogExtractor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            lines: 0,
        }
    }

    /// Log to `<dir>/output.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(LOG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>, ExtractorError> {
        if self.writer.is_none() {
            self.writer = Some(BufWriter::new(File::create(&self.path)?));
        }
        self.writer
            .as_mut()
            .ok_or_else(|| ExtractorError::Message("log file not open".into()))
    }
}

impl Extractor for JsonLogExtractor {
    fn name(&self) -> &str {
        "json_log"
    }

    fn activate(&mut self) -> Result<(), ExtractorError> {
        self.writer()?;
        log::info!("logging telemetry to {}", self.path.display());
        Ok(())
    }

    fn fetch(&mut self, snapshot: &EngineSnapshot<'_>) -> Result<(), ExtractorError> {
        let w = self.writer()?;
        serde_json::to_writer(&mut *w, snapshot.telemetry)?;
        w.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    fn release(&mut self, _snapshot: &EngineSnapshot<'_>) -> Result<(), ExtractorError> {
        if let Some(mut w) = self.writer.take() {
            w.flush()?;
        }
        log::info!("wrote {} telemetry lines to {}", self.lines, self.path.display());
        Ok(())
    }
}
