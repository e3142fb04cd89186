use std::time::{Duration, Instant};

use crate::engine::EngineSnapshot;

use super::{Extractor, ExtractorError};

/// Logs the delivered frame rate once per interval.
#[derive(Debug)]
pub struct FpsExtractor {
    interval: Duration,
    window_start: Option<Instant>,
    frames_in_window: u64,
    last_fps: Option<f64>,
}

impl Default for FpsExtractor {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl FpsExtractor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            window_start: None,
            frames_in_window: 0,
            last_fps: None,
        }
    }

    /// Rate measured over the last completed interval.
    pub fn last_fps(&self) -> Option<f64> {
        self.last_fps
    }

    fn tick(&mut self, now: Instant) {
        let start = *self.window_start.get_or_insert(now);
        self.frames_in_window += 1;
        let elapsed = now.duration_since(start);
        if elapsed >= self.interval && !elapsed.is_zero() {
            let fps = self.frames_in_window as f64 / elapsed.as_secs_f64();
            self.last_fps = Some(fps);
            log::info!("{fps:.1} fps");
            self.window_start = Some(now);
            self.frames_in_window = 0;
        }
    }
}

impl Extractor for FpsExtractor {
    fn name(&self) -> &str {
        "fps"
    }

    fn activate(&mut self) -> Result<(), ExtractorError> {
        self.window_start = Some(Instant::now());
        self.frames_in_window = 0;
        Ok(())
    }

    fn fetch(&mut self, _snapshot: &EngineSnapshot<'_>) -> Result<(), ExtractorError> {
        self.tick(Instant::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_over_one_window() {
        let mut fps = FpsExtractor::new(Duration::from_secs(1));
        let t0 = Instant::now();
        fps.window_start = Some(t0);
        for i in 1..=30 {
            fps.tick(t0 + Duration::from_millis(i * 20));
        }
        assert!(fps.last_fps().is_none());
        for i in 31..=50 {
            fps.tick(t0 + Duration::from_millis(i * 20));
        }
        let rate = fps.last_fps().expect("window closed");
        assert!((rate - 50.0).abs() < 1e-6, "{rate}");
    }
}
