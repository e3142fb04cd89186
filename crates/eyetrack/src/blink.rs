//! Brightness-baseline blink detection.
//!
//! The first [`CALIBRATION_SAMPLES`] frames record their mean intensity.
//! Once the buffer is full it is frozen, and afterwards a frame whose mean
//! differs from the baseline mean by more than [`BLINK_THRESHOLD`] counts
//! as a blink.

use serde::Serialize;

/// Frames collected before detection starts.
pub const CALIBRATION_SAMPLES: usize = 300;
/// Allowed absolute deviation from the baseline mean, in gray levels.
pub const BLINK_THRESHOLD: f64 = 10.0;
/// Progress is logged every this many samples.
const PROGRESS_EVERY: usize = 20;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BlinkError {
    #[error("blink calibration needs {expected} samples, got {got}")]
    WrongLength { expected: usize, got: usize },
    #[error("blink calibration contains a non-finite sample at index {index}")]
    NonFinite { index: usize },
}

/// Outcome of feeding one frame mean to the calibrator.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlinkObservation {
    /// Sample stored; `collected` of [`CALIBRATION_SAMPLES`] so far.
    Calibrating { collected: usize },
    /// This sample completed the baseline.
    CalibrationComplete,
    Open,
    Blink,
}

#[derive(Clone, Debug)]
pub struct BlinkCalibrator {
    samples: Vec<f64>,
    calibrated: bool,
    baseline: f64,
    blinking: bool,
}

impl Default for BlinkCalibrator {
    fn default() -> Self {
        Self::new()
    }
}

impl BlinkCalibrator {
    pub fn new() -> Self {
        Self {
            samples: Vec::with_capacity(CALIBRATION_SAMPLES),
            calibrated: false,
            baseline: 0.0,
            blinking: false,
        }
    }

    /// Calibrator pre-loaded with a stored baseline.
    pub fn from_samples(samples: Vec<f64>) -> Result<Self, BlinkError> {
        let mut cal = Self::new();
        cal.reload(samples)?;
        Ok(cal)
    }

    /// Replace the baseline with `samples`; the calibrator is calibrated
    /// afterwards.
    pub fn reload(&mut self, samples: Vec<f64>) -> Result<(), BlinkError> {
        if samples.len() != CALIBRATION_SAMPLES {
            return Err(BlinkError::WrongLength {
                expected: CALIBRATION_SAMPLES,
                got: samples.len(),
            });
        }
        if let Some(index) = samples.iter().position(|v| !v.is_finite()) {
            return Err(BlinkError::NonFinite { index });
        }
        self.samples = samples;
        self.freeze();
        Ok(())
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Number of samples collected so far.
    pub fn collected(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Mean of the frozen baseline; `None` while calibrating.
    pub fn baseline_mean(&self) -> Option<f64> {
        self.calibrated.then_some(self.baseline)
    }

    pub fn is_blinking(&self) -> bool {
        self.blinking
    }

    /// Feed one frame's mean intensity.
    pub fn observe(&mut self, frame_mean: f64) -> BlinkObservation {
        if !self.calibrated {
            self.samples.push(frame_mean);
            let collected = self.samples.len();
            if collected % PROGRESS_EVERY == 0 {
                log::info!("blink calibration {collected}/{CALIBRATION_SAMPLES}");
            }
            if collected == CALIBRATION_SAMPLES {
                self.freeze();
                log::info!(
                    "blink calibration complete, baseline mean {:.2}",
                    self.baseline
                );
                return BlinkObservation::CalibrationComplete;
            }
            return BlinkObservation::Calibrating { collected };
        }

        let blink = self.is_blink(frame_mean);
        if blink != self.blinking {
            if blink {
                log::info!("blink started (frame mean {frame_mean:.1})");
            } else {
                log::info!("blink ended");
            }
            self.blinking = blink;
        }
        if blink {
            BlinkObservation::Blink
        } else {
            BlinkObservation::Open
        }
    }

    /// Pure blink test against the frozen baseline; `false` while
    /// calibrating.
    pub fn is_blink(&self, frame_mean: f64) -> bool {
        self.calibrated && (frame_mean - self.baseline).abs() > BLINK_THRESHOLD
    }

    fn freeze(&mut self) {
        self.baseline = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
        self.calibrated = true;
        self.blinking = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibrates_exactly_once_at_last_sample() {
        let mut cal = BlinkCalibrator::new();
        let mut completions = 0;
        for i in 0..CALIBRATION_SAMPLES {
            match cal.observe(50.0 + (i % 3) as f64) {
                BlinkObservation::CalibrationComplete => {
                    completions += 1;
                    assert_eq!(i, CALIBRATION_SAMPLES - 1);
                }
                BlinkObservation::Calibrating { collected } => assert_eq!(collected, i + 1),
                other => panic!("unexpected {other:?} during calibration"),
            }
        }
        assert_eq!(completions, 1);
        assert!(cal.is_calibrated());

        let before = cal.samples().to_vec();
        assert_eq!(cal.observe(51.0), BlinkObservation::Open);
        assert_eq!(cal.samples(), before.as_slice());
        assert_eq!(cal.collected(), CALIBRATION_SAMPLES);
    }

    #[test]
    fn threshold_is_strict() {
        let mut cal = BlinkCalibrator::from_samples(vec![100.0; CALIBRATION_SAMPLES]).expect("valid");
        assert_eq!(cal.baseline_mean(), Some(100.0));
        assert_eq!(cal.observe(110.0), BlinkObservation::Open);
        assert_eq!(cal.observe(90.0), BlinkObservation::Open);
        assert_eq!(cal.observe(110.1), BlinkObservation::Blink);
        assert!(cal.is_blinking());
        assert_eq!(cal.observe(89.9), BlinkObservation::Blink);
        assert_eq!(cal.observe(100.0), BlinkObservation::Open);
        assert!(!cal.is_blinking());
    }

    #[test]
    fn reload_validates_length_and_values() {
        assert_eq!(
            BlinkCalibrator::from_samples(vec![1.0; 10]).unwrap_err(),
            BlinkError::WrongLength {
                expected: CALIBRATION_SAMPLES,
                got: 10
            }
        );
        let mut bad = vec![1.0; CALIBRATION_SAMPLES];
        bad[7] = f64::NAN;
        assert_eq!(
            BlinkCalibrator::from_samples(bad).unwrap_err(),
            BlinkError::NonFinite { index: 7 }
        );
    }

    #[test]
    fn uncalibrated_never_blinks() {
        let cal = BlinkCalibrator::new();
        assert!(!cal.is_blink(255.0));
        assert_eq!(cal.baseline_mean(), None);
    }
}
