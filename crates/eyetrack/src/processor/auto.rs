//! Initial binarization thresholds from a representative frame.

use eyetrack_core::GrayImageView;
use serde::Serialize;

/// Pixels at or outside these bounds are ignored (sensor clipping, glints).
const LOW_CUTOFF: u8 = 30;
const HIGH_CUTOFF: u8 = 220;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct InitialThresholds {
    pub pupil: f64,
    pub corneal_reflection: f64,
}

/// Thresholds derived from the pixels strictly between 30 and 220:
/// `pupil = min + 0.1 * median`, `corneal_reflection = 0.7 * min + 150`.
///
/// `None` when no pixel falls in that range.
pub fn initial_thresholds(frame: &GrayImageView<'_>) -> Option<InitialThresholds> {
    let mut hist = [0usize; 256];
    for &v in frame.data {
        if v > LOW_CUTOFF && v < HIGH_CUTOFF {
            hist[v as usize] += 1;
        }
    }
    let count: usize = hist.iter().sum();
    if count == 0 {
        return None;
    }
    let min = hist.iter().position(|&c| c > 0)? as f64;
    let median = if count % 2 == 1 {
        nth_value(&hist, count / 2)? as f64
    } else {
        (nth_value(&hist, count / 2 - 1)? as f64 + nth_value(&hist, count / 2)? as f64) / 2.0
    };
    Some(InitialThresholds {
        pupil: min + 0.1 * median,
        corneal_reflection: 0.7 * min + 150.0,
    })
}

/// Value of the `n`-th smallest sample (0-based) in a histogram.
fn nth_value(hist: &[usize; 256], n: usize) -> Option<u8> {
    let mut seen = 0usize;
    for (v, &c) in hist.iter().enumerate() {
        seen += c;
        if seen > n {
            return u8::try_from(v).ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyetrack_core::GrayImage;

    #[test]
    fn ignores_clipped_pixels() {
        // 10 and 250 fall outside (30, 220); 40, 60, 80 remain.
        let img = GrayImage::from_raw(5, 1, vec![10, 40, 60, 80, 250]).expect("valid");
        let t = initial_thresholds(&img.view()).expect("thresholds");
        assert!((t.pupil - 46.0).abs() < 1e-9);
        assert!((t.corneal_reflection - 178.0).abs() < 1e-9);
    }

    #[test]
    fn even_count_median_averages() {
        let img = GrayImage::from_raw(4, 1, vec![50, 60, 70, 100]).expect("valid");
        let t = initial_thresholds(&img.view()).expect("thresholds");
        assert!((t.pupil - (50.0 + 6.5)).abs() < 1e-9);
    }

    #[test]
    fn saturated_frame_has_no_thresholds() {
        let img = GrayImage::new_fill(8, 8, 255);
        assert!(initial_thresholds(&img.view()).is_none());
    }
}
