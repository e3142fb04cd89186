//! Closed-form shape fits for boundary point sets.
//!
//! Two interchangeable models share one contract: a slice of boundary
//! points in, a [`FitResult`] or a [`FitError`] out. Neither model keeps
//! state between calls.

mod circle;
mod eigen;
mod ellipse;

pub use circle::fit_circle;
pub use ellipse::fit_ellipse;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Fitted shape in frame pixel coordinates.
///
/// For the circular model `axis1 == axis2 == radius` and `rotation == 0`.
/// For the elliptical model the axes are semi-axes with `axis1 >= axis2`
/// and `rotation` is the major-axis angle from +x in radians, in
/// `(-pi/2, pi/2]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub center: Point2<f64>,
    pub axis1: f64,
    pub axis2: f64,
    pub rotation: f64,
}

impl FitResult {
    pub fn is_finite(&self) -> bool {
        self.center.x.is_finite()
            && self.center.y.is_finite()
            && self.axis1.is_finite()
            && self.axis2.is_finite()
            && self.rotation.is_finite()
    }
}

/// Reasons a fit could not produce a unique shape.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitError {
    #[error("too few points: need {needed}, got {got}")]
    TooFewPoints { needed: usize, got: usize },
    #[error("degenerate point set (collinear or numerically unstable)")]
    Degenerate,
}

/// Shape model selected per processor at construction time.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitModelKind {
    Circular,
    #[default]
    Elliptical,
}

impl FitModelKind {
    /// Smallest point count the model accepts.
    pub fn min_points(self) -> usize {
        match self {
            Self::Circular => circle::MIN_POINTS,
            Self::Elliptical => ellipse::MIN_POINTS,
        }
    }

    pub fn fit(self, points: &[Point2<f64>]) -> Result<FitResult, FitError> {
        match self {
            Self::Circular => fit_circle(points),
            Self::Elliptical => fit_ellipse(points),
        }
    }
}

impl std::str::FromStr for FitModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "circular" | "circle" => Ok(Self::Circular),
            "elliptical" | "ellipse" | "ellipsoid" => Ok(Self::Elliptical),
            other => Err(format!("unknown fit model '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_parse() {
        assert_eq!("circular".parse(), Ok(FitModelKind::Circular));
        assert_eq!("Ellipse".parse(), Ok(FitModelKind::Elliptical));
        assert!("square".parse::<FitModelKind>().is_err());
    }

    #[test]
    fn both_models_agree_on_a_circle() {
        let pts: Vec<Point2<f64>> = (0..24)
            .map(|i| {
                let t = std::f64::consts::TAU * i as f64 / 24.0;
                Point2::new(40.0 + 12.0 * t.cos(), 30.0 + 12.0 * t.sin())
            })
            .collect();
        let c = FitModelKind::Circular.fit(&pts).expect("circle fit");
        let e = FitModelKind::Elliptical.fit(&pts).expect("ellipse fit");
        assert!((c.center - e.center).norm() < 1e-6);
        assert!((c.axis1 - e.axis1).abs() < 1e-6);
        assert!((e.axis1 - e.axis2).abs() < 1e-6);
    }
}
