//! Core image handling, filtering and shape fitting for pupil tracking.
//!
//! This crate is intentionally small and purely geometric. It knows
//! nothing about engines, frame sources or telemetry; those live in the
//! `eyetrack` facade crate.

mod filter;
pub mod fit;
mod image;
mod logger;

pub use filter::{
    erode3x3_u8, gaussian_blur_u8, gaussian_kernel, rotate_nearest_u8, threshold_u8, Binarization,
};
pub use fit::{fit_circle, fit_ellipse, FitError, FitModelKind, FitResult};
pub use image::{mean_intensity, sample_bilinear, GrayImage, GrayImageView, ImageError};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
