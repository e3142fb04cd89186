//! Frame-synchronous pupil and corneal-reflection tracking.
//!
//! This crate provides:
//! - [`TargetProcessor`]: binarization, ray walkout, outlier rejection and
//!   shape fitting for one target (pupil or corneal reflection)
//! - [`BlinkCalibrator`]: brightness baseline and blink test
//! - [`Engine`]: the per-frame state machine that sequences the above,
//!   assembles [`FrameTelemetry`] and drives [`Extractor`]s
//! - frame sources, frame recording, parameter persistence and a small CLI
//!   (feature `cli`)
//!
//! ## Quickstart
//!
//! ```no_run
//! use eyetrack::{Engine, EngineParams, FrameSequence, JsonLogExtractor};
//! use eyetrack::core::GrayImage;
//! use nalgebra::Point2;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let frames = vec![GrayImage::new_fill(320, 240, 60); 10];
//! let mut engine = Engine::new(EngineParams::default());
//! engine.load_blink_calibration(vec![60.0; eyetrack::blink::CALIBRATION_SAMPLES])?;
//! engine.pupil_mut().set_center(Point2::new(160.0, 120.0));
//! engine.add_extractor(Box::new(JsonLogExtractor::new("output.json")));
//! let processed = engine.run(&mut FrameSequence::new(frames))?;
//! println!("{processed} frames");
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `eyetrack::core`: images, filters and the circle / ellipse fits.
//! - `eyetrack::walkout`: ray sets and the boundary search.
//! - `eyetrack::processor`: per-target tracking and recovery.
//! - `eyetrack::engine`: state machine, telemetry and snapshots.
//! - `eyetrack::extractors`: telemetry consumers.
//! - `eyetrack::source`: frame sources.
//! - `eyetrack::io`: parameter and blink calibration files.

pub use eyetrack_core as core;

pub mod blink;
pub mod display;
pub mod engine;
pub mod extractors;
pub mod io;
pub mod processor;
pub mod source;
pub mod walkout;

pub use blink::{BlinkCalibrator, BlinkError, BlinkObservation};
pub use display::{Display, DisplayCommand, TargetId};
pub use engine::{Engine, EngineError, EngineParams, EngineSnapshot, EngineState, FrameTelemetry};
pub use extractors::{Extractor, ExtractorError, FpsExtractor, JsonLogExtractor};
pub use eyetrack_core::{FitError, FitModelKind, FitResult};
pub use io::{ParamsIoError, TargetParams, TrackingParams};
pub use processor::{ProcessorParams, RecoveryParams, TargetKind, TargetProcessor, TrackError};
#[cfg(feature = "image")]
pub use extractors::FrameRecorder;
#[cfg(feature = "image")]
pub use source::ImageSequenceSource;
pub use source::{FrameSequence, FrameSource, SourceError};
pub use walkout::WalkoutError;
