//! Interactive display surface.
//!
//! A display sees every frame after the extractors and answers with the
//! commands the operator issued since the previous frame. The engine
//! applies them before the next frame is tracked.

use eyetrack_core::GrayImageView;
use nalgebra::Point2;

use crate::engine::FrameTelemetry;

/// Addresses one of the engine's target processors.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TargetId {
    Pupil,
    CornealReflection(usize),
}

/// Operator input forwarded to the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DisplayCommand {
    /// Seed the target at a clicked position and activate it.
    SetCenter { target: TargetId, center: Point2<f64> },
    AdjustThreshold { target: TargetId, delta: f64 },
    AdjustBlur { target: TargetId, delta: isize },
    /// Rotate incoming frames by this many degrees (accumulated).
    Rotate(f64),
    ToggleRecord,
    Release,
}

pub trait Display {
    fn update(
        &mut self,
        frame: &GrayImageView<'_>,
        telemetry: &FrameTelemetry,
    ) -> Vec<DisplayCommand>;

    fn release(&mut self) {}
}
