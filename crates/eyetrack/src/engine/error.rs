use crate::blink::BlinkError;
use crate::io::ParamsIoError;
use crate::source::SourceError;

/// Errors that end an engine session.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("frame source failed: {0}")]
    Source(#[from] SourceError),
    #[error(transparent)]
    Params(#[from] ParamsIoError),
    #[error(transparent)]
    Blink(#[from] BlinkError),
}
