//! Error types for frame sequence operations.

use lib_types::{Axis, AxisParseError, ShapeError};
use thiserror::Error;

/// Errors that can occur while configuring or reading a frame sequence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FramesError {
    /// Axis list could not be parsed.
    #[error("Invalid axis list: {0}")]
    Parse(#[from] AxisParseError),

    /// Axis is not present in the source.
    #[error("Axis '{0}' is not present")]
    UnknownAxis(Axis),

    /// Bundle axes must end with `y, x`.
    #[error("Invalid bundle axes '{axes}': {reason}")]
    InvalidBundleAxes { axes: String, reason: String },

    /// Iteration axes may not contain the planar axes.
    #[error("Invalid iteration axes '{axes}': {reason}")]
    InvalidIterAxes { axes: String, reason: String },

    /// Frame index outside the sequence.
    #[error("Frame index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: isize, len: usize },

    /// Planes could not be assembled into one frame.
    #[error("Shape error: {0}")]
    Shape(#[from] ShapeError),
}

/// Result type for frame sequence operations.
pub type FramesResult<T> = Result<T, FramesError>;
