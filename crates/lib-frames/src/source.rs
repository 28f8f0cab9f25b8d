//! The contract a file reader supplies to a frame sequence.

use crate::error::FramesError;
use lib_types::{AxisSizes, Coords, DefaultCoords, Frame, PixelType};

/// Per-plane access to a multidimensional image.
///
/// Implementors expose their axes and return one `(y, x)` plane per
/// coordinate set. Bundling, iteration and default coordinates are handled
/// by [`crate::FramesSequence`].
pub trait FrameSource {
    /// Error type of the reader. Sequence errors convert into it.
    type Error: std::error::Error + From<FramesError>;

    /// Axis sizes, including `x` and `y`.
    fn sizes(&self) -> &AxisSizes;

    /// Element type of returned frames.
    fn pixel_type(&self) -> PixelType;

    /// Coordinates to use for axes that are neither bundled nor iterated.
    fn default_coords(&self) -> DefaultCoords {
        DefaultCoords::new()
    }

    /// Read a single `(y, x)` plane.
    ///
    /// `coords` holds a coordinate for every non-planar axis of the source.
    fn get_frame_2d(&mut self, coords: &Coords) -> Result<Frame, Self::Error>;
}
