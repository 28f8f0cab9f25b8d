//! # lib-frames
//!
//! Axis-addressed frame sequences.
//!
//! A [`FrameSource`] hands out single `(y, x)` planes for a set of axis
//! coordinates. [`FramesSequence`] turns such a source into an indexable
//! sequence:
//!
//! - **Bundling**: merge axes such as `z` or `c` into each returned array
//! - **Iteration**: walk one or more axes by frame index (negative indices
//!   count from the end)
//! - **Default coordinates**: pin every remaining axis explicitly

pub mod error;
pub mod sequence;
pub mod source;

pub use error::{FramesError, FramesResult};
pub use sequence::{Frames, FramesSequence};
pub use source::FrameSource;
