//! Frame sequences over a [`FrameSource`].
//!
//! A sequence splits the source's non-planar axes three ways:
//!
//! - **bundle axes** are merged into each returned array (always ending in
//!   `y, x`);
//! - **iteration axes** are walked by the frame index, the last one fastest;
//! - every other axis is pinned by the sequence's [`DefaultCoords`].

use crate::error::{FramesError, FramesResult};
use crate::source::FrameSource;
use lib_types::{
    axes_to_string, Axis, AxisSizes, Coords, DefaultCoords, Frame, FrameData, PixelType, ShapeError,
};

/// Indexed, axis-aware view over a frame source.
pub struct FramesSequence<S: FrameSource> {
    source: S,
    bundle_axes: Vec<Axis>,
    iter_axes: Vec<Axis>,
    default_coords: DefaultCoords,
}

impl<S: FrameSource> FramesSequence<S> {
    /// Wrap a source.
    ///
    /// Bundles `zyx` when the source has a z axis (`yx` otherwise) and
    /// iterates over `t` when present.
    pub fn new(source: S) -> Self {
        let sizes = source.sizes();
        let bundle_axes = if sizes.contains(Axis::Z) {
            vec![Axis::Z, Axis::Y, Axis::X]
        } else {
            vec![Axis::Y, Axis::X]
        };
        let iter_axes = if sizes.contains(Axis::T) {
            vec![Axis::T]
        } else {
            Vec::new()
        };
        let default_coords = source.default_coords();

        Self {
            source,
            bundle_axes,
            iter_axes,
            default_coords,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    pub fn sizes(&self) -> &AxisSizes {
        self.source.sizes()
    }

    pub fn axes(&self) -> Vec<Axis> {
        self.sizes().axes().collect()
    }

    pub fn pixel_type(&self) -> PixelType {
        self.source.pixel_type()
    }

    pub fn bundle_axes(&self) -> &[Axis] {
        &self.bundle_axes
    }

    pub fn iter_axes(&self) -> &[Axis] {
        &self.iter_axes
    }

    pub fn default_coords(&self) -> &DefaultCoords {
        &self.default_coords
    }

    pub fn default_coords_mut(&mut self) -> &mut DefaultCoords {
        &mut self.default_coords
    }

    /// Set the bundle axes from a name such as `"czyx"`.
    pub fn set_bundle_axes(&mut self, axes: &str) -> FramesResult<()> {
        self.set_bundle_axis_list(Axis::parse_list(axes)?)
    }

    /// Set the bundle axes. Axes bundled are dropped from the iteration axes.
    pub fn set_bundle_axis_list(&mut self, axes: Vec<Axis>) -> FramesResult<()> {
        let name = axes_to_string(&axes);
        if axes.len() < 2 || axes[axes.len() - 2..] != [Axis::Y, Axis::X] {
            return Err(FramesError::InvalidBundleAxes {
                axes: name,
                reason: "the last two axes must be 'yx'".to_string(),
            });
        }
        self.check_axes(&axes)?;
        if has_duplicates(&axes) {
            return Err(FramesError::InvalidBundleAxes {
                axes: name,
                reason: "duplicate axis".to_string(),
            });
        }

        self.iter_axes.retain(|a| !axes.contains(a));
        tracing::debug!(bundle_axes = %name, "Bundle axes changed");
        self.bundle_axes = axes;
        Ok(())
    }

    /// Set the iteration axes from a name such as `"tm"`.
    pub fn set_iter_axes(&mut self, axes: &str) -> FramesResult<()> {
        self.set_iter_axis_list(Axis::parse_list(axes)?)
    }

    /// Set the iteration axes. Axes iterated are dropped from the bundle axes.
    pub fn set_iter_axis_list(&mut self, axes: Vec<Axis>) -> FramesResult<()> {
        let name = axes_to_string(&axes);
        if axes.iter().any(|a| a.is_planar()) {
            return Err(FramesError::InvalidIterAxes {
                axes: name,
                reason: "'x' and 'y' cannot be iterated".to_string(),
            });
        }
        self.check_axes(&axes)?;
        if has_duplicates(&axes) {
            return Err(FramesError::InvalidIterAxes {
                axes: name,
                reason: "duplicate axis".to_string(),
            });
        }

        self.bundle_axes.retain(|a| !axes.contains(a));
        tracing::debug!(iter_axes = %name, "Iteration axes changed");
        self.iter_axes = axes;
        Ok(())
    }

    /// Number of frames: the product of the iteration axis sizes.
    pub fn len(&self) -> usize {
        self.iter_shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape of each returned frame (bundle axis sizes, in order).
    pub fn frame_shape(&self) -> Vec<usize> {
        self.shape_of(&self.bundle_axes)
    }

    /// Read frame `index`. Negative indices count from the end.
    pub fn get(&mut self, index: isize) -> Result<Frame, S::Error> {
        let position = self.resolve_index(index)?;
        let iter_coords = self.iter_coords(position);
        let mut frame = self.read_bundle(&iter_coords)?;
        frame.frame_no = Some(position);
        Ok(frame)
    }

    /// Read several frames, in the order given.
    pub fn get_many(&mut self, indices: &[isize]) -> Result<Vec<Frame>, S::Error> {
        indices.iter().map(|&i| self.get(i)).collect()
    }

    /// Iterate over all frames.
    pub fn frames(&mut self) -> Frames<'_, S> {
        let len = self.len();
        Frames {
            sequence: self,
            next: 0,
            len,
        }
    }

    fn check_axes(&self, axes: &[Axis]) -> FramesResult<()> {
        match axes.iter().find(|a| !self.sizes().contains(**a)) {
            Some(axis) => Err(FramesError::UnknownAxis(*axis)),
            None => Ok(()),
        }
    }

    fn shape_of(&self, axes: &[Axis]) -> Vec<usize> {
        axes.iter()
            .map(|a| self.sizes().get(*a).unwrap_or(1))
            .collect()
    }

    fn iter_shape(&self) -> Vec<usize> {
        self.shape_of(&self.iter_axes)
    }

    fn resolve_index(&self, index: isize) -> FramesResult<usize> {
        let len = self.len();
        let resolved = if index < 0 {
            index + len as isize
        } else {
            index
        };
        if resolved < 0 || resolved as usize >= len {
            return Err(FramesError::IndexOutOfRange { index, len });
        }
        Ok(resolved as usize)
    }

    fn iter_coords(&self, position: usize) -> Coords {
        let shape = self.iter_shape();
        self.iter_axes
            .iter()
            .copied()
            .zip(unravel(position, &shape))
            .collect()
    }

    fn read_bundle(&mut self, iter_coords: &Coords) -> Result<Frame, S::Error> {
        // Every non-planar axis gets a coordinate: iteration first, then defaults.
        let mut base: Coords = self
            .sizes()
            .axes()
            .filter(|a| !a.is_planar())
            .map(|a| (a, self.default_coords.resolve(a)))
            .collect();
        for (axis, index) in iter_coords.iter() {
            base.set(axis, index);
        }

        let outer_axes: Vec<Axis> = self.bundle_axes[..self.bundle_axes.len() - 2].to_vec();
        if outer_axes.is_empty() {
            return self.source.get_frame_2d(&base);
        }

        let outer_shape = self.shape_of(&outer_axes);
        let count: usize = outer_shape.iter().product();
        let mut planes = Vec::with_capacity(count);
        let mut first_metadata = None;

        for flat in 0..count {
            let mut coords = base.clone();
            for (axis, index) in outer_axes.iter().zip(unravel(flat, &outer_shape)) {
                coords.set(*axis, index);
            }
            let plane = self.source.get_frame_2d(&coords)?;
            if first_metadata.is_none() {
                first_metadata = Some(plane.metadata);
            }
            planes.push(plane.data);
        }

        let data = FrameData::stack(&outer_shape, planes).map_err(FramesError::from)?;
        let mut metadata = first_metadata
            .ok_or_else(|| FramesError::Shape(ShapeError::Stack("no planes".to_string())))?;
        for axis in &outer_axes {
            base.remove(*axis);
        }
        metadata.coords = base;

        Ok(Frame::new(data, metadata))
    }
}

/// Iterator over the frames of a sequence.
pub struct Frames<'a, S: FrameSource> {
    sequence: &'a mut FramesSequence<S>,
    next: usize,
    len: usize,
}

impl<S: FrameSource> Iterator for Frames<'_, S> {
    type Item = Result<Frame, S::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let frame = self.sequence.get(self.next as isize);
        self.next += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl<S: FrameSource> ExactSizeIterator for Frames<'_, S> {}

/// Row-major unravel of a flat index; the last axis varies fastest.
fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (slot, &size) in index.iter_mut().zip(shape).rev() {
        if size == 0 {
            continue;
        }
        *slot = flat % size;
        flat /= size;
    }
    index
}

fn has_duplicates(axes: &[Axis]) -> bool {
    axes.iter()
        .enumerate()
        .any(|(i, a)| axes[i + 1..].contains(a))
}
