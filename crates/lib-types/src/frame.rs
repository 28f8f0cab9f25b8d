//! Decoded frames and per-frame metadata.
//!
//! A frame owns its pixels as an n-dimensional array. The element type
//! follows the file's bits-per-component in memory: 8 → `u8`, 16 → `u16`,
//! 32 → `f32`.

use crate::axes::Coords;
use crate::metadata::Rgb;
use crate::units::{Micrometers, Milliseconds};
use ndarray::{ArrayD, Axis as NdAxis, IxDyn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelType {
    U8,
    U16,
    F32,
}

impl PixelType {
    /// Pixel type for a bits-per-component-in-memory value.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::U8),
            16 => Some(Self::U16),
            32 => Some(Self::F32),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::U8 => 8,
            Self::U16 => 16,
            Self::F32 => 32,
        }
    }

    #[inline]
    pub fn bytes(self) -> usize {
        self.bits() as usize / 8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::F32 => "float32",
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors building or reshaping frame arrays.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("Byte length mismatch: expected {expected}, got {actual}")]
    ByteLength { expected: usize, actual: usize },

    #[error("Frame has no channel axis (ndim = {0})")]
    NoChannelAxis(usize),

    #[error("Channel {channel} out of range for {channels} channels")]
    ChannelOutOfRange { channel: usize, channels: usize },

    #[error("Cannot stack planes: {0}")]
    Stack(String),

    #[error("Invalid array layout: {0}")]
    Layout(String),
}

/// Pixel array of a frame.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameData {
    U8(ArrayD<u8>),
    U16(ArrayD<u16>),
    F32(ArrayD<f32>),
}

impl FrameData {
    pub fn pixel_type(&self) -> PixelType {
        match self {
            Self::U8(_) => PixelType::U8,
            Self::U16(_) => PixelType::U16,
            Self::F32(_) => PixelType::F32,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Self::U8(a) => a.shape(),
            Self::U16(a) => a.shape(),
            Self::F32(a) => a.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Build from tightly packed native-endian bytes in row-major order.
    pub fn from_ne_bytes(
        pixel_type: PixelType,
        shape: &[usize],
        bytes: &[u8],
    ) -> Result<Self, ShapeError> {
        let expected = shape.iter().product::<usize>() * pixel_type.bytes();
        if bytes.len() != expected {
            return Err(ShapeError::ByteLength {
                expected,
                actual: bytes.len(),
            });
        }

        let shape = IxDyn(shape);
        let layout = |e: ndarray::ShapeError| ShapeError::Layout(e.to_string());
        Ok(match pixel_type {
            PixelType::U8 => Self::U8(ArrayD::from_shape_vec(shape, bytes.to_vec()).map_err(layout)?),
            PixelType::U16 => {
                let values = bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_ne_bytes([c[0], c[1]]))
                    .collect();
                Self::U16(ArrayD::from_shape_vec(shape, values).map_err(layout)?)
            }
            PixelType::F32 => {
                let values = bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                    .collect();
                Self::F32(ArrayD::from_shape_vec(shape, values).map_err(layout)?)
            }
        })
    }

    /// Take one channel out of a `(height, width, channels)` array.
    pub fn select_channel(&self, channel: usize) -> Result<Self, ShapeError> {
        let shape = self.shape();
        if shape.len() != 3 {
            return Err(ShapeError::NoChannelAxis(shape.len()));
        }
        if channel >= shape[2] {
            return Err(ShapeError::ChannelOutOfRange {
                channel,
                channels: shape[2],
            });
        }

        Ok(match self {
            Self::U8(a) => Self::U8(a.index_axis(NdAxis(2), channel).to_owned()),
            Self::U16(a) => Self::U16(a.index_axis(NdAxis(2), channel).to_owned()),
            Self::F32(a) => Self::F32(a.index_axis(NdAxis(2), channel).to_owned()),
        })
    }

    /// Stack equally shaped planes into an array of shape
    /// `outer_shape ++ plane_shape`. Planes are taken in row-major order of
    /// `outer_shape`.
    pub fn stack(outer_shape: &[usize], planes: Vec<FrameData>) -> Result<Self, ShapeError> {
        let first = planes
            .first()
            .ok_or_else(|| ShapeError::Stack("no planes".to_string()))?;
        let count = outer_shape.iter().product::<usize>();
        if count != planes.len() {
            return Err(ShapeError::Stack(format!(
                "expected {count} planes, got {}",
                planes.len()
            )));
        }

        match first.pixel_type() {
            PixelType::U8 => {
                let arrays = collect_variant(planes, |p| match p {
                    Self::U8(a) => Some(a),
                    _ => None,
                })?;
                Ok(Self::U8(stack_arrays(outer_shape, arrays)?))
            }
            PixelType::U16 => {
                let arrays = collect_variant(planes, |p| match p {
                    Self::U16(a) => Some(a),
                    _ => None,
                })?;
                Ok(Self::U16(stack_arrays(outer_shape, arrays)?))
            }
            PixelType::F32 => {
                let arrays = collect_variant(planes, |p| match p {
                    Self::F32(a) => Some(a),
                    _ => None,
                })?;
                Ok(Self::F32(stack_arrays(outer_shape, arrays)?))
            }
        }
    }

    pub fn as_u8(&self) -> Option<&ArrayD<u8>> {
        match self {
            Self::U8(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<&ArrayD<u16>> {
        match self {
            Self::U16(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match self {
            Self::F32(a) => Some(a),
            _ => None,
        }
    }

    /// Widen every pixel to `f64`.
    pub fn to_f64(&self) -> ArrayD<f64> {
        match self {
            Self::U8(a) => a.mapv(f64::from),
            Self::U16(a) => a.mapv(f64::from),
            Self::F32(a) => a.mapv(f64::from),
        }
    }
}

fn collect_variant<T>(
    planes: Vec<FrameData>,
    extract: impl Fn(FrameData) -> Option<ArrayD<T>>,
) -> Result<Vec<ArrayD<T>>, ShapeError> {
    planes
        .into_iter()
        .map(|p| extract(p).ok_or_else(|| ShapeError::Stack("mixed pixel types".to_string())))
        .collect()
}

fn stack_arrays<T: Clone>(
    outer_shape: &[usize],
    arrays: Vec<ArrayD<T>>,
) -> Result<ArrayD<T>, ShapeError> {
    let plane_shape = arrays[0].shape().to_vec();
    if arrays.iter().any(|a| a.shape() != plane_shape.as_slice()) {
        return Err(ShapeError::Stack("planes differ in shape".to_string()));
    }

    let mut shape = outer_shape.to_vec();
    shape.extend_from_slice(&plane_shape);

    let values: Vec<T> = arrays.iter().flat_map(|a| a.iter().cloned()).collect();
    ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| ShapeError::Layout(e.to_string()))
}

/// Metadata attached to each decoded frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameMetadata {
    /// Stage position.
    pub x_um: Micrometers,
    pub y_um: Micrometers,
    pub z_um: Micrometers,

    /// Time relative to the first frame.
    pub t_ms: Milliseconds,

    /// Channel display colors.
    pub colors: Vec<Rgb>,

    /// Pixel size in x/y.
    pub mpp: Micrometers,

    /// Z step, when the file has a z loop.
    pub mpp_z: Option<Micrometers>,

    /// Largest value representable with the significant bits.
    pub max_value: u64,

    /// Coordinates the frame was requested with.
    pub coords: Coords,
}

/// A decoded frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub data: FrameData,
    pub metadata: FrameMetadata,

    /// Position in the iteration order, when read through a sequence.
    pub frame_no: Option<usize>,
}

impl Frame {
    pub fn new(data: FrameData, metadata: FrameMetadata) -> Self {
        Self {
            data,
            metadata,
            frame_no: None,
        }
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn pixel_type(&self) -> PixelType {
        self.data.pixel_type()
    }
}
