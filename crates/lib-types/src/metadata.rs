//! File-level metadata in plain Rust types.
//!
//! Everything here is an owned snapshot of what the vendor records hold,
//! converted after crossing the FFI boundary.

use crate::axes::Axis;
use crate::units::{JulianDay, Micrometers, Milliseconds};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Display color of a channel as normalized RGB.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    /// Unpack a `0x00BBGGRR` color word.
    pub fn from_packed(rgb: u32) -> Self {
        Self {
            r: (rgb & 0xFF) as f64 / 255.0,
            g: ((rgb >> 8) & 0xFF) as f64 / 255.0,
            b: ((rgb >> 16) & 0xFF) as f64 / 255.0,
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }
}

/// Kind of acquisition loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopKind {
    Time,
    Multipoint,
    Z,
    Other,
}

impl LoopKind {
    /// Decode the vendor loop type code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Time),
            1 => Some(Self::Multipoint),
            2 => Some(Self::Z),
            3 => Some(Self::Other),
            _ => None,
        }
    }

    /// Axis this loop is exposed as.
    pub fn axis(self) -> Axis {
        match self {
            Self::Time => Axis::T,
            Self::Multipoint => Axis::M,
            Self::Z => Axis::Z,
            Self::Other => Axis::O,
        }
    }
}

/// One level of the experiment (acquisition loop).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoopInfo {
    pub kind: LoopKind,

    /// Number of frames in the loop.
    pub size: usize,

    /// Sampling interval: ms for time, µm for z, -1.0 for multipoint.
    pub interval: f64,
}

/// Image compression stored in the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Lossless,
    Lossy,
    Uncompressed,
}

impl Compression {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Lossless),
            1 => Some(Self::Lossy),
            2 => Some(Self::Uncompressed),
            _ => None,
        }
    }
}

/// Normal or spectral image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Normal,
    Spectral,
}

impl ImageType {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Normal),
            1 => Some(Self::Spectral),
            _ => None,
        }
    }
}

/// Logical picture plane (channel).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneInfo {
    /// Number of physical components.
    pub components: u32,
    pub color: Rgb,
    pub name: String,
    /// Optical configuration name.
    pub optical_config: String,
    pub emission_nm: f64,
}

/// Global metadata snapshot of an open file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Nd2Metadata {
    pub width: u32,
    pub width_bytes: u32,
    pub height: u32,
    pub components: u32,
    pub bitsize_memory: u32,
    pub bitsize_significant: u32,
    pub sequence_count: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub compression: Option<Compression>,
    /// 0 (worst) to 100 (best).
    pub compression_quality: u32,

    pub plane_count: u32,
    pub angle: f64,
    pub calibration: Micrometers,
    pub time_start_jdn: JulianDay,
    pub time_start: Option<DateTime<Local>>,
    pub time_start_utc: Option<DateTime<Utc>>,
    pub objective: String,
    pub magnification: f64,
    pub numerical_aperture: f64,
    pub refractive_index1: f64,
    pub refractive_index2: f64,
    pub pinhole: f64,
    pub zoom: f64,
    pub projective_mag: f64,
    pub image_type: Option<ImageType>,

    pub z_home: Option<i32>,
    pub loops: Vec<LoopInfo>,
    pub planes: Vec<PlaneInfo>,
}

impl Nd2Metadata {
    /// Channel display colors, one per plane.
    pub fn colors(&self) -> Vec<Rgb> {
        self.planes.iter().map(|p| p.color).collect()
    }
}

/// Free-form text fields of the file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextInfo {
    pub image_id: String,
    pub image_type: String,
    pub group: String,
    pub sample_id: String,
    pub author: String,
    /// Acquisition description; contains the capturing text as well.
    pub description: String,
    pub capturing: String,
    pub sampling: String,
    pub location: String,
    pub date: String,
    pub conclusion: String,
    pub info1: String,
    pub info2: String,
    pub optics: String,
    pub app_version: String,
}

/// User event recorded during acquisition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserEvent {
    pub id: u32,
    pub time: Milliseconds,
    pub event_type: String,
    pub description: String,
}

/// Binary (mask) layer descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinaryLayerInfo {
    pub name: String,
    /// Component the layer is bound to; empty when unbound.
    pub component: String,
    pub color: Rgb,
}

/// Stitched large-image layout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LargeImageDimensions {
    pub x_fields: u32,
    pub y_fields: u32,
    pub overlap: f64,
}
