//! Fixed-layout records of the ND2 read SDK.
//!
//! Field order, sizes and array capacities mirror `nd2ReadSDK.h` exactly;
//! the SDK reads and writes these structs in place. They are converted to
//! owned `lib-types` values only after a call returns.

use crate::wide::{from_wide, LimWchar};
use lib_types::{
    BinaryLayerInfo, LoopKind, Micrometers, Milliseconds, PlaneInfo, Rgb, TextInfo, UserEvent,
};
use std::ffi::{c_double, c_int, c_uint, c_void};
use std::mem::size_of;

pub type LimUint = c_uint;
pub type LimInt = c_int;
pub type LimSize = usize;
pub type LimResult = c_int;
pub type LimFileHandle = c_int;

/// Capacity of `LIMBINARIES::pDescriptors`.
pub const LIM_MAX_BINARIES: usize = 128;
/// Capacity of `LIMMETADATA_DESC::pPlanes`.
pub const LIM_MAX_PICTURE_PLANES: usize = 256;
/// Capacity of `LIMEXPERIMENT::pAllocatedLevels`.
pub const LIM_MAX_EXPERIMENT_LEVEL: usize = 8;
/// Length of the ordinary text slots.
pub const LIM_TEXT_LEN: usize = 256;
/// Length of the description and capturing text slots.
pub const LIM_LONG_TEXT_LEN: usize = 4096;
/// Length of `LIMFILEUSEREVENT::wsType`.
pub const LIM_EVENT_TYPE_LEN: usize = 128;

pub const LIMLOOP_TIME: LimUint = 0;
pub const LIMLOOP_MULTIPOINT: LimUint = 1;
pub const LIMLOOP_Z: LimUint = 2;
pub const LIMLOOP_OTHER: LimUint = 3;

pub const LIMSTRETCH_QUICK: LimInt = 1;
pub const LIMSTRETCH_SPLINES: LimInt = 2;
pub const LIMSTRETCH_LINEAR: LimInt = 3;

/// Records that are valid when every byte is zero.
///
/// # Safety
///
/// Implementors must be `repr(C)` plain data: integers, floats, raw
/// pointers and arrays thereof.
pub unsafe trait PlainRecord: Sized {
    fn zeroed() -> Self {
        // SAFETY: guaranteed by the trait contract.
        unsafe { std::mem::zeroed() }
    }

    /// Zeroed record on the heap, without a stack temporary.
    fn boxed_zeroed() -> Box<Self> {
        // SAFETY: guaranteed by the trait contract.
        unsafe { Box::<Self>::new_zeroed().assume_init() }
    }
}

/// `LIMPICTURE`: a picture buffer allocated by `Lim_InitPicture`.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct LimPicture {
    pub width: LimUint,
    pub height: LimUint,
    /// 8, 16 or 32 (float).
    pub bits_per_comp: LimUint,
    pub components: LimUint,
    /// Line length, aligned to 4 bytes.
    pub width_bytes: LimUint,
    pub size: LimSize,
    pub image_data: *mut c_void,
}

/// `LIMBINARYDESCRIPTOR`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct LimBinaryDescriptor {
    pub name: [LimWchar; LIM_TEXT_LEN],
    /// Empty when the binary layer is unbound.
    pub comp_name: [LimWchar; LIM_TEXT_LEN],
    pub color_rgb: LimUint,
}

/// `LIMBINARIES`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct LimBinaries {
    pub count: LimUint,
    pub descriptors: [LimBinaryDescriptor; LIM_MAX_BINARIES],
}

/// `LIMPICTUREPLANE_DESC`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct LimPicturePlaneDesc {
    pub comp_count: LimUint,
    pub color_rgb: LimUint,
    pub name: [LimWchar; LIM_TEXT_LEN],
    pub oc_name: [LimWchar; LIM_TEXT_LEN],
    pub emission_wl: c_double,
}

/// `LIMMETADATA_DESC`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct LimMetadataDesc {
    /// Absolute time (JDN).
    pub time_start: c_double,
    pub angle: c_double,
    /// µm/px, 0.0 when uncalibrated.
    pub calibration: c_double,
    pub aspect: c_double,
    pub objective_name: [LimWchar; LIM_TEXT_LEN],
    pub objective_mag: c_double,
    pub objective_na: c_double,
    pub refract_index1: c_double,
    pub refract_index2: c_double,
    pub pinhole_radius: c_double,
    pub zoom: c_double,
    pub projective_mag: c_double,
    pub image_type: LimUint,
    pub plane_count: LimUint,
    pub component_count: LimUint,
    pub planes: [LimPicturePlaneDesc; LIM_MAX_PICTURE_PLANES],
}

/// `LIMTEXTINFO`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct LimTextInfo {
    pub image_id: [LimWchar; LIM_TEXT_LEN],
    pub image_type: [LimWchar; LIM_TEXT_LEN],
    pub group: [LimWchar; LIM_TEXT_LEN],
    pub sample_id: [LimWchar; LIM_TEXT_LEN],
    pub author: [LimWchar; LIM_TEXT_LEN],
    pub description: [LimWchar; LIM_LONG_TEXT_LEN],
    pub capturing: [LimWchar; LIM_LONG_TEXT_LEN],
    pub sampling: [LimWchar; LIM_TEXT_LEN],
    pub location: [LimWchar; LIM_TEXT_LEN],
    pub date: [LimWchar; LIM_TEXT_LEN],
    pub conclusion: [LimWchar; LIM_TEXT_LEN],
    pub info1: [LimWchar; LIM_TEXT_LEN],
    pub info2: [LimWchar; LIM_TEXT_LEN],
    pub optics: [LimWchar; LIM_TEXT_LEN],
    pub app_version: [LimWchar; LIM_TEXT_LEN],
}

/// `LIMEXPERIMENTLEVEL`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LimExperimentLevel {
    pub exp_type: LimUint,
    pub loop_size: LimUint,
    /// ms for time, µm for z, -1.0 for multipoint.
    pub interval: c_double,
}

/// `LIMEXPERIMENT`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LimExperiment {
    pub level_count: LimUint,
    pub levels: [LimExperimentLevel; LIM_MAX_EXPERIMENT_LEVEL],
}

/// `LIMLOCALMETADATA`: per-frame values filled by each decode.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LimLocalMetadata {
    /// Relative time from the first frame.
    pub time_msec: c_double,
    pub x_pos: c_double,
    pub y_pos: c_double,
    pub z_pos: c_double,
}

/// `LIMATTRIBUTES`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LimAttributes {
    pub width: LimUint,
    /// Line length, aligned to 4 bytes.
    pub width_bytes: LimUint,
    pub height: LimUint,
    pub components: LimUint,
    /// 8, 16 or 32 (float).
    pub bpc_in_memory: LimUint,
    /// 8 ..= 16, or 32 for float.
    pub bpc_significant: LimUint,
    pub sequence_count: LimUint,
    /// Tile size when the image is tiled, otherwise zero.
    pub tile_width: LimUint,
    pub tile_height: LimUint,
    /// 0 lossless, 1 lossy, 2 none.
    pub compression: LimUint,
    /// 0 (worst) to 100 (best).
    pub quality: LimUint,
}

/// `LIMFILEUSEREVENT`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct LimFileUserEvent {
    pub id: LimUint,
    pub time: c_double,
    pub event_type: [LimWchar; LIM_EVENT_TYPE_LEN],
    pub description: [LimWchar; LIM_TEXT_LEN],
}

unsafe impl PlainRecord for LimPicture {}
unsafe impl PlainRecord for LimBinaries {}
unsafe impl PlainRecord for LimMetadataDesc {}
unsafe impl PlainRecord for LimTextInfo {}
unsafe impl PlainRecord for LimExperiment {}
unsafe impl PlainRecord for LimLocalMetadata {}
unsafe impl PlainRecord for LimAttributes {}
unsafe impl PlainRecord for LimFileUserEvent {}

const W: usize = size_of::<LimWchar>();

const _: () = assert!(size_of::<LimAttributes>() == 44);
const _: () = assert!(size_of::<LimExperimentLevel>() == 16);
const _: () = assert!(size_of::<LimExperiment>() == 8 + 16 * LIM_MAX_EXPERIMENT_LEVEL);
const _: () = assert!(size_of::<LimLocalMetadata>() == 32);
const _: () = assert!(size_of::<LimPicturePlaneDesc>() == 16 + 2 * LIM_TEXT_LEN * W);
const _: () = assert!(
    size_of::<LimMetadataDesc>()
        == 104 + LIM_TEXT_LEN * W + LIM_MAX_PICTURE_PLANES * size_of::<LimPicturePlaneDesc>()
);
const _: () = assert!(size_of::<LimTextInfo>() == (13 * LIM_TEXT_LEN + 2 * LIM_LONG_TEXT_LEN) * W);
const _: () = assert!(size_of::<LimBinaryDescriptor>() == 2 * LIM_TEXT_LEN * W + 4);
const _: () = assert!(size_of::<LimFileUserEvent>() == 16 + (LIM_EVENT_TYPE_LEN + LIM_TEXT_LEN) * W);
#[cfg(target_pointer_width = "64")]
const _: () = assert!(size_of::<LimPicture>() == 40);

impl LimExperiment {
    /// Populated levels. A count above capacity is clamped.
    pub fn levels(&self) -> &[LimExperimentLevel] {
        let count = (self.level_count as usize).min(LIM_MAX_EXPERIMENT_LEVEL);
        &self.levels[..count]
    }
}

impl LimExperimentLevel {
    pub fn kind(&self) -> Option<LoopKind> {
        LoopKind::from_code(self.exp_type)
    }
}

impl LimMetadataDesc {
    /// Populated plane descriptors. A count above capacity is clamped.
    pub fn planes(&self) -> &[LimPicturePlaneDesc] {
        let count = (self.plane_count as usize).min(LIM_MAX_PICTURE_PLANES);
        &self.planes[..count]
    }

    pub fn objective(&self) -> String {
        from_wide(&self.objective_name)
    }
}

impl LimPicturePlaneDesc {
    pub fn to_plane_info(&self) -> PlaneInfo {
        PlaneInfo {
            components: self.comp_count,
            color: Rgb::from_packed(self.color_rgb),
            name: from_wide(&self.name),
            optical_config: from_wide(&self.oc_name),
            emission_nm: self.emission_wl,
        }
    }
}

impl LimTextInfo {
    pub fn to_text_info(&self) -> TextInfo {
        TextInfo {
            image_id: from_wide(&self.image_id),
            image_type: from_wide(&self.image_type),
            group: from_wide(&self.group),
            sample_id: from_wide(&self.sample_id),
            author: from_wide(&self.author),
            description: from_wide(&self.description),
            capturing: from_wide(&self.capturing),
            sampling: from_wide(&self.sampling),
            location: from_wide(&self.location),
            date: from_wide(&self.date),
            conclusion: from_wide(&self.conclusion),
            info1: from_wide(&self.info1),
            info2: from_wide(&self.info2),
            optics: from_wide(&self.optics),
            app_version: from_wide(&self.app_version),
        }
    }
}

impl LimBinaries {
    pub fn to_layers(&self) -> Vec<BinaryLayerInfo> {
        let count = (self.count as usize).min(LIM_MAX_BINARIES);
        self.descriptors[..count]
            .iter()
            .map(|d| BinaryLayerInfo {
                name: from_wide(&d.name),
                component: from_wide(&d.comp_name),
                color: Rgb::from_packed(d.color_rgb),
            })
            .collect()
    }
}

impl LimFileUserEvent {
    pub fn to_user_event(&self) -> UserEvent {
        UserEvent {
            id: self.id,
            time: Milliseconds(self.time),
            event_type: from_wide(&self.event_type),
            description: from_wide(&self.description),
        }
    }
}

impl LimLocalMetadata {
    pub fn stage_position(&self) -> (Micrometers, Micrometers, Micrometers) {
        (
            Micrometers(self.x_pos),
            Micrometers(self.y_pos),
            Micrometers(self.z_pos),
        )
    }
}
