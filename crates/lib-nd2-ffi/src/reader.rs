//! ND2 file reader.
//!
//! An [`Nd2Reader`] owns one open file handle and one decode buffer. The
//! attribute, experiment and metadata records are read once at open time;
//! everything afterwards decodes frames or performs small lookups.

use crate::error::{LimStatus, Nd2Error, Nd2Result};
use crate::loader::{LimCoords, Nd2Library};
use crate::picture::{aligned_stride, copy_rows, DecodeBuffer};
use crate::records::{
    LimAttributes, LimExperiment, LimFileHandle, LimLocalMetadata, LimMetadataDesc,
    LIMSTRETCH_LINEAR, LIMSTRETCH_QUICK, LIMSTRETCH_SPLINES, LIM_MAX_EXPERIMENT_LEVEL,
};
use lib_frames::{FrameSource, FramesError, FramesSequence};
use lib_types::{
    Axis, AxisSizes, BinaryLayerInfo, Compression, Coords, DefaultCoords, Frame, FrameData,
    FrameMetadata, ImageType, JulianDay, LargeImageDimensions, LoopInfo, LoopKind, Micrometers,
    Milliseconds, Nd2Metadata, PixelType, Rgb, ShapeError, TextInfo, UserEvent,
};
use ndarray::Array2;
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File extension recognized as ND2.
pub const ND2_EXTENSION: &str = "nd2";

/// True if `path` has the `.nd2` extension (any case).
pub fn is_nd2_path<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ND2_EXTENSION))
}

/// Reader state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Open,
    Closed,
}

/// Options applied when opening a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Default multipoint (`m`) coordinate.
    pub series: usize,
    /// Default channel (`c`) coordinate.
    pub channel: usize,
}

/// Resampling used by [`Nd2Reader::read_region`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StretchMode {
    #[default]
    Quick,
    Splines,
    Linear,
}

impl StretchMode {
    pub fn code(self) -> i32 {
        match self {
            Self::Quick => LIMSTRETCH_QUICK,
            Self::Splines => LIMSTRETCH_SPLINES,
            Self::Linear => LIMSTRETCH_LINEAR,
        }
    }
}

/// Destination rectangle of a region read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// An open file handle, closed on drop.
struct FileHandle {
    library: Arc<Nd2Library>,
    raw: Option<LimFileHandle>,
}

impl FileHandle {
    fn open(library: Arc<Nd2Library>, path: &Path) -> Nd2Result<Self> {
        let raw = library.open_for_read(path)?;
        Ok(Self {
            library,
            raw: Some(raw),
        })
    }

    fn raw(&self) -> Nd2Result<LimFileHandle> {
        self.raw.ok_or(Nd2Error::Closed)
    }

    fn is_open(&self) -> bool {
        self.raw.is_some()
    }

    /// Close once; the handle is forgotten even if the SDK reports an error.
    fn close(&mut self) -> Nd2Result<()> {
        match self.raw.take() {
            Some(raw) => self.library.close(raw),
            None => Ok(()),
        }
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "Error closing ND2 file during cleanup");
        }
    }
}

/// A reader over one ND2 file.
///
/// Frame reads share a single decode buffer and take `&mut self`; wrap the
/// reader in a `Mutex` to share it between threads. The reader is `Send`
/// but intentionally not `Sync`.
pub struct Nd2Reader {
    library: Arc<Nd2Library>,
    path: PathBuf,
    options: ReaderOptions,

    // Field order matters: the buffer is released before the handle closes.
    buffer: Option<DecodeBuffer>,
    file: FileHandle,

    attributes: LimAttributes,
    experiment: LimExperiment,
    /// Axis of each experiment level, in level order.
    level_axes: Vec<Axis>,
    sizes: AxisSizes,
    pixel_type: PixelType,
    max_value: u64,
    mpp_z: Option<Micrometers>,
    metadata: Nd2Metadata,
    text_info: Option<TextInfo>,

    _not_sync: PhantomData<Cell<()>>,
}

impl Nd2Reader {
    /// Open a file with default options.
    pub fn open<P: AsRef<Path>>(library: Arc<Nd2Library>, path: P) -> Nd2Result<Self> {
        Self::open_with(library, path, ReaderOptions::default())
    }

    /// Open a file.
    ///
    /// Fails with [`Nd2Error::FileNotFound`] before touching the SDK when
    /// the path is not a file. If anything fails after the SDK opened the
    /// file, the handle and buffer are released before returning.
    pub fn open_with<P: AsRef<Path>>(
        library: Arc<Nd2Library>,
        path: P,
        options: ReaderOptions,
    ) -> Nd2Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Nd2Error::FileNotFound(path.display().to_string()));
        }
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

        let file = FileHandle::open(library.clone(), &path)?;
        let handle = file.raw()?;

        let attributes = library.attributes(handle)?;
        let experiment = library.experiment(handle)?;
        let desc = library.metadata(handle)?;

        if desc.aspect != 1.0 {
            return Err(Nd2Error::UnsupportedGeometry {
                aspect: desc.aspect,
            });
        }
        let pixel_type = PixelType::from_bits(attributes.bpc_in_memory)
            .ok_or(Nd2Error::UnsupportedPixelDepth(attributes.bpc_in_memory))?;
        if attributes.width == 0 || attributes.height == 0 || attributes.components == 0 {
            return Err(Nd2Error::InvalidRecord(format!(
                "empty image {}x{}x{}",
                attributes.width, attributes.height, attributes.components
            )));
        }

        let layout = AxisLayout::from_records(&attributes, &experiment)?;
        let z_home = layout
            .sizes
            .contains(Axis::Z)
            .then(|| library.z_stack_home(handle));
        validate_options(&options, &layout.sizes)?;

        let metadata = build_metadata(&attributes, &desc, &layout.loops, z_home);

        let buffer = DecodeBuffer::new(
            library.clone(),
            attributes.width,
            attributes.height,
            attributes.bpc_in_memory,
            attributes.components,
        )?;

        tracing::info!(
            path = %path.display(),
            sizes = %layout.sizes,
            pixel_type = %pixel_type,
            sequence_count = attributes.sequence_count,
            "Opened ND2 file"
        );

        Ok(Self {
            library,
            path,
            options,
            buffer: Some(buffer),
            file,
            attributes,
            experiment,
            level_axes: layout.level_axes,
            sizes: layout.sizes,
            pixel_type,
            max_value: max_value(attributes.bpc_significant),
            mpp_z: layout.z_step.map(Micrometers),
            metadata,
            text_info: None,
            _not_sync: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> ReaderOptions {
        self.options
    }

    pub fn library(&self) -> &Arc<Nd2Library> {
        &self.library
    }

    pub fn state(&self) -> ReaderState {
        if self.file.is_open() {
            ReaderState::Open
        } else {
            ReaderState::Closed
        }
    }

    /// Axis sizes: `x`, `y`, then `c` and one axis per experiment level.
    pub fn sizes(&self) -> &AxisSizes {
        &self.sizes
    }

    pub fn axes(&self) -> Vec<Axis> {
        self.sizes.axes().collect()
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// Default coordinates derived from the open options.
    pub fn default_coords(&self) -> DefaultCoords {
        let mut defaults = DefaultCoords::new();
        if self.sizes.contains(Axis::M) {
            defaults.set(Axis::M, self.options.series);
        }
        if self.sizes.contains(Axis::C) {
            defaults.set(Axis::C, self.options.channel);
        }
        defaults
    }

    /// Global metadata read at open time. Still available after close.
    pub fn metadata(&self) -> &Nd2Metadata {
        &self.metadata
    }

    /// Pixel size in x and y.
    pub fn calibration(&self) -> Micrometers {
        self.metadata.calibration
    }

    /// Z step, when the file has a z loop.
    pub fn calibration_z(&self) -> Option<Micrometers> {
        self.mpp_z
    }

    pub fn colors(&self) -> Vec<Rgb> {
        self.metadata.colors()
    }

    pub fn z_home(&self) -> Option<i32> {
        self.metadata.z_home
    }

    pub fn max_value(&self) -> u64 {
        self.max_value
    }

    /// Full text info record, read on first use.
    pub fn text_info(&mut self) -> Nd2Result<&TextInfo> {
        if self.text_info.is_none() {
            let handle = self.file.raw()?;
            let record = self.library.text_info(handle)?;
            self.text_info = Some(record.to_text_info());
        }
        self.text_info
            .as_ref()
            .ok_or_else(|| Nd2Error::InvalidRecord("text info unavailable".to_string()))
    }

    /// Acquisition description text. It includes the capturing text.
    pub fn metadata_text(&mut self) -> Nd2Result<String> {
        Ok(self.text_info()?.description.clone())
    }

    /// Decode the frame at `coords`.
    ///
    /// Missing coordinates default to 0 and coordinates for axes the file
    /// does not have are ignored. The result has shape `(y, x)`, or
    /// `(y, x, c)` for multi-component files read without a `c` coordinate.
    pub fn get_frame(&mut self, coords: &Coords) -> Nd2Result<Frame> {
        let handle = self.file.raw()?;
        let seq_index = self.seq_index_for_coords(coords)?;

        let buffer = self.buffer.as_mut().ok_or(Nd2Error::Closed)?;
        let picture = buffer.picture_mut().ok_or(Nd2Error::Closed)?;
        // SAFETY: the picture was sized from this file's attributes.
        let local = unsafe { self.library.image_data(handle, seq_index, picture)? };
        let bytes = buffer.copy_pixels()?;

        tracing::debug!(seq_index, coords = ?coords, "Decoded frame");

        self.assemble(
            &bytes,
            self.attributes.height as usize,
            self.attributes.width as usize,
            coords,
            &local,
        )
    }

    /// Decode a rectangle of the frame at `coords`, rescaled so that the
    /// whole image would measure `total` pixels.
    pub fn read_region(
        &mut self,
        coords: &Coords,
        total: (u32, u32),
        region: Region,
        stretch: StretchMode,
    ) -> Nd2Result<Frame> {
        let handle = self.file.raw()?;
        if region.width == 0 || region.height == 0 {
            return Err(Nd2Error::invalid_parameter("region", "empty rectangle"));
        }
        let fits = |start: u32, len: u32, limit: u32| {
            start.checked_add(len).is_some_and(|end| end <= limit)
        };
        if !fits(region.x, region.width, total.0) || !fits(region.y, region.height, total.1) {
            return Err(Nd2Error::invalid_parameter(
                "region",
                format!(
                    "{}x{}+{}+{} exceeds total size {}x{}",
                    region.width, region.height, region.x, region.y, total.0, total.1
                ),
            ));
        }
        let seq_index = self.seq_index_for_coords(coords)?;

        let row_len = region.width as usize
            * self.attributes.components as usize
            * self.pixel_type.bytes();
        let stride = aligned_stride(row_len);
        let line_size = u32::try_from(stride)
            .map_err(|_| Nd2Error::invalid_parameter("region", "row too long"))?;
        let mut buffer = vec![0u8; stride * region.height as usize];
        let local = self.library.image_rect_data(
            handle,
            seq_index,
            total,
            (region.x, region.y),
            (region.width, region.height),
            &mut buffer,
            line_size,
            stretch.code(),
        )?;
        let bytes = copy_rows(&buffer, stride, row_len, region.height as usize)?;

        tracing::debug!(seq_index, ?region, ?stretch, "Decoded region");

        self.assemble(
            &bytes,
            region.height as usize,
            region.width as usize,
            coords,
            &local,
        )
    }

    /// Flat sequence index of `coords`.
    pub fn seq_index_for_coords(&self, coords: &Coords) -> Nd2Result<u32> {
        self.file.raw()?;
        self.check_coords(coords)?;
        let mut lim: LimCoords = [0; LIM_MAX_EXPERIMENT_LEVEL];
        for (slot, axis) in lim.iter_mut().zip(&self.level_axes) {
            // Bounded by the loop size, which is a u32.
            *slot = coords.get_or_zero(*axis) as u32;
        }
        Ok(self.library.seq_index_from_coords(&self.experiment, &lim))
    }

    /// Loop coordinates of a flat sequence index.
    pub fn coords_for_seq_index(&self, seq_index: u32) -> Nd2Result<Coords> {
        self.file.raw()?;
        if seq_index >= self.attributes.sequence_count {
            return Err(Nd2Error::invalid_parameter(
                "seq_index",
                format!(
                    "{seq_index} out of range for {} frames",
                    self.attributes.sequence_count
                ),
            ));
        }
        let lim = self
            .library
            .coords_from_seq_index(&self.experiment, seq_index);
        Ok(self
            .level_axes
            .iter()
            .zip(lim)
            .map(|(axis, index)| (*axis, index as usize))
            .collect())
    }

    /// Binary (mask) layer descriptors.
    pub fn binaries(&self) -> Nd2Result<Vec<BinaryLayerInfo>> {
        let handle = self.file.raw()?;
        Ok(self.library.binary_descriptors(handle)?.to_layers())
    }

    /// Decode binary layer `index` of frame `seq_index` as a label plane.
    pub fn binary_layer(&self, seq_index: u32, index: u32) -> Nd2Result<Array2<u32>> {
        let handle = self.file.raw()?;
        let (width, height) = (self.attributes.width, self.attributes.height);
        let mut buffer = DecodeBuffer::new(self.library.clone(), width, height, 32, 1)?;
        let picture = buffer.picture_mut().ok_or(Nd2Error::Closed)?;
        // SAFETY: freshly allocated 32-bit single component picture.
        unsafe { self.library.binary(handle, seq_index, index, picture)? };
        let bytes = buffer.copy_pixels()?;

        let labels = bytes
            .chunks_exact(4)
            .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Array2::from_shape_vec((height as usize, width as usize), labels)
            .map_err(|e| FramesError::from(ShapeError::Layout(e.to_string())).into())
    }

    /// Name of multipoint position `point`.
    pub fn multipoint_name(&self, point: usize) -> Nd2Result<String> {
        let handle = self.file.raw()?;
        if let Some(size) = self.sizes.get(Axis::M) {
            if point >= size {
                return Err(Nd2Error::InvalidCoordinate {
                    axis: Axis::M.as_char(),
                    index: point,
                    size,
                });
            }
        }
        let point = u32::try_from(point)
            .map_err(|_| Nd2Error::invalid_parameter("point", "too large"))?;
        self.library.multipoint_name(handle, point)
    }

    /// Stitched field layout of a large image.
    pub fn large_image_dimensions(&self) -> Nd2Result<LargeImageDimensions> {
        let handle = self.file.raw()?;
        let (x_fields, y_fields, overlap) = self.library.large_image_dimensions(handle)?;
        Ok(LargeImageDimensions {
            x_fields,
            y_fields,
            overlap,
        })
    }

    pub fn recorded_int(&self, name: &str, seq_index: u32) -> Nd2Result<i32> {
        let handle = self.file.raw()?;
        self.library
            .recorded_int(handle, name, recorded_index(seq_index)?)
    }

    pub fn recorded_double(&self, name: &str, seq_index: u32) -> Nd2Result<f64> {
        let handle = self.file.raw()?;
        self.library
            .recorded_double(handle, name, recorded_index(seq_index)?)
    }

    pub fn recorded_string(&self, name: &str, seq_index: u32) -> Nd2Result<String> {
        let handle = self.file.raw()?;
        self.library
            .recorded_string(handle, name, recorded_index(seq_index)?)
    }

    /// All user events, in recording order.
    pub fn user_events(&self) -> Nd2Result<Vec<UserEvent>> {
        let handle = self.file.raw()?;
        let mut events = Vec::new();
        let mut next_id = 0u32;
        loop {
            let previous = next_id;
            match self.library.next_user_event(handle, &mut next_id) {
                Ok(event) => events.push(event.to_user_event()),
                Err(Nd2Error::ForeignCall {
                    status: LimStatus::NotFound | LimStatus::OutOfRange,
                    ..
                }) => break,
                Err(e) => return Err(e),
            }
            if next_id == previous {
                break;
            }
        }
        Ok(events)
    }

    /// Wrap the reader in a frame sequence.
    pub fn into_sequence(self) -> FramesSequence<Self> {
        FramesSequence::new(self)
    }

    /// Release the decode buffer and close the file.
    ///
    /// Safe to call more than once. The reader is closed afterwards even if
    /// the SDK reports an error, which is returned.
    pub fn close(&mut self) -> Nd2Result<()> {
        if let Some(mut buffer) = self.buffer.take() {
            buffer.release();
        }
        if !self.file.is_open() {
            return Ok(());
        }
        let result = self.file.close();
        tracing::debug!(path = %self.path.display(), "Closed ND2 file");
        result
    }

    fn check_coords(&self, coords: &Coords) -> Nd2Result<()> {
        for (axis, index) in coords.iter() {
            if axis.is_planar() {
                continue;
            }
            if let Some(size) = self.sizes.get(axis) {
                if index >= size {
                    return Err(Nd2Error::InvalidCoordinate {
                        axis: axis.as_char(),
                        index,
                        size,
                    });
                }
            }
        }
        Ok(())
    }

    fn assemble(
        &self,
        bytes: &[u8],
        height: usize,
        width: usize,
        coords: &Coords,
        local: &LimLocalMetadata,
    ) -> Nd2Result<Frame> {
        let components = self.attributes.components as usize;
        let shape: Vec<usize> = if components > 1 {
            vec![height, width, components]
        } else {
            vec![height, width]
        };
        let mut data =
            FrameData::from_ne_bytes(self.pixel_type, &shape, bytes).map_err(FramesError::from)?;
        if components > 1 {
            if let Some(channel) = coords.get(Axis::C) {
                data = data.select_channel(channel).map_err(FramesError::from)?;
            }
        }

        let (x_um, y_um, z_um) = local.stage_position();
        let metadata = FrameMetadata {
            x_um,
            y_um,
            z_um,
            t_ms: Milliseconds(local.time_msec),
            colors: self.metadata.colors(),
            mpp: self.metadata.calibration,
            mpp_z: self.mpp_z,
            max_value: self.max_value,
            coords: coords.clone(),
        };
        Ok(Frame::new(data, metadata))
    }
}

impl Drop for Nd2Reader {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, path = %self.path.display(), "Error during reader cleanup");
        }
    }
}

impl fmt::Debug for Nd2Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nd2Reader")
            .field("path", &self.path)
            .field("state", &self.state())
            .field("sizes", &self.sizes.to_string())
            .field("pixel_type", &self.pixel_type)
            .finish()
    }
}

impl FrameSource for Nd2Reader {
    type Error = Nd2Error;

    fn sizes(&self) -> &AxisSizes {
        &self.sizes
    }

    fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    fn default_coords(&self) -> DefaultCoords {
        Nd2Reader::default_coords(self)
    }

    fn get_frame_2d(&mut self, coords: &Coords) -> Nd2Result<Frame> {
        if self.sizes.contains(Axis::C) && !coords.contains(Axis::C) {
            let coords = coords.clone().with(Axis::C, self.options.channel);
            return self.get_frame(&coords);
        }
        self.get_frame(coords)
    }
}

/// Axes derived from the attribute and experiment records.
struct AxisLayout {
    sizes: AxisSizes,
    level_axes: Vec<Axis>,
    loops: Vec<LoopInfo>,
    z_step: Option<f64>,
}

impl AxisLayout {
    fn from_records(attributes: &LimAttributes, experiment: &LimExperiment) -> Nd2Result<Self> {
        if experiment.level_count as usize > LIM_MAX_EXPERIMENT_LEVEL {
            return Err(Nd2Error::InvalidRecord(format!(
                "{} experiment levels (at most {LIM_MAX_EXPERIMENT_LEVEL})",
                experiment.level_count
            )));
        }

        let mut sizes = AxisSizes::new();
        sizes.insert(Axis::X, attributes.width as usize);
        sizes.insert(Axis::Y, attributes.height as usize);
        if attributes.components > 1 {
            sizes.insert(Axis::C, attributes.components as usize);
        }

        let mut level_axes = Vec::new();
        let mut loops = Vec::new();
        let mut z_step = None;
        for level in experiment.levels() {
            let kind = level.kind().ok_or_else(|| {
                Nd2Error::InvalidRecord(format!("unknown loop type {}", level.exp_type))
            })?;
            let axis = kind.axis();
            if !sizes.insert(axis, level.loop_size as usize) {
                return Err(Nd2Error::InvalidRecord(format!(
                    "duplicate {kind:?} loop"
                )));
            }
            if kind == LoopKind::Z {
                z_step = Some(level.interval);
            }
            level_axes.push(axis);
            loops.push(LoopInfo {
                kind,
                size: level.loop_size as usize,
                interval: level.interval,
            });
        }

        Ok(Self {
            sizes,
            level_axes,
            loops,
            z_step,
        })
    }
}

fn validate_options(options: &ReaderOptions, sizes: &AxisSizes) -> Nd2Result<()> {
    for (name, axis, value) in [
        ("series", Axis::M, options.series),
        ("channel", Axis::C, options.channel),
    ] {
        if let Some(size) = sizes.get(axis) {
            if value >= size {
                return Err(Nd2Error::invalid_parameter(
                    name,
                    format!("{value} out of range for axis '{axis}' of size {size}"),
                ));
            }
        }
    }
    Ok(())
}

fn build_metadata(
    attributes: &LimAttributes,
    desc: &LimMetadataDesc,
    loops: &[LoopInfo],
    z_home: Option<i32>,
) -> Nd2Metadata {
    let start = JulianDay(desc.time_start);
    Nd2Metadata {
        width: attributes.width,
        width_bytes: attributes.width_bytes,
        height: attributes.height,
        components: attributes.components,
        bitsize_memory: attributes.bpc_in_memory,
        bitsize_significant: attributes.bpc_significant,
        sequence_count: attributes.sequence_count,
        tile_width: attributes.tile_width,
        tile_height: attributes.tile_height,
        compression: Compression::from_code(attributes.compression),
        compression_quality: attributes.quality,
        plane_count: desc.plane_count,
        angle: desc.angle,
        calibration: Micrometers(desc.calibration),
        time_start_jdn: start,
        time_start: start.to_local(),
        time_start_utc: start.to_utc(),
        objective: desc.objective(),
        magnification: desc.objective_mag,
        numerical_aperture: desc.objective_na,
        refractive_index1: desc.refract_index1,
        refractive_index2: desc.refract_index2,
        pinhole: desc.pinhole_radius,
        zoom: desc.zoom,
        projective_mag: desc.projective_mag,
        image_type: ImageType::from_code(desc.image_type),
        z_home,
        loops: loops.to_vec(),
        planes: desc.planes().iter().map(|p| p.to_plane_info()).collect(),
    }
}

fn max_value(bits_significant: u32) -> u64 {
    if bits_significant >= 64 {
        u64::MAX
    } else {
        (1u64 << bits_significant) - 1
    }
}

fn recorded_index(seq_index: u32) -> Nd2Result<i32> {
    i32::try_from(seq_index)
        .map_err(|_| Nd2Error::invalid_parameter("seq_index", "exceeds i32::MAX"))
}
