//! Dynamic loading of the ND2 read SDK.
//!
//! This module resolves the SDK entry points from the vendor shared library
//! and wraps each of them in a call that checks its status code.

use crate::error::{check, LimStatus, Nd2Error, Nd2Result};
use crate::records::{
    LimAttributes, LimBinaries, LimExperiment, LimFileHandle, LimFileUserEvent, LimInt,
    LimLocalMetadata, LimMetadataDesc, LimPicture, LimResult, LimSize, LimTextInfo, LimUint,
    PlainRecord, LIM_MAX_EXPERIMENT_LEVEL, LIM_TEXT_LEN,
};
use crate::wide::{from_wide, to_wide, LimWchar};
use libloading::Library;
use std::ffi::{c_double, c_void};
use std::path::Path;
use std::sync::Arc;

/// Environment variable that overrides the SDK location.
pub const LIBRARY_PATH_ENV: &str = "ND2SDK_PATH";

/// Platform file name of the SDK.
#[cfg(target_os = "windows")]
pub const DEFAULT_LIBRARY_NAME: &str = "v6_w32_nd2ReadSDK.dll";

#[cfg(target_os = "macos")]
pub const DEFAULT_LIBRARY_NAME: &str = "nd2sdk.framework/Versions/1/nd2sdk";

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const DEFAULT_LIBRARY_NAME: &str = "libnd2ReadSDK.so";

/// Loop coordinates in experiment level order.
pub type LimCoords = [LimUint; LIM_MAX_EXPERIMENT_LEVEL];

/// ```c
/// LIMFILEHANDLE Lim_FileOpenForRead(LIMCWSTR wszFileName);
/// ```
pub type FileOpenForReadFn = unsafe extern "C" fn(file_name: *const LimWchar) -> LimFileHandle;

/// ```c
/// LIMRESULT Lim_FileClose(LIMFILEHANDLE hFile);
/// ```
pub type FileCloseFn = unsafe extern "C" fn(file: LimFileHandle) -> LimResult;

pub type FileGetAttributesFn =
    unsafe extern "C" fn(file: LimFileHandle, attributes: *mut LimAttributes) -> LimResult;

pub type FileGetMetadataFn =
    unsafe extern "C" fn(file: LimFileHandle, metadata: *mut LimMetadataDesc) -> LimResult;

pub type FileGetTextInfoFn =
    unsafe extern "C" fn(file: LimFileHandle, text_info: *mut LimTextInfo) -> LimResult;

pub type FileGetExperimentFn =
    unsafe extern "C" fn(file: LimFileHandle, experiment: *mut LimExperiment) -> LimResult;

/// ```c
/// LIMRESULT Lim_FileGetImageData(LIMFILEHANDLE hFile, LIMUINT uiSeqIndex,
///                                LIMPICTURE* pPicture, LIMLOCALMETADATA* pImgInfo);
/// ```
pub type FileGetImageDataFn = unsafe extern "C" fn(
    file: LimFileHandle,
    seq_index: LimUint,
    picture: *mut LimPicture,
    local: *mut LimLocalMetadata,
) -> LimResult;

/// ```c
/// LIMRESULT Lim_FileGetImageRectData(LIMFILEHANDLE hFile, LIMUINT uiSeqIndex,
///     LIMUINT uiDstTotalW, LIMUINT uiDstTotalH, LIMUINT uiDstX, LIMUINT uiDstY,
///     LIMUINT uiDstW, LIMUINT uiDstH, void* pBuffer, LIMUINT uiDstLineSize,
///     LIMINT iStretchMode, LIMLOCALMETADATA* pImgInfo);
/// ```
pub type FileGetImageRectDataFn = unsafe extern "C" fn(
    file: LimFileHandle,
    seq_index: LimUint,
    total_width: LimUint,
    total_height: LimUint,
    x: LimUint,
    y: LimUint,
    width: LimUint,
    height: LimUint,
    buffer: *mut c_void,
    line_size: LimUint,
    stretch_mode: LimInt,
    local: *mut LimLocalMetadata,
) -> LimResult;

pub type FileGetBinaryDescriptorsFn =
    unsafe extern "C" fn(file: LimFileHandle, binaries: *mut LimBinaries) -> LimResult;

pub type FileGetBinaryFn = unsafe extern "C" fn(
    file: LimFileHandle,
    seq_index: LimUint,
    binary_index: LimUint,
    picture: *mut LimPicture,
) -> LimResult;

/// ```c
/// LIMSIZE Lim_InitPicture(LIMPICTURE* pPicture, LIMUINT width, LIMUINT height,
///                         LIMUINT bpc, LIMUINT components);
/// ```
pub type InitPictureFn = unsafe extern "C" fn(
    picture: *mut LimPicture,
    width: LimUint,
    height: LimUint,
    bpc: LimUint,
    components: LimUint,
) -> LimSize;

pub type DestroyPictureFn = unsafe extern "C" fn(picture: *mut LimPicture);

pub type GetSeqIndexFromCoordsFn =
    unsafe extern "C" fn(experiment: *mut LimExperiment, coords: *mut LimUint) -> LimUint;

pub type GetCoordsFromSeqIndexFn =
    unsafe extern "C" fn(experiment: *mut LimExperiment, seq_index: LimUint, coords: *mut LimUint);

pub type GetMultipointNameFn =
    unsafe extern "C" fn(file: LimFileHandle, point: LimUint, name: *mut LimWchar) -> LimResult;

pub type GetZStackHomeFn = unsafe extern "C" fn(file: LimFileHandle) -> LimInt;

pub type GetLargeImageDimensionsFn = unsafe extern "C" fn(
    file: LimFileHandle,
    x_fields: *mut LimUint,
    y_fields: *mut LimUint,
    overlap: *mut c_double,
) -> LimResult;

pub type GetRecordedDataIntFn = unsafe extern "C" fn(
    file: LimFileHandle,
    name: *const LimWchar,
    seq_index: LimInt,
    data: *mut LimInt,
) -> LimResult;

pub type GetRecordedDataDoubleFn = unsafe extern "C" fn(
    file: LimFileHandle,
    name: *const LimWchar,
    seq_index: LimInt,
    data: *mut c_double,
) -> LimResult;

pub type GetRecordedDataStringFn = unsafe extern "C" fn(
    file: LimFileHandle,
    name: *const LimWchar,
    seq_index: LimInt,
    data: *mut LimWchar,
) -> LimResult;

pub type GetNextUserEventFn = unsafe extern "C" fn(
    file: LimFileHandle,
    next_id: *mut LimUint,
    event: *mut LimFileUserEvent,
) -> LimResult;

/// Resolved SDK entry points.
///
/// The first block is required by every reader. The optional entry points
/// are absent from some SDK builds; calling one that is missing fails with
/// [`Nd2Error::NotSupported`].
#[derive(Clone, Copy)]
pub struct LimFunctions {
    pub file_open_for_read: FileOpenForReadFn,
    pub file_close: FileCloseFn,
    pub file_get_attributes: FileGetAttributesFn,
    pub file_get_metadata: FileGetMetadataFn,
    pub file_get_text_info: FileGetTextInfoFn,
    pub file_get_experiment: FileGetExperimentFn,
    pub file_get_image_data: FileGetImageDataFn,
    pub init_picture: InitPictureFn,
    pub destroy_picture: DestroyPictureFn,
    pub get_seq_index_from_coords: GetSeqIndexFromCoordsFn,
    pub get_coords_from_seq_index: GetCoordsFromSeqIndexFn,
    pub get_z_stack_home: GetZStackHomeFn,

    pub file_get_image_rect_data: Option<FileGetImageRectDataFn>,
    pub file_get_binary_descriptors: Option<FileGetBinaryDescriptorsFn>,
    pub file_get_binary: Option<FileGetBinaryFn>,
    pub get_multipoint_name: Option<GetMultipointNameFn>,
    pub get_large_image_dimensions: Option<GetLargeImageDimensionsFn>,
    pub get_recorded_data_int: Option<GetRecordedDataIntFn>,
    pub get_recorded_data_double: Option<GetRecordedDataDoubleFn>,
    pub get_recorded_data_string: Option<GetRecordedDataStringFn>,
    pub get_next_user_event: Option<GetNextUserEventFn>,
}

impl LimFunctions {
    fn resolve(library: &Library) -> Nd2Result<Self> {
        Ok(Self {
            file_open_for_read: required(library, b"Lim_FileOpenForRead\0")?,
            file_close: required(library, b"Lim_FileClose\0")?,
            file_get_attributes: required(library, b"Lim_FileGetAttributes\0")?,
            file_get_metadata: required(library, b"Lim_FileGetMetadata\0")?,
            file_get_text_info: required(library, b"Lim_FileGetTextinfo\0")?,
            file_get_experiment: required(library, b"Lim_FileGetExperiment\0")?,
            file_get_image_data: required(library, b"Lim_FileGetImageData\0")?,
            init_picture: required(library, b"Lim_InitPicture\0")?,
            destroy_picture: required(library, b"Lim_DestroyPicture\0")?,
            get_seq_index_from_coords: required(library, b"Lim_GetSeqIndexFromCoords\0")?,
            get_coords_from_seq_index: required(library, b"Lim_GetCoordsFromSeqIndex\0")?,
            get_z_stack_home: required(library, b"Lim_GetZStackHome\0")?,

            file_get_image_rect_data: optional(library, b"Lim_FileGetImageRectData\0"),
            file_get_binary_descriptors: optional(library, b"Lim_FileGetBinaryDescriptors\0"),
            file_get_binary: optional(library, b"Lim_FileGetBinary\0"),
            get_multipoint_name: optional(library, b"Lim_GetMultipointName\0"),
            get_large_image_dimensions: optional(library, b"Lim_GetLargeImageDimensions\0"),
            get_recorded_data_int: optional(library, b"Lim_GetRecordedDataInt\0"),
            get_recorded_data_double: optional(library, b"Lim_GetRecordedDataDouble\0"),
            get_recorded_data_string: optional(library, b"Lim_GetRecordedDataString\0"),
            get_next_user_event: optional(library, b"Lim_GetNextUserEvent\0"),
        })
    }

    /// Number of optional entry points that resolved.
    pub fn optional_count(&self) -> usize {
        [
            self.file_get_image_rect_data.is_some(),
            self.file_get_binary_descriptors.is_some(),
            self.file_get_binary.is_some(),
            self.get_multipoint_name.is_some(),
            self.get_large_image_dimensions.is_some(),
            self.get_recorded_data_int.is_some(),
            self.get_recorded_data_double.is_some(),
            self.get_recorded_data_string.is_some(),
            self.get_next_user_event.is_some(),
        ]
        .into_iter()
        .filter(|&present| present)
        .count()
    }
}

fn symbol_name(symbol: &[u8]) -> String {
    String::from_utf8_lossy(symbol.strip_suffix(b"\0").unwrap_or(symbol)).into_owned()
}

fn required<T: Copy>(library: &Library, symbol: &[u8]) -> Nd2Result<T> {
    // SAFETY: `T` is the fn pointer type declared for this symbol in nd2ReadSDK.h.
    unsafe {
        library
            .get::<T>(symbol)
            .map(|s| *s)
            .map_err(|_| Nd2Error::symbol_not_found(symbol_name(symbol)))
    }
}

fn optional<T: Copy>(library: &Library, symbol: &[u8]) -> Option<T> {
    // SAFETY: as in `required`.
    unsafe { library.get::<T>(symbol).ok().map(|s| *s) }
}

fn optional_fn<T>(f: Option<T>, operation: &str) -> Nd2Result<T> {
    f.ok_or_else(|| Nd2Error::not_supported(operation))
}

/// The loaded SDK.
///
/// Every method forwards to one entry point and converts its status code.
/// Handles are not validated here; [`crate::Nd2Reader`] owns that.
pub struct Nd2Library {
    /// Keeps the resolved function pointers valid. `None` for bindings
    /// built with [`Nd2Library::from_functions`].
    #[allow(dead_code)]
    library: Option<Library>,

    /// Where the bindings came from.
    pub path: String,

    functions: LimFunctions,
}

impl Nd2Library {
    /// Load the SDK from a shared library file.
    ///
    /// # Safety
    ///
    /// The library must export the ND2 read SDK with the ABI described by
    /// `nd2ReadSDK.h`. Any other library may cause undefined behavior.
    pub fn load<P: AsRef<Path>>(path: P) -> Nd2Result<Arc<Self>> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let library =
            unsafe { Library::new(path) }.map_err(|e| Nd2Error::load_error(&path_str, e))?;
        let functions = LimFunctions::resolve(&library)?;

        tracing::info!(
            path = %path_str,
            format = ?LibraryFormat::from_path(path),
            optional_entry_points = functions.optional_count(),
            "Loaded ND2 SDK"
        );

        Ok(Arc::new(Self {
            library: Some(library),
            path: path_str,
            functions,
        }))
    }

    /// Load the SDK from `ND2SDK_PATH`, or by its platform name through the
    /// system search path.
    pub fn load_default() -> Nd2Result<Arc<Self>> {
        match std::env::var_os(LIBRARY_PATH_ENV) {
            Some(path) if !path.is_empty() => Self::load(path),
            _ => Self::load(DEFAULT_LIBRARY_NAME),
        }
    }

    /// Bind already-resolved entry points, such as a statically linked SDK.
    pub fn from_functions(functions: LimFunctions, label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            library: None,
            path: label.into(),
            functions,
        })
    }

    pub fn functions(&self) -> &LimFunctions {
        &self.functions
    }

    /// Open a file. A zero handle is reported as `LIM_ERR_FAIL`.
    pub fn open_for_read(&self, path: &Path) -> Nd2Result<LimFileHandle> {
        let name = path
            .to_str()
            .and_then(to_wide)
            .ok_or_else(|| Nd2Error::invalid_parameter("path", "not representable as a wide string"))?;
        let handle = unsafe { (self.functions.file_open_for_read)(name.as_ptr()) };
        if handle == 0 {
            return Err(Nd2Error::ForeignCall {
                function: "Lim_FileOpenForRead",
                status: LimStatus::Fail,
            });
        }
        Ok(handle)
    }

    pub fn close(&self, handle: LimFileHandle) -> Nd2Result<()> {
        check("Lim_FileClose", unsafe { (self.functions.file_close)(handle) })
    }

    pub fn attributes(&self, handle: LimFileHandle) -> Nd2Result<LimAttributes> {
        let mut attributes = LimAttributes::zeroed();
        check("Lim_FileGetAttributes", unsafe {
            (self.functions.file_get_attributes)(handle, &mut attributes)
        })?;
        Ok(attributes)
    }

    pub fn experiment(&self, handle: LimFileHandle) -> Nd2Result<LimExperiment> {
        let mut experiment = LimExperiment::zeroed();
        check("Lim_FileGetExperiment", unsafe {
            (self.functions.file_get_experiment)(handle, &mut experiment)
        })?;
        Ok(experiment)
    }

    pub fn metadata(&self, handle: LimFileHandle) -> Nd2Result<Box<LimMetadataDesc>> {
        let mut metadata = LimMetadataDesc::boxed_zeroed();
        check("Lim_FileGetMetadata", unsafe {
            (self.functions.file_get_metadata)(handle, &mut *metadata)
        })?;
        Ok(metadata)
    }

    pub fn text_info(&self, handle: LimFileHandle) -> Nd2Result<Box<LimTextInfo>> {
        let mut text_info = LimTextInfo::boxed_zeroed();
        check("Lim_FileGetTextinfo", unsafe {
            (self.functions.file_get_text_info)(handle, &mut *text_info)
        })?;
        Ok(text_info)
    }

    /// Allocate pixel storage for `picture`. Returns the buffer size.
    ///
    /// # Safety
    ///
    /// `picture` must not currently own SDK storage.
    pub unsafe fn init_picture(
        &self,
        picture: &mut LimPicture,
        width: u32,
        height: u32,
        bits_per_component: u32,
        components: u32,
    ) -> Nd2Result<usize> {
        let size = unsafe {
            (self.functions.init_picture)(picture, width, height, bits_per_component, components)
        };
        if size == 0 || picture.image_data.is_null() {
            return Err(Nd2Error::ForeignCall {
                function: "Lim_InitPicture",
                status: LimStatus::OutOfMemory,
            });
        }
        Ok(size)
    }

    /// # Safety
    ///
    /// `picture` must have been filled by [`Nd2Library::init_picture`] and
    /// not destroyed since.
    pub unsafe fn destroy_picture(&self, picture: &mut LimPicture) {
        unsafe { (self.functions.destroy_picture)(picture) }
    }

    /// Decode one frame into `picture`.
    ///
    /// # Safety
    ///
    /// `picture` must be live storage from [`Nd2Library::init_picture`]
    /// matching the file's attributes.
    pub unsafe fn image_data(
        &self,
        handle: LimFileHandle,
        seq_index: u32,
        picture: &mut LimPicture,
    ) -> Nd2Result<LimLocalMetadata> {
        let mut local = LimLocalMetadata::zeroed();
        check("Lim_FileGetImageData", unsafe {
            (self.functions.file_get_image_data)(handle, seq_index, picture, &mut local)
        })?;
        Ok(local)
    }

    /// Decode a rescaled rectangle into `buffer` with rows `line_size`
    /// bytes apart.
    #[allow(clippy::too_many_arguments)]
    pub fn image_rect_data(
        &self,
        handle: LimFileHandle,
        seq_index: u32,
        total: (u32, u32),
        origin: (u32, u32),
        extent: (u32, u32),
        buffer: &mut [u8],
        line_size: u32,
        stretch_mode: LimInt,
    ) -> Nd2Result<LimLocalMetadata> {
        let f = optional_fn(
            self.functions.file_get_image_rect_data,
            "Lim_FileGetImageRectData",
        )?;
        let needed = line_size as usize * extent.1 as usize;
        if buffer.len() < needed {
            return Err(Nd2Error::invalid_parameter(
                "buffer",
                format!("{} bytes provided, {} required", buffer.len(), needed),
            ));
        }
        let mut local = LimLocalMetadata::zeroed();
        check("Lim_FileGetImageRectData", unsafe {
            f(
                handle,
                seq_index,
                total.0,
                total.1,
                origin.0,
                origin.1,
                extent.0,
                extent.1,
                buffer.as_mut_ptr().cast(),
                line_size,
                stretch_mode,
                &mut local,
            )
        })?;
        Ok(local)
    }

    pub fn binary_descriptors(&self, handle: LimFileHandle) -> Nd2Result<Box<LimBinaries>> {
        let f = optional_fn(
            self.functions.file_get_binary_descriptors,
            "Lim_FileGetBinaryDescriptors",
        )?;
        let mut binaries = LimBinaries::boxed_zeroed();
        check("Lim_FileGetBinaryDescriptors", unsafe {
            f(handle, &mut *binaries)
        })?;
        Ok(binaries)
    }

    /// Decode one binary layer into `picture`.
    ///
    /// # Safety
    ///
    /// Same contract as [`Nd2Library::image_data`], with a 32-bit single
    /// component picture.
    pub unsafe fn binary(
        &self,
        handle: LimFileHandle,
        seq_index: u32,
        binary_index: u32,
        picture: &mut LimPicture,
    ) -> Nd2Result<()> {
        let f = optional_fn(self.functions.file_get_binary, "Lim_FileGetBinary")?;
        check("Lim_FileGetBinary", unsafe {
            f(handle, seq_index, binary_index, picture)
        })
    }

    /// Flat sequence index of a set of loop coordinates.
    pub fn seq_index_from_coords(&self, experiment: &LimExperiment, coords: &LimCoords) -> u32 {
        let mut experiment = *experiment;
        let mut coords = *coords;
        unsafe {
            (self.functions.get_seq_index_from_coords)(&mut experiment, coords.as_mut_ptr())
        }
    }

    /// Loop coordinates of a flat sequence index.
    pub fn coords_from_seq_index(&self, experiment: &LimExperiment, seq_index: u32) -> LimCoords {
        let mut experiment = *experiment;
        let mut coords: LimCoords = [0; LIM_MAX_EXPERIMENT_LEVEL];
        unsafe {
            (self.functions.get_coords_from_seq_index)(
                &mut experiment,
                seq_index,
                coords.as_mut_ptr(),
            )
        };
        coords
    }

    pub fn multipoint_name(&self, handle: LimFileHandle, point: u32) -> Nd2Result<String> {
        let f = optional_fn(self.functions.get_multipoint_name, "Lim_GetMultipointName")?;
        let mut name = [0 as LimWchar; LIM_TEXT_LEN];
        check("Lim_GetMultipointName", unsafe {
            f(handle, point, name.as_mut_ptr())
        })?;
        Ok(from_wide(&name))
    }

    /// Home position of the z stack, as an index into the z loop.
    pub fn z_stack_home(&self, handle: LimFileHandle) -> i32 {
        unsafe { (self.functions.get_z_stack_home)(handle) }
    }

    /// Stitched field counts in x and y, and their overlap.
    pub fn large_image_dimensions(&self, handle: LimFileHandle) -> Nd2Result<(u32, u32, f64)> {
        let f = optional_fn(
            self.functions.get_large_image_dimensions,
            "Lim_GetLargeImageDimensions",
        )?;
        let mut x_fields: LimUint = 0;
        let mut y_fields: LimUint = 0;
        let mut overlap: c_double = 0.0;
        check("Lim_GetLargeImageDimensions", unsafe {
            f(handle, &mut x_fields, &mut y_fields, &mut overlap)
        })?;
        Ok((x_fields, y_fields, overlap))
    }

    pub fn recorded_int(&self, handle: LimFileHandle, name: &str, seq_index: i32) -> Nd2Result<i32> {
        let f = optional_fn(self.functions.get_recorded_data_int, "Lim_GetRecordedDataInt")?;
        let name = wide_name(name)?;
        let mut value: LimInt = 0;
        check("Lim_GetRecordedDataInt", unsafe {
            f(handle, name.as_ptr(), seq_index, &mut value)
        })?;
        Ok(value)
    }

    pub fn recorded_double(
        &self,
        handle: LimFileHandle,
        name: &str,
        seq_index: i32,
    ) -> Nd2Result<f64> {
        let f = optional_fn(
            self.functions.get_recorded_data_double,
            "Lim_GetRecordedDataDouble",
        )?;
        let name = wide_name(name)?;
        let mut value: c_double = 0.0;
        check("Lim_GetRecordedDataDouble", unsafe {
            f(handle, name.as_ptr(), seq_index, &mut value)
        })?;
        Ok(value)
    }

    pub fn recorded_string(
        &self,
        handle: LimFileHandle,
        name: &str,
        seq_index: i32,
    ) -> Nd2Result<String> {
        let f = optional_fn(
            self.functions.get_recorded_data_string,
            "Lim_GetRecordedDataString",
        )?;
        let name = wide_name(name)?;
        let mut value = [0 as LimWchar; LIM_TEXT_LEN];
        check("Lim_GetRecordedDataString", unsafe {
            f(handle, name.as_ptr(), seq_index, value.as_mut_ptr())
        })?;
        Ok(from_wide(&value))
    }

    /// Fetch the event after `*next_id` and advance `next_id`.
    pub fn next_user_event(
        &self,
        handle: LimFileHandle,
        next_id: &mut u32,
    ) -> Nd2Result<LimFileUserEvent> {
        let f = optional_fn(self.functions.get_next_user_event, "Lim_GetNextUserEvent")?;
        let mut event = LimFileUserEvent::zeroed();
        check("Lim_GetNextUserEvent", unsafe {
            f(handle, next_id, &mut event)
        })?;
        Ok(event)
    }
}

fn wide_name(name: &str) -> Nd2Result<Vec<LimWchar>> {
    to_wide(name).ok_or_else(|| Nd2Error::invalid_parameter("name", "contains a NUL character"))
}

// Nd2Library only stores function pointers and the Library handle, which
// are safe to share. Per-file state lives in the reader.
unsafe impl Send for Nd2Library {}
unsafe impl Sync for Nd2Library {}

impl std::fmt::Debug for Nd2Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nd2Library")
            .field("path", &self.path)
            .field("dynamic", &self.library.is_some())
            .finish()
    }
}

/// Platform-specific library format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LibraryFormat {
    /// Windows DLL.
    Dll,
    /// Linux/Unix shared object.
    So,
    /// macOS framework binary.
    Framework,
    /// macOS dynamic library.
    Dylib,
    /// Unknown format.
    Unknown,
}

impl LibraryFormat {
    /// Detect format from the file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if path
            .components()
            .any(|c| c.as_os_str().to_string_lossy().ends_with(".framework"))
        {
            return Self::Framework;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("dll") | Some("DLL") => Self::Dll,
            Some("so") => Self::So,
            Some("dylib") => Self::Dylib,
            _ => Self::Unknown,
        }
    }
}
