//! In-process stand-in for the ND2 read SDK.
//!
//! Every entry point is an `extern "C"` function with the SDK's signature,
//! bound through `Nd2Library::from_functions`. The file opened is chosen by
//! its stem:
//!
//! - `cluster`: 38x31, 16 bit, 2 components, T=3 then Z=10
//! - `gray8`: 5x3, 8 bit, 1 component, M=2 (rows need padding)
//! - `float`: 4x2, 32 bit float, 1 component, no loops
//! - `aniso`: like `gray8` with a pixel aspect of 2.0
//! - `deep`: like `gray8` with 12 bits in memory
//!
//! Any other stem fails to open.

#![allow(dead_code)]

use lib_nd2_ffi::records::*;
use lib_nd2_ffi::wide::{from_wide, write_wide, LimWchar};
use lib_nd2_ffi::{LimFunctions, Nd2Library};
use std::ffi::{c_double, c_void};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const CALIBRATION: f64 = 0.167808983;
pub const START_JDN: f64 = 2_457_000.5;
pub const FIRST_FRAME_MS: f64 = 445.08349828;
pub const FAM_COLOR: u32 = 120 | (232 << 8) | (15 << 16);
pub const Z_HOME: i32 = 4;
pub const DESCRIPTION: &str = "Metadata:\r\nDimensions: T(3) x Z(10) x λ(2)\r\nCapturing: Andor Zyla";

const PADDING: u8 = 0xEE;

#[derive(Clone, Debug)]
pub struct Fixture {
    pub width: u32,
    pub height: u32,
    pub components: u32,
    pub bits: u32,
    pub significant: u32,
    /// (loop type, size, interval)
    pub levels: Vec<(u32, u32, f64)>,
    pub aspect: f64,
    pub planes: Vec<(&'static str, u32)>,
    pub events: Vec<(f64, &'static str, &'static str)>,
    pub binaries: Vec<(&'static str, &'static str)>,
    pub points: Vec<&'static str>,
}

impl Fixture {
    pub fn by_stem(stem: &str) -> Option<Self> {
        match stem {
            "cluster" => Some(Self {
                width: 38,
                height: 31,
                components: 2,
                bits: 16,
                significant: 12,
                levels: vec![(LIMLOOP_TIME, 3, 100.0), (LIMLOOP_Z, 10, 0.5)],
                aspect: 1.0,
                planes: vec![("5-FAM/pH 9.0", FAM_COLOR), ("Cy5", 0x0000_00FF)],
                events: vec![
                    (1200.0, "Stimulation", "Laser on"),
                    (2400.0, "Command", "Stop"),
                ],
                binaries: vec![("Nuclei", "Cy5")],
                points: Vec::new(),
            }),
            "gray8" | "aniso" | "deep" => Some(Self {
                width: 5,
                height: 3,
                components: 1,
                bits: if stem == "deep" { 12 } else { 8 },
                significant: 8,
                levels: vec![(LIMLOOP_MULTIPOINT, 2, -1.0)],
                aspect: if stem == "aniso" { 2.0 } else { 1.0 },
                planes: vec![("Brightfield", 0x00FF_FFFF)],
                events: Vec::new(),
                binaries: Vec::new(),
                points: vec!["Point A", "Point B"],
            }),
            "float" => Some(Self {
                width: 4,
                height: 2,
                components: 1,
                bits: 32,
                significant: 32,
                levels: Vec::new(),
                aspect: 1.0,
                planes: vec![("Ratio", 0x0000_FF00)],
                events: Vec::new(),
                binaries: Vec::new(),
                points: Vec::new(),
            }),
            _ => None,
        }
    }

    pub fn sequence_count(&self) -> u32 {
        self.levels.iter().map(|l| l.1).product()
    }

    pub fn width_bytes(&self) -> u32 {
        (self.width * self.components * self.bits / 8).div_ceil(4) * 4
    }
}

/// Value stored at one pixel of frame `seq`.
pub fn pixel(fixture: &Fixture, seq: u32, y: u32, x: u32, c: u32) -> f64 {
    let base = seq * 7 + y * 3 + x;
    match fixture.bits {
        8 => ((base + c * 10) % 256) as f64,
        16 => (base + c * 1000) as f64,
        _ => base as f64 * 0.5 + c as f64,
    }
}

/// Label stored in binary layers.
pub fn label(seq: u32, y: u32, x: u32) -> u32 {
    (seq + y + x) % 3
}

struct OpenFile {
    handle: LimFileHandle,
    path: PathBuf,
    fixture: Fixture,
}

static FILES: Mutex<Vec<OpenFile>> = Mutex::new(Vec::new());
static PICTURES: Mutex<Vec<(usize, usize)>> = Mutex::new(Vec::new());
static NEXT_HANDLE: AtomicI32 = AtomicI32::new(1);
static BAD_DESTROYS: AtomicUsize = AtomicUsize::new(0);

/// Handles currently open on `path`.
pub fn open_handles(path: &Path) -> usize {
    let files = FILES.lock().unwrap();
    files.iter().filter(|f| f.path == path).count()
}

/// Pictures destroyed twice or never allocated.
pub fn bad_destroys() -> usize {
    BAD_DESTROYS.load(Ordering::SeqCst)
}

fn with_file<T>(handle: LimFileHandle, f: impl FnOnce(&Fixture) -> T) -> Option<T> {
    let files = FILES.lock().unwrap();
    files.iter().find(|o| o.handle == handle).map(|o| f(&o.fixture))
}

/// Create an empty on-disk file named `<stem>.nd2`.
pub fn fixture_path(dir: &TempDir, stem: &str) -> PathBuf {
    let path = dir.path().join(format!("{stem}.nd2"));
    std::fs::write(&path, b"").unwrap();
    path
}

pub fn functions() -> LimFunctions {
    LimFunctions {
        file_open_for_read: mock_open,
        file_close: mock_close,
        file_get_attributes: mock_attributes,
        file_get_metadata: mock_metadata,
        file_get_text_info: mock_text_info,
        file_get_experiment: mock_experiment,
        file_get_image_data: mock_image_data,
        init_picture: mock_init_picture,
        destroy_picture: mock_destroy_picture,
        get_seq_index_from_coords: mock_seq_index,
        get_coords_from_seq_index: mock_coords,
        get_z_stack_home: mock_z_home,
        file_get_image_rect_data: Some(mock_image_rect_data),
        file_get_binary_descriptors: Some(mock_binary_descriptors),
        file_get_binary: Some(mock_binary),
        get_multipoint_name: Some(mock_multipoint_name),
        get_large_image_dimensions: Some(mock_large_image_dimensions),
        get_recorded_data_int: Some(mock_recorded_int),
        get_recorded_data_double: Some(mock_recorded_double),
        get_recorded_data_string: Some(mock_recorded_string),
        get_next_user_event: Some(mock_next_user_event),
    }
}

/// The mock SDK with every optional entry point present.
pub fn library() -> Arc<Nd2Library> {
    Nd2Library::from_functions(functions(), "mock-sdk")
}

/// The mock SDK with only the required entry points.
pub fn minimal_library() -> Arc<Nd2Library> {
    let mut functions = functions();
    functions.file_get_image_rect_data = None;
    functions.file_get_binary_descriptors = None;
    functions.file_get_binary = None;
    functions.get_multipoint_name = None;
    functions.get_large_image_dimensions = None;
    functions.get_recorded_data_int = None;
    functions.get_recorded_data_double = None;
    functions.get_recorded_data_string = None;
    functions.get_next_user_event = None;
    Nd2Library::from_functions(functions, "mock-sdk-minimal")
}

const LIM_OK: LimResult = 0;
const LIM_ERR_INVALIDARG: LimResult = -4;
const LIM_ERR_POINTER: LimResult = -6;
const LIM_ERR_HANDLE: LimResult = -7;
const LIM_ERR_NOTFOUND: LimResult = -13;
const LIM_ERR_OUTOFRANGE: LimResult = -17;

unsafe fn wide_arg(ptr: *const LimWchar) -> String {
    let mut len = 0;
    while unsafe { *ptr.add(len) } != 0 {
        len += 1;
    }
    from_wide(unsafe { std::slice::from_raw_parts(ptr, len) })
}

unsafe extern "C" fn mock_open(file_name: *const LimWchar) -> LimFileHandle {
    let path = PathBuf::from(unsafe { wide_arg(file_name) });
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let Some(fixture) = Fixture::by_stem(stem) else {
        return 0;
    };
    let handle = NEXT_HANDLE.fetch_add(1, Ordering::SeqCst);
    FILES.lock().unwrap().push(OpenFile {
        handle,
        path,
        fixture,
    });
    handle
}

unsafe extern "C" fn mock_close(file: LimFileHandle) -> LimResult {
    let mut files = FILES.lock().unwrap();
    match files.iter().position(|o| o.handle == file) {
        Some(i) => {
            files.remove(i);
            LIM_OK
        }
        None => LIM_ERR_HANDLE,
    }
}

unsafe extern "C" fn mock_attributes(file: LimFileHandle, out: *mut LimAttributes) -> LimResult {
    let Some(attributes) = with_file(file, |f| LimAttributes {
        width: f.width,
        width_bytes: f.width_bytes(),
        height: f.height,
        components: f.components,
        bpc_in_memory: f.bits,
        bpc_significant: f.significant,
        sequence_count: f.sequence_count(),
        tile_width: 0,
        tile_height: 0,
        compression: 2,
        quality: 100,
    }) else {
        return LIM_ERR_HANDLE;
    };
    unsafe { *out = attributes };
    LIM_OK
}

unsafe extern "C" fn mock_experiment(file: LimFileHandle, out: *mut LimExperiment) -> LimResult {
    let Some(levels) = with_file(file, |f| f.levels.clone()) else {
        return LIM_ERR_HANDLE;
    };
    let out = unsafe { &mut *out };
    out.level_count = levels.len() as u32;
    for (slot, (exp_type, loop_size, interval)) in out.levels.iter_mut().zip(levels) {
        *slot = LimExperimentLevel {
            exp_type,
            loop_size,
            interval,
        };
    }
    LIM_OK
}

unsafe extern "C" fn mock_metadata(file: LimFileHandle, out: *mut LimMetadataDesc) -> LimResult {
    let Some(fixture) = with_file(file, Fixture::clone) else {
        return LIM_ERR_HANDLE;
    };
    let out = unsafe { &mut *out };
    out.time_start = START_JDN;
    out.angle = 0.0;
    out.calibration = CALIBRATION;
    out.aspect = fixture.aspect;
    write_wide(&mut out.objective_name, "Plan Apo VC 60x Oil");
    out.objective_mag = 60.0;
    out.objective_na = 1.4;
    out.refract_index1 = 1.515;
    out.refract_index2 = 1.0;
    out.pinhole_radius = 0.0;
    out.zoom = 1.0;
    out.projective_mag = 1.0;
    out.image_type = 0;
    out.plane_count = fixture.planes.len() as u32;
    out.component_count = fixture.components;
    for (plane, (name, color)) in out.planes.iter_mut().zip(&fixture.planes) {
        plane.comp_count = 1;
        plane.color_rgb = *color;
        write_wide(&mut plane.name, name);
        write_wide(&mut plane.oc_name, name);
        plane.emission_wl = 520.0;
    }
    LIM_OK
}

unsafe extern "C" fn mock_text_info(file: LimFileHandle, out: *mut LimTextInfo) -> LimResult {
    if with_file(file, |_| ()).is_none() {
        return LIM_ERR_HANDLE;
    }
    let out = unsafe { &mut *out };
    write_wide(&mut out.author, "nd2 test");
    write_wide(&mut out.description, DESCRIPTION);
    write_wide(&mut out.capturing, "Andor Zyla");
    write_wide(&mut out.app_version, "NIS-Elements AR 4.30.01");
    LIM_OK
}

unsafe extern "C" fn mock_init_picture(
    picture: *mut LimPicture,
    width: LimUint,
    height: LimUint,
    bpc: LimUint,
    components: LimUint,
) -> LimSize {
    let width_bytes = (width * components * bpc / 8).div_ceil(4) * 4;
    let size = (width_bytes * height) as usize;
    let storage = vec![PADDING; size].into_boxed_slice();
    let data = Box::into_raw(storage) as *mut u8;
    PICTURES.lock().unwrap().push((data as usize, size));

    let picture = unsafe { &mut *picture };
    *picture = LimPicture {
        width,
        height,
        bits_per_comp: bpc,
        components,
        width_bytes,
        size,
        image_data: data.cast::<c_void>(),
    };
    size
}

unsafe extern "C" fn mock_destroy_picture(picture: *mut LimPicture) {
    let picture = unsafe { &mut *picture };
    let address = picture.image_data as usize;
    let mut pictures = PICTURES.lock().unwrap();
    match pictures.iter().position(|&(a, _)| a == address) {
        Some(i) => {
            let (_, size) = pictures.remove(i);
            let slice = std::ptr::slice_from_raw_parts_mut(address as *mut u8, size);
            drop(unsafe { Box::from_raw(slice) });
        }
        None => {
            BAD_DESTROYS.fetch_add(1, Ordering::SeqCst);
        }
    }
    picture.image_data = std::ptr::null_mut();
    picture.size = 0;
}

fn loop_sizes(experiment: &LimExperiment) -> Vec<u32> {
    experiment.levels().iter().map(|l| l.loop_size).collect()
}

unsafe extern "C" fn mock_seq_index(experiment: *mut LimExperiment, coords: *mut LimUint) -> LimUint {
    let sizes = loop_sizes(unsafe { &*experiment });
    let coords = unsafe { std::slice::from_raw_parts(coords, LIM_MAX_EXPERIMENT_LEVEL) };
    sizes
        .iter()
        .zip(coords)
        .fold(0, |index, (size, coord)| index * size + coord)
}

unsafe extern "C" fn mock_coords(experiment: *mut LimExperiment, seq_index: LimUint, coords: *mut LimUint) {
    let sizes = loop_sizes(unsafe { &*experiment });
    let coords = unsafe { std::slice::from_raw_parts_mut(coords, LIM_MAX_EXPERIMENT_LEVEL) };
    let mut rest = seq_index;
    for (slot, size) in coords[..sizes.len()].iter_mut().zip(&sizes).rev() {
        *slot = rest % size;
        rest /= size;
    }
}

fn write_sample(dst: &mut [u8], bits: u32, value: f64) {
    match bits {
        8 => dst[0] = value as u8,
        16 => dst[..2].copy_from_slice(&(value as u16).to_ne_bytes()),
        _ => dst[..4].copy_from_slice(&(value as f32).to_ne_bytes()),
    }
}

fn fill_local(local: *mut LimLocalMetadata, seq: u32) {
    if local.is_null() {
        return;
    }
    let local = unsafe { &mut *local };
    *local = LimLocalMetadata {
        time_msec: FIRST_FRAME_MS + seq as f64 * 100.0,
        x_pos: 100.0 + seq as f64,
        y_pos: -50.0,
        z_pos: seq as f64 * 0.5,
    };
}

unsafe extern "C" fn mock_image_data(
    file: LimFileHandle,
    seq_index: LimUint,
    picture: *mut LimPicture,
    local: *mut LimLocalMetadata,
) -> LimResult {
    let Some(fixture) = with_file(file, Fixture::clone) else {
        return LIM_ERR_HANDLE;
    };
    if seq_index >= fixture.sequence_count().max(1) {
        return LIM_ERR_OUTOFRANGE;
    }
    let picture = unsafe { &mut *picture };
    if picture.image_data.is_null() {
        return LIM_ERR_POINTER;
    }
    if picture.width != fixture.width
        || picture.height != fixture.height
        || picture.components != fixture.components
    {
        return LIM_ERR_INVALIDARG;
    }
    let data =
        unsafe { std::slice::from_raw_parts_mut(picture.image_data as *mut u8, picture.size) };
    let bpp = (fixture.bits / 8) as usize;
    for y in 0..fixture.height {
        let row = &mut data[(y * picture.width_bytes) as usize..];
        for x in 0..fixture.width {
            for c in 0..fixture.components {
                let offset = ((x * fixture.components + c) as usize) * bpp;
                write_sample(&mut row[offset..], fixture.bits, pixel(&fixture, seq_index, y, x, c));
            }
        }
    }
    fill_local(local, seq_index);
    LIM_OK
}

unsafe extern "C" fn mock_image_rect_data(
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
    _stretch_mode: LimInt,
    local: *mut LimLocalMetadata,
) -> LimResult {
    let Some(fixture) = with_file(file, Fixture::clone) else {
        return LIM_ERR_HANDLE;
    };
    if x + width > total_width || y + height > total_height {
        return LIM_ERR_INVALIDARG;
    }
    let data = unsafe {
        std::slice::from_raw_parts_mut(buffer as *mut u8, (line_size * height) as usize)
    };
    let bpp = (fixture.bits / 8) as usize;
    for dy in 0..height {
        let src_y = (y + dy) * fixture.height / total_height;
        let row = &mut data[(dy * line_size) as usize..];
        for dx in 0..width {
            let src_x = (x + dx) * fixture.width / total_width;
            for c in 0..fixture.components {
                let offset = ((dx * fixture.components + c) as usize) * bpp;
                write_sample(
                    &mut row[offset..],
                    fixture.bits,
                    pixel(&fixture, seq_index, src_y, src_x, c),
                );
            }
        }
    }
    fill_local(local, seq_index);
    LIM_OK
}

unsafe extern "C" fn mock_binary_descriptors(file: LimFileHandle, out: *mut LimBinaries) -> LimResult {
    let Some(binaries) = with_file(file, |f| f.binaries.clone()) else {
        return LIM_ERR_HANDLE;
    };
    let out = unsafe { &mut *out };
    out.count = binaries.len() as u32;
    for (slot, (name, component)) in out.descriptors.iter_mut().zip(binaries) {
        write_wide(&mut slot.name, name);
        write_wide(&mut slot.comp_name, component);
        slot.color_rgb = 0x0000_FF00;
    }
    LIM_OK
}

unsafe extern "C" fn mock_binary(
    file: LimFileHandle,
    seq_index: LimUint,
    binary_index: LimUint,
    picture: *mut LimPicture,
) -> LimResult {
    let Some(count) = with_file(file, |f| f.binaries.len()) else {
        return LIM_ERR_HANDLE;
    };
    if binary_index as usize >= count {
        return LIM_ERR_OUTOFRANGE;
    }
    let picture = unsafe { &mut *picture };
    if picture.bits_per_comp != 32 || picture.components != 1 {
        return LIM_ERR_INVALIDARG;
    }
    let data =
        unsafe { std::slice::from_raw_parts_mut(picture.image_data as *mut u8, picture.size) };
    for y in 0..picture.height {
        for x in 0..picture.width {
            let offset = (y * picture.width_bytes + x * 4) as usize;
            data[offset..offset + 4].copy_from_slice(&label(seq_index, y, x).to_ne_bytes());
        }
    }
    LIM_OK
}

unsafe extern "C" fn mock_multipoint_name(
    file: LimFileHandle,
    point: LimUint,
    name: *mut LimWchar,
) -> LimResult {
    let Some(points) = with_file(file, |f| f.points.clone()) else {
        return LIM_ERR_HANDLE;
    };
    let Some(point_name) = points.get(point as usize) else {
        return LIM_ERR_NOTFOUND;
    };
    let out = unsafe { std::slice::from_raw_parts_mut(name, LIM_TEXT_LEN) };
    write_wide(out, point_name);
    LIM_OK
}

unsafe extern "C" fn mock_z_home(file: LimFileHandle) -> LimInt {
    with_file(file, |_| Z_HOME).unwrap_or(-1)
}

unsafe extern "C" fn mock_large_image_dimensions(
    file: LimFileHandle,
    x_fields: *mut LimUint,
    y_fields: *mut LimUint,
    overlap: *mut c_double,
) -> LimResult {
    if with_file(file, |_| ()).is_none() {
        return LIM_ERR_HANDLE;
    }
    unsafe {
        *x_fields = 3;
        *y_fields = 2;
        *overlap = 0.1;
    }
    LIM_OK
}

unsafe extern "C" fn mock_recorded_int(
    file: LimFileHandle,
    name: *const LimWchar,
    seq_index: LimInt,
    data: *mut LimInt,
) -> LimResult {
    if with_file(file, |_| ()).is_none() {
        return LIM_ERR_HANDLE;
    }
    if unsafe { wide_arg(name) } != "Index" {
        return LIM_ERR_NOTFOUND;
    }
    unsafe { *data = seq_index * 2 };
    LIM_OK
}

unsafe extern "C" fn mock_recorded_double(
    file: LimFileHandle,
    name: *const LimWchar,
    seq_index: LimInt,
    data: *mut c_double,
) -> LimResult {
    if with_file(file, |_| ()).is_none() {
        return LIM_ERR_HANDLE;
    }
    if unsafe { wide_arg(name) } != "Z" {
        return LIM_ERR_NOTFOUND;
    }
    unsafe { *data = seq_index as f64 * 0.5 };
    LIM_OK
}

unsafe extern "C" fn mock_recorded_string(
    file: LimFileHandle,
    name: *const LimWchar,
    _seq_index: LimInt,
    data: *mut LimWchar,
) -> LimResult {
    if with_file(file, |_| ()).is_none() {
        return LIM_ERR_HANDLE;
    }
    if unsafe { wide_arg(name) } != "Camera" {
        return LIM_ERR_NOTFOUND;
    }
    let out = unsafe { std::slice::from_raw_parts_mut(data, LIM_TEXT_LEN) };
    write_wide(out, "Andor Zyla");
    LIM_OK
}

unsafe extern "C" fn mock_next_user_event(
    file: LimFileHandle,
    next_id: *mut LimUint,
    event: *mut LimFileUserEvent,
) -> LimResult {
    let Some(events) = with_file(file, |f| f.events.clone()) else {
        return LIM_ERR_HANDLE;
    };
    let next_id = unsafe { &mut *next_id };
    let Some(&(time, event_type, description)) = events.get(*next_id as usize) else {
        return LIM_ERR_NOTFOUND;
    };
    let event = unsafe { &mut *event };
    event.id = *next_id + 1;
    event.time = time;
    write_wide(&mut event.event_type, event_type);
    write_wide(&mut event.description, description);
    *next_id += 1;
    LIM_OK
}
