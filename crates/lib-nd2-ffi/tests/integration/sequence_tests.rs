//! Frame sequence tests over a real reader and the mock SDK.

use lib_frames::FramesError;
use lib_nd2_ffi::{Nd2Error, Nd2Reader};
use lib_types::{Axis, PixelType};
use ndarray::Axis as NdAxis;
use tempfile::TempDir;

use super::mock_sdk::{fixture_path, library, pixel, Fixture, FIRST_FRAME_MS};

fn open(dir: &TempDir, stem: &str) -> Nd2Reader {
    Nd2Reader::open(library(), fixture_path(dir, stem)).unwrap()
}

#[test]
fn test_default_bundle_and_iteration() {
    let dir = TempDir::new().unwrap();
    let mut frames = open(&dir, "cluster").into_sequence();
    let fixture = Fixture::by_stem("cluster").unwrap();

    assert_eq!(frames.bundle_axes(), &[Axis::Z, Axis::Y, Axis::X]);
    assert_eq!(frames.iter_axes(), &[Axis::T]);
    assert_eq!(frames.len(), 3);
    assert_eq!(frames.frame_shape(), vec![10, 31, 38]);
    assert_eq!(frames.pixel_type(), PixelType::U16);

    let frame = frames.get(1).unwrap();
    assert_eq!(frame.shape(), &[10, 31, 38]);
    assert_eq!(frame.frame_no, Some(1));
    assert_eq!(frame.metadata.coords.get(Axis::T), Some(1));
    assert_eq!(frame.metadata.coords.get(Axis::Z), None);

    let data = frame.data.to_f64();
    for z in [0usize, 4, 9] {
        let seq = 10 + z as u32;
        assert_eq!(data[[z, 3, 7].as_slice()], pixel(&fixture, seq, 3, 7, 0));
    }
}

#[test]
fn test_first_frame_time() {
    let dir = TempDir::new().unwrap();
    let mut frames = open(&dir, "cluster").into_sequence();
    frames.set_bundle_axes("yx").unwrap();

    assert_eq!(frames.frame_shape(), vec![31, 38]);
    let frame = frames.get(0).unwrap();
    assert!((frame.metadata.t_ms.0 - FIRST_FRAME_MS).abs() < 1e-9);
    assert!((frame.metadata.t_ms.0 - 445.08).abs() < 0.01);
    assert_eq!(frame.metadata.coords.get(Axis::T), Some(0));
}

#[test]
fn test_negative_and_list_indexing() {
    let dir = TempDir::new().unwrap();
    let mut frames = open(&dir, "cluster").into_sequence();
    frames.set_bundle_axes("yx").unwrap();

    let last = frames.get(2).unwrap();
    assert_eq!(frames.get(-1).unwrap(), last);

    let many = frames.get_many(&[0, -1]).unwrap();
    assert_eq!(many.len(), 2);
    assert_eq!(many[0], frames.get(0).unwrap());
    assert_eq!(many[1], last);

    let err = frames.get(3).unwrap_err();
    assert!(matches!(
        err,
        Nd2Error::Frames(FramesError::IndexOutOfRange { index: 3, len: 3 })
    ));
    assert!(frames.get(-4).is_err());
}

#[test]
fn test_default_channel_equals_bundled_channel() {
    let dir = TempDir::new().unwrap();

    let mut single = open(&dir, "cluster").into_sequence();
    single.set_bundle_axes("yx").unwrap();
    single.default_coords_mut().set(Axis::C, 1);
    let selected = single.get(1).unwrap();

    let mut bundled = open(&dir, "cluster").into_sequence();
    bundled.set_bundle_axes("cyx").unwrap();
    let stack = bundled.get(1).unwrap();
    assert_eq!(stack.shape(), &[2, 31, 38]);

    let channel = stack.data.as_u16().unwrap().index_axis(NdAxis(0), 1).to_owned();
    assert_eq!(selected.data.as_u16().unwrap(), &channel);
}

#[test]
fn test_channel_default_ignored_on_single_component() {
    let dir = TempDir::new().unwrap();
    let mut frames = open(&dir, "gray8").into_sequence();

    assert_eq!(frames.bundle_axes(), &[Axis::Y, Axis::X]);
    assert!(frames.iter_axes().is_empty());
    assert_eq!(frames.len(), 1);

    let plain = frames.get(0).unwrap();
    frames.default_coords_mut().set(Axis::C, 1);
    let with_channel = frames.get(0).unwrap();
    assert_eq!(plain.data, with_channel.data);

    assert!(matches!(
        frames.set_bundle_axes("cyx"),
        Err(FramesError::UnknownAxis(Axis::C))
    ));
}

#[test]
fn test_series_default() {
    let dir = TempDir::new().unwrap();
    let fixture = Fixture::by_stem("gray8").unwrap();
    let mut frames = open(&dir, "gray8").into_sequence();

    frames.set_iter_axes("m").unwrap();
    assert_eq!(frames.len(), 2);
    let second = frames.get(1).unwrap();
    assert_eq!(second.data.to_f64()[[0, 0].as_slice()], pixel(&fixture, 1, 0, 0, 0));

    frames.set_iter_axes("").unwrap();
    frames.default_coords_mut().set(Axis::M, 1);
    assert_eq!(frames.get(0).unwrap().data, second.data);
}

#[test]
fn test_iterate_time_and_z() {
    let dir = TempDir::new().unwrap();
    let mut frames = open(&dir, "cluster").into_sequence();
    frames.set_iter_axes("tz").unwrap();

    // Iterating z removes it from the bundle.
    assert_eq!(frames.bundle_axes(), &[Axis::Y, Axis::X]);
    assert_eq!(frames.len(), 30);

    let frame = frames.get(13).unwrap();
    assert_eq!(frame.metadata.coords.get(Axis::T), Some(1));
    assert_eq!(frame.metadata.coords.get(Axis::Z), Some(3));
    assert!((frame.metadata.t_ms.0 - (FIRST_FRAME_MS + 1300.0)).abs() < 1e-6);

    let numbers: Vec<usize> = frames
        .frames()
        .take(4)
        .map(|f| f.unwrap().frame_no.unwrap())
        .collect();
    assert_eq!(numbers, vec![0, 1, 2, 3]);
}

#[test]
fn test_frames_iterator_covers_sequence() {
    let dir = TempDir::new().unwrap();
    let mut frames = open(&dir, "cluster").into_sequence();

    let iter = frames.frames();
    assert_eq!(iter.len(), 3);
    let all: Vec<_> = iter.collect::<Result<_, _>>().unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|f| f.shape() == &[10, 31, 38]));
}
