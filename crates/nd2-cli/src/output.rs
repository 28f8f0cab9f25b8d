//! Report formatting for the inspector.

use crate::OutputFormat;
use anyhow::Result;
use lib_types::{Axis, AxisSizes, Frame, Nd2Metadata, PixelType, TextInfo, UserEvent};
use ndarray::Dimension;
use serde::Serialize;
use std::io::Write;

/// Everything `info` prints about a file.
#[derive(Clone, Debug, Serialize)]
pub struct InfoReport {
    pub path: String,
    pub sizes: AxisSizes,
    pub pixel_type: PixelType,
    pub max_value: u64,
    pub calibration_z_um: Option<f64>,
    pub metadata: Nd2Metadata,
}

/// Summary of a frame read by `frame`.
#[derive(Clone, Debug, Serialize)]
pub struct FrameReport {
    pub index: usize,
    pub bundle_axes: String,
    pub shape: Vec<usize>,
    pub pixel_type: PixelType,
    pub t_ms: f64,
    pub x_um: f64,
    pub y_um: f64,
    pub z_um: f64,
    pub coords: Vec<(Axis, usize)>,
}

impl FrameReport {
    pub fn new(frame: &Frame, bundle_axes: &[Axis]) -> Self {
        let m = &frame.metadata;
        Self {
            index: frame.frame_no.unwrap_or(0),
            bundle_axes: bundle_axes.iter().map(|a| a.as_char()).collect(),
            shape: frame.shape().to_vec(),
            pixel_type: frame.pixel_type(),
            t_ms: m.t_ms.0,
            x_um: m.x_um.0,
            y_um: m.y_um.0,
            z_um: m.z_um.0,
            coords: m.coords.iter().collect(),
        }
    }
}

pub fn write_info(out: &mut impl Write, report: &InfoReport, format: OutputFormat) -> Result<()> {
    let m = &report.metadata;
    match format {
        OutputFormat::Text => {
            writeln!(out, "ND2 File: {}", report.path)?;
            writeln!(out, "Axes: {}", report.sizes)?;
            writeln!(
                out,
                "Image: {}x{} px, {} component(s), {} ({} significant bits)",
                m.width, m.height, m.components, report.pixel_type, m.bitsize_significant
            )?;
            writeln!(out, "Frames: {}", m.sequence_count)?;
            writeln!(out, "Calibration: {:.6} um/px", m.calibration.0)?;
            if let Some(z) = report.calibration_z_um {
                writeln!(out, "Z step: {z:.4} um")?;
            }
            writeln!(
                out,
                "Objective: {} ({}x, NA {})",
                m.objective, m.magnification, m.numerical_aperture
            )?;
            match m.time_start_utc {
                Some(t) => writeln!(out, "Start: {}", t.to_rfc3339())?,
                None => writeln!(out, "Start: unknown (JDN {})", m.time_start_jdn.0)?,
            }

            if !m.loops.is_empty() {
                writeln!(out, "\nLoops:")?;
                for l in &m.loops {
                    writeln!(
                        out,
                        "  {:?}: {} (interval {})",
                        l.kind, l.size, l.interval
                    )?;
                }
            }

            writeln!(out, "\nPlanes: {}", m.plane_count)?;
            for (i, p) in m.planes.iter().enumerate() {
                let [r, g, b] = p.color.as_array();
                writeln!(
                    out,
                    "  {i}: {} [{}] color ({r:.2}, {g:.2}, {b:.2}) emission {} nm",
                    p.name, p.optical_config, p.emission_nm
                )?;
            }
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(report)?)?;
        }
        OutputFormat::Csv => {
            writeln!(out, "field,value")?;
            writeln!(out, "path,{}", csv_field(&report.path))?;
            for (axis, size) in report.sizes.iter() {
                writeln!(out, "size_{axis},{size}")?;
            }
            writeln!(out, "pixel_type,{}", report.pixel_type)?;
            writeln!(out, "width,{}", m.width)?;
            writeln!(out, "height,{}", m.height)?;
            writeln!(out, "components,{}", m.components)?;
            writeln!(out, "bits_significant,{}", m.bitsize_significant)?;
            writeln!(out, "calibration_um,{}", m.calibration.0)?;
            writeln!(out, "objective,{}", csv_field(&m.objective))?;
            writeln!(out, "plane_count,{}", m.plane_count)?;
            for (i, p) in m.planes.iter().enumerate() {
                writeln!(out, "plane_{i}_name,{}", csv_field(&p.name))?;
            }
        }
    }
    Ok(())
}

pub fn write_text(out: &mut impl Write, text: &TextInfo, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "{}", text.description)?;
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(text)?)?;
        }
        OutputFormat::Csv => {
            writeln!(out, "field,value")?;
            let fields = [
                ("image_id", &text.image_id),
                ("image_type", &text.image_type),
                ("group", &text.group),
                ("sample_id", &text.sample_id),
                ("author", &text.author),
                ("description", &text.description),
                ("capturing", &text.capturing),
                ("sampling", &text.sampling),
                ("location", &text.location),
                ("date", &text.date),
                ("conclusion", &text.conclusion),
                ("info1", &text.info1),
                ("info2", &text.info2),
                ("optics", &text.optics),
                ("app_version", &text.app_version),
            ];
            for (name, value) in fields {
                writeln!(out, "{name},{}", csv_field(value))?;
            }
        }
    }
    Ok(())
}

pub fn write_events(out: &mut impl Write, events: &[UserEvent], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "User events: {}", events.len())?;
            for e in events {
                writeln!(
                    out,
                    "  #{} at {:.3} ms [{}] {}",
                    e.id, e.time.0, e.event_type, e.description
                )?;
            }
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(events)?)?;
        }
        OutputFormat::Csv => {
            writeln!(out, "id,time_ms,type,description")?;
            for e in events {
                writeln!(
                    out,
                    "{},{},{},{}",
                    e.id,
                    e.time.0,
                    csv_field(&e.event_type),
                    csv_field(&e.description)
                )?;
            }
        }
    }
    Ok(())
}

pub fn write_frame_report(
    out: &mut impl Write,
    report: &FrameReport,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "Frame {} ({})", report.index, report.bundle_axes)?;
            writeln!(out, "  Shape:  {:?}", report.shape)?;
            writeln!(out, "  Type:   {}", report.pixel_type)?;
            writeln!(out, "  Time:   {:.3} ms", report.t_ms)?;
            writeln!(
                out,
                "  Stage:  x={:.3} y={:.3} z={:.3} um",
                report.x_um, report.y_um, report.z_um
            )?;
            let coords: Vec<String> = report
                .coords
                .iter()
                .map(|(a, i)| format!("{a}={i}"))
                .collect();
            writeln!(out, "  Coords: {}", coords.join(" "))?;
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(report)?)?;
        }
        OutputFormat::Csv => {
            writeln!(out, "index,bundle_axes,shape,pixel_type,t_ms,x_um,y_um,z_um")?;
            let shape: Vec<String> = report.shape.iter().map(|s| s.to_string()).collect();
            writeln!(
                out,
                "{},{},{},{},{},{},{},{}",
                report.index,
                report.bundle_axes,
                shape.join("x"),
                report.pixel_type,
                report.t_ms,
                report.x_um,
                report.y_um,
                report.z_um
            )?;
        }
    }
    Ok(())
}

/// Write every pixel of a frame as one CSV row: one column per bundle
/// axis, then the value.
pub fn write_frame_pixels(out: &mut impl Write, frame: &Frame, bundle_axes: &[Axis]) -> Result<()> {
    let data = frame.data.to_f64();
    let axes: Vec<String> = if bundle_axes.len() == data.ndim() {
        bundle_axes.iter().map(|a| a.to_string()).collect()
    } else {
        // Multi-component frames carry a trailing component dimension.
        (0..data.ndim()).map(|i| format!("dim{i}")).collect()
    };

    writeln!(out, "{},value", axes.join(","))?;
    for (index, value) in data.indexed_iter() {
        let index: Vec<String> = index.slice().iter().map(|i| i.to_string()).collect();
        writeln!(out, "{},{}", index.join(","), value)?;
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
