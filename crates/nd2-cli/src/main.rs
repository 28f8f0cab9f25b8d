//! nd2-inspect: look inside Nikon ND2 files through the vendor read library.

mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::InspectConfig;
use lib_frames::FramesSequence;
use lib_nd2_ffi::{is_nd2_path, Nd2Library, Nd2Reader, ReaderOptions, LIBRARY_PATH_ENV};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "nd2-inspect")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Path to the ND2 read library
    #[arg(long, env = LIBRARY_PATH_ENV, global = true)]
    library: Option<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Print global metadata and axis sizes
    Info {
        /// Path to the .nd2 file
        file: PathBuf,
    },

    /// Print the description text recorded with the file
    Text {
        /// Path to the .nd2 file
        file: PathBuf,
    },

    /// List the user events recorded during acquisition
    Events {
        /// Path to the .nd2 file
        file: PathBuf,
    },

    /// Read one frame
    Frame {
        /// Path to the .nd2 file
        file: PathBuf,

        /// Frame index; negative values count from the end
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        index: isize,

        /// Axes bundled into the frame, e.g. "zyx"
        #[arg(long)]
        bundle: Option<String>,

        /// Axes iterated over, e.g. "t"
        #[arg(long)]
        iter: Option<String>,

        /// Default channel
        #[arg(long)]
        channel: Option<usize>,

        /// Default multipoint position
        #[arg(long)]
        series: Option<usize>,

        /// Write the pixels as CSV to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from {:?}", path);
            config::load_config(path)?
        }
        None => InspectConfig::default(),
    };
    let library = load_library(cli.library.as_deref().or(config.library.as_deref()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Info { file } => {
            show_info(&library, &file, &config, &mut out, cli.format)?;
        }
        Commands::Text { file } => {
            show_text(&library, &file, &config, &mut out, cli.format)?;
        }
        Commands::Events { file } => {
            show_events(&library, &file, &config, &mut out, cli.format)?;
        }
        Commands::Frame {
            file,
            index,
            bundle,
            iter,
            channel,
            series,
            output: pixels,
        } => {
            let config = InspectConfig {
                series: series.unwrap_or(config.series),
                channel: channel.unwrap_or(config.channel),
                bundle_axes: bundle.or(config.bundle_axes),
                iter_axes: iter.or(config.iter_axes),
                ..config
            };
            show_frame(&library, &file, &config, index, pixels.as_deref(), &mut out, cli.format)?;
        }
    }

    Ok(())
}

fn load_library(path: Option<&Path>) -> Result<Arc<Nd2Library>> {
    match path {
        Some(path) => Nd2Library::load(path)
            .with_context(|| format!("Failed to load ND2 library from {:?}", path)),
        None => Nd2Library::load_default().with_context(|| {
            format!("Failed to load the ND2 library; pass --library or set {LIBRARY_PATH_ENV}")
        }),
    }
}

fn open_reader(library: &Arc<Nd2Library>, file: &Path, config: &InspectConfig) -> Result<Nd2Reader> {
    if !is_nd2_path(file) {
        tracing::warn!("{:?} does not have an .nd2 extension", file);
    }
    let options = ReaderOptions {
        series: config.series,
        channel: config.channel,
    };
    Nd2Reader::open_with(Arc::clone(library), file, options)
        .with_context(|| format!("Failed to open {:?}", file))
}

fn show_info(
    library: &Arc<Nd2Library>,
    file: &Path,
    config: &InspectConfig,
    out: &mut impl Write,
    format: OutputFormat,
) -> Result<()> {
    let mut reader = open_reader(library, file, config)?;

    let report = output::InfoReport {
        path: reader.path().display().to_string(),
        sizes: reader.sizes().clone(),
        pixel_type: reader.pixel_type(),
        max_value: reader.max_value(),
        calibration_z_um: reader.calibration_z().map(|z| z.0),
        metadata: reader.metadata().clone(),
    };
    output::write_info(out, &report, format)?;

    reader.close().context("Failed to close file")?;
    Ok(())
}

fn show_text(
    library: &Arc<Nd2Library>,
    file: &Path,
    config: &InspectConfig,
    out: &mut impl Write,
    format: OutputFormat,
) -> Result<()> {
    let mut reader = open_reader(library, file, config)?;
    let text = reader.text_info().context("Failed to read text info")?.clone();
    output::write_text(out, &text, format)?;
    reader.close().context("Failed to close file")?;
    Ok(())
}

fn show_events(
    library: &Arc<Nd2Library>,
    file: &Path,
    config: &InspectConfig,
    out: &mut impl Write,
    format: OutputFormat,
) -> Result<()> {
    let mut reader = open_reader(library, file, config)?;
    let events = reader.user_events().context("Failed to read user events")?;
    output::write_events(out, &events, format)?;
    reader.close().context("Failed to close file")?;
    Ok(())
}

fn show_frame(
    library: &Arc<Nd2Library>,
    file: &Path,
    config: &InspectConfig,
    index: isize,
    pixels: Option<&Path>,
    out: &mut impl Write,
    format: OutputFormat,
) -> Result<()> {
    let mut frames = open_reader(library, file, config)?.into_sequence();
    configure_sequence(&mut frames, config)?;
    tracing::info!(
        len = frames.len(),
        shape = ?frames.frame_shape(),
        "Reading frame {}",
        index
    );

    let frame = frames
        .get(index)
        .with_context(|| format!("Failed to read frame {index}"))?;
    let report = output::FrameReport::new(&frame, frames.bundle_axes());
    output::write_frame_report(out, &report, format)?;

    if let Some(path) = pixels {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {:?}", path))?;
        let mut writer = BufWriter::new(file);
        output::write_frame_pixels(&mut writer, &frame, frames.bundle_axes())?;
        writer.flush()?;
        tracing::info!("Wrote pixels to {:?}", path);
    }

    frames
        .into_inner()
        .close()
        .context("Failed to close file")?;
    Ok(())
}

fn configure_sequence(frames: &mut FramesSequence<Nd2Reader>, config: &InspectConfig) -> Result<()> {
    if let Some(ref bundle) = config.bundle_axes {
        frames
            .set_bundle_axes(bundle)
            .with_context(|| format!("Invalid bundle axes {bundle:?}"))?;
    }
    if let Some(ref iter) = config.iter_axes {
        frames
            .set_iter_axes(iter)
            .with_context(|| format!("Invalid iteration axes {iter:?}"))?;
    }
    Ok(())
}
