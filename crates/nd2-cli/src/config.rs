//! Inspector configuration loading and validation.

use anyhow::{Context, Result};
use lib_types::Axis;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings read from a `--config` file. Command-line flags override them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InspectConfig {
    /// Path to the vendor read library.
    pub library: Option<PathBuf>,

    /// Default multipoint position.
    #[serde(default)]
    pub series: usize,

    /// Default channel.
    #[serde(default)]
    pub channel: usize,

    /// Axes bundled into each frame, e.g. `"zyx"`.
    pub bundle_axes: Option<String>,

    /// Axes iterated over, e.g. `"t"`.
    pub iter_axes: Option<String>,
}

/// Load configuration from a file. `.json` files are parsed as JSON,
/// anything else as TOML.
pub fn load_config(path: &Path) -> Result<InspectConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: InspectConfig = if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config as JSON: {:?}", path))?
    } else {
        toml::from_str(&content).with_context(|| "Failed to parse config as TOML")?
    };

    validate_config(&config)?;

    Ok(config)
}

/// Validate configuration.
pub fn validate_config(config: &InspectConfig) -> Result<()> {
    if let Some(ref library) = config.library {
        if !library.exists() {
            anyhow::bail!("Library file not found: {:?}", library);
        }
    }

    if let Some(ref bundle) = config.bundle_axes {
        let axes = Axis::parse_list(bundle)
            .with_context(|| format!("Invalid bundle_axes: {bundle:?}"))?;
        if axes.len() < 2 || axes[axes.len() - 2..] != [Axis::Y, Axis::X] {
            anyhow::bail!("bundle_axes must end with 'yx' (got {bundle:?})");
        }
    }

    if let Some(ref iter) = config.iter_axes {
        let axes =
            Axis::parse_list(iter).with_context(|| format!("Invalid iter_axes: {iter:?}"))?;
        if axes.iter().any(|a| a.is_planar()) {
            anyhow::bail!("iter_axes cannot contain 'x' or 'y' (got {iter:?})");
        }
    }

    Ok(())
}
