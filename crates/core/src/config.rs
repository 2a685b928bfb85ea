//! Application configuration.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Directory under the platform config/data dirs owned by the app.
pub const APP_DIR: &str = "vibr";

const DEFAULT_CONFIG: &str = r#"# Vibr configuration
#
# data_dir = "/path/to/data"
# export_dir = "/path/to/exports"
# log_dir = "/path/to/logs"

[generator]
# Leave unset to generate from local templates.
# endpoint = "http://localhost:3000/api/generate-game"
timeout_secs = 30

[preview]
frame_interval_ms = 16
width = 800
height = 600
"#;

/// Generation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// URL of a remote generation endpoint; local templates when unset.
    pub endpoint: Option<String>,
    /// Request timeout for the remote endpoint.
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 30,
        }
    }
}

/// Preview loop settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PreviewConfig {
    /// Delay between frames.
    pub frame_interval_ms: u64,
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            width: 800,
            height: 600,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Where the saved-games store lives.
    pub data_dir: PathBuf,
    /// Default destination for exported games.
    pub export_dir: PathBuf,
    /// Where log files are written.
    pub log_dir: PathBuf,
    /// Generation backend.
    pub generator: GeneratorConfig,
    /// Preview loop.
    pub preview: PreviewConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            export_dir: data_dir.join("exports"),
            log_dir: data_dir.join("logs"),
            data_dir,
            generator: GeneratorConfig::default(),
            preview: PreviewConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the default config file and `VIBR_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load from an explicit file (optional) layered over defaults and the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("data_dir", path_string(&defaults.data_dir))?
            .set_default("export_dir", path_string(&defaults.export_dir))?
            .set_default("log_dir", path_string(&defaults.log_dir))?
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("VIBR")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        settings
            .try_deserialize()
            .context("failed to deserialize configuration")
    }
}

/// Path of the user configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

/// Write a commented default configuration if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
