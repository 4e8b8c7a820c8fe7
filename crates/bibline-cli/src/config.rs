//! Configuration loading from TOML files

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result};
use bibline_core::pipeline::{DEFAULT_BATCH_SIZE, DEFAULT_CHANNEL_CAPACITY};
use bibline_schema::ExportFormat;
use serde::Deserialize;

/// Global configuration for bibline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineSection,
    pub tables: TablesSection,
    pub export: ExportSection,
    pub http: HttpSection,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub batch_size: NonZeroUsize,
    pub channel_capacity: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Lookup tables handed to adapters; absent tables are empty
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TablesSection {
    pub genios_dbmap: Option<PathBuf>,
    pub crossref_members: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub format: ExportFormat,
    pub subject_mapping: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Seconds without data before a download counts as stalled
    pub read_timeout: u64,
    pub max_retries: u32,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            read_timeout: 30,
            max_retries: 3,
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./bibline.toml (current directory)
    /// 2. ~/.config/bibline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("bibline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "bibline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
