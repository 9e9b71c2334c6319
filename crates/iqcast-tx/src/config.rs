//! Tool configuration for iqcast-tx
//!
//! Configuration is stored as YAML in the user's config directory.
//! Default location: ~/.config/iqcast/config.yaml
//!
//! Every field has a default, so a missing or partial file is fine; CLI
//! flags override whatever the file provides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use iqcast_core::config::{DeviceConfig, PipelineConfig};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Sample pipeline settings (block size, ring capacity, gain, AGC)
    pub pipeline: PipelineConfig,
    /// Transmit device settings (frequency, rate, gains, buffers)
    pub device: DeviceConfig,
}

/// Get the default config file path
///
/// Returns: ~/.config/iqcast/config.yaml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("iqcast")
        .join("config.yaml")
}

/// Load configuration from a YAML file
///
/// If the file doesn't exist, returns default config.
/// If the file exists but is invalid, logs a warning and returns default config.
pub fn load_config(path: &Path) -> ToolConfig {
    if !path.exists() {
        log::debug!("no config file at {:?}, using defaults", path);
        return ToolConfig::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<ToolConfig>(&contents) {
            Ok(config) => {
                log::info!("loaded config from {:?}", path);
                config
            }
            Err(e) => {
                log::warn!("failed to parse config: {}, using defaults", e);
                ToolConfig::default()
            }
        },
        Err(e) => {
            log::warn!("failed to read config file: {}, using defaults", e);
            ToolConfig::default()
        }
    }
}
