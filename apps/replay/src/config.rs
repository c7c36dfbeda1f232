//! Replay tool configuration.
//!
//! Read from `$BLEDROP_CONFIG` if set, otherwise from
//! `~/.config/bledrop/config.json`. Missing or unparsable files fall back
//! to defaults.

use std::path::{Path, PathBuf};

use bledrop_transfer::TransferConfig;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "BLEDROP_CONFIG";

/// Replay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Directory receiving completed transfers.
    pub output_dir: PathBuf,

    /// File name prefix for stored transfers.
    pub file_prefix: String,

    /// Reassembly engine policy.
    pub transfer: TransferConfig,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("received"),
            file_prefix: "transfer".into(),
            transfer: TransferConfig::default(),
        }
    }
}

impl ReplayConfig {
    /// Loads configuration from the default location.
    pub fn load() -> anyhow::Result<Self> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(p) => PathBuf::from(p),
            None => config_path()?,
        };
        Self::load_from(&path)
    }

    /// Loads configuration from `path`, using defaults if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<ReplayConfig>(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }
}

fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("bledrop").join("config.json"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home).join(".config"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp"))
    }
}
