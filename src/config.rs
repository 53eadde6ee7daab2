//! msgai configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists.

use msgai_autonomy::AutonomyConfig;
use msgai_ledger::LedgerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MsgaiConfig {
    /// Growth scalar parameters.
    pub autonomy: AutonomyConfig,
    /// Snapshot key and transfer friction.
    pub ledger: LedgerConfig,
    /// Where snapshots live.
    pub storage: StorageConfig,
    /// Interactive session parameters.
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Snapshot directory. Default: `<data dir>/msgai`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Period of the unsolicited status line, in milliseconds.
    pub report_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            report_interval_ms: 5_000,
        }
    }
}

impl SessionConfig {
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms.max(1))
    }
}

impl StorageConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .as_deref()
            .map(|d| expand_tilde(&d.to_string_lossy()))
            .unwrap_or_else(default_store_dir)
    }
}

pub fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("msgai"))
        .unwrap_or_else(|| PathBuf::from(".msgai"))
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("msgai").join("msgai.toml"))
        .unwrap_or_else(|| PathBuf::from("msgai.toml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}

impl MsgaiConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content, path),
            Err(_) => {
                tracing::info!("No config at {} - using defaults", path.display());
                Self::default()
            }
        }
    }

    fn parse(content: &str, path: &Path) -> Self {
        match toml::from_str(content) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("Failed to parse {}: {} - using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Render as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
