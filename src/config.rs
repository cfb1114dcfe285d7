//! Application configuration.
//!
//! Polling intervals, the last selected device and profile, and where
//! profiles live. Stored as JSON in the platform config directory:
//! - Linux: ~/.config/liquid-panel/config.json
//! - Windows: %APPDATA%\liquid-panel\config.json

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PanelError, Result};

const APP_NAME: &str = "liquid-panel";
const CONFIG_FILE: &str = "config.json";
const PROFILES_DIR: &str = "profiles";

/// Shortest interval accepted from the config file, in milliseconds.
pub const MIN_INTERVAL_MS: u64 = 100;

// =============================================================================
// Config Path
// =============================================================================

/// Get the configuration directory path.
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join(APP_NAME))
        .ok_or_else(|| PanelError::InvalidInput("Could not find config directory".into()))
}

/// Get the full path to the config file.
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE))
}

/// Default root of the profile store.
pub fn default_profiles_dir() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(PROFILES_DIR))
}

// =============================================================================
// Config Structures
// =============================================================================

/// Telemetry polling intervals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Pause between steady-state status reads, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Retry interval while waiting for a device's first components.
    #[serde(default = "default_discovery_interval_ms")]
    pub discovery_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_discovery_interval_ms() -> u64 {
    1000
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl PollSettings {
    /// Intervals are never shorter than 1 ms.
    pub fn new(poll_interval: Duration, discovery_interval: Duration) -> Self {
        Self {
            poll_interval_ms: duration_ms(poll_interval).max(1),
            discovery_interval_ms: duration_ms(discovery_interval).max(1),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_interval_ms.max(1))
    }

    /// Raise intervals below [`MIN_INTERVAL_MS`] to the minimum.
    pub fn clamped(self) -> Self {
        let clamp = |name: &str, ms: u64| {
            if ms < MIN_INTERVAL_MS {
                warn!(name, ms, min = MIN_INTERVAL_MS, "Interval too short, using minimum");
                MIN_INTERVAL_MS
            } else {
                ms
            }
        };
        Self {
            poll_interval_ms: clamp("poll_interval_ms", self.poll_interval_ms),
            discovery_interval_ms: clamp("discovery_interval_ms", self.discovery_interval_ms),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            discovery_interval_ms: default_discovery_interval_ms(),
        }
    }
}

/// Main configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub polling: PollSettings,

    /// Device slot selected at startup
    #[serde(default)]
    pub active_device: usize,

    /// Profile last applied from the editor
    #[serde(default)]
    pub active_profile: Option<String>,

    /// Profile store root; the config directory's `profiles/` when unset
    #[serde(default)]
    pub profiles_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Profile store root, falling back to the default location.
    pub fn profiles_dir(&self) -> Result<PathBuf> {
        match &self.profiles_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_profiles_dir(),
        }
    }
}

// =============================================================================
// Load / Save
// =============================================================================

/// Load configuration from disk, or defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&get_config_path()?)
}

pub fn load_config_from(path: &std::path::Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let mut config: AppConfig = serde_json::from_str(&content)
        .map_err(|e| PanelError::InvalidInput(format!("Failed to parse config: {}", e)))?;
    config.polling = config.polling.clamped();
    Ok(config)
}

/// Save configuration to disk.
pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_to(config, &get_config_path()?)
}

pub fn save_config_to(config: &AppConfig, path: &std::path::Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
