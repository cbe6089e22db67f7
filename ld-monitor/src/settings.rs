//! Monitor settings

use std::path::PathBuf;

use anyhow::{Context, Result};
use ld_link::{SessionConfig, DEFAULT_BAUD_RATE};
use ld_sim::VirtualRadarConfig;
use serde::{Deserialize, Serialize};

/// Persisted monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Serial port path
    pub port: String,
    pub baud_rate: u32,
    /// Print events as JSON lines instead of log output
    pub json_output: bool,
    pub session: SessionConfig,
    /// Virtual radar used by `simulate`
    pub simulation: VirtualRadarConfig,
    /// Interval between simulated reports (ms)
    pub report_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            json_output: false,
            session: SessionConfig::default(),
            simulation: VirtualRadarConfig::default(),
            report_interval_ms: 100,
        }
    }
}

impl Settings {
    /// Get the XDG config directory for ldlink
    /// Uses $XDG_CONFIG_HOME/ldlink, falls back to ~/.config/ldlink
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("ldlink"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("ldlink"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::settings_path()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::settings_path().context("Could not determine settings path")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(&path, json).context("Failed to write settings")?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ld_protocol::Variant;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"port":"/dev/ttyUSB0","session":{"variant":"ld6001b"}}"#)
                .unwrap();

        assert_eq!(settings.port, "/dev/ttyUSB0");
        assert_eq!(settings.baud_rate, 115_200);
        assert_eq!(settings.session.variant, Variant::Ld6001b);
        assert_eq!(settings.session.poll_interval_ms, 500);
        assert_eq!(settings.report_interval_ms, 100);
    }

    #[test]
    fn test_round_trip() {
        let mut settings = Settings::default();
        settings.json_output = true;
        settings.session.tracker.departure_misses = 3;

        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
