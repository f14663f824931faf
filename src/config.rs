//! Configuration management for dirview
//!
//! Settings are resolved in layers: built-in defaults, then an optional
//! `.dirview.toml` file, then `DIRVIEW_*` environment variables. Command line
//! flags are applied last by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::session::{MAX_RECENT_WINDOW_SECS, MAX_REFRESH_MS, MIN_REFRESH_MS};
use crate::core::DEFAULT_IGNORED;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = ".dirview.toml";

/// Global configuration for dirview
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// File watcher configuration
    pub watcher: WatcherConfig,
    /// UI configuration
    pub ui: UiConfig,
    /// Diagnostic log configuration
    pub logging: LoggingConfig,
}

/// Configuration for file watching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Filenames (gitignore-style patterns) that never produce events
    pub ignore: Vec<String>,
    /// Watch subdirectories as well
    pub recursive: bool,
    /// Cap on the in-memory event log; unbounded when unset
    pub max_events: Option<usize>,
    /// Cap on pending, undrained events; unbounded when unset
    pub queue_capacity: Option<usize>,
}

/// Configuration for the user interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Refresh interval in milliseconds
    pub refresh_rate_ms: u64,
    /// Folder shown on startup
    pub starting_directory: String,
    /// Maximum lines of text shown in a preview
    pub preview_lines: usize,
    /// Number of previews kept in the cache
    pub preview_cache_size: usize,
    /// How far back the "New Events" panel looks, in seconds
    pub recent_window_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append-only diagnostic log file
    pub file: PathBuf,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            ignore: DEFAULT_IGNORED.iter().map(|s| s.to_string()).collect(),
            recursive: false,
            max_events: None,
            queue_capacity: None,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_rate_ms: 15_000,
            starting_directory: "~/Downloads".to_string(),
            preview_lines: 40,
            preview_cache_size: 32,
            recent_window_secs: 300, // 5 minutes
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("file_monitor.log"),
        }
    }
}

impl UiConfig {
    /// Get refresh interval duration
    pub fn refresh_duration(&self) -> Duration {
        Duration::from_millis(self.refresh_rate_ms)
    }

    /// Get recent event window duration
    pub fn recent_window_duration(&self) -> Duration {
        Duration::from_secs(self.recent_window_secs)
    }
}

/// Configuration loading and management
impl ViewerConfig {
    /// Parse configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid configuration file")
    }

    /// Load from `path` if given, otherwise from [`DEFAULT_CONFIG_FILE`] when
    /// it exists, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Failed to load config file {}", path.display()))
    }

    /// Override values with environment variables if present
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("DIRVIEW_REFRESH_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                self.ui.refresh_rate_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("DIRVIEW_START_DIR") {
            if !val.trim().is_empty() {
                self.ui.starting_directory = val;
            }
        }

        if let Ok(val) = std::env::var("DIRVIEW_MAX_EVENTS") {
            if let Ok(max) = val.parse::<usize>() {
                self.watcher.max_events = Some(max);
            }
        }

        if let Ok(val) = std::env::var("DIRVIEW_IGNORE") {
            self.watcher.ignore = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(val) = std::env::var("DIRVIEW_LOG_FILE") {
            if !val.trim().is_empty() {
                self.logging.file = PathBuf::from(val);
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_REFRESH_MS..=MAX_REFRESH_MS).contains(&self.ui.refresh_rate_ms) {
            return Err(format!(
                "refresh_rate_ms must be between {} and {}",
                MIN_REFRESH_MS, MAX_REFRESH_MS
            ));
        }

        if self.watcher.max_events == Some(0) {
            return Err("max_events must be greater than 0".to_string());
        }

        if self.watcher.queue_capacity == Some(0) {
            return Err("queue_capacity must be greater than 0".to_string());
        }

        if self.ui.preview_lines == 0 {
            return Err("preview_lines must be greater than 0".to_string());
        }

        if self.ui.preview_cache_size == 0 {
            return Err("preview_cache_size must be greater than 0".to_string());
        }

        if !(1..=MAX_RECENT_WINDOW_SECS).contains(&self.ui.recent_window_secs) {
            return Err(format!(
                "recent_window_secs must be between 1 and {}",
                MAX_RECENT_WINDOW_SECS
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ViewerConfig::default();

        assert_eq!(config.ui.refresh_rate_ms, 15_000);
        assert_eq!(config.ui.starting_directory, "~/Downloads");
        assert_eq!(config.watcher.ignore, vec![".DS_Store", ".localized"]);
        assert_eq!(config.watcher.max_events, None);
        assert_eq!(config.logging.file, PathBuf::from("file_monitor.log"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = ViewerConfig::default();
        assert!(config.validate().is_ok());

        config.ui.refresh_rate_ms = 100;
        assert!(config.validate().is_err());

        config.ui.refresh_rate_ms = 1_000;
        config.watcher.max_events = Some(0);
        assert!(config.validate().is_err());

        config.watcher.max_events = Some(10);
        config.ui.preview_lines = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_recent_window() {
        let mut config = ViewerConfig::default();

        config.ui.recent_window_secs = 1_000_000_000_000_000;
        assert!(config.validate().is_err());

        config.ui.recent_window_secs = 0;
        assert!(config.validate().is_err());

        config.ui.recent_window_secs = MAX_RECENT_WINDOW_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ViewerConfig::from_toml_str(
            r#"
            [ui]
            refresh_rate_ms = 2000
            starting_directory = "/srv/inbox"

            [watcher]
            ignore = ["*.part"]
            "#,
        )
        .unwrap();

        assert_eq!(config.ui.refresh_rate_ms, 2000);
        assert_eq!(config.ui.starting_directory, "/srv/inbox");
        assert_eq!(config.ui.preview_lines, 40);
        assert_eq!(config.watcher.ignore, vec!["*.part"]);
        assert!(!config.watcher.recursive);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(ViewerConfig::from_toml_str("[ui]\nrefresh_rate_ms = \"fast\"").is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("viewer.toml");
        std::fs::write(&path, "[watcher]\nrecursive = true\n").unwrap();

        let config = ViewerConfig::from_file(&path).unwrap();
        assert!(config.watcher.recursive);
        assert!(ViewerConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_duration_conversions() {
        let config = UiConfig::default();

        assert_eq!(config.refresh_duration(), Duration::from_secs(15));
        assert_eq!(config.recent_window_duration(), Duration::from_secs(300));
    }

    #[test]
    fn test_env_config_loading() {
        std::env::set_var("DIRVIEW_REFRESH_MS", "2500");
        std::env::set_var("DIRVIEW_IGNORE", "*.tmp, .DS_Store,");

        let mut config = ViewerConfig::default();
        config.apply_env();

        assert_eq!(config.ui.refresh_rate_ms, 2500);
        assert_eq!(config.watcher.ignore, vec!["*.tmp", ".DS_Store"]);

        // Cleanup
        std::env::remove_var("DIRVIEW_REFRESH_MS");
        std::env::remove_var("DIRVIEW_IGNORE");
    }
}
