use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use crate::config::ViewerConfig;

#[derive(Parser)]
#[command(name = "dirview")]
#[command(version)]
#[command(about = "A real-time directory viewer for the terminal")]
#[command(long_about = "dirview shows the contents of a folder, a preview of its most \
recently modified file and a live list of file-system events. Monitoring can be started and \
stopped at any time; diagnostics go to an append-only log file.")]
pub struct Cli {
    /// Folder to monitor
    #[arg(
        value_name = "PATH",
        help = "Folder to monitor (defaults to the configured starting directory)"
    )]
    pub path: Option<String>,

    /// Refresh interval in milliseconds
    #[arg(long, help = "Refresh interval in ms (500-30000)")]
    pub refresh_ms: Option<u64>,

    /// Filenames to ignore, replacing the configured list
    #[arg(
        long,
        value_delimiter = ',',
        help = "Filenames or globs to ignore (e.g. .DS_Store,*.swp)"
    )]
    pub ignore: Option<Vec<String>>,

    /// Watch subdirectories too
    #[arg(short, long, help = "Watch subdirectories recursively")]
    pub recursive: bool,

    /// Maximum number of events to keep in memory
    #[arg(long, help = "Maximum events to keep (unbounded if omitted)")]
    pub max_events: Option<usize>,

    /// Maximum number of undrained events
    #[arg(long, help = "Maximum pending events between refreshes (unbounded if omitted)")]
    pub queue_capacity: Option<usize>,

    /// Output format
    #[arg(long, default_value = "tui", help = "Output format")]
    pub output: OutputFormat,

    /// Diagnostic log file
    #[arg(long, value_name = "FILE", help = "Append diagnostics to this file")]
    pub log_file: Option<PathBuf>,

    /// Configuration file
    #[arg(long, value_name = "FILE", help = "Configuration file (defaults to ./.dirview.toml)")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable debug-level diagnostics")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Terminal user interface (default)
    Tui,
    /// JSON lines for scripting
    Json,
    /// Plain text lines
    Text,
}

impl Cli {
    /// Loads the configuration and applies command line overrides on top.
    pub fn resolve_config(&self) -> Result<ViewerConfig> {
        let mut config = ViewerConfig::load(self.config.as_deref())?;
        self.apply_to(&mut config);
        config
            .validate()
            .map_err(|err| anyhow::anyhow!("Invalid configuration: {}", err))?;
        Ok(config)
    }

    pub fn apply_to(&self, config: &mut ViewerConfig) {
        if let Some(path) = &self.path {
            config.ui.starting_directory = path.clone();
        }
        if let Some(ms) = self.refresh_ms {
            config.ui.refresh_rate_ms = ms;
        }
        if let Some(ignore) = &self.ignore {
            config.watcher.ignore = ignore.clone();
        }
        if self.recursive {
            config.watcher.recursive = true;
        }
        if let Some(max) = self.max_events {
            config.watcher.max_events = Some(max);
        }
        if let Some(capacity) = self.queue_capacity {
            config.watcher.queue_capacity = Some(capacity);
        }
        if let Some(file) = &self.log_file {
            config.logging.file = file.clone();
        }
    }

    /// Installs the global subscriber writing timestamped lines to `log_file`.
    /// The terminal belongs to the UI, so nothing is logged to stdout.
    pub fn setup_logging(&self, log_file: &Path) -> Result<()> {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .try_init()
            .map_err(|err| anyhow::anyhow!("Failed to install logger: {}", err))?;

        Ok(())
    }
}
