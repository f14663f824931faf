//! Per-session state and the handlers that act on it.
//!
//! Every front end owns exactly one [`Session`] and passes it by `&mut` to
//! the handlers below. Failures are logged and recorded as a
//! [`StatusMessage`]; nothing here is fatal to the process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;

use super::events::{EventLog, FileEvent};
use super::filter::FileFilter;
use super::queue::EventQueue;
use super::watcher::{FileWatcher, WatchError, WatchOptions};
use crate::config::ViewerConfig;

pub const MIN_REFRESH_MS: u64 = 500;
pub const MAX_REFRESH_MS: u64 = 30_000;
/// Longest "recent events" window accepted from configuration (7 days).
pub const MAX_RECENT_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn new(level: MessageLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

pub struct Session {
    folder: Option<PathBuf>,
    queue: EventQueue,
    watcher: Option<FileWatcher>,
    log: EventLog,
    options: WatchOptions,
    refresh_interval: Duration,
    recent_window: chrono::Duration,
    message: Option<StatusMessage>,
}

impl Session {
    pub fn new(options: WatchOptions, queue: EventQueue, log: EventLog) -> Self {
        Self {
            folder: None,
            queue,
            watcher: None,
            log,
            options,
            refresh_interval: Duration::from_millis(15_000),
            recent_window: chrono::Duration::minutes(5),
            message: None,
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Result<Self, ignore::Error> {
        let options = WatchOptions {
            recursive: config.watcher.recursive,
            filter: FileFilter::new(&config.watcher.ignore)?,
            ..WatchOptions::default()
        };
        let queue = match config.watcher.queue_capacity {
            Some(capacity) => EventQueue::bounded(capacity),
            None => EventQueue::unbounded(),
        };
        let log = match config.watcher.max_events {
            Some(max) => EventLog::with_limit(max),
            None => EventLog::new(),
        };

        let mut session = Self::new(options, queue, log);
        session.set_refresh_interval_ms(config.ui.refresh_rate_ms);
        session.set_recent_window_secs(config.ui.recent_window_secs);
        Ok(session)
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn filter(&self) -> &FileFilter {
        &self.options.filter
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn is_monitoring(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn recent_window(&self) -> chrono::Duration {
        self.recent_window
    }

    pub fn message(&self) -> Option<&StatusMessage> {
        self.message.as_ref()
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }

    fn notify(&mut self, level: MessageLevel, text: impl Into<String>) {
        self.message = Some(StatusMessage::new(level, text));
    }

    /// Validates and selects the folder to monitor. A leading `~` expands to
    /// the home directory. Switching folders stops any running watcher.
    pub fn set_folder(&mut self, raw: &str) -> Result<(), WatchError> {
        let path = expand_home(raw.trim());

        let invalid = if raw.trim().is_empty() || !path.exists() {
            Some(WatchError::NotFound(path.clone()))
        } else if !path.is_dir() {
            Some(WatchError::NotADirectory(path.clone()))
        } else {
            None
        };
        if let Some(err) = invalid {
            tracing::warn!("Rejected folder {:?}: {}", raw, err);
            self.notify(MessageLevel::Error, "Please enter a valid folder path.");
            return Err(err);
        }

        if self.folder.as_deref() == Some(path.as_path()) {
            return Ok(());
        }
        if self.is_monitoring() {
            self.stop_monitoring()?;
        }

        tracing::info!("Folder set to {}", path.display());
        self.folder = Some(path);
        Ok(())
    }

    pub fn start_monitoring(&mut self) -> Result<(), WatchError> {
        if self.is_monitoring() {
            self.notify(MessageLevel::Warning, "Already monitoring");
            return Ok(());
        }
        let Some(folder) = self.folder.clone() else {
            self.notify(MessageLevel::Error, "Please enter a valid folder path.");
            return Err(WatchError::NotFound(PathBuf::new()));
        };

        match FileWatcher::start(&folder, self.queue.producer(), self.options.clone()) {
            Ok(watcher) => {
                self.watcher = Some(watcher);
                self.notify(
                    MessageLevel::Success,
                    format!("Started monitoring {}", folder.display()),
                );
                Ok(())
            }
            Err(err) => {
                tracing::error!("Failed to start monitoring {}: {}", folder.display(), err);
                self.notify(MessageLevel::Error, format!("Could not start monitoring: {err}"));
                Err(err)
            }
        }
    }

    /// Stops the watcher and waits for its thread to exit. Events the thread
    /// queued before exiting are moved into the log.
    pub fn stop_monitoring(&mut self) -> Result<(), WatchError> {
        self.stop_and_drain().map(|_| ())
    }

    /// Like [`Session::stop_monitoring`], but also returns the events that
    /// were still queued when the watcher thread exited.
    pub fn stop_and_drain(&mut self) -> Result<Vec<FileEvent>, WatchError> {
        let Some(watcher) = self.watcher.take() else {
            return Ok(Vec::new());
        };

        match watcher.stop() {
            Ok(()) => {
                let leftover = self.drain_into_log();
                self.notify(MessageLevel::Success, "Stopped monitoring");
                Ok(leftover)
            }
            Err(err) => {
                tracing::error!("Failed to stop monitoring: {}", err);
                self.notify(MessageLevel::Error, format!("Could not stop monitoring: {err}"));
                Err(err)
            }
        }
    }

    pub fn toggle_monitoring(&mut self) -> Result<(), WatchError> {
        if self.is_monitoring() {
            self.stop_monitoring()
        } else {
            self.start_monitoring()
        }
    }

    /// Moves everything pending in the queue into the log. Never blocks.
    /// Returns how many events were appended.
    pub fn poll_events(&mut self) -> usize {
        self.poll_batch().len()
    }

    /// Moves everything pending in the queue into the log and returns the
    /// drained batch. The batch is complete even when the log cap evicts
    /// part of it.
    pub fn poll_batch(&mut self) -> Vec<FileEvent> {
        if !self.is_monitoring() {
            return Vec::new();
        }
        let batch = self.drain_into_log();
        tracing::debug!("Processing events: {} ({} new)", self.log.len(), batch.len());
        batch
    }

    fn drain_into_log(&mut self) -> Vec<FileEvent> {
        let batch = self.queue.drain_all();
        self.log.extend(batch.iter().cloned());
        batch
    }

    pub fn recent_events(&self) -> Vec<&FileEvent> {
        self.log.recent(self.recent_window, Local::now())
    }

    /// Sets the refresh interval, clamped to the supported range.
    pub fn set_refresh_interval_ms(&mut self, ms: u64) -> Duration {
        self.refresh_interval = Duration::from_millis(ms.clamp(MIN_REFRESH_MS, MAX_REFRESH_MS));
        self.refresh_interval
    }

    /// Sets the "recent events" window, clamped to at most
    /// [`MAX_RECENT_WINDOW_SECS`].
    pub fn set_recent_window_secs(&mut self, secs: u64) -> chrono::Duration {
        let secs = secs.clamp(1, MAX_RECENT_WINDOW_SECS) as i64;
        self.recent_window = chrono::Duration::try_seconds(secs).unwrap_or(self.recent_window);
        self.recent_window
    }

    pub fn adjust_refresh_interval(&mut self, delta_ms: i64) -> Duration {
        let current = self.refresh_interval.as_millis() as i64;
        let next = (current + delta_ms).max(0) as u64;
        self.set_refresh_interval_ms(next)
    }
}

pub fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}
