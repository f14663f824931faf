use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};

/// Display format for event timestamps, shared by the TUI and text output.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileEventKind {
    Created,
    Modified,
    Deleted,
    Moved,
}

impl FileEventKind {
    pub fn label(&self) -> &'static str {
        match self {
            FileEventKind::Created => "CREATED",
            FileEventKind::Modified => "MODIFIED",
            FileEventKind::Deleted => "DELETED",
            FileEventKind::Moved => "MOVED",
        }
    }
}

impl fmt::Display for FileEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileEventKind::Created => "created",
            FileEventKind::Modified => "modified",
            FileEventKind::Deleted => "deleted",
            FileEventKind::Moved => "moved",
        };
        f.write_str(name)
    }
}

/// A single reported filesystem change.
///
/// Events are built once on the watcher thread and only read afterwards,
/// so the fields are private and exposed through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    kind: FileEventKind,
    path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to: Option<PathBuf>,
    observed_at: DateTime<Local>,
}

impl FileEvent {
    pub fn new(kind: FileEventKind, path: impl Into<PathBuf>) -> Self {
        Self::new_at(kind, path, Local::now())
    }

    pub fn new_at(
        kind: FileEventKind,
        path: impl Into<PathBuf>,
        observed_at: DateTime<Local>,
    ) -> Self {
        Self {
            kind,
            path: path.into(),
            to: None,
            observed_at,
        }
    }

    pub fn moved(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            kind: FileEventKind::Moved,
            path: from.into(),
            to: Some(to.into()),
            observed_at: Local::now(),
        }
    }

    pub fn kind(&self) -> FileEventKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Destination of a `Moved` event.
    pub fn destination(&self) -> Option<&Path> {
        self.to.as_deref()
    }

    pub fn observed_at(&self) -> DateTime<Local> {
        self.observed_at
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl fmt::Display for FileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.observed_at.format(TIMESTAMP_FORMAT),
            self.kind,
            self.path.display()
        )?;
        if let Some(to) = &self.to {
            write!(f, " -> {}", to.display())?;
        }
        Ok(())
    }
}

/// Ordered, append-only record of drained events.
///
/// Unbounded unless a limit is set, in which case the oldest entries are
/// evicted first.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: VecDeque<FileEvent>,
    max_events: Option<usize>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_events: usize) -> Self {
        Self {
            events: VecDeque::new(),
            max_events: Some(max_events.max(1)),
        }
    }

    pub fn max_events(&self) -> Option<usize> {
        self.max_events
    }

    pub fn append(&mut self, event: FileEvent) {
        self.events.push_back(event);
        if let Some(max) = self.max_events {
            while self.events.len() > max {
                self.events.pop_front();
            }
        }
    }

    /// Appends every event in order and returns how many were added.
    pub fn extend<I: IntoIterator<Item = FileEvent>>(&mut self, events: I) -> usize {
        let mut added = 0;
        for event in events {
            self.append(event);
            added += 1;
        }
        added
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &FileEvent> + ExactSizeIterator {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&FileEvent> {
        self.events.back()
    }

    /// The last `n` events, oldest first.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &FileEvent> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip)
    }

    /// Events observed within `window` of `now`, oldest first. A window
    /// reaching past the representable range keeps every event.
    pub fn recent(&self, window: Duration, now: DateTime<Local>) -> Vec<&FileEvent> {
        let Some(cutoff) = now.checked_sub_signed(window) else {
            return self.events.iter().collect();
        };
        self.events
            .iter()
            .filter(|event| event.observed_at >= cutoff)
            .collect()
    }

    /// Returns (total, created, modified, deleted, moved).
    pub fn counts(&self) -> (usize, usize, usize, usize, usize) {
        let mut created = 0;
        let mut modified = 0;
        let mut deleted = 0;
        let mut moved = 0;
        for event in &self.events {
            match event.kind {
                FileEventKind::Created => created += 1,
                FileEventKind::Modified => modified += 1,
                FileEventKind::Deleted => deleted += 1,
                FileEventKind::Moved => moved += 1,
            }
        }
        (self.events.len(), created, modified, deleted, moved)
    }
}
