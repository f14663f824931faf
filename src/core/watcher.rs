use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

use super::events::{FileEvent, FileEventKind};
use super::filter::FileFilter;
use super::queue::{EventProducer, QueueError};

/// How long the first half of a rename is held back waiting for the rest.
const RENAME_PAIR_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("path does not exist: {}", .0.display())]
    NotFound(PathBuf),
    #[error("path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("failed to create file system watcher: {0}")]
    Create(#[source] notify::Error),
    #[error("failed to start watching {}: {source}", .path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("failed to spawn watcher thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("watcher thread exited before it was ready")]
    ThreadExited,
    #[error("watcher thread panicked")]
    Panicked,
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub recursive: bool,
    pub filter: FileFilter,
    /// How long the watcher thread waits for a notification before checking
    /// for a stop request.
    pub poll_timeout: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            filter: FileFilter::default(),
            poll_timeout: Duration::from_millis(100),
        }
    }
}

/// Handle to a running watcher thread.
///
/// The thread owns the notify watcher and is the only producer on the
/// queue it was started with. [`FileWatcher::stop`] joins it, so once it
/// returns no further events are pushed. Dropping the handle stops it too.
pub struct FileWatcher {
    root: PathBuf,
    stop_tx: Option<mpsc::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl FileWatcher {
    pub fn start<P: AsRef<Path>>(
        root: P,
        producer: EventProducer,
        options: WatchOptions,
    ) -> Result<Self, WatchError> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            return Err(WatchError::NotFound(root));
        }
        if !root.is_dir() {
            return Err(WatchError::NotADirectory(root));
        }

        tracing::info!("Starting watcher on {}", root.display());

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), WatchError>>(1);
        let thread_root = root.clone();

        let join = thread::Builder::new()
            .name("dirview-watcher".to_string())
            .spawn(move || run_watcher(thread_root, producer, options, stop_rx, ready_tx))
            .map_err(WatchError::Spawn)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::info!("Watcher started");
                Ok(Self {
                    root,
                    stop_tx: Some(stop_tx),
                    join: Some(join),
                })
            }
            Ok(Err(err)) => {
                let _ = join.join();
                Err(err)
            }
            Err(_) => {
                let _ = join.join();
                Err(WatchError::ThreadExited)
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Requests shutdown and blocks until the watcher thread has exited.
    pub fn stop(mut self) -> Result<(), WatchError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), WatchError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join) = self.join.take() {
            tracing::info!("Stopping watcher on {}", self.root.display());
            join.join().map_err(|_| WatchError::Panicked)?;
            tracing::info!("Watcher stopped");
        }
        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::error!("Failed to stop watcher: {}", err);
        }
    }
}

fn run_watcher(
    root: PathBuf,
    producer: EventProducer,
    options: WatchOptions,
    stop_rx: mpsc::Receiver<()>,
    ready_tx: mpsc::SyncSender<Result<(), WatchError>>,
) {
    let (raw_tx, raw_rx) = mpsc::channel::<notify::Result<Event>>();

    let mut watcher: RecommendedWatcher = match notify::recommended_watcher(raw_tx) {
        Ok(watcher) => watcher,
        Err(err) => {
            let _ = ready_tx.send(Err(WatchError::Create(err)));
            return;
        }
    };

    let mode = if options.recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    if let Err(err) = watcher.watch(&root, mode) {
        let _ = ready_tx.send(Err(WatchError::Watch {
            path: root,
            source: err,
        }));
        return;
    }
    let _ = ready_tx.send(Ok(()));

    let mut renames = RenamePairer::default();
    loop {
        match stop_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        match raw_rx.recv_timeout(options.poll_timeout) {
            Ok(Ok(event)) => {
                let events = renames.process(&event, &options.filter, Instant::now());
                publish(&producer, events);
            }
            Ok(Err(err)) => {
                tracing::error!("File watcher error: {}", err);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("Notification channel disconnected");
                break;
            }
        }

        publish(&producer, renames.expire(&options.filter, Instant::now()));
    }
    publish(&producer, renames.flush(&options.filter));

    if let Err(err) = watcher.unwatch(&root) {
        tracing::debug!("Unwatch failed for {}: {}", root.display(), err);
    }
    tracing::debug!("Watcher thread finished");
}

fn publish(producer: &EventProducer, events: Vec<FileEvent>) {
    for file_event in events {
        tracing::info!(
            "Event detected: {} - {} at {}",
            file_event.kind(),
            file_event.path().display(),
            file_event.observed_at().format(super::events::TIMESTAMP_FORMAT)
        );
        match producer.push(file_event) {
            Ok(()) => {}
            Err(err @ QueueError::Full { .. }) => tracing::warn!("Dropping event: {}", err),
            Err(QueueError::Closed) => tracing::debug!("Event queue closed, discarding event"),
        }
    }
}

struct PendingRename {
    tracker: Option<usize>,
    from: PathBuf,
    to: Option<PathBuf>,
    since: Instant,
}

impl PendingRename {
    fn matches(&self, event: &Event) -> bool {
        match (self.tracker, event.tracker()) {
            (Some(pending), Some(seen)) => pending == seen,
            (None, None) => true,
            _ => false,
        }
    }

    fn resolve(self, filter: &FileFilter) -> Vec<FileEvent> {
        match self.to {
            Some(to) => translate_rename(&[self.from, to], filter),
            None if is_reportable(&self.from, filter) => {
                vec![FileEvent::new(FileEventKind::Deleted, self.from)]
            }
            None => Vec::new(),
        }
    }
}

/// Collapses the `From`, `To` and `Both` notifications that inotify and
/// Windows send for a single rename into one moved event.
///
/// A `From` half is held for [`RENAME_PAIR_WINDOW`]. A matching `To` is
/// attached to it and a matching `Both` replaces it. Halves that never pair
/// up are reported as deleted (or moved, when both ends arrived without a
/// `Both`) once the window passes.
#[derive(Default)]
pub struct RenamePairer {
    pending: Vec<PendingRename>,
}

impl RenamePairer {
    pub fn process(&mut self, event: &Event, filter: &FileFilter, now: Instant) -> Vec<FileEvent> {
        match (event.kind, event.paths.as_slice()) {
            (EventKind::Modify(ModifyKind::Name(RenameMode::From)), [from]) => {
                self.pending.push(PendingRename {
                    tracker: event.tracker(),
                    from: from.clone(),
                    to: None,
                    since: now,
                });
                return Vec::new();
            }
            (EventKind::Modify(ModifyKind::Name(RenameMode::To)), [to]) => {
                let half = self
                    .pending
                    .iter_mut()
                    .rev()
                    .find(|pending| pending.to.is_none() && pending.matches(event));
                if let Some(pending) = half {
                    pending.to = Some(to.clone());
                    return Vec::new();
                }
            }
            (EventKind::Modify(ModifyKind::Name(RenameMode::Both)), [from, _]) => {
                let tracker = event.tracker();
                self.pending.retain(|pending| {
                    let same_cookie = tracker.is_some() && pending.tracker == tracker;
                    !(same_cookie || pending.from == *from)
                });
            }
            _ => {}
        }
        translate_event(event, filter)
    }

    /// Reports halves that have waited longer than the pairing window.
    pub fn expire(&mut self, filter: &FileFilter, now: Instant) -> Vec<FileEvent> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let (expired, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|pending| {
                now.saturating_duration_since(pending.since) >= RENAME_PAIR_WINDOW
            });
        self.pending = pending;
        expired.into_iter().flat_map(|pending| pending.resolve(filter)).collect()
    }

    /// Reports every held half regardless of age.
    pub fn flush(&mut self, filter: &FileFilter) -> Vec<FileEvent> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .flat_map(|pending| pending.resolve(filter))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Translates one raw notification into zero or more [`FileEvent`]s.
///
/// Directory events and ignored filenames are dropped. Paths that no longer
/// exist cannot be checked for being a directory and are kept.
pub fn translate_event(event: &Event, filter: &FileFilter) -> Vec<FileEvent> {
    let kind = match event.kind {
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => {
            return Vec::new();
        }
        EventKind::Create(_) => FileEventKind::Created,
        EventKind::Remove(_) => FileEventKind::Deleted,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            return translate_rename(&event.paths, filter);
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => FileEventKind::Deleted,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => FileEventKind::Created,
        EventKind::Modify(ModifyKind::Name(_)) => {
            // Only one side of the rename is known; whether the path still
            // exists tells which side it was.
            return event
                .paths
                .iter()
                .filter(|path| is_reportable(path, filter))
                .map(|path| {
                    let kind = if path.exists() {
                        FileEventKind::Created
                    } else {
                        FileEventKind::Deleted
                    };
                    FileEvent::new(kind, path.clone())
                })
                .collect();
        }
        EventKind::Modify(_) => FileEventKind::Modified,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
    };

    event
        .paths
        .iter()
        .filter(|path| is_reportable(path, filter))
        .map(|path| FileEvent::new(kind, path.clone()))
        .collect()
}

fn translate_rename(paths: &[PathBuf], filter: &FileFilter) -> Vec<FileEvent> {
    let (from, to) = match paths {
        [from, to] => (from, to),
        _ => return Vec::new(),
    };
    if to.is_dir() {
        return Vec::new();
    }

    match (filter.should_watch(from), filter.should_watch(to)) {
        (true, true) => vec![FileEvent::moved(from.clone(), to.clone())],
        (true, false) => vec![FileEvent::new(FileEventKind::Deleted, from.clone())],
        (false, true) => vec![FileEvent::new(FileEventKind::Created, to.clone())],
        (false, false) => Vec::new(),
    }
}

fn is_reportable(path: &Path, filter: &FileFilter) -> bool {
    !path.is_dir() && filter.should_watch(path)
}
