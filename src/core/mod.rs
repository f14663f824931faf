//! Core functionality module
//!
//! Contains file watching, filtering, the event hand-off queue and session state

pub mod events;
pub mod filter;
pub mod queue;
pub mod session;
pub mod watcher;

// Re-export main types
pub use events::{EventLog, FileEvent, FileEventKind, TIMESTAMP_FORMAT};
pub use filter::{FileFilter, DEFAULT_IGNORED};
pub use queue::{EventProducer, EventQueue, QueueError};
pub use session::{MessageLevel, Session, StatusMessage};
pub use watcher::{translate_event, FileWatcher, RenamePairer, WatchError, WatchOptions};
