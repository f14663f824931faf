//! Read-only views over the watched folder
//!
//! Directory listing, latest-file lookup and file-type previews

pub mod cache;
pub mod listing;
pub mod preview;

// Re-export main types
pub use cache::PreviewCache;
pub use listing::{format_size, latest_file, list_directory, DirEntryInfo, EntryKind};
pub use preview::{build_preview, FileMeta, MediaKind, Preview, PreviewKind};
