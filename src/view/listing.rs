use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::core::FileFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    File,
    Folder,
}

impl EntryKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::File => "File",
            EntryKind::Folder => "Folder",
        }
    }
}

/// One row of the directory listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirEntryInfo {
    pub name: String,
    pub kind: EntryKind,
    pub modified: DateTime<Local>,
    pub size: u64,
    pub path: PathBuf,
}

/// Lists the immediate children of `folder`, skipping ignored names.
/// Entries are sorted by name.
pub fn list_directory(folder: &Path, filter: &FileFilter) -> Result<Vec<DirEntryInfo>> {
    if !folder.exists() {
        bail!("The specified folder path does not exist: {}", folder.display());
    }

    let mut entries = Vec::new();
    let read_dir = fs::read_dir(folder)
        .with_context(|| format!("Failed to read directory {}", folder.display()))?;

    for entry in read_dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("Error reading directory entry: {}", err);
                continue;
            }
        };

        let path = entry.path();
        if filter.is_ignored(&path) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!("Cannot stat {}: {}", path.display(), err);
                continue;
            }
        };

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        entries.push(DirEntryInfo {
            name: entry.file_name().to_string_lossy().into_owned(),
            kind: if metadata.is_dir() {
                EntryKind::Folder
            } else {
                EntryKind::File
            },
            modified: DateTime::<Local>::from(modified),
            size: metadata.len(),
            path,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// The most recently modified entry in `folder`, files and folders alike.
pub fn latest_file(folder: &Path, filter: &FileFilter) -> Result<Option<DirEntryInfo>> {
    let entries = list_directory(folder, filter)?;
    Ok(entries.into_iter().max_by_key(|entry| entry.modified))
}

/// Human-readable byte size, e.g. `1.5 KB`.
pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if size < 1024 {
        return format!("{} B", size);
    }
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_listing_skips_ignored_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "bb").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join(".DS_Store"), "").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let entries = list_directory(dir.path(), &FileFilter::default()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);

        assert_eq!(entries[1].size, 2);
        assert_eq!(entries[2].kind, EntryKind::Folder);
    }

    #[test]
    fn test_listing_missing_folder_is_an_error() {
        let result = list_directory(Path::new("/no/such/dir"), &FileFilter::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_latest_file() {
        let dir = TempDir::new().unwrap();
        assert!(latest_file(dir.path(), &FileFilter::default()).unwrap().is_none());

        fs::write(dir.path().join("old.txt"), "old").unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        fs::write(dir.path().join("new.txt"), "new").unwrap();

        let latest = latest_file(dir.path(), &FileFilter::default()).unwrap().unwrap();
        assert_eq!(latest.name, "new.txt");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(12), "12 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
