use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Result;
use lru::LruCache;

use super::preview::{build_preview, Preview};

/// Cache for built previews to avoid re-reading the latest file on every
/// refresh. An entry is reused only while the file's modification time and
/// size are unchanged.
pub struct PreviewCache {
    cache: LruCache<PathBuf, CachedPreview>,
    max_lines: usize,
}

struct CachedPreview {
    modified: SystemTime,
    size: u64,
    preview: Preview,
}

impl PreviewCache {
    pub fn new(capacity: usize, max_lines: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            max_lines,
        }
    }

    /// Returns the cached preview when still fresh, otherwise rebuilds it.
    pub fn get_or_build(&mut self, path: &Path) -> Result<Preview> {
        let metadata = std::fs::metadata(path)?;
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let size = metadata.len();

        if let Some(cached) = self.cache.get(path) {
            if cached.modified == modified && cached.size == size {
                return Ok(cached.preview.clone());
            }
        }

        tracing::debug!("Building preview for {}", path.display());
        let preview = build_preview(path, self.max_lines)?;
        self.cache.put(
            path.to_path_buf(),
            CachedPreview {
                modified,
                size,
                preview: preview.clone(),
            },
        );
        Ok(preview)
    }

    pub fn invalidate(&mut self, path: &Path) {
        self.cache.pop(path);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cache_reuses_and_refreshes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, "one").unwrap();

        let mut cache = PreviewCache::new(4, 10);
        assert_eq!(cache.get_or_build(&path).unwrap().render_lines(), vec!["one"]);
        assert_eq!(cache.len(), 1);

        // Different size forces a rebuild even within the same mtime tick.
        fs::write(&path, "one\ntwo").unwrap();
        assert_eq!(cache.get_or_build(&path).unwrap().render_lines(), vec!["one", "two"]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_capacity_evicts() {
        let dir = TempDir::new().unwrap();
        let mut cache = PreviewCache::new(2, 10);
        for name in ["a.md", "b.md", "c.md"] {
            let path = dir.path().join(name);
            fs::write(&path, name).unwrap();
            cache.get_or_build(&path).unwrap();
        }
        assert_eq!(cache.len(), 2);

        cache.invalidate(&dir.path().join("c.md"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = PreviewCache::new(0, 10);
        assert!(cache.is_empty());
    }
}
