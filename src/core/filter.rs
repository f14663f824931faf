use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// Filenames that never produce events or listing entries unless overridden.
pub const DEFAULT_IGNORED: &[&str] = &[".DS_Store", ".localized"];

/// Ignore-list of filenames. Entries are gitignore-style patterns matched
/// against the final path component, so both `.DS_Store` and `*.swp` work.
#[derive(Debug, Clone)]
pub struct FileFilter {
    patterns: Vec<String>,
    matcher: Gitignore,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORED).unwrap_or_else(|err| {
            tracing::warn!("Invalid default ignore pattern: {}", err);
            Self::allow_all()
        })
    }
}

impl FileFilter {
    pub fn new<I, S>(patterns: I) -> Result<Self, ignore::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GitignoreBuilder::new("");
        let mut kept = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            builder.add_line(None, pattern)?;
            kept.push(pattern.to_string());
        }

        Ok(Self {
            patterns: kept,
            matcher: builder.build()?,
        })
    }

    pub fn allow_all() -> Self {
        Self {
            patterns: Vec::new(),
            matcher: Gitignore::empty(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_ignored<P: AsRef<Path>>(&self, path: P) -> bool {
        match path.as_ref().file_name() {
            Some(name) => self.matcher.matched(Path::new(name), false).is_ignore(),
            None => false,
        }
    }

    pub fn should_watch<P: AsRef<Path>>(&self, path: P) -> bool {
        !self.is_ignored(path)
    }
}
