//! File-type dispatch for the "Latest File" panel.
//!
//! The extension decides how a file is shown: source code and markdown as
//! plain text, CSV as a header plus records, media and everything else as
//! metadata. Highlighting is left to the terminal.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use super::listing::format_size;
use crate::core::TIMESTAMP_FORMAT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "Image",
            MediaKind::Audio => "Audio",
            MediaKind::Video => "Video",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    Code { language: &'static str },
    Markdown,
    Csv,
    Media(MediaKind),
    Metadata,
}

impl PreviewKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "java" => PreviewKind::Code { language: "java" },
            "ts" => PreviewKind::Code { language: "typescript" },
            "js" => PreviewKind::Code { language: "javascript" },
            "py" => PreviewKind::Code { language: "python" },
            "sh" => PreviewKind::Code { language: "bash" },
            "md" => PreviewKind::Markdown,
            "csv" => PreviewKind::Csv,
            "jpg" | "png" | "webp" => PreviewKind::Media(MediaKind::Image),
            "mp3" | "wav" => PreviewKind::Media(MediaKind::Audio),
            "mp4" | "avi" => PreviewKind::Media(MediaKind::Video),
            _ => PreviewKind::Metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Local>,
}

impl FileMeta {
    fn read(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to read metadata for {}", path.display()))?;
        Ok(Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            size: metadata.len(),
            modified: DateTime::<Local>::from(
                metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            ),
        })
    }

    fn lines(&self) -> Vec<String> {
        vec![
            format!("File Name: {}", self.name),
            format!("Size (bytes): {} ({})", self.size, format_size(self.size)),
            format!("Modified: {}", self.modified.format(TIMESTAMP_FORMAT)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    Text {
        language: Option<&'static str>,
        lines: Vec<String>,
        truncated: bool,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        truncated: bool,
    },
    /// The file matched a structured kind but could not be parsed.
    Unreadable { meta: FileMeta, message: String },
    Media { kind: MediaKind, meta: FileMeta },
    Metadata(FileMeta),
}

/// Builds the preview for `path`, keeping at most `max_lines` lines or rows.
pub fn build_preview(path: &Path, max_lines: usize) -> Result<Preview> {
    let meta = FileMeta::read(path)?;
    if path.is_dir() {
        return Ok(Preview::Metadata(meta));
    }

    let preview = match PreviewKind::from_path(path) {
        PreviewKind::Code { language } => text_preview(path, Some(language), max_lines)?,
        PreviewKind::Markdown => text_preview(path, None, max_lines)?,
        PreviewKind::Csv => match csv_preview(path, max_lines) {
            Ok(table) => table,
            Err(err) => Preview::Unreadable {
                meta,
                message: format!("Error reading CSV file: {err}"),
            },
        },
        PreviewKind::Media(kind) => Preview::Media { kind, meta },
        PreviewKind::Metadata => Preview::Metadata(meta),
    };
    Ok(preview)
}

fn text_preview(path: &Path, language: Option<&'static str>, max_lines: usize) -> Result<Preview> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let mut lines = Vec::new();
    let mut truncated = false;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if read == 0 {
            break;
        }
        if lines.len() == max_lines {
            truncated = true;
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        lines.push(line.trim_end_matches(['\n', '\r']).to_string());
    }

    Ok(Preview::Text {
        language,
        lines,
        truncated,
    })
}

fn csv_preview(path: &Path, max_rows: usize) -> Result<Preview, csv::Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    let mut truncated = false;
    for record in reader.records() {
        let record = record?;
        if rows.len() == max_rows {
            truncated = true;
            break;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Preview::Table {
        headers,
        rows,
        truncated,
    })
}

impl Preview {
    /// Short heading for the preview panel.
    pub fn title(&self) -> String {
        match self {
            Preview::Text {
                language: Some(language),
                ..
            } => format!("code ({language})"),
            Preview::Text { language: None, .. } => "markdown".to_string(),
            Preview::Table { .. } => "csv".to_string(),
            Preview::Unreadable { .. } => "unreadable".to_string(),
            Preview::Media { kind, .. } => kind.label().to_ascii_lowercase(),
            Preview::Metadata(_) => "details".to_string(),
        }
    }

    /// Plain-text rendering used by every front end.
    pub fn render_lines(&self) -> Vec<String> {
        match self {
            Preview::Text {
                lines, truncated, ..
            } => {
                let mut out = lines.clone();
                if *truncated {
                    out.push("...".to_string());
                }
                out
            }
            Preview::Table {
                headers,
                rows,
                truncated,
            } => {
                let mut out = Vec::with_capacity(rows.len() + 2);
                out.push(headers.join(" | "));
                out.push("-".repeat(out[0].chars().count().max(3)));
                out.extend(rows.iter().map(|row| row.join(" | ")));
                if *truncated {
                    out.push("...".to_string());
                }
                out
            }
            Preview::Unreadable { meta, message } => {
                let mut out = vec![message.clone()];
                out.extend(meta.lines());
                out
            }
            Preview::Media { kind, meta } => {
                let mut out = vec![format!("{} file (not rendered in the terminal)", kind.label())];
                out.extend(meta.lines());
                out
            }
            Preview::Metadata(meta) => meta.lines(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dispatch_by_extension() {
        assert_eq!(
            PreviewKind::from_path(Path::new("Main.java")),
            PreviewKind::Code { language: "java" }
        );
        assert_eq!(
            PreviewKind::from_path(Path::new("app.ts")),
            PreviewKind::Code { language: "typescript" }
        );
        assert_eq!(
            PreviewKind::from_path(Path::new("run.sh")),
            PreviewKind::Code { language: "bash" }
        );
        assert_eq!(PreviewKind::from_path(Path::new("README.md")), PreviewKind::Markdown);
        assert_eq!(PreviewKind::from_path(Path::new("data.CSV")), PreviewKind::Csv);
        assert_eq!(
            PreviewKind::from_path(Path::new("photo.webp")),
            PreviewKind::Media(MediaKind::Image)
        );
        assert_eq!(
            PreviewKind::from_path(Path::new("song.wav")),
            PreviewKind::Media(MediaKind::Audio)
        );
        assert_eq!(
            PreviewKind::from_path(Path::new("clip.avi")),
            PreviewKind::Media(MediaKind::Video)
        );
        assert_eq!(PreviewKind::from_path(Path::new("archive.zip")), PreviewKind::Metadata);
        assert_eq!(PreviewKind::from_path(Path::new("Makefile")), PreviewKind::Metadata);
    }

    #[test]
    fn test_code_preview_truncates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("script.py");
        let body: String = (0..10).map(|i| format!("print({i})\n")).collect();
        fs::write(&path, body).unwrap();

        match build_preview(&path, 3).unwrap() {
            Preview::Text {
                language,
                lines,
                truncated,
            } => {
                assert_eq!(language, Some("python"));
                assert_eq!(lines, vec!["print(0)", "print(1)", "print(2)"]);
                assert!(truncated);
            }
            other => panic!("unexpected preview {:?}", other),
        }
    }

    #[test]
    fn test_text_preview_stops_at_line_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        let mut body = b"one\r\ntwo\n\xff\xfe\n".to_vec();
        body.extend(std::iter::repeat(b'x').take(64 * 1024));
        fs::write(&path, body).unwrap();

        match build_preview(&path, 3).unwrap() {
            Preview::Text { lines, truncated, .. } => {
                assert_eq!(lines.len(), 3);
                assert_eq!(lines[0], "one");
                assert_eq!(lines[1], "two");
                assert!(lines[2].contains('\u{FFFD}'));
                assert!(truncated);
            }
            other => panic!("unexpected preview {:?}", other),
        }

        let exact = dir.path().join("exact.md");
        fs::write(&exact, "a\nb\n").unwrap();
        match build_preview(&exact, 2).unwrap() {
            Preview::Text { lines, truncated, .. } => {
                assert_eq!(lines, vec!["a", "b"]);
                assert!(!truncated);
            }
            other => panic!("unexpected preview {:?}", other),
        }
    }

    #[test]
    fn test_markdown_preview() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, "# Title\n\nBody").unwrap();

        let preview = build_preview(&path, 40).unwrap();
        assert_eq!(preview.title(), "markdown");
        assert_eq!(preview.render_lines(), vec!["# Title", "", "Body"]);
    }

    #[test]
    fn test_csv_preview() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("people.csv");
        fs::write(&path, "name,age\nada,36\nalan,41\n").unwrap();

        match build_preview(&path, 40).unwrap() {
            Preview::Table {
                headers,
                rows,
                truncated,
            } => {
                assert_eq!(headers, vec!["name", "age"]);
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[1], vec!["alan", "41"]);
                assert!(!truncated);
            }
            other => panic!("unexpected preview {:?}", other),
        }
    }

    #[test]
    fn test_malformed_csv_reports_error_instead_of_failing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.csv");
        fs::write(&path, "a,b\n1,2,3\n").unwrap();

        let preview = build_preview(&path, 40).unwrap();
        assert!(matches!(preview, Preview::Unreadable { .. }));
        assert!(preview.render_lines()[0].starts_with("Error reading CSV file"));
    }

    #[test]
    fn test_media_and_fallback_show_metadata() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("cat.png");
        fs::write(&image, [0u8; 16]).unwrap();
        let other = dir.path().join("blob.bin");
        fs::write(&other, [0u8; 4]).unwrap();

        let preview = build_preview(&image, 40).unwrap();
        assert_eq!(preview.title(), "image");
        assert!(preview.render_lines().iter().any(|l| l == "File Name: cat.png"));

        match build_preview(&other, 40).unwrap() {
            Preview::Metadata(meta) => assert_eq!(meta.size, 4),
            other => panic!("unexpected preview {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(build_preview(Path::new("/no/such/file.md"), 10).is_err());
    }
}
