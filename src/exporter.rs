use crate::config::NotesConfig;
use crate::fs::{FileSystem, OsFileSystem};
use crate::models::{ExportResult, Highlight, Selection};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const MARKDOWN_EXTENSION: &str = "md";
const MAX_FILENAME_CHARS: usize = 200;
const KEY_SEPARATOR: &str = "|";

static HIGHLIGHT_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^- (.+) \(Page: ([0-9]+)\)$").expect("highlight line pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    CreateDirectory,
    CheckExisting,
    ReadExisting,
    WriteNotes,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoOp::CreateDirectory => write!(f, "creating directory"),
            IoOp::CheckExisting => write!(f, "checking existing file"),
            IoOp::ReadExisting => write!(f, "reading existing file"),
            IoOp::WriteNotes => write!(f, "writing file"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("book title cannot be empty")]
    EmptyTitle,
    #[error("title {0:?} leaves no usable file name")]
    InvalidFileName(String),
    #[error("{op} {}: {source}", path.display())]
    Io {
        op: IoOp,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A book failed to export. `completed` holds the books written before it.
#[derive(Debug, Error)]
#[error("exporting highlights for {title:?}: {source}")]
pub struct ExportFailure {
    pub title: String,
    pub completed: Vec<ExportResult>,
    #[source]
    pub source: ExportError,
}

pub struct Exporter<F = OsFileSystem> {
    notes_root: PathBuf,
    fs: F,
}

impl Exporter<OsFileSystem> {
    pub fn new(config: &NotesConfig) -> Self {
        Self::with_file_system(config, OsFileSystem)
    }
}

impl<F: FileSystem> Exporter<F> {
    pub fn with_file_system(config: &NotesConfig, fs: F) -> Self {
        Exporter {
            notes_root: config.notes_root(),
            fs,
        }
    }

    #[cfg(test)]
    fn file_system(&self) -> &F {
        &self.fs
    }

    /// Exports every book in the selection, one at a time, stopping at the
    /// first book that fails.
    pub fn export_highlights(&self, selection: &Selection) -> Result<Vec<ExportResult>, ExportFailure> {
        let mut results = Vec::with_capacity(selection.len());

        for (title, highlights) in selection {
            if highlights.is_empty() {
                tracing::debug!(title = %title, "no highlights selected, skipping");
                continue;
            }

            match self.export_book(title, highlights) {
                Ok(result) => results.push(result),
                Err(source) => {
                    tracing::warn!(title = %title, error = %source, "export failed");
                    return Err(ExportFailure {
                        title: title.clone(),
                        completed: results,
                        source,
                    });
                }
            }
        }

        Ok(results)
    }

    pub fn export_book(&self, title: &str, highlights: &[Highlight]) -> Result<ExportResult, ExportError> {
        let path = self.notes_path(title)?;

        if let Some(dir) = path.parent() {
            self.fs.mkdir_all(dir).map_err(|source| ExportError::Io {
                op: IoOp::CreateDirectory,
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let (mut content, existing) = self.load_existing(&path, title)?;

        let (new, duplicates): (Vec<&Highlight>, Vec<&Highlight>) = highlights
            .iter()
            .partition(|h| !existing.contains(&highlight_key(&h.text, &h.page)));

        if !new.is_empty() {
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            for highlight in &new {
                content.push_str(&render_highlight(highlight));
            }

            self.fs.write_file(&path, &content).map_err(|source| ExportError::Io {
                op: IoOp::WriteNotes,
                path: path.clone(),
                source,
            })?;
        }

        tracing::info!(
            title = %title,
            path = %path.display(),
            new = new.len(),
            skipped = duplicates.len(),
            "exported highlights"
        );

        Ok(ExportResult {
            book_title: title.to_string(),
            new_count: new.len(),
            skipped_count: duplicates.len(),
            total_count: highlights.len(),
        })
    }

    /// Markdown file a book's highlights are written to.
    pub fn notes_path(&self, title: &str) -> Result<PathBuf, ExportError> {
        if title.is_empty() {
            return Err(ExportError::EmptyTitle);
        }

        let file_stem = sanitize_filename(title);
        if file_stem.is_empty() {
            return Err(ExportError::InvalidFileName(title.to_string()));
        }

        Ok(self
            .notes_root
            .join(format!("{}.{}", file_stem, MARKDOWN_EXTENSION)))
    }

    fn load_existing(&self, path: &Path, title: &str) -> Result<(String, HashSet<String>), ExportError> {
        match self.fs.stat(path) {
            Ok(info) if info.is_dir => Err(ExportError::Io {
                op: IoOp::CheckExisting,
                path: path.to_path_buf(),
                source: io::Error::other("a directory is in the way of the notes file"),
            }),
            Ok(_) => {
                let content = self.fs.read_file(path).map_err(|source| ExportError::Io {
                    op: IoOp::ReadExisting,
                    path: path.to_path_buf(),
                    source,
                })?;
                let keys = extract_existing_keys(&content);
                tracing::debug!(path = %path.display(), existing = keys.len(), "merging into existing notes");
                Ok((content, keys))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Ok((format!("# {}\n\n", title), HashSet::new()))
            }
            Err(source) => Err(ExportError::Io {
                op: IoOp::CheckExisting,
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Makes a book title safe to use as a file name on common platforms.
pub fn sanitize_filename(title: &str) -> String {
    let replaced: String = title
        .chars()
        .filter_map(|c| match c {
            '/' | '\\' | ':' | '|' => Some('-'),
            '*' | '?' | '"' | '<' | '>' => None,
            other => Some(other),
        })
        .collect();

    replaced.trim().chars().take(MAX_FILENAME_CHARS).collect()
}

/// Keys of the highlights already present in an exported notes file.
pub fn extract_existing_keys(content: &str) -> HashSet<String> {
    content
        .lines()
        .filter_map(|line| HIGHLIGHT_LINE_RE.captures(line.trim()))
        .map(|caps| highlight_key(&caps[1], &caps[2]))
        .collect()
}

pub fn highlight_key(text: &str, page: &str) -> String {
    format!("{}{}{}", text, KEY_SEPARATOR, page)
}

fn render_highlight(highlight: &Highlight) -> String {
    format!("- {} (Page: {})\n", highlight.text, highlight.page)
}
