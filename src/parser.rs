use crate::models::{BookGroup, Highlight};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

const UTF8_BOM: char = '\u{feff}';
const SEPARATOR: &str = "==========";

static METADATA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Your Highlight.*page ([0-9]+) .*location ([0-9-]+) \| Added on (.*)")
        .expect("metadata pattern is valid")
});

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read clippings file {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, PartialEq)]
enum Line<'a> {
    Title { title: &'a str, author: &'a str },
    Metadata { page: &'a str, location: &'a str, date: &'a str },
    Content(&'a str),
    Skip,
}

pub fn parse_clippings(path: &Path) -> Result<Vec<Highlight>, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;

    let highlights = parse_lines(content.lines());
    tracing::debug!(
        path = %path.display(),
        count = highlights.len(),
        "parsed clippings"
    );

    Ok(highlights)
}

/// Rebuilds highlight records from clipping lines.
///
/// Title and metadata lines fill in the record being built; the next content
/// line completes it. Records never need all three parts, so partial input
/// yields partial records rather than errors.
pub fn parse_lines<'a, I>(lines: I) -> Vec<Highlight>
where
    I: IntoIterator<Item = &'a str>,
{
    let (highlights, _) = lines.into_iter().fold(
        (Vec::new(), Highlight::default()),
        |(mut highlights, mut current), line| {
            match classify(line) {
                Line::Title { title, author } => {
                    current.title = title.to_string();
                    current.author = author.to_string();
                }
                Line::Metadata {
                    page,
                    location,
                    date,
                } => {
                    current.page = page.to_string();
                    current.location = location.to_string();
                    current.date = date.to_string();
                }
                Line::Content(text) => {
                    current.text = text.to_string();
                    highlights.push(std::mem::take(&mut current));
                }
                Line::Skip => {}
            }
            (highlights, current)
        },
    );

    highlights
}

fn classify(line: &str) -> Line<'_> {
    if let Some((title, author)) = split_title_line(line) {
        let title = title.strip_prefix(UTF8_BOM).unwrap_or(title);
        return Line::Title { title, author };
    }

    if let Some(caps) = METADATA_RE.captures(line) {
        let group = |i| caps.get(i).map_or("", |m| m.as_str());
        return Line::Metadata {
            page: group(1),
            location: group(2),
            date: group(3),
        };
    }

    if !line.is_empty() && !line.starts_with(SEPARATOR) {
        return Line::Content(line);
    }

    Line::Skip
}

/// Splits `Title (Author)` at the last ` (` before the closing parenthesis,
/// so parentheses inside the title stay part of it.
fn split_title_line(line: &str) -> Option<(&str, &str)> {
    let body = line.strip_suffix(')')?;
    let open = body.rfind(" (")?;
    Some((&body[..open], &body[open + 2..]))
}

pub fn group_by_book(highlights: &[Highlight]) -> Vec<BookGroup> {
    let mut books: Vec<BookGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for highlight in highlights {
        let slot = *index.entry(highlight.title.as_str()).or_insert_with(|| {
            books.push(BookGroup {
                title: highlight.title.clone(),
                author: String::new(),
                highlights: Vec::new(),
                expanded: false,
            });
            books.len() - 1
        });

        let book = &mut books[slot];
        book.author = highlight.author.clone();
        book.highlights.push(highlight.clone());
    }

    books
}
