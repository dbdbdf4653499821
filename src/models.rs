use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highlight {
    pub title: String,
    pub author: String,
    pub page: String,
    pub location: String,
    pub date: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookGroup {
    pub title: String,
    pub author: String,
    pub highlights: Vec<Highlight>,
    pub expanded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub book_title: String,
    pub new_count: usize,
    pub skipped_count: usize,
    pub total_count: usize,
}

/// Highlights chosen for export, keyed by book title.
pub type Selection = BTreeMap<String, Vec<Highlight>>;
