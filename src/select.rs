use crate::models::{BookGroup, Highlight, Selection};
use chrono::{NaiveDate, NaiveDateTime};

/// Kindle writes the "Added on" stamp in the device locale.
const ADDED_ON_FORMATS: &[&str] = &[
    "%A, %d %B %Y %H:%M:%S",
    "%A, %B %d, %Y %I:%M:%S %p",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    pub book: Option<String>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

pub fn select(books: &[BookGroup], selector: &Selector) -> Selection {
    let needle = selector.book.as_deref().map(str::to_lowercase);
    let mut selection = Selection::new();

    for book in books {
        if book.title.is_empty() {
            tracing::warn!(count = book.highlights.len(), "skipping highlights without a book title");
            continue;
        }

        if let Some(needle) = &needle {
            if !book.title.to_lowercase().contains(needle.as_str()) {
                continue;
            }
        }

        let highlights = match selector.date_range {
            Some((from, to)) => filter_by_date(&book.highlights, from, to),
            None => book.highlights.clone(),
        };

        if highlights.is_empty() {
            tracing::debug!(title = %book.title, "no highlights left after filtering");
            continue;
        }

        selection
            .entry(book.title.clone())
            .or_default()
            .extend(highlights);
    }

    selection
}

pub fn filter_by_date(highlights: &[Highlight], from: NaiveDate, to: NaiveDate) -> Vec<Highlight> {
    highlights
        .iter()
        .filter(|h| match parse_added_on(&h.date) {
            Some(added) => {
                let date = added.date();
                date >= from && date <= to
            }
            None => false,
        })
        .cloned()
        .collect()
}

pub fn parse_added_on(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ADDED_ON_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_highlight(title: &str, text: &str, added_on: &str) -> Highlight {
        Highlight {
            title: title.to_string(),
            author: "Test Author".to_string(),
            page: "1".to_string(),
            date: added_on.to_string(),
            text: text.to_string(),
            ..Highlight::default()
        }
    }

    fn make_book(title: &str, highlights: Vec<Highlight>) -> BookGroup {
        BookGroup {
            title: title.to_string(),
            author: "Test Author".to_string(),
            highlights,
            expanded: false,
        }
    }

    fn sample_books() -> Vec<BookGroup> {
        vec![
            make_book(
                "Sandworm",
                vec![
                    make_highlight("Sandworm", "Early", "Monday, 1 January 2024 10:00:00"),
                    make_highlight("Sandworm", "Late", "Wednesday, 3 January 2024 21:40:12"),
                ],
            ),
            make_book(
                "Modern Software Engineering",
                vec![make_highlight(
                    "Modern Software Engineering",
                    "Middle",
                    "Tuesday, 2 January 2024 09:15:00",
                )],
            ),
        ]
    }

    #[test]
    fn test_parse_added_on_day_first() {
        let parsed = parse_added_on("Monday, 1 January 2024 10:00:00").unwrap();

        assert_eq!(parsed.date(), date(2024, 1, 1));
        assert_eq!(parsed.format("%H:%M:%S").to_string(), "10:00:00");
    }

    #[test]
    fn test_parse_added_on_month_first() {
        let parsed = parse_added_on("Sunday, January 5, 2020 3:04:05 PM").unwrap();

        assert_eq!(parsed.date(), date(2020, 1, 5));
        assert_eq!(parsed.format("%H:%M:%S").to_string(), "15:04:05");
    }

    #[test]
    fn test_parse_added_on_rejects_garbage() {
        assert!(parse_added_on("").is_none());
        assert!(parse_added_on("yesterday").is_none());
    }

    #[test]
    fn test_select_everything_by_default() {
        let selection = select(&sample_books(), &Selector::default());

        assert_eq!(selection.len(), 2);
        assert_eq!(selection["Sandworm"].len(), 2);
        assert_eq!(selection["Modern Software Engineering"].len(), 1);
    }

    #[test]
    fn test_select_book_case_insensitive() {
        let selector = Selector {
            book: Some("sandWORM".to_string()),
            date_range: None,
        };

        let selection = select(&sample_books(), &selector);

        assert_eq!(selection.keys().collect::<Vec<_>>(), vec!["Sandworm"]);
    }

    #[test]
    fn test_select_date_range_drops_empty_books() {
        let selector = Selector {
            book: None,
            date_range: Some((date(2024, 1, 3), date(2024, 1, 3))),
        };

        let selection = select(&sample_books(), &selector);

        assert_eq!(selection.len(), 1);
        assert_eq!(selection["Sandworm"][0].text, "Late");
    }

    #[test]
    fn test_select_skips_untitled_highlights() {
        let mut books = sample_books();
        books.push(make_book("", vec![make_highlight("", "Orphan", "")]));

        let selection = select(&books, &Selector::default());

        assert_eq!(selection.len(), 2);
        assert!(!selection.contains_key(""));
    }

    #[test]
    fn test_filter_by_date_full_range() {
        let books = sample_books();

        let filtered = filter_by_date(&books[0].highlights, date(2024, 1, 1), date(2024, 1, 3));

        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_filter_by_date_skips_unparseable() {
        let highlights = vec![
            make_highlight("Dune", "No metadata", ""),
            make_highlight("Dune", "Dated", "Monday, 1 January 2024 10:00:00"),
        ];

        let filtered = filter_by_date(&highlights, date(2023, 1, 1), date(2025, 1, 1));

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].text, "Dated");
    }
}
