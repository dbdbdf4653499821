use kindle_notes::config::Config;
use kindle_notes::exporter::Exporter;
use kindle_notes::models::{BookGroup, ExportResult};
use kindle_notes::{logging, parser, select};

fn main() {
    if let Err(e) = logging::init() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let highlights = match parser::parse_clippings(&config.clippings_path) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let books = parser::group_by_book(&highlights);

    if config.list_only {
        print_books(&books);
        return;
    }

    let selection = select::select(&books, &config.selector);
    if selection.is_empty() {
        println!("No highlights matched the selection.");
        return;
    }

    let exporter = Exporter::new(&config.notes);
    match exporter.export_highlights(&selection) {
        Ok(results) => print_results(&results),
        Err(failure) => {
            print_results(&failure.completed);
            eprintln!("Error: {}", failure);
            std::process::exit(1);
        }
    }
}

fn print_books(books: &[BookGroup]) {
    for book in books {
        println!(
            "{} ({}) - {} highlights",
            book.title,
            book.author,
            book.highlights.len()
        );
    }
}

fn print_results(results: &[ExportResult]) {
    for result in results {
        println!(
            "{}: {} new, {} skipped ({} total)",
            result.book_title, result.new_count, result.skipped_count, result.total_count
        );
    }
}
