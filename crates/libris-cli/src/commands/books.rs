use anyhow::Result;
use libris_client::{BackendClient, Book, BookOfTheDay, HomeFeed, LibraryEntry};
use serde_json::json;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::{HomeSection, OutputFormat};
use crate::output::{print_books, print_heading, print_serialized, print_value};

fn section(feed: &HomeFeed, section: HomeSection) -> &[Book] {
    match section {
        HomeSection::Carousel => &feed.carousel,
        HomeSection::Recent => &feed.recent,
        HomeSection::Bestsellers => &feed.bestsellers,
        HomeSection::Recommended => &feed.recommended,
    }
}

fn section_title(section: HomeSection) -> &'static str {
    match section {
        HomeSection::Carousel => "Featured",
        HomeSection::Recent => "Recently added",
        HomeSection::Bestsellers => "Bestsellers",
        HomeSection::Recommended => "Recommended for you",
    }
}

pub async fn home(
    client: &BackendClient,
    only: Option<HomeSection>,
    format: OutputFormat,
) -> Result<()> {
    let feed = client.home().await?;

    if let Some(only) = only {
        return print_books(section(&feed, only), format);
    }
    if format != OutputFormat::Table {
        return print_serialized(&feed, format);
    }

    for (i, s) in [
        HomeSection::Carousel,
        HomeSection::Recent,
        HomeSection::Bestsellers,
        HomeSection::Recommended,
    ]
    .into_iter()
    .enumerate()
    {
        if i > 0 {
            println!();
        }
        print_heading(section_title(s));
        print_books(section(&feed, s), format)?;
    }
    Ok(())
}

pub async fn today(client: &BackendClient, format: OutputFormat) -> Result<()> {
    let pick = client.book_of_the_day().await?;
    if format != OutputFormat::Table {
        return print_serialized(&pick, format);
    }
    print_heading("Book of the Day");
    println!("{}", pick_line(&pick));
    println!();
    println!("{}", pick.summary);
    Ok(())
}

fn pick_line(pick: &BookOfTheDay) -> String {
    match &pick.book {
        Some(book) if book.authors.is_empty() => book.title.clone(),
        Some(book) => format!("{} by {}", book.title, book.authors.join(", ")),
        None => "No book".to_string(),
    }
}

pub async fn book(client: &BackendClient, id: &str, format: OutputFormat) -> Result<()> {
    let detail = client.book_details(id).await?;
    if format != OutputFormat::Table {
        return print_serialized(&detail, format);
    }

    print_heading(&detail.title);
    print_value(
        &json!({
            "id": detail.google_id.as_deref().unwrap_or(id),
            "authors": detail.authors,
            "published": detail.published_date,
            "categories": detail.categories,
            "cover": detail.cover(),
        }),
        format,
    )?;
    if let Some(synopsis) = detail.synopsis() {
        println!();
        println!("{synopsis}");
    }
    Ok(())
}

pub async fn summary(client: &BackendClient, id: &str, format: OutputFormat) -> Result<()> {
    let summary = client.summary(id).await?;
    if format == OutputFormat::Table {
        print_heading("Summary");
        println!("{summary}");
        return Ok(());
    }
    print_value(&json!({ "id": id, "summary": summary }), format)
}

pub async fn library(client: &BackendClient, format: OutputFormat) -> Result<()> {
    let entries = client.my_library().await?;
    if format != OutputFormat::Table {
        return print_serialized(&entries, format);
    }
    if entries.is_empty() {
        println!("Your library is empty.");
        return Ok(());
    }
    println!("{}", library_table(&entries));
    Ok(())
}

fn library_table(entries: &[LibraryEntry]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Title", "Status", "Favorite"]);
    for entry in entries {
        builder.push_record([
            entry.title().unwrap_or("-"),
            entry.status.as_deref().unwrap_or("-"),
            if entry.is_favorite { "★" } else { "" },
        ]);
    }
    builder.build().with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_library_table() {
        let entries: Vec<LibraryEntry> = serde_json::from_value(json!([
            {"book": {"title": "Dune"}, "status": "reading", "is_favorite": true},
            {"title": "Emma"}
        ]))
        .unwrap();
        let table = library_table(&entries);
        assert!(table.contains("Dune"));
        assert!(table.contains("reading"));
        assert!(table.contains('★'));
        assert!(table.contains("Emma"));
    }

    #[test]
    fn test_pick_line() {
        let mut pick = BookOfTheDay {
            book: Some(Book {
                id: "g42".into(),
                title: "Piranesi".into(),
                authors: vec!["Susanna Clarke".into()],
                thumbnail: String::new(),
            }),
            summary: "A house of endless halls.".into(),
        };
        assert_eq!(pick_line(&pick), "Piranesi by Susanna Clarke");

        pick.book = None;
        assert_eq!(pick_line(&pick), "No book");
    }

    #[test]
    fn test_section_selection() {
        let book = |id: &str| Book {
            id: id.into(),
            title: id.into(),
            authors: vec![],
            thumbnail: String::new(),
        };
        let feed = HomeFeed {
            recent: vec![book("r1")],
            bestsellers: vec![book("b1"), book("b2")],
            ..Default::default()
        };
        assert_eq!(section(&feed, HomeSection::Recent)[0].id, "r1");
        assert_eq!(section(&feed, HomeSection::Bestsellers).len(), 2);
        assert!(section(&feed, HomeSection::Carousel).is_empty());
    }
}
