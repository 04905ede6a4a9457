use anyhow::{Context, Result};
use libris_client::CatalogClient;

use crate::cli::{CatalogSource, OutputFormat, SearchArgs};
use crate::output::print_books;

pub async fn search(catalog: &CatalogClient, args: &SearchArgs, format: OutputFormat) -> Result<()> {
    let query = args.query.trim();
    anyhow::ensure!(!query.is_empty(), "Search query must not be empty");

    let books = match args.source {
        CatalogSource::Google => catalog.search_google(query, args.limit).await,
        CatalogSource::OpenLibrary => catalog.search_open_library(query, args.limit).await,
    }
    .with_context(|| format!("Search for \"{query}\" failed"))?;

    tracing::debug!(count = books.len(), source = ?args.source, "catalog search finished");
    print_books(&books, format)
}
