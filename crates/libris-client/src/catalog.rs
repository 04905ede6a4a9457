//! Third-party book catalogs.
//!
//! Google Books and Open Library are public, read-only APIs. They are called
//! directly with a plain HTTP client: no credentials are attached and no
//! refresh logic applies.

use serde::Deserialize;
use url::Url;

use crate::books::{Book, GoogleVolume, OpenLibraryDoc, PLACEHOLDER_COVER};
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::transport::{build_http_client, map_reqwest_error};

/// Default number of Open Library results.
pub const DEFAULT_OPEN_LIBRARY_LIMIT: u32 = 15;

/// Open Library cover sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverSize {
    Small,
    Medium,
    Large,
}

impl CoverSize {
    fn suffix(self) -> &'static str {
        match self {
            Self::Small => "S",
            Self::Medium => "M",
            Self::Large => "L",
        }
    }
}

#[derive(Deserialize)]
struct VolumesPage {
    #[serde(default)]
    items: Vec<GoogleVolume>,
}

#[derive(Deserialize)]
struct SearchPage {
    #[serde(default)]
    docs: Vec<OpenLibraryDoc>,
}

/// Client for the public catalogs.
pub struct CatalogClient {
    http: reqwest::Client,
    google_books_url: Url,
    open_library_url: Url,
    covers_url: Url,
}

impl CatalogClient {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        Ok(Self {
            http: build_http_client(config)?,
            google_books_url: config.google_books_url.clone(),
            open_library_url: config.open_library_url.clone(),
            covers_url: config.covers_url.clone(),
        })
    }

    /// Searches Google Books volumes.
    pub async fn search_google(&self, query: &str, max_results: Option<u32>) -> ApiResult<Vec<Book>> {
        let url = join(&self.google_books_url, "volumes")?;
        let mut params = vec![("q", query.to_string())];
        if let Some(max) = max_results {
            params.push(("maxResults", max.to_string()));
        }
        let page: VolumesPage = self.get_json(url, &params).await?;
        Ok(page.items.into_iter().map(Book::from).collect())
    }

    /// Searches Open Library.
    pub async fn search_open_library(&self, query: &str, limit: Option<u32>) -> ApiResult<Vec<Book>> {
        let url = join(&self.open_library_url, "search.json")?;
        let limit = limit.unwrap_or(DEFAULT_OPEN_LIBRARY_LIMIT);
        let params = [("q", query.to_string()), ("limit", limit.to_string())];
        let page: SearchPage = self.get_json(url, &params).await?;
        Ok(page.docs.into_iter().map(|doc| self.open_library_book(doc)).collect())
    }

    /// URL of an Open Library cover image.
    pub fn cover_url(&self, cover_id: u64, size: CoverSize) -> String {
        format!(
            "{}b/id/{cover_id}-{}.jpg",
            self.covers_url.as_str(),
            size.suffix()
        )
    }

    fn open_library_book(&self, doc: OpenLibraryDoc) -> Book {
        let thumbnail = doc
            .cover_i
            .map(|id| self.cover_url(id, CoverSize::Medium))
            .unwrap_or_else(|| PLACEHOLDER_COVER.to_string());
        Book {
            title: doc.title.unwrap_or_else(|| "Untitled".to_string()),
            id: doc.key,
            authors: doc.author_name,
            thumbnail,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&str, String)],
    ) -> ApiResult<T> {
        let url_str = url.to_string();
        tracing::debug!(url = %url_str, "catalog search");
        let resp = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| map_reqwest_error(&url_str, e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| map_reqwest_error(&url_str, e))?;
        if !status.is_success() {
            return Err(ApiError::Status { status, body });
        }
        serde_json::from_str(&body).map_err(ApiError::decode)
    }
}

fn join(base: &Url, path: &str) -> ApiResult<Url> {
    base.join(path)
        .map_err(|e| ApiError::InvalidUrl(format!("{base}{path}: {e}")))
}
