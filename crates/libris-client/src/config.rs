//! Client configuration.

use std::time::Duration;

use url::Url;

use crate::error::{ApiError, ApiResult};

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/v1/";
/// Default Google Books API base URL.
pub const DEFAULT_GOOGLE_BOOKS_URL: &str = "https://www.googleapis.com/books/v1/";
/// Default Open Library base URL.
pub const DEFAULT_OPEN_LIBRARY_URL: &str = "https://openlibrary.org/";
/// Default Open Library covers CDN base URL.
pub const DEFAULT_COVERS_URL: &str = "https://covers.openlibrary.org/";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(7);

/// Configuration shared by the gateway and the catalog client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend API base URL (default: `http://127.0.0.1:8000/api/v1/`).
    pub base_url: Url,

    /// Timeout applied to every individual HTTP call (default: 7 seconds).
    pub timeout: Duration,

    /// Google Books API base URL.
    pub google_books_url: Url,

    /// Open Library search base URL.
    pub open_library_url: Url,

    /// Open Library covers CDN base URL.
    pub covers_url: Url,
}

impl ClientConfig {
    /// Creates a configuration with the default backend, catalogs and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if a built-in URL fails to parse.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            base_url: parse_url(DEFAULT_BASE_URL)?,
            timeout: DEFAULT_TIMEOUT,
            google_books_url: parse_url(DEFAULT_GOOGLE_BOOKS_URL)?,
            open_library_url: parse_url(DEFAULT_OPEN_LIBRARY_URL)?,
            covers_url: parse_url(DEFAULT_COVERS_URL)?,
        })
    }

    /// Creates a configuration pointing at the given backend.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `base_url` is not an absolute URL.
    pub fn for_server(base_url: &str) -> ApiResult<Self> {
        Ok(Self::new()?.with_base_url(parse_url(base_url)?))
    }

    /// Sets the backend base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = with_trailing_slash(url);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the Google Books API base URL.
    #[must_use]
    pub fn with_google_books_url(mut self, url: Url) -> Self {
        self.google_books_url = with_trailing_slash(url);
        self
    }

    /// Sets the Open Library base URL.
    #[must_use]
    pub fn with_open_library_url(mut self, url: Url) -> Self {
        self.open_library_url = with_trailing_slash(url);
        self
    }

    /// Sets the covers CDN base URL.
    #[must_use]
    pub fn with_covers_url(mut self, url: Url) -> Self {
        self.covers_url = with_trailing_slash(url);
        self
    }
}

/// Parses an absolute URL, normalizing it to end with `/`.
pub fn parse_url(raw: &str) -> ApiResult<Url> {
    Url::parse(raw)
        .map(with_trailing_slash)
        .map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new().unwrap();
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.google_books_url.as_str(), DEFAULT_GOOGLE_BOOKS_URL);
        assert_eq!(config.open_library_url.as_str(), DEFAULT_OPEN_LIBRARY_URL);
        assert_eq!(config.timeout, Duration::from_secs(7));
        assert_eq!(config.covers_url.as_str(), DEFAULT_COVERS_URL);
    }

    #[test]
    fn test_for_server_adds_trailing_slash() {
        let config = ClientConfig::for_server("https://books.example.com/api/v1").unwrap();
        assert_eq!(config.base_url.as_str(), "https://books.example.com/api/v1/");
    }

    #[test]
    fn test_for_server_rejects_relative() {
        assert!(matches!(
            ClientConfig::for_server("api/v1"),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}
