//! Book records and their normalization into a single display shape.
//!
//! The backend, Google Books and Open Library all describe books
//! differently. Everything the client renders goes through [`Book`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cover shown when a source has no thumbnail.
pub const PLACEHOLDER_COVER: &str = "https://via.placeholder.com/120x180?text=No+Cover";

/// Normalized book used for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub thumbnail: String,
}

/// Book as returned by the backend's listing endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BackendBook {
    pub google_id: Option<String>,
    pub id: Option<Value>,
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub thumbnail: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl From<BackendBook> for Book {
    fn from(book: BackendBook) -> Self {
        let id = non_empty(book.google_id)
            .or_else(|| book.id.as_ref().and_then(value_to_id))
            .or_else(|| non_empty(book.title.clone()))
            .unwrap_or_default();
        Self {
            id,
            title: book.title.unwrap_or_default(),
            authors: book.authors.unwrap_or_default(),
            thumbnail: non_empty(book.thumbnail)
                .or_else(|| non_empty(book.thumbnail_url))
                .unwrap_or_else(|| PLACEHOLDER_COVER.to_string()),
        }
    }
}

/// Detailed record from `books/details/{id}/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookDetail {
    pub google_id: Option<String>,
    pub title: String,
    pub authors: Vec<String>,
    pub published_date: Option<String>,
    pub categories: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
}

impl BookDetail {
    /// Cover to display, falling back to the placeholder.
    pub fn cover(&self) -> &str {
        self.thumbnail_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(PLACEHOLDER_COVER)
    }

    /// Longest description available.
    pub fn synopsis(&self) -> Option<&str> {
        self.description
            .as_deref()
            .or(self.short_description.as_deref())
            .filter(|text| !text.is_empty())
    }
}

/// Volume as returned by the Google Books API.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleVolume {
    pub id: String,
    #[serde(rename = "volumeInfo", default)]
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VolumeInfo {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub image_links: Option<ImageLinks>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImageLinks {
    pub thumbnail: Option<String>,
}

impl From<GoogleVolume> for Book {
    fn from(volume: GoogleVolume) -> Self {
        let info = volume.volume_info;
        Self {
            id: volume.id,
            title: non_empty(info.title).unwrap_or_else(|| "Untitled".to_string()),
            authors: info.authors.unwrap_or_default(),
            thumbnail: info
                .image_links
                .and_then(|links| non_empty(links.thumbnail))
                .unwrap_or_else(|| PLACEHOLDER_COVER.to_string()),
        }
    }
}

/// Search document as returned by Open Library.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OpenLibraryDoc {
    pub key: String,
    pub title: Option<String>,
    pub author_name: Vec<String>,
    pub cover_i: Option<u64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn backend(value: Value) -> Book {
        serde_json::from_value::<BackendBook>(value).unwrap().into()
    }

    #[test]
    fn test_backend_prefers_google_id() {
        let book = backend(json!({
            "google_id": "zyTCAlFPjgYC",
            "id": 12,
            "title": "The Google Story",
            "authors": ["David A. Vise"],
            "thumbnail": "http://books.google.com/cover.jpg"
        }));
        assert_eq!(book.id, "zyTCAlFPjgYC");
        assert_eq!(book.thumbnail, "http://books.google.com/cover.jpg");
    }

    #[test]
    fn test_backend_id_fallbacks() {
        assert_eq!(backend(json!({"id": 12, "title": "Dune"})).id, "12");
        assert_eq!(backend(json!({"title": "Dune"})).id, "Dune");
        assert_eq!(backend(json!({"google_id": "", "title": "Dune"})).id, "Dune");
    }

    #[test]
    fn test_backend_thumbnail_fallbacks() {
        let book = backend(json!({"title": "Dune", "thumbnail_url": "http://x/cover.jpg"}));
        assert_eq!(book.thumbnail, "http://x/cover.jpg");

        let book = backend(json!({"title": "Dune", "authors": null}));
        assert_eq!(book.thumbnail, PLACEHOLDER_COVER);
        assert!(book.authors.is_empty());
    }

    #[test]
    fn test_google_volume() {
        let volume: GoogleVolume = serde_json::from_value(json!({
            "id": "abc",
            "volumeInfo": {
                "title": "Rust in Action",
                "authors": ["Tim McNamara"],
                "imageLinks": {"thumbnail": "http://img/1"}
            }
        }))
        .unwrap();
        let book = Book::from(volume);
        assert_eq!(book.title, "Rust in Action");
        assert_eq!(book.thumbnail, "http://img/1");

        let bare: GoogleVolume = serde_json::from_value(json!({"id": "xyz"})).unwrap();
        let book = Book::from(bare);
        assert_eq!(book.title, "Untitled");
        assert_eq!(book.thumbnail, PLACEHOLDER_COVER);
    }

    #[test]
    fn test_detail_helpers() {
        let detail = BookDetail {
            short_description: Some("Short".into()),
            ..Default::default()
        };
        assert_eq!(detail.cover(), PLACEHOLDER_COVER);
        assert_eq!(detail.synopsis(), Some("Short"));
    }
}
