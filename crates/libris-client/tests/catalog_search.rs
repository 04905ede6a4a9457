//! Public catalog searches against mock Google Books and Open Library.

use libris_client::books::PLACEHOLDER_COVER;
use libris_client::{CatalogClient, ClientConfig};
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn catalog(server: &MockServer) -> CatalogClient {
    let base = |suffix: &str| Url::parse(&format!("{}/{suffix}", server.uri())).unwrap();
    let config = ClientConfig::new()
        .unwrap()
        .with_google_books_url(base("books/v1/"))
        .with_open_library_url(base("ol/"))
        .with_covers_url(base("covers/"));
    CatalogClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_google_search_normalizes_volumes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/books/v1/volumes"))
        .and(query_param("q", "rust programming"))
        .and(query_param("maxResults", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalItems": 2,
            "items": [
                {
                    "id": "abc",
                    "volumeInfo": {
                        "title": "Rust in Action",
                        "authors": ["Tim McNamara"],
                        "imageLinks": { "thumbnail": "http://img/abc" }
                    }
                },
                { "id": "def", "volumeInfo": {} }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let books = catalog(&server)
        .search_google("rust programming", Some(2))
        .await
        .unwrap();

    assert_eq!(books.len(), 2);
    assert_eq!(books[0].title, "Rust in Action");
    assert_eq!(books[0].thumbnail, "http://img/abc");
    assert_eq!(books[1].title, "Untitled");
    assert_eq!(books[1].thumbnail, PLACEHOLDER_COVER);
}

#[tokio::test]
async fn test_google_search_without_items_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/books/v1/volumes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "totalItems": 0 })))
        .mount(&server)
        .await;

    let books = catalog(&server).search_google("zzzz", None).await.unwrap();
    assert!(books.is_empty());
}

#[tokio::test]
async fn test_open_library_search_builds_cover_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ol/search.json"))
        .and(query_param("q", "dahl"))
        .and(query_param("limit", "15"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "numFound": 2,
            "docs": [
                {
                    "key": "/works/OL45804W",
                    "title": "Fantastic Mr Fox",
                    "author_name": ["Roald Dahl"],
                    "cover_i": 6498519
                },
                { "key": "/works/OL1W" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let books = catalog(&server).search_open_library("dahl", None).await.unwrap();

    assert_eq!(books[0].id, "/works/OL45804W");
    assert_eq!(
        books[0].thumbnail,
        format!("{}/covers/b/id/6498519-M.jpg", server.uri())
    );
    assert_eq!(books[1].title, "Untitled");
    assert_eq!(books[1].thumbnail, PLACEHOLDER_COVER);
}

#[tokio::test]
async fn test_catalog_never_sends_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/books/v1/volumes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    catalog(&server).search_google("dune", None).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_catalog_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ol/search.json"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = catalog(&server)
        .search_open_library("dune", Some(5))
        .await
        .unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(503));
}
