//! Client library for the Libris book-discovery service.
//!
//! The centre of the crate is the [`Gateway`]: every backend call is routed
//! through it so that bearer credentials are attached, expired access tokens
//! are refreshed exactly once no matter how many requests fail together, and
//! requests that were waiting on that refresh are replayed with the new token.
//!
//! Around it sit:
//!
//! - [`credentials`] - reload-durable token storage
//! - [`api`] - typed backend endpoints ([`BackendClient`])
//! - [`catalog`] - public catalogs (Google Books, Open Library), unauthenticated
//! - [`books`] - normalization of the various book shapes into [`Book`]
//! - [`session`] - local inspection of the stored access token
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use libris_client::{BackendClient, ClientConfig, FileCredentialStore};
//!
//! let store = Arc::new(FileCredentialStore::for_profile("default")?);
//! let client = BackendClient::connect(&ClientConfig::new()?, store)?;
//!
//! client.login("ada", "s3cret").await?;
//! let feed = client.home().await?;
//! ```

pub mod api;
pub mod books;
pub mod catalog;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod session;
pub mod transport;

pub use api::{
    BackendClient, BookOfTheDay, HomeFeed, LibraryEntry, Registration, RegistrationOutcome,
    UserProfile,
};
pub use books::{Book, BookDetail};
pub use catalog::{CatalogClient, CoverSize};
pub use config::ClientConfig;
pub use credentials::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, StoreError, TokenPair,
};
pub use error::{ApiError, ApiResult};
pub use gateway::{Gateway, GatewayState};
pub use session::SessionStatus;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
