//! Typed bindings for the Libris backend.
//!
//! [`BackendClient`] maps each backend endpoint to a method. All calls go
//! through [`Gateway::dispatch`], so authenticated endpoints transparently
//! benefit from token refresh. Login and registration persist the issued
//! tokens in the gateway's credential store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::books::{BackendBook, Book, BookDetail};
use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, REFRESH_TOKEN_KEY, TokenPair};
use crate::error::{ApiError, ApiResult};
use crate::gateway::Gateway;
use crate::transport::ApiRequest;

pub const LOGIN_PATH: &str = "users/login/";
pub const VERIFY_OTP_PATH: &str = "users/verify-otp/";
pub const SEND_OTP_PATH: &str = "users/send-otp/";
pub const REGISTER_PATH: &str = "users/register/";
pub const HOME_PATH: &str = "/home/";
pub const ME_PATH: &str = "/users/me/";
pub const MY_LIBRARY_PATH: &str = "/interactions/my-library/";

/// Sections of the home feed, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HomeFeed {
    pub carousel: Vec<Book>,
    pub recent: Vec<Book>,
    pub bestsellers: Vec<Book>,
    pub recommended: Vec<Book>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct HomePayload {
    carousel: Option<Vec<BackendBook>>,
    recent: Option<Vec<BackendBook>>,
    bestsellers: Option<Vec<BackendBook>>,
    recommended: Option<Vec<BackendBook>>,
}

/// Shown when the daily pick has no summary.
pub const NO_SUMMARY: &str = "No summary available.";
/// Shown when the home feed has no recommendation to pick from.
pub const NO_RECOMMENDATION: &str = "No recommendation available.";

/// The first recommended book of the home feed, with its summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookOfTheDay {
    /// `None` when the feed has no recommendations.
    pub book: Option<Book>,
    pub summary: String,
}

/// Profile of the logged-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub id: Option<i64>,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// One entry of the user's saved library.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryEntry {
    pub user: Option<String>,
    pub book: Option<Value>,
    pub status: Option<String>,
    pub is_favorite: bool,
    /// Present when the backend returns bare books instead of interactions.
    pub title: Option<String>,
}

impl LibraryEntry {
    /// Title of the saved book, whichever shape the entry has.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().or_else(|| {
            self.book
                .as_ref()
                .and_then(|book| book.get("title"))
                .and_then(Value::as_str)
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LibraryPayload {
    Wrapped { library: Vec<LibraryEntry> },
    Bare(Vec<LibraryEntry>),
}

/// Account creation parameters.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    /// Falls back to `phone` when empty.
    pub username: Option<String>,
    pub name: Option<String>,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub password_confirmation: String,
}

impl Registration {
    fn payload(&self) -> Value {
        let username = self
            .username
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.phone);
        let mut payload = json!({
            "username": username,
            "user_name": username,
            "email": self.email,
            "phone": self.phone,
            "password": self.password,
            "password2": self.password_confirmation,
        });
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            payload["name"] = json!(name);
        }
        payload
    }
}

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The backend issued tokens right away; they have been stored.
    LoggedIn,
    /// The account exists; the user still has to log in.
    Created,
}

/// Client for the Libris backend.
#[derive(Clone)]
pub struct BackendClient {
    gateway: Arc<Gateway>,
}

impl BackendClient {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Builds an HTTP gateway for the configured backend and wraps it.
    pub fn connect(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> ApiResult<Self> {
        Ok(Self::new(Arc::new(Gateway::http(config, store)?)))
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    fn store(&self) -> &Arc<dyn CredentialStore> {
        self.gateway.store()
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.gateway.dispatch(ApiRequest::get(path)).await?.json()
    }

    async fn post_json(&self, path: &str, body: Value) -> ApiResult<Value> {
        self.gateway
            .dispatch(ApiRequest::post(path).with_json(body))
            .await?
            .json()
    }

    /// Logs in with username and password and stores the issued tokens.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<TokenPair> {
        let body = json!({ "username": username, "password": password });
        let tokens = parse_tokens(self.post_json(LOGIN_PATH, body).await?)?;
        self.store().save_tokens(&tokens)?;
        tracing::info!(%username, "logged in");
        Ok(tokens)
    }

    /// Logs in with a one-time password and stores the issued tokens.
    pub async fn login_with_otp(&self, phone: &str, otp: &str) -> ApiResult<TokenPair> {
        let body = json!({ "phone": phone, "otp": otp });
        let tokens = parse_tokens(self.post_json(VERIFY_OTP_PATH, body).await?)?;
        self.store().save_tokens(&tokens)?;
        tracing::info!(%phone, "logged in with OTP");
        Ok(tokens)
    }

    /// Asks the backend to text a one-time password to `phone`.
    ///
    /// Returns the backend's confirmation message.
    pub async fn send_otp(&self, phone: &str) -> ApiResult<String> {
        let value = self.post_json(SEND_OTP_PATH, json!({ "phone": phone })).await?;
        Ok(value
            .get("detail")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("OTP sent to {phone}")))
    }

    /// Creates an account. Tokens issued with the response are stored.
    pub async fn register(&self, registration: &Registration) -> ApiResult<RegistrationOutcome> {
        let value = self.post_json(REGISTER_PATH, registration.payload()).await?;
        let Value::Object(fields) = value else {
            return Err(ApiError::malformed("registration response is not an object"));
        };

        let Some(access) = string_field(&fields, "access") else {
            return Ok(RegistrationOutcome::Created);
        };
        self.store().set_access_token(&access)?;
        match string_field(&fields, "refresh") {
            Some(refresh) => self.store().set(REFRESH_TOKEN_KEY, &refresh)?,
            // A refresh token left by an earlier session belongs to another account.
            None => self.store().remove(REFRESH_TOKEN_KEY)?,
        }
        Ok(RegistrationOutcome::LoggedIn)
    }

    /// Forgets both tokens.
    pub fn logout(&self) -> ApiResult<()> {
        self.store().clear_tokens()?;
        Ok(())
    }

    /// Home feed with carousel, recent, bestseller and recommended books.
    pub async fn home(&self) -> ApiResult<HomeFeed> {
        let payload: Option<HomePayload> = self.get_json(HOME_PATH).await?;
        let payload = payload.unwrap_or_default();
        let normalize = |books: Option<Vec<BackendBook>>| -> Vec<Book> {
            books.unwrap_or_default().into_iter().map(Book::from).collect()
        };
        Ok(HomeFeed {
            carousel: normalize(payload.carousel),
            recent: normalize(payload.recent),
            bestsellers: normalize(payload.bestsellers),
            recommended: normalize(payload.recommended),
        })
    }

    /// Picks the first recommendation of the home feed and fetches its summary.
    ///
    /// A failing summary call degrades to [`NO_SUMMARY`]; only the home feed
    /// request itself can fail.
    pub async fn book_of_the_day(&self) -> ApiResult<BookOfTheDay> {
        let Some(book) = self.home().await?.recommended.into_iter().next() else {
            return Ok(BookOfTheDay {
                book: None,
                summary: NO_RECOMMENDATION.to_string(),
            });
        };
        let summary = match self.summary(&book.id).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::debug!(error = %e, book = %book.id, "no summary for book of the day");
                NO_SUMMARY.to_string()
            }
        };
        Ok(BookOfTheDay {
            book: Some(book),
            summary,
        })
    }

    /// Text summary of a book.
    pub async fn summary(&self, book_id: &str) -> ApiResult<String> {
        let value: Value = self.get_json(&format!("/summary/{}/", segment(book_id))).await?;
        value
            .get("summary")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::malformed("summary response has no `summary`"))
    }

    /// Detailed record of one book.
    pub async fn book_details(&self, book_id: &str) -> ApiResult<BookDetail> {
        self.get_json(&format!("/books/details/{}/", segment(book_id)))
            .await
    }

    /// Profile of the logged-in user.
    pub async fn me(&self) -> ApiResult<UserProfile> {
        self.get_json(ME_PATH).await
    }

    /// Books saved by the logged-in user.
    pub async fn my_library(&self) -> ApiResult<Vec<LibraryEntry>> {
        let payload: LibraryPayload = self.get_json(MY_LIBRARY_PATH).await?;
        Ok(match payload {
            LibraryPayload::Wrapped { library } => library,
            LibraryPayload::Bare(entries) => entries,
        })
    }
}

fn parse_tokens(value: Value) -> ApiResult<TokenPair> {
    let Value::Object(fields) = value else {
        return Err(ApiError::malformed("login response is not an object"));
    };
    match (string_field(&fields, "access"), string_field(&fields, "refresh")) {
        (Some(access), Some(refresh)) => Ok(TokenPair { access, refresh }),
        _ => Err(ApiError::malformed("login response is missing `access` or `refresh`")),
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Percent-encodes a single path segment.
fn segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
