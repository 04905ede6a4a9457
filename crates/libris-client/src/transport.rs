//! Request descriptors and the HTTP transport underneath the gateway.
//!
//! The gateway never talks to `reqwest` directly: it hands an [`ApiRequest`]
//! to a [`Transport`] and gets an [`ApiResponse`] back for *any* HTTP status.
//! Only failures that produce no response at all (connection errors and
//! timeouts) are returned as errors, which is what lets the gateway tell an
//! authentication failure apart from a network failure.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};

/// An outbound request to the backend.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the backend base URL (leading `/` optional), or an
    /// absolute URL.
    pub path: String,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Bearer credential sent in the `Authorization` header.
    pub bearer: Option<String>,
    /// Set once the request has been replayed after a token refresh.
    pub retried: bool,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            bearer: None,
            retried: false,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Whether the request targets the login or token refresh endpoint.
    ///
    /// Such requests never carry a bearer credential.
    #[must_use]
    pub fn is_auth_endpoint(&self) -> bool {
        self.path.contains("token/refresh") || self.path.contains("users/login")
    }
}

/// A response received from the backend, whatever its status.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    /// Decodes the body as JSON. An empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        let body = if self.body.trim().is_empty() {
            "null"
        } else {
            self.body.as_str()
        };
        serde_json::from_str(body).map_err(ApiError::decode)
    }

    /// Converts a non-success response into [`ApiError::Status`].
    pub fn error_for_status(self) -> ApiResult<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(ApiError::Status {
                status: self.status,
                body: self.body,
            })
        }
    }
}

/// Executes requests on behalf of the gateway.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns the response for any HTTP status.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Timeout`] or [`ApiError::Network`] when no
    /// response was received.
    async fn send(&self, request: &ApiRequest) -> ApiResult<ApiResponse>;
}

/// [`Transport`] backed by a `reqwest` client.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Builds a transport for the configured backend and timeout.
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let http = build_http_client(config)?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    /// Resolves a request path against the base URL.
    ///
    /// `base/` joined with `/home/` gives `base/home/`; absolute URLs are
    /// used as-is.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        let url = self.resolve(&request.path);
        let mut req = self
            .http
            .request(request.method.clone(), &url)
            .header("Content-Type", "application/json");
        if let Some(token) = &request.bearer {
            req = req.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|e| map_reqwest_error(&url, e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| map_reqwest_error(&url, e))?;
        tracing::trace!(method = %request.method, %url, %status, "request completed");
        Ok(ApiResponse { status, body })
    }
}

pub(crate) fn build_http_client(config: &ClientConfig) -> ApiResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| ApiError::Network {
            url: config.base_url.to_string(),
            message: format!("failed to build HTTP client: {e}"),
        })
}

pub(crate) fn map_reqwest_error(url: &str, err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout {
            url: url.to_string(),
        }
    } else {
        ApiError::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> HttpTransport {
        let config = ClientConfig::for_server(base).unwrap();
        HttpTransport::new(&config).unwrap()
    }

    #[test]
    fn test_resolve_joins_slashes() {
        let t = transport("http://127.0.0.1:8000/api/v1/");
        assert_eq!(t.resolve("/home/"), "http://127.0.0.1:8000/api/v1/home/");
        assert_eq!(
            t.resolve("users/login/"),
            "http://127.0.0.1:8000/api/v1/users/login/"
        );
    }

    #[test]
    fn test_resolve_absolute_passthrough() {
        let t = transport("http://127.0.0.1:8000/api/v1/");
        assert_eq!(
            t.resolve("https://other.example.com/x"),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn test_request_builders() {
        let req = ApiRequest::post("users/send-otp/")
            .with_json(serde_json::json!({"phone": "5550100"}));
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.body.as_ref().unwrap()["phone"], "5550100");
        assert_eq!(req.bearer, None);
        assert!(!req.retried);

        let req = ApiRequest::get("/home/");
        assert_eq!(req.method, Method::GET);
        assert!(req.body.is_none());
    }

    #[test]
    fn test_auth_endpoint_detection() {
        assert!(ApiRequest::post("users/login/").is_auth_endpoint());
        assert!(ApiRequest::post("users/token/refresh/").is_auth_endpoint());
        assert!(!ApiRequest::get("/users/me/").is_auth_endpoint());
        assert!(!ApiRequest::post("users/verify-otp/").is_auth_endpoint());
    }

    #[test]
    fn test_error_for_status() {
        let ok = ApiResponse {
            status: StatusCode::OK,
            body: "{}".into(),
        };
        assert!(ok.error_for_status().is_ok());

        let unauthorized = ApiResponse {
            status: StatusCode::UNAUTHORIZED,
            body: r#"{"detail": "expired"}"#.into(),
        };
        let err = unauthorized.error_for_status().unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_empty_body_decodes_as_null() {
        let resp = ApiResponse {
            status: StatusCode::NO_CONTENT,
            body: String::new(),
        };
        let value: Value = resp.json().unwrap();
        assert!(value.is_null());
    }
}
