//! Authenticated request gateway.
//!
//! [`Gateway::dispatch`] is the only way the rest of the client talks to the
//! backend. For every request it:
//!
//! 1. attaches the stored access token as a bearer credential (except for
//!    the login and refresh endpoints),
//! 2. executes the request through the [`Transport`],
//! 3. on an HTTP 401, exchanges the refresh token for a new access token and
//!    replays the request exactly once.
//!
//! # Single-flight refresh
//!
//! When several requests fail with 401 at the same time only one of them
//! (the *leader*) calls the refresh endpoint. The others register a waiter
//! and are handed the leader's outcome: the new token, with which they
//! replay themselves, or a failure sentinel, on which they reject with their
//! own original 401.
//!
//! The decision to refresh and the `Idle -> RefreshInFlight` transition are
//! made under a single lock acquisition, so two failing requests can never
//! both become leaders. The lock is never held across an `.await`.
//!
//! # Failure semantics
//!
//! - Transport errors and non-401 statuses propagate unchanged.
//! - A request that was already replayed is never refreshed again.
//! - No refresh token: the access token is dropped and the 401 propagates.
//! - Refresh failure: both tokens are dropped, waiters reject with their own
//!   401, and the leader returns [`ApiError::RefreshFailed`].

use std::mem;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::{ApiError, ApiResult};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

/// Path of the token refresh endpoint, relative to the backend base URL.
pub const REFRESH_PATH: &str = "users/token/refresh/";

/// Observable state of the refresh protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    /// No refresh is running.
    Idle,
    /// A refresh call is outstanding; `queued` requests wait for its outcome.
    RefreshInFlight { queued: usize },
}

type Waiter = oneshot::Sender<Option<String>>;

enum RefreshState {
    Idle,
    InFlight { waiters: Vec<Waiter> },
}

/// What a request that hit a 401 has to do next.
enum Ticket<'a> {
    Lead(RefreshGuard<'a>),
    Wait(oneshot::Receiver<Option<String>>),
}

/// Owns the `InFlight` state for the duration of one refresh call.
///
/// Publishing hands the outcome to every waiter in registration order and
/// returns the gateway to `Idle`. Dropping the guard unpublished (the leading
/// future was cancelled or panicked) publishes the failure sentinel.
struct RefreshGuard<'a> {
    state: &'a Mutex<RefreshState>,
    published: bool,
}

impl RefreshGuard<'_> {
    fn publish(mut self, token: Option<String>) {
        self.release(token);
    }

    fn release(&mut self, token: Option<String>) {
        if self.published {
            return;
        }
        self.published = true;

        let waiters = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::InFlight { waiters } => waiters,
                RefreshState::Idle => Vec::new(),
            }
        };

        tracing::debug!(
            waiters = waiters.len(),
            refreshed = token.is_some(),
            "publishing refresh outcome"
        );
        for waiter in waiters {
            // The receiving request may have been dropped; nothing to do then.
            let _ = waiter.send(token.clone());
        }
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.release(None);
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: Option<String>,
}

/// Wraps backend calls with credential attachment and token refresh.
pub struct Gateway {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    refresh: Mutex<RefreshState>,
}

impl Gateway {
    /// Creates a gateway over an arbitrary transport.
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            transport,
            store,
            refresh: Mutex::new(RefreshState::Idle),
        }
    }

    /// Creates a gateway talking HTTP to the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn http(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> ApiResult<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), store))
    }

    /// The credential store this gateway reads tokens from.
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Current state of the refresh protocol.
    pub fn state(&self) -> GatewayState {
        let state = self.refresh.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            RefreshState::Idle => GatewayState::Idle,
            RefreshState::InFlight { waiters } => GatewayState::RefreshInFlight {
                queued: waiters.len(),
            },
        }
    }

    /// Sends a request with the stored credentials, refreshing them once on
    /// an authentication failure.
    ///
    /// Resolves with the response of the original request or of its single
    /// replay. Non-success statuses are returned as [`ApiError::Status`].
    ///
    /// # Errors
    ///
    /// - [`ApiError::Timeout`] / [`ApiError::Network`] when no response was received
    /// - [`ApiError::Status`] for any non-success status that could not be
    ///   resolved by refreshing (including the original 401)
    /// - [`ApiError::RefreshFailed`] when this request led a refresh that failed
    /// - [`ApiError::Store`] when the refresh token could not be read
    pub async fn dispatch(&self, mut request: ApiRequest) -> ApiResult<ApiResponse> {
        self.attach_credentials(&mut request);
        match self.execute(&request).await {
            Ok(response) => Ok(response),
            Err(error) => self.recover(request, error).await,
        }
    }

    fn attach_credentials(&self, request: &mut ApiRequest) {
        if request.is_auth_endpoint() {
            request.bearer = None;
            return;
        }
        match self.store.access_token() {
            Ok(Some(token)) => request.bearer = Some(token),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, path = %request.path, "cannot read access token, sending request unauthenticated");
            }
        }
    }

    async fn execute(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        self.transport.send(request).await?.error_for_status()
    }

    async fn recover(&self, request: ApiRequest, error: ApiError) -> ApiResult<ApiResponse> {
        if request.retried || !error.is_unauthorized() {
            return Err(error);
        }

        let Some(refresh_token) = self.store.refresh_token()? else {
            tracing::debug!(path = %request.path, "401 without refresh token, dropping access token");
            if let Err(e) = self.store.clear_access_token() {
                tracing::warn!(error = %e, "failed to clear access token");
            }
            return Err(error);
        };

        match self.begin_refresh() {
            Ticket::Wait(outcome) => {
                tracing::debug!(path = %request.path, "refresh in flight, queueing request");
                match outcome.await {
                    Ok(Some(token)) => self.replay(request, token).await,
                    // Failure sentinel, or the leader went away without publishing.
                    _ => Err(error),
                }
            }
            Ticket::Lead(guard) => {
                tracing::info!(path = %request.path, "access token rejected, refreshing");
                match self.refresh_access_token(&refresh_token).await {
                    Ok(token) => {
                        tracing::info!("token refresh succeeded");
                        guard.publish(Some(token.clone()));
                        self.replay(request, token).await
                    }
                    Err(refresh_error) => {
                        tracing::warn!(error = %refresh_error, "token refresh failed, clearing credentials");
                        if let Err(e) = self.store.clear_tokens() {
                            tracing::warn!(error = %e, "failed to clear credentials");
                        }
                        guard.publish(None);
                        Err(ApiError::RefreshFailed(Box::new(refresh_error)))
                    }
                }
            }
        }
    }

    /// Joins the in-flight refresh or becomes its leader, atomically.
    fn begin_refresh(&self) -> Ticket<'_> {
        let mut state = self.refresh.lock().unwrap_or_else(PoisonError::into_inner);
        if let RefreshState::InFlight { waiters } = &mut *state {
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            return Ticket::Wait(rx);
        }
        *state = RefreshState::InFlight {
            waiters: Vec::new(),
        };
        Ticket::Lead(RefreshGuard {
            state: &self.refresh,
            published: false,
        })
    }

    /// Calls the refresh endpoint directly on the transport, bypassing
    /// credential attachment, and persists the new access token.
    async fn refresh_access_token(&self, refresh_token: &str) -> ApiResult<String> {
        let request = ApiRequest::post(REFRESH_PATH).with_json(json!({ "refresh": refresh_token }));
        let response = self.execute(&request).await?;
        let access = response
            .json::<RefreshResponse>()?
            .access
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::MissingAccessToken)?;
        self.store.set_access_token(&access)?;
        Ok(access)
    }

    async fn replay(&self, mut request: ApiRequest, token: String) -> ApiResult<ApiResponse> {
        request.retried = true;
        request.bearer = Some(token);
        self.execute(&request).await
    }
}
