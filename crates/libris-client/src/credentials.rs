//! Credential storage.
//!
//! The gateway reads the access and refresh tokens from a [`CredentialStore`]
//! on every request and writes them back when a refresh succeeds or fails.
//! Stores are plain string key-value maps with well-known keys so that other
//! preferences (such as the UI theme) can live next to the tokens.
//!
//! Two implementations are provided:
//!
//! - [`MemoryCredentialStore`] - process-local, used by tests and embedders
//! - [`FileCredentialStore`] - JSON file under `~/.libris`, re-read on every
//!   access so that writes made by another process are observed immediately

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Key holding the short-lived access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Key holding the long-lived refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Key holding the UI theme preference.
pub const THEME_KEY: &str = "theme";

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by credential stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("Credential store I/O error at {path}: {source}")]
    Io {
        /// Path of the backing file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The backing file does not contain a valid JSON object of strings.
    #[error("Credential store at {path} is corrupt: {message}")]
    Serialization {
        /// Path of the backing file.
        path: PathBuf,
        /// Description of the parse failure.
        message: String,
    },

    /// The user's home directory cannot be determined.
    #[error("Cannot determine home directory")]
    HomeDirUnavailable,
}

/// Access/refresh token pair issued by the login endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived bearer token.
    pub access: String,
    /// Long-lived token exchanged for new access tokens.
    pub refresh: String,
}

/// A reload-durable key-value store for credentials and preferences.
///
/// Implementations must be safe to share between concurrently running
/// requests. Reads must reflect the latest write, including writes made
/// outside this process where the backing medium allows it.
pub trait CredentialStore: Send + Sync {
    /// Reads a value.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;

    fn access_token(&self) -> StoreResult<Option<String>> {
        self.get(ACCESS_TOKEN_KEY)
    }

    fn refresh_token(&self) -> StoreResult<Option<String>> {
        self.get(REFRESH_TOKEN_KEY)
    }

    fn set_access_token(&self, token: &str) -> StoreResult<()> {
        self.set(ACCESS_TOKEN_KEY, token)
    }

    /// Persists both tokens of a freshly issued pair.
    fn save_tokens(&self, tokens: &TokenPair) -> StoreResult<()> {
        self.set(ACCESS_TOKEN_KEY, &tokens.access)?;
        self.set(REFRESH_TOKEN_KEY, &tokens.refresh)
    }

    fn clear_access_token(&self) -> StoreResult<()> {
        self.remove(ACCESS_TOKEN_KEY)
    }

    /// Removes both tokens, leaving other preferences untouched.
    fn clear_tokens(&self) -> StoreResult<()> {
        self.remove(ACCESS_TOKEN_KEY)?;
        self.remove(REFRESH_TOKEN_KEY)
    }
}

/// In-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with a token pair.
    #[must_use]
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        let mut values = BTreeMap::new();
        if let Some(access) = access {
            values.insert(ACCESS_TOKEN_KEY.to_string(), access.to_string());
        }
        if let Some(refresh) = refresh {
            values.insert(REFRESH_TOKEN_KEY.to_string(), refresh.to_string());
        }
        Self {
            values: RwLock::new(values),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

/// Credential store backed by a JSON file.
///
/// The file holds a flat object of string values. It is read on every access
/// and replaced on every change, so two stores (or two processes) pointing
/// at the same path see each other's writes on their next read.
///
/// Changes are written to a sibling temporary file that is then renamed over
/// the target, so a reader never observes a truncated or half-written file.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Uses the given file as backing storage.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Uses `~/.libris/state.<profile>.json`.
    pub fn for_profile(profile: &str) -> StoreResult<Self> {
        let dir = dirs::home_dir()
            .ok_or(StoreError::HomeDirUnavailable)?
            .join(".libris");
        Ok(Self::at(dir.join(format!("state.{profile}.json"))))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoreResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| StoreError::Serialization {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> StoreResult<()> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_err)?;
        let content = serde_json::to_string_pretty(values).map_err(|e| {
            StoreError::Serialization {
                path: self.path.clone(),
                message: e.to_string(),
            }
        })?;

        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        staged.write_all(content.as_bytes()).map_err(io_err)?;
        staged.as_file().sync_all().map_err(io_err)?;
        staged
            .persist(&self.path)
            .map_err(|e| io_err(e.error))?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> StoreResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.load()?;
        apply(&mut values);
        self.persist(&values)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|values| {
            values.remove(key);
        })
    }
}
