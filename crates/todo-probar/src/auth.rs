//! Auth token provider.
//!
//! Login is performed once and the token written to a file, so that suites
//! running in separate processes can share one authenticated session.

use crate::client::ToDoClient;
use crate::config::Credentials;
use crate::model::LoginResponse;
use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Opaque bearer token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    token: String,
}

impl AuthToken {
    /// Wrap a raw token string
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// The raw bearer value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// First characters of the token, safe to log
    #[must_use]
    pub fn preview(&self) -> String {
        let head: String = self.token.chars().take(20).collect();
        format!("{head}...")
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AuthToken").field(&self.preview()).finish()
    }
}

/// File-backed token storage (`{"token": "..."}`).
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Store backed by the given file
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the token, creating the parent directory if needed.
    pub fn save(&self, token: &AuthToken) -> ProbeResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string(token)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Load a previously persisted token.
    ///
    /// Every failure maps to [`ProbeError::TokenUnavailable`] so callers can
    /// tell "run login first" apart from network trouble.
    pub fn load(&self) -> ProbeResult<AuthToken> {
        if !self.path.exists() {
            return Err(ProbeError::token_unavailable(
                &self.path,
                format!("Auth file not found at: {}", self.path.display()),
            ));
        }
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| ProbeError::token_unavailable(&self.path, e.to_string()))?;
        let stored: StoredToken = serde_json::from_str(&raw)
            .map_err(|e| ProbeError::token_unavailable(&self.path, e.to_string()))?;
        match stored.token {
            Some(token) if !token.is_empty() => Ok(AuthToken::new(token)),
            _ => Err(ProbeError::token_unavailable(
                &self.path,
                "Token not found in auth file",
            )),
        }
    }
}

#[derive(Deserialize)]
struct StoredToken {
    #[serde(default)]
    token: Option<String>,
}

/// Log in once and return the issued token.
///
/// Fails unless the service answers 200 with a non-empty `token`.
pub async fn login(client: &ToDoClient, credentials: &Credentials) -> ProbeResult<AuthToken> {
    let response = client.login(credentials).await?;
    if response.status != 200 {
        return Err(ProbeError::LoginFailed {
            status: response.status,
            message: crate::assertion::truncate(&response.body, 200),
        });
    }
    let parsed: LoginResponse = response.json().map_err(|e| ProbeError::LoginFailed {
        status: response.status,
        message: e.to_string(),
    })?;
    match parsed.token {
        Some(token) if !token.is_empty() => Ok(AuthToken::new(token)),
        _ => Err(ProbeError::LoginFailed {
            status: response.status,
            message: "No authentication token received from login response".to_string(),
        }),
    }
}

/// Log in and persist the token to `store`.
pub async fn login_and_store(
    client: &ToDoClient,
    credentials: &Credentials,
    store: &TokenStore,
) -> ProbeResult<AuthToken> {
    tracing::info!(base_url = client.base_url(), "starting authentication setup");
    let token = login(client, credentials).await?;
    store.save(&token)?;
    tracing::info!(
        path = %store.path().display(),
        token = %token.preview(),
        "authentication setup completed, token saved"
    );
    Ok(token)
}
