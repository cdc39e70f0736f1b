//! Session/context manager.
//!
//! A [`Session`] bundles the configuration, the loaded token and an
//! authenticated client. It is created before a suite runs and closed after;
//! clones share the same read-only state.

use crate::auth::{AuthToken, TokenStore};
use crate::client::ToDoClient;
use crate::config::HarnessConfig;
use crate::result::ProbeResult;
use std::sync::Arc;

/// Read-only context shared by every scenario in a run.
#[derive(Debug, Clone)]
pub struct Session {
    config: Arc<HarnessConfig>,
    token: AuthToken,
    client: ToDoClient,
}

impl Session {
    /// Open a session using the token persisted by a previous login.
    ///
    /// Fails before any request is made if the token file is missing.
    pub fn open(config: HarnessConfig) -> ProbeResult<Self> {
        let token = TokenStore::new(&config.token_path).load()?;
        tracing::info!(base_url = %config.base_url, "using saved authentication token");
        Self::with_token(config, token)
    }

    /// Open a session around an already obtained token.
    pub fn with_token(config: HarnessConfig, token: AuthToken) -> ProbeResult<Self> {
        let http = config.http_client()?;
        let client = ToDoClient::with_client(&config.base_url, http).with_token(token.as_str());
        Ok(Self {
            config: Arc::new(config),
            token,
            client,
        })
    }

    /// Authenticated client
    #[must_use]
    pub const fn client(&self) -> &ToDoClient {
        &self.client
    }

    /// Run configuration
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Bearer token of this session
    #[must_use]
    pub const fn token(&self) -> &AuthToken {
        &self.token
    }

    /// Release the session.
    pub fn close(self, suite: &str) {
        tracing::info!(suite, "API context disposed");
    }
}
