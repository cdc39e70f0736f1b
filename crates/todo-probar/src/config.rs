//! Harness configuration
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. Required values fail fast with a message naming the variable.

use crate::result::{ProbeError, ProbeResult};
use std::path::PathBuf;
use std::time::Duration;

/// Default location of the persisted token
pub const DEFAULT_TOKEN_PATH: &str = ".auth/token.json";

/// Login credentials for `POST /api/Auth/login`
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create credentials
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Configuration shared by every suite in a run
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Service base URL, without trailing slash
    pub base_url: String,
    /// Credentials, only needed by the login step
    pub credentials: Option<Credentials>,
    /// Where the token is persisted between processes
    pub token_path: PathBuf,
    /// Upper bound for one scenario (and for each HTTP request)
    pub test_timeout: Duration,
    /// Upper bound for one step
    pub step_timeout: Duration,
    /// Accept self-signed certificates (local HTTPS dev servers)
    pub accept_invalid_certs: bool,
}

impl HarnessConfig {
    /// Create a configuration with defaults for everything but the base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            test_timeout: Duration::from_secs(30),
            step_timeout: Duration::from_secs(5),
            accept_invalid_certs: true,
        }
    }

    /// Load configuration from the environment.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> ProbeResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> ProbeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ProbeError::config("BASE_URL is not defined in environment variables"))?;

        let mut config = Self::new(base_url);

        if let (Some(email), Some(password)) = (lookup("API_EMAIL"), lookup("API_PASSWORD")) {
            config.credentials = Some(Credentials::new(email, password));
        }
        if let Some(path) = lookup("TOKEN_PATH").filter(|v| !v.is_empty()) {
            config.token_path = PathBuf::from(path);
        }
        if let Some(ms) = parse_optional::<u64>(&lookup, "TEST_TIMEOUT_MS")? {
            config.test_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_optional::<u64>(&lookup, "STEP_TIMEOUT_MS")? {
            config.step_timeout = Duration::from_millis(ms);
        }
        if let Some(flag) = parse_optional::<bool>(&lookup, "ACCEPT_INVALID_CERTS")? {
            config.accept_invalid_certs = flag;
        }

        Ok(config)
    }

    /// Set credentials
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set token path
    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Set scenario timeout
    #[must_use]
    pub const fn with_test_timeout(mut self, timeout: Duration) -> Self {
        self.test_timeout = timeout;
        self
    }

    /// Set step timeout
    #[must_use]
    pub const fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Set certificate validation policy
    #[must_use]
    pub const fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Credentials, or a configuration error naming what is missing
    pub fn require_credentials(&self) -> ProbeResult<&Credentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| ProbeError::config("API_EMAIL and API_PASSWORD must be set for login"))
    }

    /// Build the HTTP client used by every request in the run
    pub fn http_client(&self) -> ProbeResult<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(self.test_timeout)
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()?;
        Ok(client)
    }
}

fn parse_optional<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> ProbeResult<Option<T>>
where
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ProbeError::config(format!("{key} has an invalid value: {raw}"))),
    }
}
