//! HTTP client for the ToDo REST resource.
//!
//! Every call returns the raw status and body. The client never retries and
//! never turns a status code into an error; only transport failures are
//! errors. Deciding what a status means is the caller's job.

use crate::config::Credentials;
use crate::model::{LoginRequest, ToDoPayload};
use crate::result::ProbeResult;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

/// Login endpoint
pub const LOGIN_PATH: &str = "/api/Auth/login";
/// Collection endpoint
pub const ITEMS_PATH: &str = "/api/ToDoItems";

/// A response with timing metadata.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
    /// Time until the full body was received.
    pub latency: Duration,
}

impl ApiResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> ProbeResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// 2xx status
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// 5xx status
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

/// Typed client for `/api/ToDoItems`.
#[derive(Clone)]
pub struct ToDoClient {
    base_url: String,
    client: reqwest::Client,
    token: Option<String>,
}

impl std::fmt::Debug for ToDoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToDoClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl ToDoClient {
    /// Create an unauthenticated client pointing at the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self::with_client(base_url, client)
    }

    /// Create a client with a custom reqwest client (for custom timeouts, TLS, etc.).
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            token: None,
        }
    }

    /// Attach a bearer token to every subsequent request.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// A copy of this client that sends no Authorization header.
    #[must_use]
    pub fn without_auth(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            token: None,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether requests carry a bearer token.
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// `POST /api/Auth/login`
    pub async fn login(&self, credentials: &Credentials) -> ProbeResult<ApiResponse> {
        let body = LoginRequest {
            email: &credentials.email,
            password: &credentials.password,
        };
        let request = self
            .client
            .post(self.url(LOGIN_PATH))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(&body);
        send(request).await
    }

    /// `POST /api/ToDoItems`
    pub async fn create(&self, payload: &ToDoPayload) -> ProbeResult<ApiResponse> {
        let request = self.request(reqwest::Method::POST, ITEMS_PATH).json(payload);
        send(request).await
    }

    /// `GET /api/ToDoItems/{id}`
    pub async fn get(&self, id: i64) -> ProbeResult<ApiResponse> {
        send(self.request(reqwest::Method::GET, &item_path(id))).await
    }

    /// `GET /api/ToDoItems`
    pub async fn list(&self) -> ProbeResult<ApiResponse> {
        send(self.request(reqwest::Method::GET, ITEMS_PATH)).await
    }

    /// `GET /api/ToDoItems/search?Title=...`
    pub async fn search(&self, title_term: &str) -> ProbeResult<ApiResponse> {
        let path = format!("{ITEMS_PATH}/search");
        let request = self
            .request(reqwest::Method::GET, &path)
            .query(&[("Title", title_term)]);
        send(request).await
    }

    /// `PUT /api/ToDoItems/{id}`
    pub async fn update(&self, id: i64, payload: &ToDoPayload) -> ProbeResult<ApiResponse> {
        let request = self
            .request(reqwest::Method::PUT, &item_path(id))
            .json(payload);
        send(request).await
    }

    /// `DELETE /api/ToDoItems/{id}`
    pub async fn delete(&self, id: i64) -> ProbeResult<ApiResponse> {
        send(self.request(reqwest::Method::DELETE, &item_path(id))).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }
}

fn item_path(id: i64) -> String {
    format!("{ITEMS_PATH}/{id}")
}

async fn send(request: reqwest::RequestBuilder) -> ProbeResult<ApiResponse> {
    let start = Instant::now();
    let resp = request.send().await?;
    let status = resp.status().as_u16();
    let body = resp.text().await?;
    Ok(ApiResponse {
        status,
        body,
        latency: start.elapsed(),
    })
}
