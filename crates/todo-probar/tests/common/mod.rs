//! In-memory ToDo service for integration tests.
//!
//! Mirrors the live API closely enough for the suites: bearer auth on every
//! item route, 400 on empty titles, 404 on unknown ids, case-insensitive
//! title search. Fault switches let tests break deletes, updates and
//! validation, alter what a create echoes back, or slow down reads.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use axum::extract::{Path, Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use todo_probar::{AuthToken, Credentials, HarnessConfig, Session, ToDoItem, ToDoPayload};

pub const EMAIL: &str = "tester@example.com";
pub const PASSWORD: &str = "correct-horse";
pub const TOKEN: &str = "fake.jwt.token";

#[derive(Debug, Default)]
pub struct FakeService {
    items: Mutex<BTreeMap<i64, ToDoItem>>,
    next_id: AtomicI64,
    pub fail_deletes: AtomicBool,
    pub fail_updates: AtomicBool,
    pub read_delay_ms: AtomicU64,
    pub login_without_token: AtomicBool,
    pub alter_created_title: AtomicBool,
    pub accept_empty_title: AtomicBool,
    pub server_error_on_metacharacters: AtomicBool,
    pub allow_anonymous: AtomicBool,
    pub missing_items_found: AtomicBool,
}

impl FakeService {
    pub fn item_count(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn seed(&self, title: &str) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.items.lock().unwrap().insert(
            id,
            ToDoItem {
                id,
                title: title.to_string(),
                description: String::new(),
                is_completed: false,
            },
        );
        id
    }
}

pub struct Fake {
    pub url: String,
    pub service: Arc<FakeService>,
}

impl Fake {
    pub async fn start() -> Self {
        let service = Arc::new(FakeService::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::clone(&service));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            url: format!("http://{addr}"),
            service,
        }
    }

    pub fn config(&self) -> HarnessConfig {
        HarnessConfig::new(&self.url)
            .with_credentials(Credentials::new(EMAIL, PASSWORD))
            .with_test_timeout(Duration::from_secs(10))
            .with_step_timeout(Duration::from_secs(2))
            .with_accept_invalid_certs(false)
    }

    pub fn session(&self) -> Session {
        Session::with_token(self.config(), AuthToken::new(TOKEN)).unwrap()
    }
}

type Shared = Arc<FakeService>;

fn router(service: Shared) -> Router {
    Router::new()
        .route("/api/Auth/login", post(login))
        .route("/api/ToDoItems", get(list).post(create))
        .route("/api/ToDoItems/search", get(search))
        .route(
            "/api/ToDoItems/{id}",
            get(fetch).put(update).delete(remove),
        )
        .with_state(service)
}

fn authorized(service: &FakeService, headers: &HeaderMap) -> bool {
    if service.allow_anonymous.load(Ordering::SeqCst) {
        return true;
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn unauthorized() -> Response {
    StatusCode::UNAUTHORIZED.into_response()
}

fn not_found(id: i64) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "title": "Not Found", "detail": format!("ToDoItem {id} not found") })),
    )
        .into_response()
}

fn bad_title() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "title": "Validation failed", "errors": { "Title": ["Title is required"] } })),
    )
        .into_response()
}

async fn read_delay(service: &FakeService) {
    let ms = service.read_delay_ms.load(Ordering::SeqCst);
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(service): State<Shared>, Json(body): Json<LoginBody>) -> Response {
    if body.email != EMAIL || body.password != PASSWORD {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid credentials" })))
            .into_response();
    }
    if service.login_without_token.load(Ordering::SeqCst) {
        return Json(json!({ "token": "" })).into_response();
    }
    Json(json!({ "token": TOKEN })).into_response()
}

async fn list(State(service): State<Shared>, headers: HeaderMap) -> Response {
    if !authorized(&service, &headers) {
        return unauthorized();
    }
    read_delay(&service).await;
    let items: Vec<ToDoItem> = service.items.lock().unwrap().values().cloned().collect();
    Json(items).into_response()
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(rename = "Title", default)]
    title: String,
}

async fn search(
    State(service): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Response {
    if !authorized(&service, &headers) {
        return unauthorized();
    }
    let term = query.title.to_lowercase();
    let items: Vec<ToDoItem> = service
        .items
        .lock()
        .unwrap()
        .values()
        .filter(|item| item.title.to_lowercase().contains(&term))
        .cloned()
        .collect();
    Json(items).into_response()
}

async fn create(
    State(service): State<Shared>,
    headers: HeaderMap,
    Json(payload): Json<ToDoPayload>,
) -> Response {
    if !authorized(&service, &headers) {
        return unauthorized();
    }
    if payload.title.trim().is_empty() && !service.accept_empty_title.load(Ordering::SeqCst) {
        return bad_title();
    }
    if service.server_error_on_metacharacters.load(Ordering::SeqCst)
        && (payload.title.contains('\'') || payload.title.contains("--"))
    {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let id = service.next_id.fetch_add(1, Ordering::SeqCst) + 1;
    let mut item = ToDoItem {
        id,
        title: payload.title,
        description: payload.description,
        is_completed: payload.is_completed,
    };
    service.items.lock().unwrap().insert(id, item.clone());
    if service.alter_created_title.load(Ordering::SeqCst) {
        item.title.push('!');
    }
    (StatusCode::CREATED, Json(item)).into_response()
}

async fn fetch(State(service): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if !authorized(&service, &headers) {
        return unauthorized();
    }
    read_delay(&service).await;
    let found = service.items.lock().unwrap().get(&id).cloned();
    match found {
        Some(item) => Json(item).into_response(),
        None if service.missing_items_found.load(Ordering::SeqCst) => Json(ToDoItem {
            id,
            title: "ghost".to_string(),
            description: String::new(),
            is_completed: false,
        })
        .into_response(),
        None => not_found(id),
    }
}

async fn update(
    State(service): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<ToDoPayload>,
) -> Response {
    if !authorized(&service, &headers) {
        return unauthorized();
    }
    if service.fail_updates.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if payload.title.trim().is_empty() {
        return bad_title();
    }
    let mut items = service.items.lock().unwrap();
    match items.get_mut(&id) {
        Some(item) => {
            item.title = payload.title;
            item.description = payload.description;
            item.is_completed = payload.is_completed;
            Json(item.clone()).into_response()
        }
        None => not_found(id),
    }
}

async fn remove(State(service): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if !authorized(&service, &headers) {
        return unauthorized();
    }
    if service.fail_deletes.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    match service.items.lock().unwrap().remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(id),
    }
}
