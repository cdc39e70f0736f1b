//! End-to-end suite runs against the in-memory ToDo service.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{Fake, EMAIL, TOKEN};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::TempDir;
use todo_probar::prelude::*;
use todo_probar::{AuthToken, Credentials, NegativeCheck, Property, TokenStore};

#[tokio::test]
async fn login_persists_token_for_later_sessions() {
    let fake = Fake::start().await;
    let dir = TempDir::new().unwrap();
    let config = fake.config().with_token_path(dir.path().join(".auth/token.json"));

    let client = ToDoClient::new(&config.base_url);
    let store = TokenStore::new(&config.token_path);
    let token = login_and_store(&client, config.require_credentials().unwrap(), &store)
        .await
        .unwrap();
    assert_eq!(token.as_str(), TOKEN);

    let session = Session::open(config).unwrap();
    assert_eq!(session.token().as_str(), TOKEN);
    assert_eq!(run_crud(&session).await.error, None);
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let fake = Fake::start().await;
    let client = ToDoClient::new(&fake.url);
    let err = login(&client, &Credentials::new(EMAIL, "nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::LoginFailed { status: 401, .. }));
}

#[tokio::test]
async fn login_without_token_in_body_fails() {
    let fake = Fake::start().await;
    fake.service.login_without_token.store(true, Ordering::SeqCst);
    let client = ToDoClient::new(&fake.url);
    let err = login(&client, fake.config().require_credentials().unwrap())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("No authentication token"));
}

#[tokio::test]
async fn crud_flow_reaches_verified_gone() {
    let fake = Fake::start().await;
    let session = fake.session();

    let report = run_crud(&session).await;

    assert!(report.passed(), "{report:?}");
    assert_eq!(report.steps.len(), 6);
    assert_eq!(report.state.as_deref(), Some("verified-gone"));
    assert!(report.warnings.is_empty());
    assert_eq!(fake.service.item_count(), 0);
}

#[tokio::test]
async fn crud_failure_still_deletes_fixture() {
    let fake = Fake::start().await;
    fake.service.fail_updates.store(true, Ordering::SeqCst);
    let session = fake.session();

    let report = run_crud(&session).await;

    assert!(!report.passed());
    assert_eq!(report.failed_step().unwrap().name, "UPDATE ToDo item");
    assert_eq!(report.state.as_deref(), Some("read-verified"));
    assert_eq!(report.steps.len(), 3);
    assert_eq!(fake.service.item_count(), 0);
}

#[tokio::test]
async fn concurrent_crud_runs_do_not_collide() {
    let fake = Fake::start().await;
    let session = fake.session();

    let reports = futures::future::join_all((0..4).map(|_| run_crud(&session))).await;

    assert!(reports.iter().all(|r| r.passed()), "{reports:?}");
    assert_eq!(fake.service.item_count(), 0);
}

#[tokio::test]
async fn negative_suite_passes_and_cleans_up() {
    let fake = Fake::start().await;
    let session = fake.session();

    let suite = run_negative(&session).await;

    assert!(suite.all_passed(), "{:?}", suite.failures());
    assert_eq!(suite.scenarios.len(), NegativeCheck::ALL.len());
    assert_eq!(fake.service.item_count(), 0);
}

#[tokio::test]
async fn create_with_altered_echo_still_deletes_item() {
    let fake = Fake::start().await;
    fake.service.alter_created_title.store(true, Ordering::SeqCst);
    let session = fake.session();

    let report = run_crud(&session).await;

    assert!(!report.passed());
    assert_eq!(report.failed_step().unwrap().name, "CREATE new ToDo item");
    assert_eq!(report.state.as_deref(), Some("unset"));
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(fake.service.item_count(), 0);
}

fn assert_check_fails(report: &ScenarioReport, check: NegativeCheck, needle: &str) {
    assert!(!report.passed(), "{report:?}");
    let failed = report.failed_step().unwrap();
    assert_eq!(failed.name, check.name());
    let error = failed.error.as_deref().unwrap();
    assert!(error.starts_with(&format!("[{}]", check.name())), "{error}");
    assert!(error.contains(needle), "{error}");
}

#[tokio::test]
async fn server_error_on_metacharacters_fails_check() {
    let fake = Fake::start().await;
    fake.service
        .server_error_on_metacharacters
        .store(true, Ordering::SeqCst);
    let session = fake.session();

    let report = NegativeCheck::SqlInjection.run(&session).await;

    assert_check_fails(&report, NegativeCheck::SqlInjection, "server error status 500");
    assert_eq!(fake.service.item_count(), 0);
}

#[tokio::test]
async fn accepted_empty_title_fails_check_and_is_deleted() {
    let fake = Fake::start().await;
    fake.service.accept_empty_title.store(true, Ordering::SeqCst);
    let session = fake.session();

    let report = NegativeCheck::EmptyTitle.run(&session).await;

    assert_check_fails(&report, NegativeCheck::EmptyTitle, "expected status 400, got 201");
    assert_eq!(fake.service.item_count(), 0);
}

#[tokio::test]
async fn accepted_empty_title_property_leaves_nothing_behind() {
    let fake = Fake::start().await;
    fake.service.accept_empty_title.store(true, Ordering::SeqCst);
    let session = fake.session();

    let report = Property::EmptyTitleLeavesListUnchanged.run(&session).await;

    assert!(!report.passed());
    assert_eq!(report.failed_step().unwrap().name, "create with empty title");
    assert_eq!(fake.service.item_count(), 0);
}

#[tokio::test]
async fn anonymous_list_accepted_fails_check() {
    let fake = Fake::start().await;
    fake.service.allow_anonymous.store(true, Ordering::SeqCst);
    let session = fake.session();

    let report = NegativeCheck::Unauthenticated.run(&session).await;

    assert_check_fails(&report, NegativeCheck::Unauthenticated, "got 200");
}

#[tokio::test]
async fn missing_item_returned_fails_check() {
    let fake = Fake::start().await;
    fake.service.missing_items_found.store(true, Ordering::SeqCst);
    let session = fake.session();

    let suite = run_negative(&session).await;

    assert_eq!(suite.failed_count(), 1);
    let report = suite.failures()[0];
    assert_eq!(report.name, NegativeCheck::MissingItem.name());
    assert_check_fails(report, NegativeCheck::MissingItem, "expected status 404, got 200");
    assert_eq!(fake.service.item_count(), 0);
}

#[tokio::test]
async fn property_suite_passes_and_cleans_up() {
    let fake = Fake::start().await;
    fake.service.seed("Unrelated existing item");
    let session = fake.session();

    let suite = run_properties(&session).await;

    assert!(suite.all_passed(), "{:?}", suite.failures());
    assert_eq!(suite.scenarios.len(), Property::ALL.len());
    assert_eq!(fake.service.item_count(), 1);
}

#[tokio::test]
async fn teardown_failure_is_a_warning() {
    let fake = Fake::start().await;
    fake.service.fail_deletes.store(true, Ordering::SeqCst);
    let session = fake.session();

    let report = Property::RoundTrip.run(&session).await;

    assert!(report.passed(), "{report:?}");
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].starts_with("Cleanup failed for item"));
}

#[tokio::test]
async fn slow_step_times_out() {
    let fake = Fake::start().await;
    fake.service.read_delay_ms.store(500, Ordering::SeqCst);
    let config = fake.config().with_step_timeout(Duration::from_millis(100));
    let session = Session::with_token(config, AuthToken::new(TOKEN)).unwrap();

    let report = run_crud(&session).await;

    assert!(!report.passed());
    let failed = report.failed_step().unwrap();
    assert_eq!(failed.name, "GET ToDo item by ID and in list");
    assert!(failed.error.as_deref().unwrap().contains("timed out"));
    assert_eq!(fake.service.item_count(), 0);
}

#[tokio::test]
async fn invalid_token_fails_every_check() {
    let fake = Fake::start().await;
    let session = Session::with_token(fake.config(), AuthToken::new("stale")).unwrap();

    let report = run_crud(&session).await;

    assert!(!report.passed());
    let error = report.error.unwrap();
    assert!(error.contains("401"), "{error}");
}
