//! Negative-path checks.
//!
//! Each check is a single request/assert pair with no shared fixture state,
//! so the whole suite runs concurrently.

use crate::assertion::ResponseAssertion;
use crate::client::ApiResponse;
use crate::model::ToDoPayload;
use crate::result::ProbeResult;
use crate::scenario::{ScenarioContext, ScenarioReport, SuiteReport};
use crate::session::Session;
use futures::future::join_all;
use std::time::Instant;

/// Name of the negative suite
pub const NEGATIVE_SUITE: &str = "ToDoItem API negative tests";

/// Id used for "get a missing item"
pub const MISSING_GET_ID: i64 = 999_999;

/// Id used for "update a missing item"
pub const MISSING_UPDATE_ID: i64 = 888_888;

/// Title carrying SQL metacharacters
pub const SQL_INJECTION_TITLE: &str = "Test'; DROP TABLE ToDoItems; --";

/// The individual negative checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegativeCheck {
    /// Empty title on create returns 400
    EmptyTitle,
    /// Get of a missing id returns 404
    MissingItem,
    /// List without Authorization returns 401
    Unauthenticated,
    /// Update of a missing id returns 404
    UpdateMissing,
    /// SQL metacharacters in a title never cause a 5xx
    SqlInjection,
}

impl NegativeCheck {
    /// All checks, in reporting order
    pub const ALL: [Self; 5] = [
        Self::EmptyTitle,
        Self::MissingItem,
        Self::Unauthenticated,
        Self::UpdateMissing,
        Self::SqlInjection,
    ];

    /// Scenario name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EmptyTitle => "CREATE with empty title returns 400",
            Self::MissingItem => "GET non-existent item returns 404",
            Self::Unauthenticated => "GET without authentication token returns 401",
            Self::UpdateMissing => "UPDATE non-existent item returns 404",
            Self::SqlInjection => "SQL injection does not break the API",
        }
    }

    /// Run this check as its own scenario.
    pub async fn run(self, session: &Session) -> ScenarioReport {
        let mut ctx = ScenarioContext::new(self.name(), session);
        let outcome = tokio::time::timeout(ctx.test_timeout(), self.body(&mut ctx)).await;
        ctx.conclude(outcome).await
    }

    async fn body(self, ctx: &mut ScenarioContext) -> ProbeResult<()> {
        let client = ctx.client();
        let name = self.name();
        match self {
            Self::EmptyTitle => {
                let payload = ToDoPayload::new("", "Valid description", false);
                ctx.create_step(name, &payload, |resp| {
                    log_error_body(name, resp);
                    ResponseAssertion::new().status(400).verify(name, resp)
                })
                .await
                .map(drop)
            }
            Self::MissingItem => {
                ctx.step(name, async {
                    let resp = client.get(MISSING_GET_ID).await?;
                    log_error_body(name, &resp);
                    ResponseAssertion::new().status(404).verify(name, &resp)
                })
                .await
            }
            Self::Unauthenticated => {
                let anonymous = client.without_auth();
                ctx.step(name, async {
                    let resp = anonymous.list().await?;
                    log_error_body(name, &resp);
                    ResponseAssertion::new().status(401).verify(name, &resp)
                })
                .await
            }
            Self::UpdateMissing => {
                ctx.step(name, async {
                    let payload = ToDoPayload::new(
                        "Trying to update non-existent item",
                        "This should fail",
                        true,
                    );
                    let resp = client.update(MISSING_UPDATE_ID, &payload).await?;
                    log_error_body(name, &resp);
                    ResponseAssertion::new().status(404).verify(name, &resp)
                })
                .await
            }
            Self::SqlInjection => {
                let payload = ToDoPayload::new(SQL_INJECTION_TITLE, "SQL injection test", false);
                ctx.create_step(name, &payload, |resp| {
                    tracing::info!(status = resp.status, "SQL injection handled");
                    ResponseAssertion::new().no_server_error().verify(name, resp)
                })
                .await
                .map(drop)
            }
        }
    }
}

/// Run every negative check concurrently.
pub async fn run_negative(session: &Session) -> SuiteReport {
    let start = Instant::now();
    let scenarios = join_all(NegativeCheck::ALL.iter().map(|check| check.run(session))).await;
    SuiteReport::new(NEGATIVE_SUITE, scenarios, start.elapsed())
}

fn log_error_body(check: &str, resp: &ApiResponse) {
    if resp.status >= 400 {
        match serde_json::from_str::<serde_json::Value>(&resp.body) {
            Ok(json) => tracing::debug!(check, status = resp.status, body = %json, "error response"),
            Err(_) => tracing::debug!(check, status = resp.status, body = %resp.body, "error response"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_check_names_are_distinct() {
        let names: HashSet<&str> = NegativeCheck::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(names.len(), NegativeCheck::ALL.len());
    }

    #[test]
    fn test_missing_ids_differ() {
        assert_ne!(MISSING_GET_ID, MISSING_UPDATE_ID);
    }

    #[test]
    fn test_injection_title_has_metacharacters() {
        assert!(SQL_INJECTION_TITLE.contains('\''));
        assert!(SQL_INJECTION_TITLE.contains("--"));
    }
}
