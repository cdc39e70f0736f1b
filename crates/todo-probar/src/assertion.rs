//! Response assertions: status expectations and body invariants.
//!
//! Checks are collected with a builder and evaluated against one
//! [`ApiResponse`]. `verify` turns the first failure into a [`ProbeError`]
//! attributed to the step that issued the request.

use crate::client::ApiResponse;
use crate::model::{ToDoItem, ToDoPayload};
use crate::result::{ProbeError, ProbeResult};
use std::time::Duration;

/// Statuses accepted for a successful delete.
pub const DELETE_SUCCESS: [u16; 2] = [200, 204];

/// What a status code is expected to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusExpectation {
    /// Exactly this status
    Exact(u16),
    /// Any of these statuses
    AnyOf(Vec<u16>),
    /// Anything below 500
    NotServerError,
}

impl StatusExpectation {
    /// Whether `status` satisfies the expectation
    #[must_use]
    pub fn accepts(&self, status: u16) -> bool {
        match self {
            Self::Exact(expected) => status == *expected,
            Self::AnyOf(allowed) => allowed.contains(&status),
            Self::NotServerError => status < 500,
        }
    }

    /// Human-readable form used in failure messages
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Exact(expected) => expected.to_string(),
            Self::AnyOf(allowed) => allowed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" or "),
            Self::NotServerError => "< 500".to_string(),
        }
    }
}

/// Category of a check, used to pick the error variant on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// Status code check
    Status,
    /// Body invariant
    Body,
    /// Latency budget
    Latency,
}

/// Result of one check.
#[derive(Debug, Clone)]
pub struct AssertionResult {
    /// Name of the check.
    pub name: String,
    /// Category of the check.
    pub kind: CheckKind,
    /// Whether the check passed.
    pub passed: bool,
    /// Human-readable detail on failure.
    pub detail: Option<String>,
}

impl AssertionResult {
    fn pass(name: &str, kind: CheckKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            passed: true,
            detail: None,
        }
    }

    fn fail(name: &str, kind: CheckKind, detail: String) -> Self {
        Self {
            name: name.to_string(),
            kind,
            passed: false,
            detail: Some(detail),
        }
    }
}

/// Collection of checks to run against one response.
#[derive(Debug, Default)]
pub struct ResponseAssertion {
    status: Option<StatusExpectation>,
    checks: Vec<Box<dyn AssertionCheck>>,
}

trait AssertionCheck: std::fmt::Debug + Send + Sync {
    fn check(&self, response: &ApiResponse) -> AssertionResult;
}

// --- Built-in checks ---

#[derive(Debug)]
struct LatencyCheck {
    budget: Duration,
}

impl AssertionCheck for LatencyCheck {
    fn check(&self, response: &ApiResponse) -> AssertionResult {
        if response.latency <= self.budget {
            AssertionResult::pass("latency_under", CheckKind::Latency)
        } else {
            AssertionResult::fail(
                "latency_under",
                CheckKind::Latency,
                format!(
                    "latency {}ms exceeds budget {}ms",
                    response.latency.as_millis(),
                    self.budget.as_millis()
                ),
            )
        }
    }
}

#[derive(Debug)]
struct ItemCheck {
    id: Option<i64>,
    payload: Option<ToDoPayload>,
}

impl AssertionCheck for ItemCheck {
    fn check(&self, response: &ApiResponse) -> AssertionResult {
        let item: ToDoItem = match response.json() {
            Ok(item) => item,
            Err(e) => {
                return AssertionResult::fail(
                    "item",
                    CheckKind::Body,
                    format!("body is not an item: {e}"),
                )
            }
        };
        let mut issues = Vec::new();
        if let Some(id) = self.id {
            if item.id != id {
                issues.push(format!("id {} != {id}", item.id));
            }
        }
        if let Some(payload) = &self.payload {
            if item.title != payload.title {
                issues.push(format!("title {:?} != {:?}", item.title, payload.title));
            }
            if item.description != payload.description {
                issues.push(format!(
                    "description {:?} != {:?}",
                    item.description, payload.description
                ));
            }
            if item.is_completed != payload.is_completed {
                issues.push(format!(
                    "isCompleted {} != {}",
                    item.is_completed, payload.is_completed
                ));
            }
        }
        if issues.is_empty() {
            AssertionResult::pass("item", CheckKind::Body)
        } else {
            AssertionResult::fail("item", CheckKind::Body, issues.join(", "))
        }
    }
}

#[derive(Debug)]
struct ContainsItemCheck {
    id: i64,
    title: Option<String>,
}

impl AssertionCheck for ContainsItemCheck {
    fn check(&self, response: &ApiResponse) -> AssertionResult {
        let items: Vec<ToDoItem> = match response.json() {
            Ok(items) => items,
            Err(e) => {
                return AssertionResult::fail(
                    "contains_item",
                    CheckKind::Body,
                    format!("body is not an item array: {e}"),
                )
            }
        };
        match items.iter().find(|item| item.id == self.id) {
            None => AssertionResult::fail(
                "contains_item",
                CheckKind::Body,
                format!("item {} not found among {} items", self.id, items.len()),
            ),
            Some(item) => match &self.title {
                Some(title) if &item.title != title => AssertionResult::fail(
                    "contains_item",
                    CheckKind::Body,
                    format!("item {} has title {:?}, expected {title:?}", self.id, item.title),
                ),
                _ => AssertionResult::pass("contains_item", CheckKind::Body),
            },
        }
    }
}

#[derive(Debug)]
struct TitleSearchCheck {
    term: String,
    every: bool,
}

impl AssertionCheck for TitleSearchCheck {
    fn check(&self, response: &ApiResponse) -> AssertionResult {
        let name = if self.every {
            "all_titles_contain"
        } else {
            "any_title_contains"
        };
        let items: Vec<ToDoItem> = match response.json() {
            Ok(items) => items,
            Err(e) => {
                return AssertionResult::fail(
                    name,
                    CheckKind::Body,
                    format!("body is not an item array: {e}"),
                )
            }
        };
        if items.is_empty() {
            return AssertionResult::fail(name, CheckKind::Body, "result set is empty".to_string());
        }
        let matching = items
            .iter()
            .filter(|item| contains_ignore_case(&item.title, &self.term))
            .count();
        let passed = if self.every {
            matching == items.len()
        } else {
            matching > 0
        };
        if passed {
            AssertionResult::pass(name, CheckKind::Body)
        } else {
            AssertionResult::fail(
                name,
                CheckKind::Body,
                format!(
                    "{matching}/{} titles contain {:?} (case-insensitive)",
                    items.len(),
                    self.term
                ),
            )
        }
    }
}

#[derive(Debug)]
struct ArrayCheck;

impl AssertionCheck for ArrayCheck {
    fn check(&self, response: &ApiResponse) -> AssertionResult {
        match response.json::<Vec<ToDoItem>>() {
            Ok(_) => AssertionResult::pass("array", CheckKind::Body),
            Err(e) => AssertionResult::fail(
                "array",
                CheckKind::Body,
                format!("body is not an item array: {e}"),
            ),
        }
    }
}

impl ResponseAssertion {
    /// Create a new empty assertion builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect exactly this status.
    pub fn status(mut self, expected: u16) -> Self {
        self.status = Some(StatusExpectation::Exact(expected));
        self
    }

    /// Expect any of these statuses.
    pub fn status_in(mut self, allowed: &[u16]) -> Self {
        self.status = Some(StatusExpectation::AnyOf(allowed.to_vec()));
        self
    }

    /// Expect anything but a server error.
    pub fn no_server_error(mut self) -> Self {
        self.status = Some(StatusExpectation::NotServerError);
        self
    }

    /// Assert total latency is under the given duration.
    pub fn latency_under(mut self, budget: Duration) -> Self {
        self.checks.push(Box::new(LatencyCheck { budget }));
        self
    }

    /// Assert the body is a JSON array of items.
    pub fn item_array(mut self) -> Self {
        self.checks.push(Box::new(ArrayCheck));
        self
    }

    /// Assert the body is an item with this id.
    pub fn item_id(mut self, id: i64) -> Self {
        self.checks.push(Box::new(ItemCheck {
            id: Some(id),
            payload: None,
        }));
        self
    }

    /// Assert the body is an item echoing `payload` exactly.
    pub fn item_matches(mut self, id: Option<i64>, payload: &ToDoPayload) -> Self {
        self.checks.push(Box::new(ItemCheck {
            id,
            payload: Some(payload.clone()),
        }));
        self
    }

    /// Assert the body array contains the item, optionally with this title.
    pub fn contains_item(mut self, id: i64, title: Option<&str>) -> Self {
        self.checks.push(Box::new(ContainsItemCheck {
            id,
            title: title.map(str::to_string),
        }));
        self
    }

    /// Assert the array is non-empty and at least one title contains `term`, ignoring case.
    pub fn any_title_contains(mut self, term: impl Into<String>) -> Self {
        self.checks.push(Box::new(TitleSearchCheck {
            term: term.into(),
            every: false,
        }));
        self
    }

    /// Assert the array is non-empty and every title contains `term`, ignoring case.
    pub fn all_titles_contain(mut self, term: impl Into<String>) -> Self {
        self.checks.push(Box::new(TitleSearchCheck {
            term: term.into(),
            every: true,
        }));
        self
    }

    /// Run all checks, returning results for each.
    ///
    /// Body checks are skipped when the status check fails, since the body
    /// of an unexpected status rarely has the expected shape.
    pub fn run(&self, response: &ApiResponse) -> Vec<AssertionResult> {
        let mut results = Vec::with_capacity(self.checks.len() + 1);
        if let Some(expectation) = &self.status {
            let result = check_status(expectation, response);
            let failed = !result.passed;
            results.push(result);
            if failed {
                return results;
            }
        }
        results.extend(self.checks.iter().map(|c| c.check(response)));
        results
    }

    /// Run all checks and return true only if all passed.
    pub fn run_all_pass(&self, response: &ApiResponse) -> bool {
        self.run(response).iter().all(|r| r.passed)
    }

    /// Run all checks, converting the first failure into an error for `step`.
    pub fn verify(&self, step: &str, response: &ApiResponse) -> ProbeResult<()> {
        let Some(failure) = self.run(response).into_iter().find(|r| !r.passed) else {
            return Ok(());
        };
        let detail = failure.detail.unwrap_or_default();
        Err(match failure.kind {
            CheckKind::Status => match &self.status {
                Some(StatusExpectation::NotServerError) => ProbeError::ServerError {
                    step: step.to_string(),
                    status: response.status,
                },
                Some(expectation) => ProbeError::UnexpectedStatus {
                    step: step.to_string(),
                    expected: expectation.describe(),
                    actual: response.status,
                    body: truncate(&response.body, 200),
                },
                None => ProbeError::assertion(step, detail),
            },
            CheckKind::Body | CheckKind::Latency => ProbeError::assertion(step, detail),
        })
    }
}

fn check_status(expectation: &StatusExpectation, response: &ApiResponse) -> AssertionResult {
    if expectation.accepts(response.status) {
        AssertionResult::pass("status", CheckKind::Status)
    } else {
        AssertionResult::fail(
            "status",
            CheckKind::Status,
            format!(
                "expected status {}, got {}",
                expectation.describe(),
                response.status
            ),
        )
    }
}

/// Case-insensitive substring test.
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Truncate a string for display purposes.
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}...")
    }
}
