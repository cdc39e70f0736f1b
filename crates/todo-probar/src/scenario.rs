//! Scenario runner.
//!
//! A scenario is a sequence of steps sharing one [`ScenarioContext`]. Each
//! step is wrapped by [`ScenarioContext::step`], which bounds it with the step
//! timeout and records a [`StepReport`]. The first failing step aborts the
//! scenario; fixtures created along the way are deleted during teardown
//! whatever the outcome.
//!
//! The CRUD flow walks one fixture slot through
//! `Unset → Created → ReadVerified → Updated → SearchVerified → Deleted → VerifiedGone`.

use crate::assertion::{ResponseAssertion, DELETE_SUCCESS};
use crate::client::{ApiResponse, ToDoClient};
use crate::model::{ToDoItem, ToDoPayload};
use crate::result::{ProbeError, ProbeResult};
use crate::session::Session;
use crate::title::unique_title;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::error::Elapsed;

/// Name of the CRUD scenario
pub const CRUD_SCENARIO: &str = "ToDoItem API CRUD flow";

/// Term the CRUD flow searches for; both fixture titles contain it.
pub const CRUD_SEARCH_TERM: &str = "Song";

/// Progress of the CRUD flow over its fixture slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrudState {
    /// No item created yet
    Unset,
    /// Item created, id captured
    Created,
    /// Item found by id and in the list
    ReadVerified,
    /// Title, description and flag changed
    Updated,
    /// Item found by search
    SearchVerified,
    /// Delete accepted
    Deleted,
    /// Get after delete returned 404
    VerifiedGone,
}

impl std::fmt::Display for CrudState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unset => "unset",
            Self::Created => "created",
            Self::ReadVerified => "read-verified",
            Self::Updated => "updated",
            Self::SearchVerified => "search-verified",
            Self::Deleted => "deleted",
            Self::VerifiedGone => "verified-gone",
        };
        f.write_str(name)
    }
}

/// Identifier of the item a scenario created, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixtureSlot(Option<i64>);

impl FixtureSlot {
    /// Record the id of a freshly created item
    pub fn set(&mut self, id: i64) {
        self.0 = Some(id);
    }

    /// Current id, if one was captured
    #[must_use]
    pub const fn get(&self) -> Option<i64> {
        self.0
    }

    /// Current id, or an assertion failure for `step`
    pub fn require(&self, step: &str) -> ProbeResult<i64> {
        self.0
            .ok_or_else(|| ProbeError::assertion(step, "no fixture id was captured by a prior step"))
    }

    /// Forget the id once the item no longer needs cleanup
    pub fn release(&mut self) -> Option<i64> {
        self.0.take()
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    /// Step name
    pub name: String,
    /// Whether the step passed
    pub passed: bool,
    /// Wall time in milliseconds
    pub duration_ms: f64,
    /// Failure message
    pub error: Option<String>,
}

/// Outcome of one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// Steps in execution order
    pub steps: Vec<StepReport>,
    /// Failure that aborted the scenario
    pub error: Option<String>,
    /// Cleanup problems; never affect the verdict
    pub warnings: Vec<String>,
    /// Last state reached, for stateful scenarios
    pub state: Option<String>,
    /// Wall time in milliseconds
    pub duration_ms: f64,
}

impl ScenarioReport {
    /// Whether the scenario passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.steps.iter().all(|s| s.passed)
    }

    /// First failing step, if any
    #[must_use]
    pub fn failed_step(&self) -> Option<&StepReport> {
        self.steps.iter().find(|s| !s.passed)
    }
}

/// Results from running a group of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Suite name
    pub suite: String,
    /// Individual scenario reports
    pub scenarios: Vec<ScenarioReport>,
    /// Total wall time in milliseconds
    pub duration_ms: f64,
    /// RFC 3339 timestamp of the run
    pub timestamp: String,
}

impl SuiteReport {
    /// Create a report from finished scenarios
    #[must_use]
    pub fn new(suite: impl Into<String>, scenarios: Vec<ScenarioReport>, elapsed: Duration) -> Self {
        Self {
            suite: suite.into(),
            scenarios,
            duration_ms: millis(elapsed),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Check if all scenarios passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::passed)
    }

    /// Count passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.passed()).count()
    }

    /// Count failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.scenarios.len() - self.passed_count()
    }

    /// Get failed scenarios
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioReport> {
        self.scenarios.iter().filter(|s| !s.passed()).collect()
    }
}

/// Per-scenario state: session handle, fixture slot and step log.
#[derive(Debug)]
pub struct ScenarioContext {
    name: String,
    session: Session,
    started: Instant,
    steps: Vec<StepReport>,
    warnings: Vec<String>,
    state: Option<String>,
    /// Primary fixture of the scenario
    pub fixture: FixtureSlot,
    tracked: Vec<i64>,
}

impl ScenarioContext {
    /// Start a scenario
    #[must_use]
    pub fn new(name: impl Into<String>, session: &Session) -> Self {
        let name = name.into();
        tracing::info!(scenario = %name, "scenario started");
        Self {
            name,
            session: session.clone(),
            started: Instant::now(),
            steps: Vec::new(),
            warnings: Vec::new(),
            state: None,
            fixture: FixtureSlot::default(),
            tracked: Vec::new(),
        }
    }

    /// Scenario name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Authenticated client, cloned so steps can borrow it freely
    #[must_use]
    pub fn client(&self) -> ToDoClient {
        self.session.client().clone()
    }

    /// Upper bound for the whole scenario
    #[must_use]
    pub fn test_timeout(&self) -> Duration {
        self.session.config().test_timeout
    }

    /// Record the state a stateful scenario has reached
    pub fn mark(&mut self, state: impl ToString) {
        let state = state.to_string();
        tracing::debug!(scenario = %self.name, %state, "state reached");
        self.state = Some(state);
    }

    /// Register an extra item for cleanup
    pub fn track(&mut self, id: i64) {
        self.tracked.push(id);
    }

    /// Run one step, bounded by the step timeout, and record its outcome.
    pub async fn step<T, F>(&mut self, name: &str, body: F) -> ProbeResult<T>
    where
        F: Future<Output = ProbeResult<T>>,
    {
        let limit = self.session.config().step_timeout;
        let start = Instant::now();
        tracing::info!(scenario = %self.name, step = name, "step started");

        let result = match tokio::time::timeout(limit, body).await {
            Ok(result) => result,
            Err(_) => Err(step_timeout(name, limit)),
        };
        self.record(name, start, result)
    }

    /// Create an item as one step.
    ///
    /// Any 2xx answer is registered for cleanup before `check` looks at the
    /// response, so a create that fails its check still leaves nothing
    /// behind. Returns the new id, or `None` when the service refused the
    /// create and `check` accepted that.
    pub async fn create_step<F>(
        &mut self,
        name: &str,
        payload: &ToDoPayload,
        check: F,
    ) -> ProbeResult<Option<i64>>
    where
        F: FnOnce(&ApiResponse) -> ProbeResult<()>,
    {
        let client = self.client();
        let limit = self.session.config().step_timeout;
        let start = Instant::now();
        tracing::info!(scenario = %self.name, step = name, "step started");

        let result = match tokio::time::timeout(limit, client.create(payload)).await {
            Ok(Ok(resp)) => {
                let created = if resp.is_success() {
                    resp.json::<ToDoItem>().map(|item| Some(item.id))
                } else {
                    Ok(None)
                };
                if let Ok(Some(id)) = &created {
                    self.own(*id);
                }
                check(&resp).and(created)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(step_timeout(name, limit)),
        };
        self.record(name, start, result)
    }

    /// The first created item fills the fixture slot; later ones are tracked.
    fn own(&mut self, id: i64) {
        if self.fixture.get().is_none() {
            self.fixture.set(id);
        } else {
            self.track(id);
        }
        tracing::debug!(scenario = %self.name, id, "fixture registered");
    }

    fn record<T>(&mut self, name: &str, start: Instant, result: ProbeResult<T>) -> ProbeResult<T> {
        let report = StepReport {
            name: name.to_string(),
            passed: result.is_ok(),
            duration_ms: millis(start.elapsed()),
            error: result.as_ref().err().map(ToString::to_string),
        };
        match &report.error {
            None => tracing::info!(scenario = %self.name, step = name, "step passed"),
            Some(error) => tracing::error!(scenario = %self.name, step = name, %error, "step failed"),
        }
        self.steps.push(report);
        result
    }

    /// Run teardown and build the report.
    ///
    /// `outcome` is the scenario body wrapped in the scenario timeout.
    pub async fn conclude(mut self, outcome: Result<ProbeResult<()>, Elapsed>) -> ScenarioReport {
        let error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(step_timeout(&self.name, self.test_timeout()).to_string()),
        };

        self.release_fixtures().await;

        let report = ScenarioReport {
            name: self.name,
            steps: self.steps,
            error,
            warnings: self.warnings,
            state: self.state,
            duration_ms: millis(self.started.elapsed()),
        };
        if report.passed() {
            tracing::info!(scenario = %report.name, "scenario passed");
        } else {
            tracing::error!(scenario = %report.name, error = ?report.error, "scenario failed");
        }
        report
    }

    /// Best-effort deletion of everything this scenario still owns.
    ///
    /// Failures are logged and kept as warnings.
    async fn release_fixtures(&mut self) {
        let ids: Vec<i64> = self
            .fixture
            .release()
            .into_iter()
            .chain(self.tracked.drain(..))
            .collect();
        if ids.is_empty() {
            return;
        }
        let client = self.client();
        let limit = self.session.config().step_timeout;
        for id in ids {
            let warning = match tokio::time::timeout(limit, client.delete(id)).await {
                Ok(Ok(resp)) if !resp.is_server_error() => {
                    tracing::debug!(scenario = %self.name, id, status = resp.status, "cleanup delete");
                    None
                }
                Ok(Ok(resp)) => Some(format!(
                    "Cleanup failed for item {id}: status {}",
                    resp.status
                )),
                Ok(Err(e)) => Some(format!("Cleanup failed for item {id}: {e}")),
                Err(_) => Some(format!(
                    "Cleanup failed for item {id}: timed out after {}ms",
                    limit.as_millis()
                )),
            };
            if let Some(warning) = warning {
                tracing::warn!(scenario = %self.name, "{warning}");
                self.warnings.push(warning);
            }
        }
    }
}

/// Run the CRUD flow against one fresh fixture.
pub async fn run_crud(session: &Session) -> ScenarioReport {
    let mut ctx = ScenarioContext::new(CRUD_SCENARIO, session);
    ctx.mark(CrudState::Unset);
    let outcome = tokio::time::timeout(ctx.test_timeout(), crud_flow(&mut ctx)).await;
    ctx.conclude(outcome).await
}

async fn crud_flow(ctx: &mut ScenarioContext) -> ProbeResult<()> {
    let client = ctx.client();
    let create_title = unique_title("Song is fun but i want to dance");
    let update_title = unique_title("Song is fun but I want to dance MORE");
    tracing::info!(%create_title, %update_title, "unique titles generated");

    let created = ToDoPayload::new(&create_title, "Learn to dance and sing", false);
    let id = ctx
        .create_step("CREATE new ToDo item", &created, |resp| {
            ResponseAssertion::new()
                .status(201)
                .item_matches(None, &created)
                .verify("CREATE new ToDo item", resp)
        })
        .await?
        .ok_or_else(|| ProbeError::assertion("CREATE new ToDo item", "service returned no item"))?;
    ctx.mark(CrudState::Created);
    tracing::info!(id, "item created");

    ctx.step("GET ToDo item by ID and in list", async {
        let resp = client.get(id).await?;
        ResponseAssertion::new()
            .status(200)
            .item_matches(Some(id), &created)
            .verify("GET ToDo item by ID", &resp)?;
        let list = client.list().await?;
        ResponseAssertion::new()
            .status(200)
            .item_array()
            .contains_item(id, Some(create_title.as_str()))
            .verify("GET all ToDo items", &list)
    })
    .await?;
    ctx.mark(CrudState::ReadVerified);

    let updated = ctx
        .step("UPDATE ToDo item", async {
            let current = client.get(id).await?;
            ResponseAssertion::new()
                .status(200)
                .verify("UPDATE ToDo item: fetch current", &current)?;
            let item: ToDoItem = current.json()?;
            let payload = ToDoPayload::new(
                &update_title,
                "Learn to dance and sing even better",
                !item.is_completed,
            );
            let resp = client.update(id, &payload).await?;
            ResponseAssertion::new()
                .status(200)
                .item_matches(Some(id), &payload)
                .verify("UPDATE ToDo item", &resp)?;
            Ok::<_, ProbeError>(payload)
        })
        .await?;
    ctx.mark(CrudState::Updated);

    ctx.step("SEARCH ToDo items", async {
        let resp = client.search(CRUD_SEARCH_TERM).await?;
        ResponseAssertion::new()
            .status(200)
            .any_title_contains(CRUD_SEARCH_TERM)
            .contains_item(id, Some(updated.title.as_str()))
            .verify("SEARCH ToDo items", &resp)
    })
    .await?;
    ctx.mark(CrudState::SearchVerified);

    ctx.step("DELETE ToDo item", async {
        let resp = client.delete(id).await?;
        ResponseAssertion::new()
            .status_in(&DELETE_SUCCESS)
            .verify("DELETE ToDo item", &resp)
    })
    .await?;
    ctx.fixture.release();
    ctx.mark(CrudState::Deleted);

    ctx.step("GET deleted item returns 404", async {
        let resp = client.get(id).await?;
        ResponseAssertion::new()
            .status(404)
            .verify("GET deleted item returns 404", &resp)
    })
    .await?;
    ctx.mark(CrudState::VerifiedGone);
    Ok(())
}

fn step_timeout(step: &str, limit: Duration) -> ProbeError {
    ProbeError::Timeout {
        step: step.to_string(),
        ms: limit.as_millis() as u64,
    }
}

pub(crate) fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
