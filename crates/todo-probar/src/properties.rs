//! Behavioral properties of the service, each checked as its own scenario.
//!
//! These run one after another: the list-count check compares two listings
//! and must not overlap with scenarios that create items.

use crate::assertion::{ResponseAssertion, DELETE_SUCCESS};
use crate::model::{ToDoItem, ToDoPayload};
use crate::result::{ProbeError, ProbeResult};
use crate::scenario::{ScenarioContext, ScenarioReport, SuiteReport};
use crate::session::Session;
use crate::title::unique_title;
use std::time::Instant;

/// Name of the property suite
pub const PROPERTY_SUITE: &str = "ToDoItem API properties";

/// Term the seeded search looks for
pub const SEEDED_SEARCH_TERM: &str = "playwright";

/// The individual properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    /// Create then get yields identical fields
    RoundTrip,
    /// Get after update reflects exactly the updated fields
    UpdateMonotonicity,
    /// Get after delete is 404 and a repeated delete is not a 5xx
    DeletionFinality,
    /// Listing without a token is 401
    AuthBoundary,
    /// A rejected empty-title create leaves the list size unchanged
    EmptyTitleLeavesListUnchanged,
    /// Searching a term unique to one title finds it and only matching titles
    SearchByUniqueTerm,
    /// With several seeded items, a search returns relevant results
    SeededSearch,
}

impl Property {
    /// All properties, in execution order
    pub const ALL: [Self; 7] = [
        Self::RoundTrip,
        Self::UpdateMonotonicity,
        Self::DeletionFinality,
        Self::AuthBoundary,
        Self::EmptyTitleLeavesListUnchanged,
        Self::SearchByUniqueTerm,
        Self::SeededSearch,
    ];

    /// Scenario name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RoundTrip => "created item round-trips through get",
            Self::UpdateMonotonicity => "get after update reflects updated fields",
            Self::DeletionFinality => "deleted item stays gone",
            Self::AuthBoundary => "listing without a token is unauthorized",
            Self::EmptyTitleLeavesListUnchanged => "empty title create leaves list unchanged",
            Self::SearchByUniqueTerm => "search by unique term",
            Self::SeededSearch => "search over seeded items returns relevant results",
        }
    }

    /// Run this property as its own scenario.
    pub async fn run(self, session: &Session) -> ScenarioReport {
        let mut ctx = ScenarioContext::new(self.name(), session);
        let outcome = tokio::time::timeout(ctx.test_timeout(), self.body(&mut ctx)).await;
        ctx.conclude(outcome).await
    }

    async fn body(self, ctx: &mut ScenarioContext) -> ProbeResult<()> {
        match self {
            Self::RoundTrip => round_trip(ctx).await,
            Self::UpdateMonotonicity => update_monotonicity(ctx).await,
            Self::DeletionFinality => deletion_finality(ctx).await,
            Self::AuthBoundary => auth_boundary(ctx).await,
            Self::EmptyTitleLeavesListUnchanged => empty_title_leaves_list_unchanged(ctx).await,
            Self::SearchByUniqueTerm => search_by_unique_term(ctx).await,
            Self::SeededSearch => seeded_search(ctx).await,
        }
    }
}

/// Run every property sequentially.
pub async fn run_properties(session: &Session) -> SuiteReport {
    let start = Instant::now();
    let mut scenarios = Vec::with_capacity(Property::ALL.len());
    for property in Property::ALL {
        scenarios.push(property.run(session).await);
    }
    SuiteReport::new(PROPERTY_SUITE, scenarios, start.elapsed())
}

async fn create_fixture(ctx: &mut ScenarioContext, payload: &ToDoPayload) -> ProbeResult<i64> {
    ctx.create_step("create fixture", payload, |resp| {
        ResponseAssertion::new()
            .status(201)
            .verify("create fixture", resp)
    })
    .await?
    .ok_or_else(|| ProbeError::assertion("create fixture", "service returned no item"))
}

async fn round_trip(ctx: &mut ScenarioContext) -> ProbeResult<()> {
    let payload = ToDoPayload::new(unique_title("X"), "d", false);
    let id = create_fixture(ctx, &payload).await?;
    let client = ctx.client();
    ctx.step("get returns identical fields", async {
        let resp = client.get(id).await?;
        ResponseAssertion::new()
            .status(200)
            .item_matches(Some(id), &payload)
            .verify("get returns identical fields", &resp)
    })
    .await
}

async fn update_monotonicity(ctx: &mut ScenarioContext) -> ProbeResult<()> {
    let original = ToDoPayload::new(unique_title("Before update"), "old", false);
    let id = create_fixture(ctx, &original).await?;
    let client = ctx.client();
    let updated = ToDoPayload::new(unique_title("After update"), "new", true);
    ctx.step("update", async {
        let resp = client.update(id, &updated).await?;
        ResponseAssertion::new().status(200).verify("update", &resp)
    })
    .await?;
    ctx.step("get reflects update", async {
        let resp = client.get(id).await?;
        ResponseAssertion::new()
            .status(200)
            .item_matches(Some(id), &updated)
            .verify("get reflects update", &resp)
    })
    .await
}

async fn deletion_finality(ctx: &mut ScenarioContext) -> ProbeResult<()> {
    let payload = ToDoPayload::new(unique_title("Short lived"), "to be deleted", false);
    let id = create_fixture(ctx, &payload).await?;
    let client = ctx.client();
    ctx.step("delete", async {
        let resp = client.delete(id).await?;
        ResponseAssertion::new()
            .status_in(&DELETE_SUCCESS)
            .verify("delete", &resp)
    })
    .await?;
    ctx.fixture.release();
    ctx.step("get after delete is 404", async {
        let resp = client.get(id).await?;
        ResponseAssertion::new()
            .status(404)
            .verify("get after delete is 404", &resp)
    })
    .await?;
    ctx.step("repeated delete is not a server error", async {
        let resp = client.delete(id).await?;
        ResponseAssertion::new()
            .no_server_error()
            .verify("repeated delete is not a server error", &resp)
    })
    .await
}

async fn auth_boundary(ctx: &mut ScenarioContext) -> ProbeResult<()> {
    let anonymous = ctx.client().without_auth();
    ctx.step("list without token", async {
        let resp = anonymous.list().await?;
        ResponseAssertion::new()
            .status(401)
            .verify("list without token", &resp)
    })
    .await?;
    ctx.step("search without token", async {
        let resp = anonymous.search("a").await?;
        ResponseAssertion::new()
            .status(401)
            .verify("search without token", &resp)
    })
    .await
}

async fn empty_title_leaves_list_unchanged(ctx: &mut ScenarioContext) -> ProbeResult<()> {
    let client = ctx.client();
    let before = ctx
        .step("count before", async { count_items(&client, "count before").await })
        .await?;
    let empty = ToDoPayload::new("", "d", false);
    ctx.create_step("create with empty title", &empty, |resp| {
        ResponseAssertion::new()
            .status(400)
            .verify("create with empty title", resp)
    })
    .await?;
    ctx.step("count unchanged", async {
        let after = count_items(&client, "count unchanged").await?;
        if after == before {
            Ok(())
        } else {
            Err(ProbeError::assertion(
                "count unchanged",
                format!("list size changed from {before} to {after}"),
            ))
        }
    })
    .await
}

async fn count_items(client: &crate::client::ToDoClient, step: &str) -> ProbeResult<usize> {
    let resp = client.list().await?;
    ResponseAssertion::new().status(200).verify(step, &resp)?;
    Ok(resp.json::<Vec<ToDoItem>>()?.len())
}

async fn search_by_unique_term(ctx: &mut ScenarioContext) -> ProbeResult<()> {
    let marker = uuid::Uuid::new_v4().simple().to_string();
    let term = format!("Needle{}", &marker[..10]);
    let payload = ToDoPayload::new(unique_title(&format!("Find the {term} here")), "", false);
    let id = create_fixture(ctx, &payload).await?;
    let client = ctx.client();
    let lower = term.to_lowercase();
    ctx.step("search finds exactly matching titles", async {
        let resp = client.search(&lower).await?;
        ResponseAssertion::new()
            .status(200)
            .all_titles_contain(&term)
            .contains_item(id, Some(payload.title.as_str()))
            .verify("search finds exactly matching titles", &resp)
    })
    .await
}

async fn seeded_search(ctx: &mut ScenarioContext) -> ProbeResult<()> {
    let client = ctx.client();
    let seeds = [
        ToDoPayload::new(unique_title("Learn Playwright with Gherkin"), "BDD testing", false),
        ToDoPayload::new(unique_title("Practice BDD"), "Behavior Driven Development", true),
        ToDoPayload::new(unique_title("API Automation"), "REST API testing", false),
    ];
    let mut ids = Vec::with_capacity(seeds.len());
    for seed in &seeds {
        let id = ctx
            .create_step("seed item", seed, |resp| {
                ResponseAssertion::new().status(201).verify("seed item", resp)
            })
            .await?
            .ok_or_else(|| ProbeError::assertion("seed item", "service returned no item"))?;
        ids.push(id);
    }
    let playwright_id = ids[0];
    ctx.step("search returns relevant results", async {
        let resp = client.search(SEEDED_SEARCH_TERM).await?;
        ResponseAssertion::new()
            .status(200)
            .any_title_contains(SEEDED_SEARCH_TERM)
            .contains_item(playwright_id, None)
            .verify("search returns relevant results", &resp)
    })
    .await
}
