//! todo-probar: API test harness and load generator for a ToDo REST service.
//!
//! The service exposes a login endpoint issuing bearer tokens and a
//! `/api/ToDoItems` resource with create, get, list, search, update and
//! delete. This crate drives it end to end.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    todo-probar Architecture                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   ┌──────────┐    ┌───────────┐    ┌──────────────────────────┐   │
//! │   │ login    │───►│ token     │───►│ Session                  │   │
//! │   │ (auth)   │    │ file      │    │ ├─ run_crud              │   │
//! │   └──────────┘    └───────────┘    │ ├─ run_negative (conc.)  │   │
//! │                                    │ └─ run_properties (seq.) │   │
//! │                                    └──────────────────────────┘   │
//! │   ┌──────────┐    ┌───────────┐    ┌──────────────────────────┐   │
//! │   │ Load     │───►│ LoadTest  │───►│ report: JSON / Markdown  │   │
//! │   │ Profile  │    │ (VUs)     │    │ performance.md           │   │
//! │   └──────────┘    └───────────┘    └──────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Scenarios run against a shared remote service whose state is never reset,
//! so every created item gets a collision-safe title from [`unique_title`]
//! and is deleted during scenario teardown.

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

/// Response assertions for ToDo API calls
pub mod assertion;

/// Login and token persistence
pub mod auth;

/// HTTP client for the ToDo API
pub mod client;

/// Environment-driven configuration
pub mod config;

/// Virtual-user load generation
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod loadtest;

/// Wire types
pub mod model;

/// Negative-path checks
pub mod negative;

/// Behavioral properties
pub mod properties;

/// JSON, Markdown and console reports
pub mod report;

mod result;

/// Scenario runner and CRUD flow
pub mod scenario;

/// Shared run context
pub mod session;

/// Collision-safe titles
pub mod title;

pub use assertion::{AssertionResult, CheckKind, ResponseAssertion, StatusExpectation};
pub use auth::{login, login_and_store, AuthToken, TokenStore};
pub use client::{ApiResponse, ToDoClient};
pub use config::{Credentials, HarnessConfig};
pub use loadtest::{
    Executor, LatencyThreshold, LoadProfile, LoadTest, LoadTestResult, Population,
    PopulationResult, Stage, ThresholdResult, Workload,
};
pub use model::{ToDoItem, ToDoPayload};
pub use negative::{run_negative, NegativeCheck};
pub use properties::{run_properties, Property};
pub use result::{ProbeError, ProbeResult};
pub use scenario::{
    run_crud, CrudState, FixtureSlot, ScenarioContext, ScenarioReport, StepReport, SuiteReport,
};
pub use session::Session;
pub use title::unique_title;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        login, login_and_store, run_crud, run_negative, run_properties, unique_title,
        HarnessConfig, LoadProfile, LoadTest, ProbeError, ProbeResult, ResponseAssertion,
        ScenarioReport, Session, SuiteReport, ToDoClient, ToDoPayload,
    };
}
