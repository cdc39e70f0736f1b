//! Virtual-user load generation against the ToDo service.
//!
//! A [`LoadProfile`] is a set of populations running side by side. Each
//! population has a workload (list or create), a think-time and an executor
//! that decides how many virtual users are active at any moment. A controller
//! per population ticks, computes the target user count and spawns or retires
//! users to match it. Users share nothing but the token.

use crate::auth::{login, AuthToken};
use crate::client::ToDoClient;
use crate::config::Credentials;
use crate::result::{ProbeError, ProbeResult};
use crate::title::unique_title;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// One ramp segment: move linearly to `target` users over `duration_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Segment length in milliseconds
    pub duration_ms: u64,
    /// User count at the end of the segment
    pub target: u32,
}

impl Stage {
    /// Create a stage
    #[must_use]
    pub const fn new(duration: Duration, target: u32) -> Self {
        Self {
            duration_ms: duration.as_millis() as u64,
            target,
        }
    }
}

/// How many users a population runs over time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Executor {
    /// Linear ramps between stage targets
    RampingVus {
        /// Users before the first stage
        #[serde(default)]
        start_vus: u32,
        /// Ramp segments, in order
        stages: Vec<Stage>,
    },
    /// A fixed number of users for a fixed time
    ConstantVus {
        /// Number of users
        vus: u32,
        /// Run time in milliseconds
        duration_ms: u64,
    },
}

impl Executor {
    /// Total run time
    #[must_use]
    pub fn duration(&self) -> Duration {
        match self {
            Self::RampingVus { stages, .. } => {
                Duration::from_millis(stages.iter().map(|s| s.duration_ms).sum())
            }
            Self::ConstantVus { duration_ms, .. } => Duration::from_millis(*duration_ms),
        }
    }

    /// Target user count `elapsed` into the run
    #[must_use]
    pub fn target_at(&self, elapsed: Duration) -> u32 {
        match self {
            Self::ConstantVus { vus, duration_ms } => {
                if elapsed.as_millis() < u128::from(*duration_ms) {
                    *vus
                } else {
                    0
                }
            }
            Self::RampingVus { start_vus, stages } => {
                let mut offset = elapsed.as_millis() as u64;
                let mut from = *start_vus;
                for stage in stages {
                    if offset < stage.duration_ms {
                        let progress = offset as f64 / stage.duration_ms as f64;
                        let range = f64::from(stage.target) - f64::from(from);
                        return (f64::from(from) + range * progress).round() as u32;
                    }
                    offset -= stage.duration_ms;
                    from = stage.target;
                }
                0
            }
        }
    }

    /// Highest user count the executor ever asks for
    #[must_use]
    pub fn peak(&self) -> u32 {
        match self {
            Self::ConstantVus { vus, .. } => *vus,
            Self::RampingVus { start_vus, stages } => stages
                .iter()
                .map(|s| s.target)
                .chain(std::iter::once(*start_vus))
                .max()
                .unwrap_or(0),
        }
    }

    fn scaled(&self, factor: f64) -> Self {
        let scale = |ms: u64| ((ms as f64) * factor).round().max(1.0) as u64;
        match self {
            Self::ConstantVus { vus, duration_ms } => Self::ConstantVus {
                vus: *vus,
                duration_ms: scale(*duration_ms),
            },
            Self::RampingVus { start_vus, stages } => Self::RampingVus {
                start_vus: *start_vus,
                stages: stages
                    .iter()
                    .map(|s| Stage {
                        duration_ms: scale(s.duration_ms),
                        target: s.target,
                    })
                    .collect(),
            },
        }
    }
}

/// What a virtual user does each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workload {
    /// Authenticated list, expecting 200
    List,
    /// Create with a unique title, expecting 201 or 200
    Create,
}

impl Workload {
    async fn execute(self, client: &ToDoClient) -> RequestRecord {
        let result = match self {
            Self::List => client.list().await,
            Self::Create => {
                let payload = crate::model::ToDoPayload::new(
                    unique_title("Zadatak"),
                    "Load test with unique title",
                    false,
                );
                client.create(&payload).await
            }
        };
        match result {
            Ok(resp) => RequestRecord {
                latency: resp.latency,
                check_passed: self.accepts(resp.status),
                transport_error: false,
            },
            Err(e) => {
                tracing::debug!(error = %e, "request failed");
                RequestRecord {
                    latency: Duration::ZERO,
                    check_passed: false,
                    transport_error: true,
                }
            }
        }
    }

    /// Whether a response status passes this workload's check
    #[must_use]
    pub const fn accepts(self, status: u16) -> bool {
        match self {
            Self::List => status == 200,
            Self::Create => status == 201 || status == 200,
        }
    }
}

/// A group of identical virtual users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Population {
    /// Name used in reports
    pub name: String,
    /// Per-iteration action
    pub workload: Workload,
    /// Pause between iterations in milliseconds
    pub think_time_ms: u64,
    /// User schedule
    pub executor: Executor,
}

/// Latency bound over all requests of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyThreshold {
    /// Percentile in (0, 100]
    pub percentile: f64,
    /// Upper bound in milliseconds (exclusive)
    pub max_ms: f64,
}

impl LatencyThreshold {
    /// `p(95) < max_ms`
    #[must_use]
    pub const fn p95(max_ms: f64) -> Self {
        Self {
            percentile: 95.0,
            max_ms,
        }
    }

    /// Description in the form `p(95)<500`
    #[must_use]
    pub fn description(&self) -> String {
        format!("p({})<{}", self.percentile, self.max_ms)
    }
}

fn default_tick_ms() -> u64 {
    100
}

/// A complete load test definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadProfile {
    /// Name used in reports
    pub name: String,
    /// Populations running concurrently
    pub populations: Vec<Population>,
    /// Thresholds applied across every request
    #[serde(default)]
    pub thresholds: Vec<LatencyThreshold>,
    /// Controller tick in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl LoadProfile {
    /// Ramp readers 0 → 100 over 20s, hold 40s, ramp down over 20s; 1s think-time.
    #[must_use]
    pub fn uniform_read() -> Self {
        Self {
            name: "uniform-read".to_string(),
            populations: vec![Population {
                name: "readers".to_string(),
                workload: Workload::List,
                think_time_ms: 1000,
                executor: Executor::RampingVus {
                    start_vus: 0,
                    stages: vec![
                        Stage::new(Duration::from_secs(20), 100),
                        Stage::new(Duration::from_secs(40), 100),
                        Stage::new(Duration::from_secs(20), 0),
                    ],
                },
            }],
            thresholds: vec![LatencyThreshold::p95(500.0)],
            tick_ms: default_tick_ms(),
        }
    }

    /// 15 readers and 5 writers for one minute.
    #[must_use]
    pub fn mixed() -> Self {
        Self {
            name: "mixed-read-write".to_string(),
            populations: vec![
                Population {
                    name: "readers".to_string(),
                    workload: Workload::List,
                    think_time_ms: 1000,
                    executor: Executor::ConstantVus {
                        vus: 15,
                        duration_ms: 60_000,
                    },
                },
                Population {
                    name: "writers".to_string(),
                    workload: Workload::Create,
                    think_time_ms: 2000,
                    executor: Executor::ConstantVus {
                        vus: 5,
                        duration_ms: 60_000,
                    },
                },
            ],
            thresholds: vec![LatencyThreshold::p95(500.0)],
            tick_ms: default_tick_ms(),
        }
    }

    /// Parse and validate a profile from YAML
    pub fn from_yaml(yaml: &str) -> ProbeResult<Self> {
        let profile: Self =
            serde_yaml_ng::from_str(yaml).map_err(|e| ProbeError::invalid_profile(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load and validate a profile from a YAML file
    pub fn load(path: &std::path::Path) -> ProbeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        serde_yaml_ng::to_string(self).map_err(|e| ProbeError::invalid_profile(e.to_string()))
    }

    /// Longest population run time
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.populations
            .iter()
            .map(|p| p.executor.duration())
            .max()
            .unwrap_or_default()
    }

    /// Copy with every executor duration multiplied by `factor`
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        let mut scaled = self.clone();
        for population in &mut scaled.populations {
            population.executor = population.executor.scaled(factor);
        }
        scaled
    }

    /// Check the profile is runnable
    pub fn validate(&self) -> ProbeResult<()> {
        if self.populations.is_empty() {
            return Err(ProbeError::invalid_profile("profile has no populations"));
        }
        if self.tick_ms == 0 {
            return Err(ProbeError::invalid_profile("tick_ms must be positive"));
        }
        for population in &self.populations {
            if population.executor.duration().is_zero() {
                return Err(ProbeError::invalid_profile(format!(
                    "population {} has zero duration",
                    population.name
                )));
            }
            if let Executor::RampingVus { stages, .. } = &population.executor {
                if stages.is_empty() {
                    return Err(ProbeError::invalid_profile(format!(
                        "population {} has no stages",
                        population.name
                    )));
                }
            }
        }
        for threshold in &self.thresholds {
            if !(threshold.percentile > 0.0 && threshold.percentile <= 100.0) {
                return Err(ProbeError::invalid_profile(format!(
                    "threshold percentile {} is outside (0, 100]",
                    threshold.percentile
                )));
            }
        }
        Ok(())
    }
}

/// Individual request timing record.
#[derive(Debug, Clone, Copy)]
struct RequestRecord {
    latency: Duration,
    check_passed: bool,
    transport_error: bool,
}

/// Per-population summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationResult {
    /// Population name
    pub name: String,
    /// Workload
    pub workload: Workload,
    /// Requests that received a response
    pub requests: u64,
    /// Responses passing the workload check
    pub checks_passed: u64,
    /// Responses failing the workload check
    pub checks_failed: u64,
    /// Requests without a response
    pub transport_errors: u64,
    /// Most users active at once
    pub max_vus: u32,
    /// Median latency (ms)
    pub latency_p50_ms: f64,
    /// 95th percentile latency (ms)
    pub latency_p95_ms: f64,
}

/// Outcome of one threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdResult {
    /// Threshold in `p(95)<500` form
    pub description: String,
    /// Measured percentile (ms)
    pub actual_ms: f64,
    /// Whether the bound held
    pub passed: bool,
}

/// Results from a load test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadTestResult {
    /// Profile name
    pub profile_name: String,
    /// Whether the one-time login produced a token
    pub token_acquired: bool,
    /// Requests that received a response
    pub total_requests: u64,
    /// Responses passing their check
    pub checks_passed: u64,
    /// Responses failing their check
    pub checks_failed: u64,
    /// Requests without a response
    pub transport_errors: u64,
    /// Requests per second (throughput).
    pub throughput_rps: f64,
    /// Median latency (ms).
    pub latency_p50_ms: f64,
    /// 90th percentile latency (ms).
    pub latency_p90_ms: f64,
    /// 95th percentile latency (ms).
    pub latency_p95_ms: f64,
    /// 99th percentile latency (ms).
    pub latency_p99_ms: f64,
    /// Slowest request (ms).
    pub latency_max_ms: f64,
    /// Total elapsed wall time (seconds).
    pub elapsed_secs: f64,
    /// ISO 8601 timestamp of the run.
    pub timestamp: String,
    /// Per-population breakdown
    pub populations: Vec<PopulationResult>,
    /// Threshold outcomes
    pub thresholds: Vec<ThresholdResult>,
}

impl LoadTestResult {
    /// A run passes when a token was obtained, the service answered at
    /// least one request and every threshold held
    #[must_use]
    pub fn passed(&self) -> bool {
        self.token_acquired
            && self.total_requests > 0
            && self.thresholds.iter().all(|t| t.passed)
    }

    /// Share of responses failing their check, in percent
    #[must_use]
    pub fn check_failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.checks_failed as f64 / self.total_requests as f64 * 100.0
        }
    }
}

/// Load test executor.
#[derive(Debug)]
pub struct LoadTest {
    client: ToDoClient,
    credentials: Credentials,
    profile: LoadProfile,
}

struct PopulationRun {
    records: Vec<RequestRecord>,
    max_vus: u32,
}

impl LoadTest {
    /// Create a new load test. `client` should carry no token; one is obtained at start.
    pub fn new(client: ToDoClient, credentials: Credentials, profile: LoadProfile) -> Self {
        Self {
            client,
            credentials,
            profile,
        }
    }

    /// The profile being run
    pub const fn profile(&self) -> &LoadProfile {
        &self.profile
    }

    /// Log in once, run every population and aggregate the results.
    ///
    /// A failed login is not an error: users skip their iterations and the
    /// result reports `token_acquired = false`.
    pub async fn run(&self) -> ProbeResult<LoadTestResult> {
        self.profile.validate()?;
        let token = self.setup().await;
        let active = token.is_some();
        let client = match &token {
            Some(token) => self.client.clone().with_token(token.as_str()),
            None => self.client.clone(),
        };

        tracing::info!(
            profile = %self.profile.name,
            duration_secs = self.profile.duration().as_secs_f64(),
            "load test started"
        );
        let start = Instant::now();
        let tick = Duration::from_millis(self.profile.tick_ms);
        let runs = join_all(
            self.profile
                .populations
                .iter()
                .map(|p| run_population(client.clone(), p.clone(), tick, active)),
        )
        .await;
        let elapsed = start.elapsed().as_secs_f64();

        let result = aggregate_results(&self.profile, &runs, elapsed, active);
        tracing::info!(
            profile = %result.profile_name,
            requests = result.total_requests,
            p95_ms = result.latency_p95_ms,
            passed = result.passed(),
            "load test finished"
        );
        Ok(result)
    }

    async fn setup(&self) -> Option<AuthToken> {
        match login(&self.client, &self.credentials).await {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::error!(error = %e, "login failed, virtual users will not run");
                None
            }
        }
    }
}

async fn run_population(
    client: ToDoClient,
    population: Population,
    tick: Duration,
    active: bool,
) -> PopulationRun {
    if !active {
        return PopulationRun {
            records: Vec::new(),
            max_vus: 0,
        };
    }

    let duration = population.executor.duration();
    let start = Instant::now();
    let deadline = start + duration;
    let target = Arc::new(AtomicU32::new(0));
    let think = Duration::from_millis(population.think_time_ms);
    let mut slots: Vec<Option<JoinHandle<Vec<RequestRecord>>>> = Vec::new();
    let mut retired = Vec::new();
    let mut max_vus = 0;
    let mut ticker = tokio::time::interval(tick);

    loop {
        ticker.tick().await;
        let elapsed = start.elapsed();
        if elapsed >= duration {
            target.store(0, Ordering::Relaxed);
            break;
        }
        let want = population.executor.target_at(elapsed);
        target.store(want, Ordering::Relaxed);

        let want = want as usize;
        if slots.len() < want {
            slots.resize_with(want, || None);
        }
        for (index, slot) in slots.iter_mut().enumerate().take(want) {
            let running = slot.as_ref().is_some_and(|h| !h.is_finished());
            if running {
                continue;
            }
            if let Some(done) = slot.take() {
                retired.push(done);
            }
            *slot = Some(tokio::spawn(virtual_user(
                index as u32,
                client.clone(),
                population.workload,
                think,
                Arc::clone(&target),
                deadline,
            )));
        }
        let active_now = slots
            .iter()
            .filter(|s| s.as_ref().is_some_and(|h| !h.is_finished()))
            .count() as u32;
        max_vus = max_vus.max(active_now);
    }

    let mut records = Vec::new();
    for handle in slots.into_iter().flatten().chain(retired) {
        if let Ok(vu_records) = handle.await {
            records.extend(vu_records);
        }
    }
    PopulationRun { records, max_vus }
}

async fn virtual_user(
    index: u32,
    client: ToDoClient,
    workload: Workload,
    think: Duration,
    target: Arc<AtomicU32>,
    deadline: Instant,
) -> Vec<RequestRecord> {
    let mut records = Vec::new();
    while index < target.load(Ordering::Relaxed) && Instant::now() < deadline {
        records.push(workload.execute(&client).await);
        let remaining = deadline.saturating_duration_since(Instant::now());
        tokio::time::sleep(think.min(remaining)).await;
    }
    records
}

/// Aggregate individual request records into summary statistics.
fn aggregate_results(
    profile: &LoadProfile,
    runs: &[PopulationRun],
    elapsed_secs: f64,
    token_acquired: bool,
) -> LoadTestResult {
    let all: Vec<RequestRecord> = runs.iter().flat_map(|r| r.records.iter().copied()).collect();
    let latencies = sorted_latencies(&all);

    let answered = all.iter().filter(|r| !r.transport_error).count() as u64;
    let checks_passed = all.iter().filter(|r| r.check_passed).count() as u64;
    let transport_errors = all.len() as u64 - answered;

    let throughput_rps = if elapsed_secs > 0.0 {
        answered as f64 / elapsed_secs
    } else {
        0.0
    };

    let populations = profile
        .populations
        .iter()
        .zip(runs)
        .map(|(population, run)| {
            let lat = sorted_latencies(&run.records);
            let requests = run.records.iter().filter(|r| !r.transport_error).count() as u64;
            let passed = run.records.iter().filter(|r| r.check_passed).count() as u64;
            PopulationResult {
                name: population.name.clone(),
                workload: population.workload,
                requests,
                checks_passed: passed,
                checks_failed: requests - passed,
                transport_errors: run.records.len() as u64 - requests,
                max_vus: run.max_vus,
                latency_p50_ms: percentile(&lat, 0.50),
                latency_p95_ms: percentile(&lat, 0.95),
            }
        })
        .collect();

    let thresholds = profile
        .thresholds
        .iter()
        .map(|t| {
            let actual_ms = percentile(&latencies, t.percentile / 100.0);
            // No answered request means no latency to hold the limit against.
            ThresholdResult {
                description: t.description(),
                actual_ms,
                passed: !latencies.is_empty() && actual_ms < t.max_ms,
            }
        })
        .collect();

    LoadTestResult {
        profile_name: profile.name.clone(),
        token_acquired,
        total_requests: answered,
        checks_passed,
        checks_failed: answered - checks_passed,
        transport_errors,
        throughput_rps,
        latency_p50_ms: percentile(&latencies, 0.50),
        latency_p90_ms: percentile(&latencies, 0.90),
        latency_p95_ms: percentile(&latencies, 0.95),
        latency_p99_ms: percentile(&latencies, 0.99),
        latency_max_ms: latencies.last().copied().unwrap_or(0.0),
        elapsed_secs,
        timestamp: chrono::Utc::now().to_rfc3339(),
        populations,
        thresholds,
    }
}

fn sorted_latencies(records: &[RequestRecord]) -> Vec<f64> {
    let mut latencies: Vec<f64> = records
        .iter()
        .filter(|r| !r.transport_error)
        .map(|r| r.latency.as_secs_f64() * 1000.0)
        .collect();
    latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    latencies
}

/// Compute a percentile from a sorted slice. Returns 0.0 for empty slices.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
