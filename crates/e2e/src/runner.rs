//! Main test runner that orchestrates the server, browsers and scenarios

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::E2eConfig;
use crate::driver::cdp::{BrowserSettings, CdpLauncher};
use crate::driver::{Driver, Launcher};
use crate::error::{E2eError, E2eResult};
use crate::server::{ServerConfig, ServerHandle};
use crate::suites::{Outcome, Scenario, ScenarioContext};
use crate::teardown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub suite: String,
    pub status: TestStatus,
    pub duration_ms: u64,

    /// Failure message, or the reason for a skip
    pub error: Option<String>,

    /// Full-page capture taken when the scenario failed
    pub screenshot: Option<PathBuf>,
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    fn from_results(started_at: DateTime<Utc>, duration: Duration, results: Vec<TestResult>) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        Self {
            started_at,
            total: results.len(),
            passed: count(TestStatus::Passed),
            failed: count(TestStatus::Failed),
            skipped: count(TestStatus::Skipped),
            duration_ms: duration.as_millis() as u64,
            results,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Narrows the catalogue; empty filter selects everything
#[derive(Debug, Clone, Default)]
pub struct ScenarioFilter {
    pub name: Option<String>,
    pub tag: Option<String>,
}

impl ScenarioFilter {
    pub fn matches(&self, scenario: &Scenario) -> bool {
        self.name.as_deref().map_or(true, |n| scenario.name == n)
            && self.tag.as_deref().map_or(true, |t| scenario.has_tag(t))
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub harness: E2eConfig,
    pub server: ServerConfig,
    pub browser: BrowserSettings,
    pub output_dir: PathBuf,

    /// Scenarios in flight at once, each with its own browser
    pub workers: usize,
}

impl RunnerConfig {
    /// Defaults derived from the harness config: one worker on CI, half
    /// the available cores otherwise.
    pub fn new(harness: E2eConfig) -> Self {
        let workers = if harness.ci {
            1
        } else {
            std::thread::available_parallelism()
                .map(|n| (n.get() / 2).max(1))
                .unwrap_or(1)
        };
        Self {
            server: ServerConfig::new(harness.base_url.clone(), harness.ci),
            browser: BrowserSettings::default(),
            output_dir: PathBuf::from("test-results"),
            workers,
            harness,
        }
    }
}

/// Main E2E test runner
pub struct TestRunner<L = CdpLauncher> {
    config: Arc<E2eConfig>,
    server_config: ServerConfig,
    launcher: L,
    server: Option<ServerHandle>,
    output_dir: PathBuf,
    workers: usize,
}

impl TestRunner<CdpLauncher> {
    pub fn with_config(config: RunnerConfig) -> Self {
        let launcher = CdpLauncher::new(config.browser.clone());
        Self::with_launcher(config, launcher)
    }
}

impl<L: Launcher> TestRunner<L> {
    pub fn with_launcher(config: RunnerConfig, launcher: L) -> Self {
        Self {
            config: Arc::new(config.harness),
            server_config: config.server,
            launcher,
            server: None,
            output_dir: config.output_dir,
            workers: config.workers.max(1),
        }
    }

    pub fn harness(&self) -> &E2eConfig {
        &self.config
    }

    fn screenshot_dir(&self) -> PathBuf {
        self.output_dir.join("screenshots")
    }

    /// Start (or reuse) the server
    pub async fn start_server(&mut self) -> E2eResult<()> {
        if self.server.is_some() {
            return Ok(());
        }
        self.server = Some(ServerHandle::ensure(&self.server_config).await?);
        Ok(())
    }

    /// Stop the server if this run spawned it
    pub fn stop_server(&mut self) {
        if let Some(mut server) = self.server.take() {
            server.stop();
        }
    }

    /// Catalogue entries matching `filter`, in catalogue order.
    pub fn select(&self, scenarios: Vec<Scenario>, filter: &ScenarioFilter) -> Vec<Scenario> {
        scenarios.into_iter().filter(|s| filter.matches(s)).collect()
    }

    /// Run `scenarios` with at most `workers` in flight. Results keep the
    /// input order.
    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> TestSuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        info!("Running {} scenario(s) on {} worker(s)...", scenarios.len(), self.workers);

        let results: Vec<TestResult> = stream::iter(scenarios)
            .map(|scenario| self.run_scenario(scenario))
            .buffered(self.workers)
            .collect()
            .await;

        let summary = TestSuiteResult::from_results(started_at, start.elapsed(), results);
        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            summary.passed, summary.failed, summary.skipped, summary.duration_ms
        );
        summary
    }

    /// Run one scenario in a fresh browser. Never fails: every error ends
    /// up in the returned result.
    pub async fn run_scenario(&self, scenario: &Scenario) -> TestResult {
        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name);

        let (status, error, screenshot) = match self.launcher.launch().await {
            Ok(driver) => {
                let outcome = self.execute(scenario, driver.clone()).await;
                let verdict = match outcome {
                    Ok(Outcome::Passed) => (TestStatus::Passed, None, None),
                    Ok(Outcome::Skipped(reason)) => (TestStatus::Skipped, Some(reason), None),
                    Err(e) => {
                        let shot = self.capture_failure(driver.as_ref(), scenario.name).await;
                        (TestStatus::Failed, Some(e.to_string()), shot)
                    }
                };
                if let Err(e) = driver.close().await {
                    warn!("Failed to close browser for {}: {}", scenario.name, e);
                }
                verdict
            }
            Err(e) => (TestStatus::Failed, Some(format!("browser launch failed: {}", e)), None),
        };

        let result = TestResult {
            name: scenario.name.to_string(),
            suite: scenario.suite.to_string(),
            status,
            duration_ms: start.elapsed().as_millis() as u64,
            error,
            screenshot,
        };
        match result.status {
            TestStatus::Passed => info!("✓ {} ({} ms)", result.name, result.duration_ms),
            TestStatus::Skipped => info!(
                "- {} skipped: {}",
                result.name,
                result.error.as_deref().unwrap_or("no reason given")
            ),
            TestStatus::Failed => error!(
                "✗ {} - {}",
                result.name,
                result.error.as_deref().unwrap_or("unknown error")
            ),
        }
        result
    }

    /// Fixture then body, bounded by the scenario budget.
    async fn execute(&self, scenario: &Scenario, driver: Arc<dyn Driver>) -> E2eResult<Outcome> {
        let budget = scenario.timeout_or(self.config.timeouts.scenario);
        let cx = ScenarioContext::new(driver.clone(), self.config.clone());
        let run = async {
            scenario.fixture.prepare(driver, &self.config).await?;
            (scenario.body)(cx).await
        };
        match tokio::time::timeout(budget, run).await {
            Ok(outcome) => outcome,
            Err(_) => Err(E2eError::deadline(
                format!("scenario {}", scenario.name),
                "completion",
                budget,
            )),
        }
    }

    async fn capture_failure(&self, driver: &dyn Driver, name: &str) -> Option<PathBuf> {
        let path = self.screenshot_dir().join(format!("{}.png", name));
        match driver.screenshot(&path).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("Could not capture failure screenshot for {}: {}", name, e);
                None
            }
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.output_dir, results)
    }

    /// Delete the test account's data. Runs once after all scenarios.
    pub async fn teardown(&self) -> E2eResult<()> {
        teardown::run_teardown(&self.config).await
    }
}

impl<L> Drop for TestRunner<L> {
    fn drop(&mut self) {
        if let Some(mut server) = self.server.take() {
            server.stop();
        }
    }
}

pub fn write_results(output_dir: &Path, results: &TestSuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("test-results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}
