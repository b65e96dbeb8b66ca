//! VibeFeeder E2E Test Framework
//!
//! This crate drives the VibeFeeder dashboard end to end:
//! - Reuses or spawns the dev server and waits for it to answer
//! - Runs one isolated Chromium per scenario over the DevTools protocol
//! - Exercises auth, feed management and summaries through page objects
//! - Observes remotely rendered state with deadline-bound polling
//! - Cleans the test account's rows out of the data plane afterwards
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── start_server() -> ServerHandle                       │
//! │    ├── run_scenarios([Scenario]) -> TestSuiteResult         │
//! │    │     └── Launcher::launch() -> Arc<dyn Driver>          │
//! │    ├── write_results() -> test-results.json                 │
//! │    └── teardown() -> TeardownClient::cleanup()              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario                                                   │
//! │    ├── name, suite, tags, timeout                           │
//! │    ├── fixture: Anonymous | LoginPage | Authenticated       │
//! │    └── body(ScenarioContext) -> Outcome                     │
//! │          └── AuthPage / DashboardPage / FeedPage /          │
//! │              SummaryPage -> Locator -> poll_until           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod fixtures;
pub mod pages;
pub mod runner;
pub mod server;
pub mod suites;
pub mod teardown;
pub mod wait;

pub use config::E2eConfig;
pub use error::{E2eError, E2eResult};
pub use runner::{RunnerConfig, ScenarioFilter, TestRunner, TestSuiteResult};
pub use suites::{Outcome, Scenario};
pub use wait::{poll_until, Condition, Sample, WaitPolicy};
