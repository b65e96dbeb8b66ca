//! Scenario catalogue
//!
//! Scenarios are plain async functions registered in a static table. Each
//! one gets a fresh browser session prepared by its [`Fixture`] and
//! returns an [`Outcome`]; any `Err` fails it.

pub mod auth;
pub mod feeds;
pub mod summary;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use futures::future::BoxFuture;
use regex::Regex;

use crate::config::E2eConfig;
use crate::driver::Driver;
use crate::error::{E2eError, E2eResult};
use crate::fixtures::Fixture;
use crate::pages::{AuthPage, BasePage, DashboardPage, FeedPage, SummaryPage};

/// Fail the scenario with [`E2eError::AssertionFailed`] unless `cond` holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::E2eError::AssertionFailed(format!($($arg)+)));
        }
    };
}

/// How a scenario body finished, short of failing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Skipped(String),
}

pub type ScenarioFuture = BoxFuture<'static, E2eResult<Outcome>>;
pub type ScenarioBody = fn(ScenarioContext) -> ScenarioFuture;

/// One registered end-to-end scenario
#[derive(Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub suite: &'static str,
    pub tags: &'static [&'static str],
    pub fixture: Fixture,

    /// Overrides the configured per-scenario budget
    pub timeout: Option<Duration>,

    pub body: ScenarioBody,
}

impl Scenario {
    /// Suite name counts as a tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.suite == tag || self.tags.contains(&tag)
    }

    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("suite", &self.suite)
            .field("tags", &self.tags)
            .field("fixture", &self.fixture)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Everything a scenario body gets to work with
#[derive(Clone)]
pub struct ScenarioContext {
    pub driver: Arc<dyn Driver>,
    pub config: Arc<E2eConfig>,
}

impl ScenarioContext {
    pub fn new(driver: Arc<dyn Driver>, config: Arc<E2eConfig>) -> Self {
        Self { driver, config }
    }

    pub fn base(&self) -> BasePage {
        BasePage::new(self.driver.clone(), &self.config)
    }

    pub fn auth(&self) -> AuthPage {
        AuthPage::new(self.driver.clone(), &self.config)
    }

    pub fn dashboard(&self) -> DashboardPage {
        DashboardPage::new(self.driver.clone(), &self.config)
    }

    pub fn feeds(&self) -> FeedPage {
        FeedPage::new(self.driver.clone(), &self.config)
    }

    pub fn summary(&self) -> SummaryPage {
        SummaryPage::new(self.driver.clone(), &self.config)
    }
}

/// Every scenario, in suite order.
pub fn all() -> Vec<Scenario> {
    let mut scenarios = auth::scenarios();
    scenarios.extend(feeds::scenarios());
    scenarios.extend(summary::scenarios());
    scenarios
}

/// Case-insensitive regex check on an observed message.
pub fn ensure_matches(what: &str, text: &str, pattern: &str) -> E2eResult<()> {
    let re = Regex::new(&format!("(?i){}", pattern))
        .map_err(|e| E2eError::AssertionFailed(format!("bad pattern {:?}: {}", pattern, e)))?;
    ensure!(re.is_match(text), "{} {:?} does not match /{}/", what, text, pattern);
    Ok(())
}

/// Unwrap an optional observation or fail with `what`.
pub fn require<T>(value: Option<T>, what: &str) -> E2eResult<T> {
    value.ok_or_else(|| E2eError::AssertionFailed(format!("expected {}", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalogue_names_are_unique() {
        let scenarios = all();
        let names: HashSet<_> = scenarios.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), scenarios.len());
        assert_eq!(scenarios.iter().filter(|s| s.suite == "auth").count(), 7);
        assert_eq!(scenarios.iter().filter(|s| s.suite == "feeds").count(), 16);
        assert_eq!(scenarios.iter().filter(|s| s.suite == "summary").count(), 2);
    }

    #[test]
    fn long_running_scenarios_extend_their_budget() {
        let slow: Vec<_> = all()
            .into_iter()
            .filter(|s| s.timeout == Some(Duration::from_secs(60)))
            .map(|s| s.name)
            .collect();
        assert_eq!(
            slow,
            vec![
                "filter-only-working-feeds",
                "status-pending-to-ok",
                "fetch-error-handling",
                "generate-summary-with-timestamp"
            ]
        );
    }

    #[test]
    fn status_scenarios_outlast_login_setup_and_status_wait() {
        let timeouts = crate::pages::testing::config().timeouts;
        let needed = timeouts.navigation + timeouts.action * 2 + timeouts.feed_status;
        for scenario in all().into_iter().filter(|s| s.has_tag("status")) {
            assert!(
                scenario.timeout_or(timeouts.scenario) > needed,
                "{} budget does not cover its status wait",
                scenario.name
            );
        }
    }

    #[test]
    fn suite_name_acts_as_tag() {
        let scenario = all().into_iter().find(|s| s.name == "login-page-renders").unwrap();
        assert!(scenario.has_tag("auth"));
        assert!(scenario.has_tag("smoke"));
        assert!(!scenario.has_tag("feeds"));
    }

    #[test]
    fn message_matching_is_case_insensitive() {
        assert!(ensure_matches("name error", "This field is Required", "(required|cannot be empty)").is_ok());
        let err = ensure_matches("url error", "Looks fine", "(invalid|valid url|https)").unwrap_err();
        assert!(matches!(err, E2eError::AssertionFailed(_)));
    }
}
