//! Page objects for the dashboard UI
//!
//! Each page wraps a [`BasePage`] and exposes named locators plus the
//! user-level actions the scenarios need. Pages are cheap to build and
//! share the scenario's driver.

pub mod auth;
pub mod dashboard;
pub mod feed;
pub mod summary;

pub use auth::AuthPage;
pub use dashboard::DashboardPage;
pub use feed::{FeedPage, FeedRef, FeedStatus, StatusFilter};
pub use summary::SummaryPage;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use reqwest::Url;
use tracing::debug;

use crate::config::{E2eConfig, Timeouts};
use crate::driver::{selector, wait_for_url, Driver, Locator};
use crate::error::{E2eError, E2eResult};

/// Shared navigation and lookup helpers
#[derive(Clone)]
pub struct BasePage {
    driver: Arc<dyn Driver>,
    base_url: Url,
    timeouts: Timeouts,
    screenshot_dir: PathBuf,
}

impl BasePage {
    pub fn new(driver: Arc<dyn Driver>, config: &E2eConfig) -> Self {
        Self {
            driver,
            base_url: config.base_url.clone(),
            timeouts: config.timeouts.clone(),
            screenshot_dir: PathBuf::from("screenshots"),
        }
    }

    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = dir.into();
        self
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Resolve `path` against the base URL.
    pub fn url_for(&self, path: &str) -> E2eResult<String> {
        self.base_url
            .join(path)
            .map(String::from)
            .map_err(|e| E2eError::InvalidConfig(format!("cannot join {:?} to {}: {}", path, self.base_url, e)))
    }

    pub async fn goto(&self, path: &str) -> E2eResult<()> {
        let url = self.url_for(path)?;
        debug!("Navigating to {}", url);
        self.driver.goto(&url).await
    }

    pub async fn reload(&self) -> E2eResult<()> {
        self.driver.reload().await
    }

    pub async fn title(&self) -> E2eResult<String> {
        self.driver.title().await
    }

    pub async fn url(&self) -> E2eResult<String> {
        self.driver.current_url().await
    }

    pub fn locator(&self, css: &str) -> Locator {
        Locator::new(self.driver.clone(), css, self.timeouts.action)
    }

    pub fn by_test_id(&self, id: &str) -> Locator {
        self.locator(&selector::test_id(id))
    }

    pub async fn wait_for_url(&self, pattern: &str, timeout: Duration) -> E2eResult<String> {
        wait_for_url(self.driver.as_ref(), pattern, timeout).await
    }

    /// Full-page PNG at `<screenshot_dir>/<name>.png`.
    pub async fn screenshot(&self, name: &str) -> E2eResult<PathBuf> {
        let path = self.screenshot_dir.join(format!("{}.png", name));
        self.driver.screenshot(&path).await?;
        Ok(path)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::FakeElement;

    #[tokio::test]
    async fn goto_resolves_against_base_url() {
        let driver = testing::driver();
        let page = BasePage::new(driver.clone(), &testing::config());

        page.goto("/dashboard").await.unwrap();

        assert_eq!(driver.visited(), vec!["http://localhost:8081/dashboard".to_string()]);
    }

    #[tokio::test]
    async fn screenshot_lands_in_configured_dir() {
        let driver = testing::driver();
        let page = BasePage::new(driver.clone(), &testing::config()).with_screenshot_dir("out/shots");

        let path = page.screenshot("login-page").await.unwrap();

        assert_eq!(path, PathBuf::from("out/shots/login-page.png"));
        assert_eq!(driver.screenshots(), vec![path]);
    }

    #[tokio::test]
    async fn by_test_id_builds_attribute_selector() {
        let driver = testing::driver();
        driver.insert(FakeElement::test_id("feed-form").text("form"));
        let page = BasePage::new(driver, &testing::config());

        let locator = page.by_test_id("feed-form");
        assert_eq!(locator.selector(), "[data-testid=\"feed-form\"]");
        assert_eq!(locator.count().await.unwrap(), 1);
    }
}
