//! Dashboard shell: heading, add-feed entry point, logout

use std::sync::Arc;

use super::BasePage;
use crate::config::E2eConfig;
use crate::driver::{Driver, Locator};
use crate::error::E2eResult;

pub struct DashboardPage {
    pub base: BasePage,
    pub page_title: Locator,
    pub add_feed_button: Locator,
    pub feed_list: Locator,
    pub logout_button: Locator,
}

impl DashboardPage {
    pub fn new(driver: Arc<dyn Driver>, config: &E2eConfig) -> Self {
        let base = BasePage::new(driver, config);
        Self {
            page_title: base.locator("h1"),
            add_feed_button: base.locator("button, a").has_text("Add Feed"),
            feed_list: base.locator("[data-testid=\"feed-list\"], .feed-list"),
            logout_button: base.locator("button, a").has_text("Logout"),
            base,
        }
    }

    pub async fn goto_dashboard(&self) -> E2eResult<()> {
        self.base.goto("/dashboard").await
    }

    /// True once the browser is on the dashboard; a redirect elsewhere
    /// within the navigation timeout yields `false`.
    pub async fn is_logged_in(&self) -> E2eResult<bool> {
        match self
            .base
            .wait_for_url("**/dashboard", self.base.timeouts().navigation)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_deadline() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn page_title(&self) -> E2eResult<String> {
        Ok(self.page_title.text_content().await?.unwrap_or_default())
    }

    pub async fn click_add_feed(&self) -> E2eResult<()> {
        self.add_feed_button.click().await
    }

    pub async fn logout(&self) -> E2eResult<()> {
        self.logout_button.click().await?;
        self.base
            .wait_for_url("**/login", self.base.timeouts().navigation)
            .await?;
        Ok(())
    }
}
