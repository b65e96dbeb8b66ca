//! Summary button and modal

use std::sync::Arc;
use std::time::Duration;

use super::BasePage;
use crate::config::E2eConfig;
use crate::driver::{Driver, ElementState, Locator};
use crate::error::E2eResult;

const QUICK_CHECK: Duration = Duration::from_secs(2);
const MODAL_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SummaryPage {
    pub base: BasePage,
    pub summary_button: Locator,
    pub summary_button_disabled: Locator,
    pub modal: Locator,
    pub modal_content: Locator,
    pub modal_title: Locator,
    pub content: Locator,
    pub timestamp: Locator,
    pub empty_state: Locator,
    pub error_state: Locator,
    pub generate_button: Locator,
    pub close_button: Locator,
}

impl SummaryPage {
    pub fn new(driver: Arc<dyn Driver>, config: &E2eConfig) -> Self {
        let base = BasePage::new(driver, config);
        Self {
            summary_button: base.by_test_id("summary-button"),
            summary_button_disabled: base.by_test_id("summary-button-disabled"),
            modal: base.locator("#summary-modal"),
            modal_content: base.by_test_id("summary-modal-content"),
            modal_title: base.locator("#summary-modal-title"),
            content: base.by_test_id("summary-content"),
            timestamp: base.by_test_id("summary-timestamp"),
            empty_state: base.by_test_id("summary-empty-state"),
            error_state: base.by_test_id("summary-error-state"),
            generate_button: base.by_test_id("summary-generate-button"),
            close_button: base.locator("#summary-modal .btn-circle.btn-ghost"),
            base,
        }
    }

    pub async fn open_summary_modal(&self) -> E2eResult<()> {
        self.summary_button.click().await?;
        self.modal_content
            .wait_for(ElementState::Visible, self.base.timeouts().action)
            .await
    }

    /// The disabled variant is rendered only while the user has no feeds.
    pub async fn is_summary_button_disabled(&self) -> E2eResult<bool> {
        Ok(self.summary_button_disabled.count().await? > 0)
    }

    pub async fn is_summary_button_enabled(&self) -> E2eResult<bool> {
        self.summary_button.is_visible_within(QUICK_CHECK).await
    }

    pub async fn generate_summary(&self) -> E2eResult<()> {
        self.generate_button.click().await
    }

    /// Summary body without its leading timestamp line, or `None` if
    /// nothing rendered within the summary timeout.
    pub async fn summary_content(&self) -> E2eResult<Option<String>> {
        if !self
            .content
            .is_visible_within(self.base.timeouts().summary)
            .await?
        {
            return Ok(None);
        }
        let text = self.content.text_content().await?.unwrap_or_default();
        Ok(strip_first_line(&text))
    }

    pub async fn summary_timestamp(&self) -> E2eResult<Option<String>> {
        if !self.timestamp.is_visible_within(MODAL_TIMEOUT).await? {
            return Ok(None);
        }
        self.timestamp.text_content().await
    }

    pub async fn is_empty_state_displayed(&self) -> E2eResult<bool> {
        self.empty_state.is_visible_within(MODAL_TIMEOUT).await
    }

    pub async fn is_error_state_displayed(&self) -> E2eResult<bool> {
        self.error_state.is_visible().await
    }

    pub async fn is_modal_open(&self) -> E2eResult<bool> {
        self.modal.is_visible().await
    }

    pub async fn close_modal(&self) -> E2eResult<()> {
        self.close_button.click().await?;
        self.modal.wait_for(ElementState::Hidden, MODAL_TIMEOUT).await
    }

    pub async fn wait_for_generate_button(&self) -> E2eResult<()> {
        self.generate_button
            .wait_for(ElementState::Visible, self.base.timeouts().action)
            .await
    }

    pub async fn is_generate_button_visible(&self) -> E2eResult<bool> {
        self.generate_button.is_visible_within(QUICK_CHECK).await
    }

    pub async fn modal_title(&self) -> E2eResult<Option<String>> {
        if !self.modal_title.is_visible_within(MODAL_TIMEOUT).await? {
            return Ok(None);
        }
        self.modal_title.text_content().await
    }
}

fn strip_first_line(text: &str) -> Option<String> {
    let body = text.split('\n').skip(1).collect::<Vec<_>>().join("\n");
    let body = body.trim();
    (!body.is_empty()).then(|| body.to_string())
}
