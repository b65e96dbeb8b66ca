//! Feed list, add/edit form, delete confirmation, search and filters
//!
//! The list renders as a table on wide screens and as cards on narrow
//! ones. Both views share the per-feed `feed-name-{id}`, `feed-status-{id}`
//! and button test ids, so lookups go through those rather than the row
//! containers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::BasePage;
use crate::config::E2eConfig;
use crate::driver::{selector, Driver, ElementState, Locator};
use crate::error::{E2eError, E2eResult};
use crate::fixtures::FeedFixtures;
use crate::wait::{poll_until, Condition, Contains, NonEmpty, Sample, WaitPolicy};

const FEED_NAME_PREFIX: &str = "feed-name-";
const EMPTY_STATE_TEXT: &str = "You don't have any feeds yet";
const QUICK_CHECK: Duration = Duration::from_secs(2);

/// Fetch status shown in a feed's badge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Pending,
    Ok,
    Error,
}

impl FeedStatus {
    /// Text the badge carries, after its icon.
    pub fn label(&self) -> &'static str {
        match self {
            FeedStatus::Pending => "Pending",
            FeedStatus::Ok => "OK",
            FeedStatus::Error => "Error",
        }
    }
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status filter buttons above the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Working,
    Pending,
    Error,
}

impl StatusFilter {
    fn test_id(&self) -> &'static str {
        match self {
            StatusFilter::All => "status-filter-all",
            StatusFilter::Working => "status-filter-working",
            StatusFilter::Pending => "status-filter-pending",
            StatusFilter::Error => "status-filter-error",
        }
    }
}

/// A feed located in the currently rendered list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRef {
    pub id: String,
    pub name: String,
}

/// Lowercase `name` and collapse every run of non `[a-z0-9]` into `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_gap = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
            in_gap = false;
        } else if !in_gap {
            slug.push('-');
            in_gap = true;
        }
    }
    slug
}

/// Unique-per-name URL pointing at `base`, so two scenarios never collide
/// on the duplicate URL check.
pub fn feed_url_from_name(name: &str, base: &str) -> String {
    format!("{}?test={}", base, slugify(name))
}

pub struct FeedPage {
    pub base: BasePage,
    fixtures: FeedFixtures,

    pub filter_form: Locator,
    pub search_input: Locator,

    pub form_modal: Locator,
    pub form: Locator,
    pub name_input: Locator,
    pub url_input: Locator,
    pub submit_button: Locator,
    pub cancel_button: Locator,
    pub form_error: Locator,

    pub delete_confirmation: Locator,
    pub delete_cancel_button: Locator,
    pub add_feed_button: Locator,
}

impl FeedPage {
    pub fn new(driver: Arc<dyn Driver>, config: &E2eConfig) -> Self {
        let base = BasePage::new(driver, config);
        Self {
            fixtures: FeedFixtures::new(config.github_token.as_deref()),
            filter_form: base.by_test_id("feed-filter-form"),
            search_input: base.by_test_id("feed-search-input"),
            form_modal: base.locator("#feed-form-modal-content"),
            form: base.by_test_id("feed-form"),
            name_input: base.by_test_id("feed-form-name-input"),
            url_input: base.by_test_id("feed-form-url-input"),
            submit_button: base.by_test_id("feed-form-submit-btn"),
            cancel_button: base.by_test_id("feed-form-cancel-btn"),
            form_error: base.by_test_id("feed-form-error"),
            delete_confirmation: base.by_test_id("delete-confirmation"),
            delete_cancel_button: base.by_test_id("delete-confirmation-cancel-btn"),
            add_feed_button: base.by_test_id("add-feed-button"),
            base,
        }
    }

    pub fn fixtures(&self) -> &FeedFixtures {
        &self.fixtures
    }

    /// [`feed_url_from_name`] against the basic RSS fixture.
    pub fn feed_url_from_name(&self, name: &str) -> String {
        feed_url_from_name(name, &self.fixtures.basic)
    }

    pub fn feed_item(&self, id: &str) -> Locator {
        self.base.locator(&format!(
            "{}, {}",
            selector::test_id(&format!("feed-list-item-{}", id)),
            selector::test_id(&format!("feed-card-{}", id)),
        ))
    }

    pub fn feed_name(&self, id: &str) -> Locator {
        self.base.by_test_id(&format!("feed-name-{}", id))
    }

    pub fn feed_url(&self, id: &str) -> Locator {
        self.base.by_test_id(&format!("feed-url-{}", id))
    }

    pub fn feed_status_badge(&self, id: &str) -> Locator {
        self.base.by_test_id(&format!("feed-status-{}", id))
    }

    fn edit_button(&self, id: &str) -> Locator {
        self.base.by_test_id(&format!("feed-edit-btn-{}", id))
    }

    fn delete_button(&self, id: &str) -> Locator {
        self.base.by_test_id(&format!("feed-delete-btn-{}", id))
    }

    fn delete_confirm_button(&self, id: &str) -> Locator {
        self.base.by_test_id(&format!("delete-confirmation-confirm-btn-{}", id))
    }

    fn action_timeout(&self) -> Duration {
        self.base.timeouts().action
    }

    pub async fn goto_feeds(&self) -> E2eResult<()> {
        self.base.goto("/dashboard").await
    }

    pub async fn search_feeds(&self, query: &str) -> E2eResult<()> {
        self.search_input.clear().await?;
        self.search_input.fill(query).await
    }

    pub async fn filter_by_status(&self, filter: StatusFilter) -> E2eResult<()> {
        self.base.by_test_id(filter.test_id()).click().await
    }

    pub async fn open_add_feed_form(&self) -> E2eResult<()> {
        self.add_feed_button.click().await?;
        self.form.wait_for(ElementState::Visible, self.action_timeout()).await
    }

    pub async fn open_edit_feed_form(&self, id: &str) -> E2eResult<()> {
        self.edit_button(id).click().await?;
        self.form.wait_for(ElementState::Visible, self.action_timeout()).await
    }

    pub async fn fill_feed_form(&self, name: &str, url: &str) -> E2eResult<()> {
        self.name_input.fill(name).await?;
        self.url_input.fill(url).await
    }

    pub async fn submit_feed_form(&self) -> E2eResult<()> {
        self.submit_button.click().await
    }

    /// Open the form, submit `name`/`url` and wait for the form to close.
    pub async fn add_feed(&self, name: &str, url: &str) -> E2eResult<()> {
        self.open_add_feed_form().await?;
        self.fill_feed_form(name, url).await?;
        self.submit_feed_form().await?;
        self.form.wait_for(ElementState::Hidden, self.action_timeout()).await?;
        info!("Added feed {:?}", name);
        Ok(())
    }

    /// Replace whichever fields are given, submit and wait for the form
    /// to close.
    pub async fn edit_feed(&self, id: &str, name: Option<&str>, url: Option<&str>) -> E2eResult<()> {
        self.open_edit_feed_form(id).await?;
        if let Some(name) = name {
            self.name_input.clear().await?;
            self.name_input.fill(name).await?;
        }
        if let Some(url) = url {
            self.url_input.clear().await?;
            self.url_input.fill(url).await?;
        }
        self.submit_feed_form().await?;
        self.form.wait_for(ElementState::Hidden, self.action_timeout()).await
    }

    pub async fn delete_feed(&self, id: &str) -> E2eResult<()> {
        self.delete_button(id).click().await?;
        self.delete_confirmation
            .wait_for(ElementState::Visible, self.action_timeout())
            .await?;
        self.delete_confirm_button(id).click().await?;
        self.delete_confirmation
            .wait_for(ElementState::Hidden, self.action_timeout())
            .await
    }

    /// First rendered feed whose name contains `name`. Only searches what
    /// is currently listed; call [`FeedPage::search_feeds`] first to
    /// narrow a long list.
    pub async fn feed_by_name(&self, name: &str) -> E2eResult<Option<FeedRef>> {
        let names = self
            .base
            .locator(&selector::test_id_prefix(FEED_NAME_PREFIX))
            .snapshots()
            .await?;
        Ok(names.into_iter().find_map(|el| {
            if !el.text.contains(name) {
                return None;
            }
            let id = el.test_id?.strip_prefix(FEED_NAME_PREFIX)?.to_string();
            Some(FeedRef {
                id,
                name: el.text.trim().to_string(),
            })
        }))
    }

    pub async fn feed_exists(&self, name: &str) -> E2eResult<bool> {
        Ok(self.feed_by_name(name).await?.is_some())
    }

    /// Rows in the table view.
    pub async fn feeds_count(&self) -> E2eResult<usize> {
        self.base
            .locator(&selector::test_id_prefix("feed-list-item-"))
            .count()
            .await
    }

    /// Current badge text, e.g. "⏳ Pending".
    pub async fn feed_status(&self, id: &str) -> E2eResult<String> {
        let badge = self.feed_status_badge(id);
        badge.wait_visible().await?;
        Ok(badge.text_content().await?.unwrap_or_default().trim().to_string())
    }

    /// Reload until the badge of feed `id` shows `status`, using the
    /// configured status policy.
    pub async fn wait_for_feed_status(&self, id: &str, status: FeedStatus) -> E2eResult<String> {
        let policy = self.base.timeouts().feed_status_policy();
        self.wait_for_feed_status_with(id, &Contains(status.label().to_string()), &policy)
            .await
    }

    /// Pause, reload, read the badge; repeat until `condition` holds.
    /// A reload failure aborts the wait. An absent or hidden badge is
    /// an inconclusive sample.
    pub async fn wait_for_feed_status_with<C>(&self, id: &str, condition: &C, policy: &WaitPolicy) -> E2eResult<String>
    where
        C: Condition<String> + ?Sized,
    {
        let badge = self.feed_status_badge(id);
        let subject = format!("feed {} status", id);
        poll_until(&subject, condition, policy, || async {
            self.base.reload().await?;
            let sample = match badge.first_snapshot().await? {
                Some(el) if el.visible => Sample::Value(el.text.trim().to_string()),
                _ => Sample::Missing,
            };
            Ok::<_, E2eError>(sample)
        })
        .await
    }

    pub async fn is_empty_state_displayed(&self) -> E2eResult<bool> {
        self.base
            .locator("p, h2, h3, span, div")
            .has_text(EMPTY_STATE_TEXT)
            .is_visible_within(QUICK_CHECK)
            .await
    }

    /// Form-level error, if one shows up shortly.
    pub async fn form_error(&self) -> E2eResult<Option<String>> {
        if !self.form_error.is_visible_within(QUICK_CHECK).await? {
            return Ok(None);
        }
        self.form_error.text_content().await
    }

    pub async fn name_field_error(&self) -> E2eResult<Option<String>> {
        field_error(&self.name_input).await
    }

    pub async fn url_field_error(&self) -> E2eResult<Option<String>> {
        field_error(&self.url_input).await
    }

    pub async fn has_name_field_error(&self) -> E2eResult<bool> {
        Ok(self.name_field_error().await?.is_some())
    }

    pub async fn has_url_field_error(&self) -> E2eResult<bool> {
        Ok(self.url_field_error().await?.is_some())
    }

    pub async fn wait_for_name_field_error(&self) -> E2eResult<String> {
        self.wait_for_field_error("name field error", &self.name_input).await
    }

    pub async fn wait_for_url_field_error(&self) -> E2eResult<String> {
        self.wait_for_field_error("url field error", &self.url_input).await
    }

    async fn wait_for_field_error(&self, subject: &str, input: &Locator) -> E2eResult<String> {
        let policy = self.base.timeouts().field_error_policy();
        poll_until(subject, &NonEmpty, &policy, || async {
            Ok::<_, E2eError>(Sample::from(field_error(input).await?))
        })
        .await
    }

    pub async fn close_feed_form(&self) -> E2eResult<()> {
        self.cancel_button.click().await?;
        self.form.wait_for(ElementState::Hidden, self.action_timeout()).await
    }

    pub async fn close_delete_confirmation(&self) -> E2eResult<()> {
        self.delete_cancel_button.click().await?;
        self.delete_confirmation
            .wait_for(ElementState::Hidden, self.action_timeout())
            .await
    }
}

/// Validation message rendered right after an input; absent input or
/// blank text reads as no error.
async fn field_error(input: &Locator) -> E2eResult<Option<String>> {
    match input.next_sibling_text().await {
        Ok(text) => Ok(text.filter(|t| !t.is_empty())),
        Err(E2eError::ElementNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
