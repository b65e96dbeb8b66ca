//! Browser driver seam
//!
//! Page objects talk to the browser only through [`Driver`]. The real
//! implementation lives in [`cdp`]; tests use an in-memory document.
//! Element handles are never held across calls: every read re-queries
//! the live DOM and returns plain [`ElementSnapshot`]s.

pub mod cdp;
#[cfg(test)]
pub(crate) mod fake;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::wait::{poll_until, Predicate, Sample, WaitPolicy};

/// Interval used by element and URL waits.
pub const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Point-in-time view of one DOM element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// `data-testid` attribute, if any
    pub test_id: Option<String>,

    /// `textContent`, untrimmed
    pub text: String,

    pub visible: bool,
    pub disabled: bool,

    /// Constraint validation result; `true` for non-form elements
    pub valid: bool,
}

/// Browser operations used by the page objects
#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigate to an absolute URL and wait for the load event.
    async fn goto(&self, url: &str) -> E2eResult<()>;

    /// Re-fetch and re-render the current document.
    async fn reload(&self) -> E2eResult<()>;

    async fn current_url(&self) -> E2eResult<String>;

    async fn title(&self) -> E2eResult<String>;

    /// All elements matching a CSS selector, in document order.
    async fn query_all(&self, selector: &str) -> E2eResult<Vec<ElementSnapshot>>;

    /// Click the `nth` match of `selector`.
    async fn click(&self, selector: &str, nth: usize) -> E2eResult<()>;

    /// Replace the value of the `nth` match and fire `input`/`change`.
    async fn fill(&self, selector: &str, nth: usize, value: &str) -> E2eResult<()>;

    /// Trimmed text of the element right after the `nth` match, if any.
    async fn next_sibling_text(&self, selector: &str, nth: usize) -> E2eResult<Option<String>>;

    async fn screenshot(&self, path: &Path) -> E2eResult<()>;

    async fn close(&self) -> E2eResult<()> {
        Ok(())
    }
}

/// Opens a fresh, isolated browser session per scenario
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self) -> E2eResult<Arc<dyn Driver>>;
}

pub mod selector {
    //! CSS selector builders for the `data-testid` convention

    pub fn test_id(id: &str) -> String {
        format!("[data-testid=\"{}\"]", id)
    }

    pub fn test_id_prefix(prefix: &str) -> String {
        format!("[data-testid^=\"{}\"]", prefix)
    }
}

/// Element lifecycle states a [`Locator`] can wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl ElementState {
    fn as_str(&self) -> &'static str {
        match self {
            ElementState::Visible => "visible",
            ElementState::Hidden => "hidden",
            ElementState::Attached => "attached",
            ElementState::Detached => "detached",
        }
    }

    fn is_met_by(&self, first: Option<&ElementSnapshot>) -> bool {
        match self {
            ElementState::Visible => first.is_some_and(|e| e.visible),
            ElementState::Hidden => first.map_or(true, |e| !e.visible),
            ElementState::Attached => first.is_some(),
            ElementState::Detached => first.is_none(),
        }
    }
}

/// Lazily evaluated element query, resolved on every call
#[derive(Clone)]
pub struct Locator {
    driver: Arc<dyn Driver>,
    selector: String,
    has_text: Option<String>,
    timeout: Duration,
}

impl Locator {
    pub fn new(driver: Arc<dyn Driver>, selector: impl Into<String>, timeout: Duration) -> Self {
        Self {
            driver,
            selector: selector.into(),
            has_text: None,
            timeout,
        }
    }

    /// Narrow to elements whose text contains `text`.
    pub fn has_text(mut self, text: impl Into<String>) -> Self {
        self.has_text = Some(text.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    fn describe(&self) -> String {
        match &self.has_text {
            Some(text) => format!("{} (text {:?})", self.selector, text),
            None => self.selector.clone(),
        }
    }

    /// Matching elements paired with their index among raw selector matches.
    async fn resolve(&self) -> E2eResult<Vec<(usize, ElementSnapshot)>> {
        let all = self.driver.query_all(&self.selector).await?;
        Ok(all
            .into_iter()
            .enumerate()
            .filter(|(_, e)| self.has_text.as_ref().map_or(true, |t| e.text.contains(t.as_str())))
            .collect())
    }

    pub async fn snapshots(&self) -> E2eResult<Vec<ElementSnapshot>> {
        Ok(self.resolve().await?.into_iter().map(|(_, e)| e).collect())
    }

    pub async fn first_snapshot(&self) -> E2eResult<Option<ElementSnapshot>> {
        Ok(self.resolve().await?.into_iter().next().map(|(_, e)| e))
    }

    pub async fn count(&self) -> E2eResult<usize> {
        Ok(self.resolve().await?.len())
    }

    pub async fn is_visible(&self) -> E2eResult<bool> {
        Ok(self.first_snapshot().await?.is_some_and(|e| e.visible))
    }

    /// Text of the first match, or `None` when nothing matches.
    pub async fn text_content(&self) -> E2eResult<Option<String>> {
        Ok(self.first_snapshot().await?.map(|e| e.text))
    }

    /// Wait until the first match is in `state`.
    pub async fn wait_for(&self, state: ElementState, timeout: Duration) -> E2eResult<()> {
        let policy = WaitPolicy {
            timeout,
            interval: ELEMENT_POLL_INTERVAL,
            pause_first: false,
        };
        let condition = Predicate::new(state.as_str(), |first: &Option<ElementSnapshot>| {
            state.is_met_by(first.as_ref())
        });
        poll_until(&self.describe(), &condition, &policy, || async {
            Ok::<_, E2eError>(Sample::Value(self.first_snapshot().await?))
        })
        .await?;
        Ok(())
    }

    /// Wait for visibility within the default timeout.
    pub async fn wait_visible(&self) -> E2eResult<()> {
        self.wait_for(ElementState::Visible, self.timeout).await
    }

    /// Like [`Locator::wait_for`] with `Visible`, but a timeout yields `false`.
    pub async fn is_visible_within(&self, timeout: Duration) -> E2eResult<bool> {
        match self.wait_for(ElementState::Visible, timeout).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_deadline() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn actionable_index(&self) -> E2eResult<usize> {
        self.wait_visible().await?;
        self.resolve()
            .await?
            .into_iter()
            .find(|(_, e)| e.visible)
            .map(|(i, _)| i)
            .ok_or_else(|| E2eError::ElementNotFound(self.describe()))
    }

    pub async fn click(&self) -> E2eResult<()> {
        let nth = self.actionable_index().await?;
        self.driver.click(&self.selector, nth).await
    }

    pub async fn fill(&self, value: &str) -> E2eResult<()> {
        let nth = self.actionable_index().await?;
        self.driver.fill(&self.selector, nth, value).await
    }

    pub async fn clear(&self) -> E2eResult<()> {
        self.fill("").await
    }

    /// Text of the element after the first match; `None` if either is absent.
    pub async fn next_sibling_text(&self) -> E2eResult<Option<String>> {
        match self.resolve().await?.first() {
            Some((nth, _)) => self.driver.next_sibling_text(&self.selector, *nth).await,
            None => Ok(None),
        }
    }
}

/// Match a URL against `**/suffix` style patterns; other patterns must
/// equal the full path. Query strings and fragments are ignored.
pub fn url_matches(url: &str, pattern: &str) -> bool {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    match pattern.strip_prefix("**") {
        Some(suffix) => path.ends_with(suffix),
        None => path == pattern,
    }
}

/// Wait until the driver's URL matches `pattern`.
pub async fn wait_for_url(driver: &dyn Driver, pattern: &str, timeout: Duration) -> E2eResult<String> {
    let policy = WaitPolicy {
        timeout,
        interval: ELEMENT_POLL_INTERVAL,
        pause_first: false,
    };
    let condition = Predicate::new(format!("URL matching {}", pattern), |url: &String| {
        url_matches(url, pattern)
    });
    poll_until("page URL", &condition, &policy, || async {
        Ok::<_, E2eError>(Sample::Value(driver.current_url().await?))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::fake::{FakeDriver, FakeElement};
    use super::*;
    use test_case::test_case;

    fn locator(driver: &Arc<FakeDriver>, selector: &str) -> Locator {
        Locator::new(driver.clone(), selector, Duration::from_secs(1))
    }

    #[test_case("http://localhost:8081/dashboard", "**/dashboard", true ; "suffix")]
    #[test_case("http://localhost:8081/dashboard?tab=1", "**/dashboard", true ; "query ignored")]
    #[test_case("http://localhost:8081/login", "**/dashboard", false ; "other page")]
    #[test_case("http://localhost:8081/login", "/login", true ; "exact path")]
    fn url_pattern_matching(url: &str, pattern: &str, expected: bool) {
        assert_eq!(url_matches(url, pattern), expected);
    }

    #[test]
    fn test_id_selectors() {
        assert_eq!(selector::test_id("feed-form"), "[data-testid=\"feed-form\"]");
        assert_eq!(selector::test_id_prefix("feed-name-"), "[data-testid^=\"feed-name-\"]");
    }

    #[tokio::test(start_paused = true)]
    async fn has_text_filters_and_clicks_matching_index() {
        let driver = Arc::new(FakeDriver::new());
        driver.insert(FakeElement::new("button").text("Settings"));
        driver.insert(FakeElement::new("button").text("Logout"));

        locator(&driver, "button").has_text("Logout").click().await.unwrap();

        assert_eq!(driver.clicks(), vec![("button".to_string(), 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn click_times_out_when_element_never_appears() {
        let driver = Arc::new(FakeDriver::new());
        let err = locator(&driver, "#missing").click().await.unwrap_err();
        assert!(err.is_deadline());
        assert!(driver.clicks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_state_accepts_detached_element() {
        let driver = Arc::new(FakeDriver::new());
        locator(&driver, "#modal")
            .wait_for(ElementState::Hidden, Duration::from_millis(100))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_url_change() {
        let driver = Arc::new(FakeDriver::new());
        driver.set_url("http://localhost:8081/login");
        driver.after_reads(3, |d| d.set_url("http://localhost:8081/dashboard"));

        let url = wait_for_url(driver.as_ref(), "**/dashboard", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:8081/dashboard");
    }
}
