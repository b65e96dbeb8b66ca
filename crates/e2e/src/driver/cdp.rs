//! Chromium over the DevTools protocol
//!
//! Every scenario gets its own headless Chromium with a throwaway profile
//! directory, so cookies and storage never leak between scenarios that
//! run side by side.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::Deserialize;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Driver, ElementSnapshot, Launcher};
use crate::error::{E2eError, E2eResult};

/// How browsers are launched
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,

    /// Chromium binary; auto-detected when `None`
    pub chrome_executable: Option<PathBuf>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1280,
            window_height: 720,
            chrome_executable: None,
        }
    }
}

/// Launches one Chromium per session
#[derive(Debug, Clone, Default)]
pub struct CdpLauncher {
    settings: BrowserSettings,
}

impl CdpLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Launcher for CdpLauncher {
    async fn launch(&self) -> E2eResult<Arc<dyn Driver>> {
        Ok(Arc::new(CdpDriver::launch(&self.settings).await?))
    }
}

/// [`Driver`] backed by a single Chromium page
pub struct CdpDriver {
    page: Page,
    browser: Mutex<Option<CdpBrowser>>,
    handler: JoinHandle<()>,
    _profile: TempDir,
}

impl CdpDriver {
    pub async fn launch(settings: &BrowserSettings) -> E2eResult<Self> {
        let profile = tempfile::Builder::new().prefix("vibefeeder-e2e-").tempdir()?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .window_size(settings.window_width, settings.window_height)
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| E2eError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = CdpBrowser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler stopped: {}", e);
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        info!("Launched Chromium (profile: {})", profile.path().display());

        Ok(Self {
            page,
            browser: Mutex::new(Some(browser)),
            handler,
            _profile: profile,
        })
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> E2eResult<T> {
        Ok(self.page.evaluate(script).await?.into_value::<T>()?)
    }
}

impl Drop for CdpDriver {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[derive(Debug, Deserialize)]
struct SiblingText {
    found: bool,
    text: String,
}

/// Snapshot every match of `selector`.
fn query_script(selector: &str) -> E2eResult<String> {
    let selector = serde_json::to_string(selector)?;
    Ok(format!(
        r#"Array.from(document.querySelectorAll({selector})).map((el) => ({{
  test_id: el.getAttribute("data-testid"),
  text: el.textContent || "",
  visible: !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length),
  disabled: !!el.disabled,
  valid: el.validity ? el.validity.valid : true,
}}))"#
    ))
}

/// Set the value of the `nth` match the way typing would, firing the
/// events form libraries listen for. Evaluates to the number of elements
/// touched.
fn fill_script(selector: &str, nth: usize, value: &str) -> E2eResult<String> {
    let selector = serde_json::to_string(selector)?;
    let value = serde_json::to_string(value)?;
    Ok(format!(
        r#"Array.from(document.querySelectorAll({selector})).slice({nth}, {nth} + 1).map((el) => {{
  el.focus();
  el.value = {value};
  el.dispatchEvent(new Event("input", {{ bubbles: true }}));
  el.dispatchEvent(new Event("change", {{ bubbles: true }}));
  return true;
}}).length"#
    ))
}

fn sibling_script(selector: &str, nth: usize) -> E2eResult<String> {
    let selector = serde_json::to_string(selector)?;
    Ok(format!(
        r#"Array.from(document.querySelectorAll({selector})).slice({nth}, {nth} + 1).map((el) => {{
  const next = el.nextElementSibling;
  return {{ found: !!next, text: next ? (next.textContent || "").trim() : "" }};
}})"#
    ))
}

#[async_trait]
impl Driver for CdpDriver {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        debug!("goto {}", url);
        self.page.goto(url).await?;
        Ok(())
    }

    async fn reload(&self) -> E2eResult<()> {
        self.page.reload().await?;
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn title(&self) -> E2eResult<String> {
        Ok(self.page.get_title().await?.unwrap_or_default())
    }

    async fn query_all(&self, selector: &str) -> E2eResult<Vec<ElementSnapshot>> {
        self.eval(query_script(selector)?).await
    }

    async fn click(&self, selector: &str, nth: usize) -> E2eResult<()> {
        let elements = self.page.find_elements(selector).await?;
        let element = elements
            .get(nth)
            .ok_or_else(|| E2eError::ElementNotFound(format!("{} [{}]", selector, nth)))?;
        element.click().await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, nth: usize, value: &str) -> E2eResult<()> {
        let touched: usize = self.eval(fill_script(selector, nth, value)?).await?;
        if touched == 0 {
            return Err(E2eError::ElementNotFound(format!("{} [{}]", selector, nth)));
        }
        Ok(())
    }

    async fn next_sibling_text(&self, selector: &str, nth: usize) -> E2eResult<Option<String>> {
        let found: Vec<SiblingText> = self.eval(sibling_script(selector, nth)?).await?;
        Ok(found.into_iter().next().filter(|s| s.found).map(|s| s.text))
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        let png = self
            .page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(path, png).await?;
        Ok(())
    }

    async fn close(&self) -> E2eResult<()> {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                warn!("Error closing browser: {}", e);
            }
            let _ = browser.wait().await;
        }
        Ok(())
    }
}
