//! In-memory [`Driver`] for page-object and runner tests
//!
//! Understands three selector forms, optionally comma-separated:
//! `[data-testid="x"]`, `[data-testid^="x"]`, and any other string, which
//! matches elements registered under exactly that key.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use async_trait::async_trait;

use super::{Driver, ElementSnapshot};
use crate::error::{E2eError, E2eResult};

type Hook = Arc<dyn Fn(&FakeDriver) + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    key: Option<String>,
    test_id: Option<String>,
    text: String,
    visible: bool,
    disabled: bool,
    valid: bool,
    sibling_text: Option<String>,
    value: String,
}

impl FakeElement {
    /// Element matched by an exact selector string.
    pub fn new(key: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            visible: true,
            valid: true,
            ..Default::default()
        }
    }

    /// Element matched by its `data-testid`.
    pub fn test_id(id: &str) -> Self {
        Self {
            test_id: Some(id.to_string()),
            visible: true,
            valid: true,
            ..Default::default()
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn invalid(mut self) -> Self {
        self.valid = false;
        self
    }

    pub fn sibling(mut self, text: &str) -> Self {
        self.sibling_text = Some(text.to_string());
        self
    }

    fn matches(&self, selector: &str) -> bool {
        if self.key.as_deref() == Some(selector) {
            return true;
        }
        selector.split(',').map(str::trim).any(|part| {
            if let Some(id) = quoted(part, "[data-testid=\"") {
                self.test_id.as_deref() == Some(id)
            } else if let Some(prefix) = quoted(part, "[data-testid^=\"") {
                self.test_id.as_deref().is_some_and(|t| t.starts_with(prefix))
            } else {
                self.key.as_deref() == Some(part)
            }
        })
    }

    fn snapshot(&self) -> ElementSnapshot {
        ElementSnapshot {
            test_id: self.test_id.clone(),
            text: self.text.clone(),
            visible: self.visible,
            disabled: self.disabled,
            valid: self.valid,
        }
    }
}

fn quoted<'a>(part: &'a str, open: &str) -> Option<&'a str> {
    part.strip_prefix(open)?.strip_suffix("\"]")
}

#[derive(Default)]
struct State {
    url: String,
    title: String,
    elements: Vec<FakeElement>,
    visited: Vec<String>,
    clicks: Vec<(String, usize)>,
    fills: Vec<(String, usize, String)>,
    screenshots: Vec<PathBuf>,
    reloads: usize,
    reads: usize,
    click_hooks: Vec<(String, Hook)>,
    goto_hooks: Vec<(String, Hook)>,
    reload_hooks: Vec<Hook>,
    read_hooks: Vec<(usize, Hook)>,
}

#[derive(Default)]
pub struct FakeDriver {
    state: Mutex<State>,
}

impl FakeDriver {
    pub fn new() -> Self {
        let driver = Self::default();
        driver.set_url("about:blank");
        driver
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, element: FakeElement) {
        self.state().elements.push(element);
    }

    pub fn remove(&self, selector: &str) {
        self.state().elements.retain(|e| !e.matches(selector));
    }

    pub fn clear_elements(&self) {
        self.state().elements.clear();
    }

    pub fn set_text(&self, selector: &str, text: &str) {
        for e in self.state().elements.iter_mut().filter(|e| e.matches(selector)) {
            e.text = text.to_string();
        }
    }

    pub fn set_sibling(&self, selector: &str, text: &str) {
        for e in self.state().elements.iter_mut().filter(|e| e.matches(selector)) {
            e.sibling_text = Some(text.to_string());
        }
    }

    pub fn set_visible(&self, selector: &str, visible: bool) {
        for e in self.state().elements.iter_mut().filter(|e| e.matches(selector)) {
            e.visible = visible;
        }
    }

    pub fn set_url(&self, url: &str) {
        self.state().url = url.to_string();
    }

    pub fn set_title(&self, title: &str) {
        self.state().title = title.to_string();
    }

    pub fn value_of(&self, selector: &str) -> Option<String> {
        self.state()
            .elements
            .iter()
            .find(|e| e.matches(selector))
            .map(|e| e.value.clone())
    }

    pub fn visited(&self) -> Vec<String> {
        self.state().visited.clone()
    }

    pub fn clicks(&self) -> Vec<(String, usize)> {
        self.state().clicks.clone()
    }

    pub fn fills(&self) -> Vec<(String, usize, String)> {
        self.state().fills.clone()
    }

    pub fn reloads(&self) -> usize {
        self.state().reloads
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state().screenshots.clone()
    }

    /// Run `hook` whenever `selector` is clicked.
    pub fn on_click(&self, selector: &str, hook: impl Fn(&FakeDriver) + Send + Sync + 'static) {
        self.state().click_hooks.push((selector.to_string(), Arc::new(hook)));
    }

    /// Run `hook` whenever a URL ending in `suffix` is visited.
    pub fn on_goto(&self, suffix: &str, hook: impl Fn(&FakeDriver) + Send + Sync + 'static) {
        self.state().goto_hooks.push((suffix.to_string(), Arc::new(hook)));
    }

    pub fn on_reload(&self, hook: impl Fn(&FakeDriver) + Send + Sync + 'static) {
        self.state().reload_hooks.push(Arc::new(hook));
    }

    /// Run `hook` once, after `reads` more DOM/URL reads.
    pub fn after_reads(&self, reads: usize, hook: impl Fn(&FakeDriver) + Send + Sync + 'static) {
        let mut state = self.state();
        let at = state.reads + reads;
        state.read_hooks.push((at, Arc::new(hook)));
    }

    fn record_read(&self) {
        let due: Vec<Hook> = {
            let mut state = self.state();
            state.reads += 1;
            let reads = state.reads;
            let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut state.read_hooks)
                .into_iter()
                .partition(|(at, _)| *at <= reads);
            state.read_hooks = pending;
            due.into_iter().map(|(_, h)| h).collect()
        };
        for hook in due {
            hook(self);
        }
    }

    fn nth_mut<R>(&self, selector: &str, nth: usize, f: impl FnOnce(&mut FakeElement) -> R) -> E2eResult<R> {
        let mut state = self.state();
        state
            .elements
            .iter_mut()
            .filter(|e| e.matches(selector))
            .nth(nth)
            .map(f)
            .ok_or_else(|| E2eError::ElementNotFound(format!("{} [{}]", selector, nth)))
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        let hooks: Vec<Hook> = {
            let mut state = self.state();
            state.url = url.to_string();
            state.visited.push(url.to_string());
            state
                .goto_hooks
                .iter()
                .filter(|(suffix, _)| url.ends_with(suffix.as_str()))
                .map(|(_, h)| h.clone())
                .collect()
        };
        for hook in hooks {
            hook(self);
        }
        Ok(())
    }

    async fn reload(&self) -> E2eResult<()> {
        let hooks: Vec<Hook> = {
            let mut state = self.state();
            state.reloads += 1;
            state.reload_hooks.clone()
        };
        for hook in hooks {
            hook(self);
        }
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        self.record_read();
        Ok(self.state().url.clone())
    }

    async fn title(&self) -> E2eResult<String> {
        Ok(self.state().title.clone())
    }

    async fn query_all(&self, selector: &str) -> E2eResult<Vec<ElementSnapshot>> {
        self.record_read();
        Ok(self
            .state()
            .elements
            .iter()
            .filter(|e| e.matches(selector))
            .map(FakeElement::snapshot)
            .collect())
    }

    async fn click(&self, selector: &str, nth: usize) -> E2eResult<()> {
        self.nth_mut(selector, nth, |_| ())?;
        let hooks: Vec<Hook> = {
            let mut state = self.state();
            state.clicks.push((selector.to_string(), nth));
            state
                .click_hooks
                .iter()
                .filter(|(s, _)| s == selector)
                .map(|(_, h)| h.clone())
                .collect()
        };
        for hook in hooks {
            hook(self);
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, nth: usize, value: &str) -> E2eResult<()> {
        self.nth_mut(selector, nth, |e| e.value = value.to_string())?;
        self.state()
            .fills
            .push((selector.to_string(), nth, value.to_string()));
        Ok(())
    }

    async fn next_sibling_text(&self, selector: &str, nth: usize) -> E2eResult<Option<String>> {
        self.record_read();
        self.nth_mut(selector, nth, |e| e.sibling_text.as_ref().map(|t| t.trim().to_string()))
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        self.state().screenshots.push(path.to_path_buf());
        Ok(())
    }
}
