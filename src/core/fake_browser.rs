use crate::domain::ports::{Browser, Locator};
use crate::utils::error::{ReconcileError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Scripted page used by unit tests. Elements are keyed by
/// `Locator::describe()`; selecting an option schedules text updates that
/// become visible after a delay, like a page refreshing its totals.
#[derive(Default)]
pub(crate) struct FakeBrowser {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    texts: HashMap<String, String>,
    visible: HashSet<String>,
    pages: HashMap<String, Vec<(String, String)>>,
    failing_urls: HashSet<String>,
    on_select: HashMap<String, Vec<(Duration, String, String)>>,
    pending: Vec<(Instant, String, String)>,
    navigations: Vec<String>,
    selections: Vec<String>,
    clicks: Vec<String>,
    screenshots: Vec<PathBuf>,
}

impl FakeState {
    fn apply_pending(&mut self) {
        let now = Instant::now();
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|(at, _, _)| *at <= now);
        self.pending = waiting;
        for (_, key, text) in due {
            self.texts.insert(key, text);
        }
    }
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_visible(self, key: &str) -> Self {
        self.state.lock().unwrap().visible.insert(key.to_string());
        self
    }

    pub fn with_text(self, key: &str, text: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .texts
            .insert(key.to_string(), text.to_string());
        self
    }

    /// Text that is (re)loaded every time `url` is navigated to.
    pub fn with_page(self, url: &str, key: &str, text: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .pages
            .entry(url.to_string())
            .or_default()
            .push((key.to_string(), text.to_string()));
        self
    }

    pub fn failing(self, url: &str) -> Self {
        self.state.lock().unwrap().failing_urls.insert(url.to_string());
        self
    }

    pub fn on_select(self, value: &str, delay: Duration, key: &str, text: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .on_select
            .entry(value.to_string())
            .or_default()
            .push((delay, key.to_string(), text.to_string()));
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn selections(&self) -> Vec<String> {
        self.state.lock().unwrap().selections.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().screenshots.clone()
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        if url.is_empty() || state.failing_urls.contains(url) {
            return Err(ReconcileError::navigation(url, "net::ERR_NAME_NOT_RESOLVED"));
        }
        state.pending.clear();
        let entries = state.pages.get(url).cloned().unwrap_or_default();
        for (key, text) in entries {
            state.texts.insert(key, text);
        }
        Ok(())
    }

    async fn is_visible(&self, locator: &Locator) -> bool {
        self.state.lock().unwrap().visible.contains(&locator.describe())
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.state.lock().unwrap().clicks.push(locator.describe());
        Ok(())
    }

    async fn text_content(&self, locator: &Locator) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.apply_pending();
        state
            .texts
            .get(&locator.describe())
            .cloned()
            .map(Some)
            .ok_or_else(|| ReconcileError::element_missing(locator.describe()))
    }

    async fn select_option(&self, locator: &Locator, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.visible.contains(&locator.describe()) {
            return Err(ReconcileError::element_missing(locator.describe()));
        }
        state.selections.push(value.to_string());
        let now = Instant::now();
        let updates = state.on_select.get(value).cloned().unwrap_or_default();
        for (delay, key, text) in updates {
            state.pending.push((now + delay, key, text));
        }
        Ok(())
    }

    async fn wait_for_visible(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut state = self.state.lock().unwrap();
                state.apply_pending();
                let key = locator.describe();
                if state.visible.contains(&key) || state.texts.contains_key(&key) {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(ReconcileError::element_missing(locator.describe()));
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> Result<()> {
        self.state.lock().unwrap().screenshots.push(path.to_path_buf());
        Ok(())
    }
}
