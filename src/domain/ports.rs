use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Lazy address of a page element. Resolves to the first match at the time
/// an operation runs, never to a cached handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub selector: String,
    /// Only consider elements that are currently displayed.
    pub visible_only: bool,
    pub within: Option<Box<Locator>>,
}

impl Locator {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            visible_only: false,
            within: None,
        }
    }

    pub fn visible(mut self) -> Self {
        self.visible_only = true;
        self
    }

    /// Child locator searched inside the first match of `self`.
    pub fn child(&self, selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            visible_only: false,
            within: Some(Box::new(self.clone())),
        }
    }

    pub fn describe(&self) -> String {
        let own = if self.visible_only {
            format!("{}:visible", self.selector)
        } else {
            self.selector.clone()
        };
        match &self.within {
            Some(parent) => format!("{} {}", parent.describe(), own),
            None => own,
        }
    }
}

/// Browser automation capability. One implementation drives one page; all
/// operations act on that page's current state.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Returns once the document is parsed (DOMContentLoaded). Fails with
    /// `ReconcileError::Navigation` on timeout or network failure.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Never fails; any internal error reads as "not visible".
    async fn is_visible(&self, locator: &Locator) -> bool;

    async fn click(&self, locator: &Locator) -> Result<()>;

    async fn text_content(&self, locator: &Locator) -> Result<Option<String>>;

    async fn select_option(&self, locator: &Locator, value: &str) -> Result<()>;

    /// Fails with `ReconcileError::ElementMissing` when the element is not
    /// visible within `timeout`.
    async fn wait_for_visible(&self, locator: &Locator, timeout: Duration) -> Result<()>;

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<()>;

    /// Waits for pending page activity to finish. Best effort.
    async fn wait_for_idle(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}

/// HTTP delivery capability for webhook payloads. Returns the response
/// status on success; non-2xx and timeouts are `ReconcileError::Delivery`.
#[async_trait]
pub trait WebhookClient: Send + Sync {
    async fn post(&self, url: &str, body: &serde_json::Value, timeout: Duration) -> Result<u16>;
}
