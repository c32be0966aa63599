use crate::config::SourceBConfig;
use crate::domain::ports::{Browser, Locator};
use crate::utils::error::{ReconcileError, Result};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub select_timeout: Duration,
    pub change_timeout: Duration,
    pub poll_interval: Duration,
    pub idle_timeout: Duration,
    pub settle_delay: Duration,
}

impl From<&SourceBConfig> for SyncSettings {
    fn from(config: &SourceBConfig) -> Self {
        Self {
            select_timeout: Duration::from_millis(config.select_timeout_ms),
            change_timeout: Duration::from_millis(config.change_timeout_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            idle_timeout: Duration::from_millis(config.idle_timeout_ms),
            settle_delay: Duration::from_millis(config.settle_ms),
        }
    }
}

/// Displayed total before and after a branch selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub before: String,
    pub after: String,
    /// False when the bound elapsed without the total changing.
    pub changed: bool,
}

/// Drives the branch select control and waits until the visible total
/// reflects the new branch instead of the one selected before it.
pub struct BranchSynchronizer {
    select: Locator,
    total: Locator,
    settings: SyncSettings,
}

impl BranchSynchronizer {
    pub fn new(select: Locator, total: Locator, settings: SyncSettings) -> Self {
        Self {
            select,
            total,
            settings,
        }
    }

    pub fn from_config(config: &SourceBConfig) -> Self {
        let total = Locator::new(&config.total_block)
            .visible()
            .child(&config.total_selector);
        Self::new(
            Locator::new(&config.branch_select),
            total,
            SyncSettings::from(config),
        )
    }

    pub fn total_locator(&self) -> &Locator {
        &self.total
    }

    pub async fn select_branch(
        &self,
        browser: &dyn Browser,
        value: &str,
        label: &str,
    ) -> Result<SyncOutcome> {
        browser
            .wait_for_visible(&self.select, self.settings.select_timeout)
            .await?;

        let before = current_text(browser, &self.total).await;
        tracing::debug!("{}: total before selection = '{}'", label, before);

        browser.select_option(&self.select, value).await?;
        tracing::info!("✅ Selected branch: {} (value={})", label, value);

        let changed = match wait_for_text_change(
            browser,
            &self.total,
            &before,
            label,
            self.settings.change_timeout,
            self.settings.poll_interval,
        )
        .await
        {
            Ok(after) => {
                tracing::debug!("{}: total changed '{}' -> '{}'", label, before, after);
                true
            }
            Err(e) => {
                tracing::warn!("⚠️ {}; reading the current value anyway", e);
                false
            }
        };

        if let Err(e) = browser.wait_for_idle(self.settings.idle_timeout).await {
            tracing::debug!("{}: page did not go idle: {}", label, e);
        }
        tokio::time::sleep(self.settings.settle_delay).await;

        Ok(SyncOutcome {
            after: current_text(browser, &self.total).await,
            before,
            changed,
        })
    }
}

/// Trimmed text of `locator`, or "" when it has none or cannot be read.
async fn current_text(browser: &dyn Browser, locator: &Locator) -> String {
    browser
        .text_content(locator)
        .await
        .ok()
        .flatten()
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

/// Polls until the trimmed text of `locator` differs from `before` and
/// returns the new text. Fails with `StateSyncTimeout` after `timeout`.
pub async fn wait_for_text_change(
    browser: &dyn Browser,
    locator: &Locator,
    before: &str,
    label: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<String> {
    let poll = async {
        loop {
            let now = current_text(browser, locator).await;
            if now != before {
                return now;
            }
            tokio::time::sleep(poll_interval).await;
        }
    };

    tokio::time::timeout(timeout, poll)
        .await
        .map_err(|_| ReconcileError::StateSyncTimeout {
            branch: label.to_string(),
            timeout,
        })
}
