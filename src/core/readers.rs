use crate::config::{SourceAConfig, SourceBConfig};
use crate::core::extract::extract_count;
use crate::core::sync::BranchSynchronizer;
use crate::domain::model::{BranchSpec, FailureKind, ReadOutcome, Source};
use crate::domain::ports::{Browser, Locator};
use crate::utils::error::{ReconcileError, Result};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn failure_kind(error: &ReconcileError) -> FailureKind {
    match error {
        ReconcileError::Navigation { .. } => FailureKind::Navigation,
        ReconcileError::ElementMissing { .. } => FailureKind::ElementMissing,
        _ => FailureKind::Browser,
    }
}

fn into_outcome(source: Source, label: &str, result: Result<u64>) -> ReadOutcome {
    match result {
        Ok(value) => ReadOutcome::success(source, label, value),
        Err(e) => {
            tracing::error!("❌ {} read failed for {}: {}", source, label, e);
            ReadOutcome::failed(source, label, failure_kind(&e), e.to_string())
        }
    }
}

/// Writes full-page screenshots named `{unix_millis}_{tag}_{label}.png`.
/// Failures are logged and otherwise ignored.
#[derive(Debug, Clone)]
pub struct Screenshots {
    dir: PathBuf,
}

impl Screenshots {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_dir(dir: Option<&str>) -> Option<Self> {
        dir.map(Self::new)
    }

    pub async fn capture(&self, browser: &dyn Browser, tag: &str, label: &str) {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let path = self.dir.join(format!("{}_{}_{}.png", millis, tag, label));

        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            tracing::warn!("Cannot create screenshot dir {}: {}", self.dir.display(), e);
            return;
        }
        match browser.screenshot(&path, true).await {
            Ok(()) => tracing::debug!("📸 {}", path.display()),
            Err(e) => tracing::warn!("Screenshot {} failed: {}", path.display(), e),
        }
    }
}

/// Reads the partner marketplace count for a branch.
pub struct SourceAReader {
    config: SourceAConfig,
    navigation_timeout: Duration,
    screenshots: Option<Screenshots>,
}

impl SourceAReader {
    pub fn new(
        config: SourceAConfig,
        navigation_timeout: Duration,
        screenshots: Option<Screenshots>,
    ) -> Self {
        Self {
            config,
            navigation_timeout,
            screenshots,
        }
    }

    /// Never fails: errors become a zero reading carrying the failure.
    pub async fn read(&self, browser: &dyn Browser, spec: &BranchSpec) -> ReadOutcome {
        tracing::info!("🔷 Source A → {}", spec.label);
        into_outcome(Source::A, &spec.label, self.try_read(browser, spec).await)
    }

    async fn try_read(&self, browser: &dyn Browser, spec: &BranchSpec) -> Result<u64> {
        let url = spec.source_a_target.trim();
        if url.is_empty() {
            return Err(ReconcileError::navigation(url, "no source A address configured"));
        }

        browser
            .navigate(url, self.navigation_timeout)
            .await?;
        self.accept_consent(browser).await;
        tokio::time::sleep(self.config.settle_delay()).await;

        if let Some(shots) = &self.screenshots {
            shots.capture(browser, "source_a", &spec.label).await;
        }

        let text = browser
            .text_content(&Locator::new(&self.config.count_selector))
            .await?;
        let value = extract_count(text.as_deref());

        match &self.config.secondary_selector {
            Some(selector) => {
                let secondary = browser
                    .text_content(&Locator::new(selector))
                    .await
                    .ok()
                    .flatten();
                tracing::info!(
                    "📊 Source A ({}) => count={}, total={}",
                    spec.label,
                    value,
                    extract_count(secondary.as_deref())
                );
            }
            None => tracing::info!("📊 Source A ({}) => count={}", spec.label, value),
        }

        Ok(value)
    }

    /// Clicks the first visible consent button. Returns whether one was found.
    async fn accept_consent(&self, browser: &dyn Browser) -> bool {
        for selector in &self.config.consent_selectors {
            let button = Locator::new(selector);
            if browser.is_visible(&button).await {
                if let Err(e) = browser.click(&button).await {
                    tracing::debug!("Consent click on {} failed: {}", selector, e);
                }
                tokio::time::sleep(self.config.consent_pause()).await;
                tracing::info!("✅ Consent accepted");
                return true;
            }
        }
        tracing::info!("ℹ️ Consent button not found");
        false
    }
}

/// Reads the dealer site total after filtering it to a branch.
pub struct SourceBReader {
    listing_url: String,
    total_block: Locator,
    total: Locator,
    counter: Option<Locator>,
    block_timeout: Duration,
    navigation_timeout: Duration,
    synchronizer: BranchSynchronizer,
    screenshots: Option<Screenshots>,
}

impl SourceBReader {
    pub fn new(
        config: &SourceBConfig,
        navigation_timeout: Duration,
        screenshots: Option<Screenshots>,
    ) -> Self {
        let total_block = Locator::new(&config.total_block).visible();
        Self {
            listing_url: config.listing_url.clone(),
            total: total_block.child(&config.total_selector),
            counter: config.counter_selector.as_ref().map(|s| total_block.child(s)),
            total_block,
            block_timeout: Duration::from_millis(config.block_timeout_ms),
            navigation_timeout,
            synchronizer: BranchSynchronizer::from_config(config),
            screenshots,
        }
    }

    pub async fn read(&self, browser: &dyn Browser, spec: &BranchSpec) -> ReadOutcome {
        tracing::info!("🔶 Source B → {}", spec.label);
        into_outcome(Source::B, &spec.label, self.try_read(browser, spec).await)
    }

    async fn try_read(&self, browser: &dyn Browser, spec: &BranchSpec) -> Result<u64> {
        let branch = spec.source_b_selector.trim();
        if branch.is_empty() {
            return Err(ReconcileError::element_missing(format!(
                "branch option for '{}'",
                spec.label
            )));
        }

        browser
            .navigate(&self.listing_url, self.navigation_timeout)
            .await?;
        if let Some(shots) = &self.screenshots {
            shots.capture(browser, "source_b_loaded", &spec.label).await;
        }

        self.synchronizer
            .select_branch(browser, branch, &spec.label)
            .await?;
        if let Some(shots) = &self.screenshots {
            shots.capture(browser, "source_b", &spec.label).await;
        }

        browser
            .wait_for_visible(&self.total_block, self.block_timeout)
            .await?;
        let value = extract_count(browser.text_content(&self.total).await?.as_deref());

        match &self.counter {
            Some(counter) => {
                let shown = browser.text_content(counter).await.ok().flatten();
                tracing::info!(
                    "📊 Source B ({}) => counter={}, max={}",
                    spec.label,
                    extract_count(shown.as_deref()),
                    value
                );
            }
            None => tracing::info!("📊 Source B ({}) => max={}", spec.label, value),
        }

        Ok(value)
    }
}
