use crate::config::ReconcileConfig;
use crate::core::readers::{Screenshots, SourceAReader, SourceBReader};
use crate::domain::model::{BranchSpec, ComparisonResult, RunSummary};
use crate::domain::ports::Browser;

/// Compares Source A and Source B for each configured branch over one
/// shared browser session.
pub struct Reconciler<B: Browser> {
    browser: B,
    source_a: SourceAReader,
    source_b: SourceBReader,
}

impl<B: Browser> Reconciler<B> {
    pub fn new(browser: B, source_a: SourceAReader, source_b: SourceBReader) -> Self {
        Self {
            browser,
            source_a,
            source_b,
        }
    }

    pub fn from_config(browser: B, config: &ReconcileConfig) -> Self {
        let navigation_timeout = config.browser.navigation_timeout();
        let screenshots = Screenshots::from_dir(config.browser.screenshot_dir.as_deref());

        Self::new(
            browser,
            SourceAReader::new(
                config.source_a.clone(),
                navigation_timeout,
                screenshots.clone(),
            ),
            SourceBReader::new(&config.source_b, navigation_timeout, screenshots),
        )
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn into_browser(self) -> B {
        self.browser
    }

    /// Runs every branch in order. Branches run one at a time because both
    /// readers drive the same page.
    pub async fn run(&self, branches: &[BranchSpec]) -> RunSummary {
        let mut summary = RunSummary::new();

        for (index, spec) in branches.iter().enumerate() {
            tracing::info!(
                "🔍 Branch {}/{}: {}",
                index + 1,
                branches.len(),
                spec.label
            );
            let result = self.compare(spec).await;

            if result.passed() {
                tracing::info!("✅ PASS ({}): {} matches {}", result.label, result.a, result.b);
            } else {
                tracing::warn!("❌ FAIL ({}): {} != {}", result.label, result.a, result.b);
            }
            summary.record(result);
        }

        tracing::info!(
            "🏁 Reconciliation finished: {} total, {} passed, {} failed",
            summary.total,
            summary.passed,
            summary.failed
        );
        summary
    }

    async fn compare(&self, spec: &BranchSpec) -> ComparisonResult {
        let a = self.source_a.read(&self.browser, spec).await;
        let b = self.source_b.read(&self.browser, spec).await;

        if a.value() == 0 && b.value() == 0 && !a.is_failure() && !b.is_failure() {
            tracing::warn!(
                "⚠️ {}: both sources report 0; the page may have shown no data",
                spec.label
            );
        }

        ComparisonResult::from_outcomes(&spec.label, a, b)
    }
}
