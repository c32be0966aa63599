use crate::core::dispatch::WebhookDispatcher;
use crate::core::report::format_report;
use crate::core::runner::Reconciler;
use crate::domain::model::{BranchSpec, DeliveryOutcome, RunSummary, WebhookTarget};
use crate::domain::ports::{Browser, WebhookClient};

#[derive(Debug, Clone)]
pub struct EngineReport {
    pub summary: RunSummary,
    pub message: String,
    pub deliveries: Vec<DeliveryOutcome>,
}

/// Reconcile, report, notify.
pub struct ReconcileEngine<B: Browser, C: WebhookClient> {
    reconciler: Reconciler<B>,
    dispatcher: WebhookDispatcher<C>,
    title: String,
    targets: Vec<WebhookTarget>,
}

impl<B: Browser, C: WebhookClient> ReconcileEngine<B, C> {
    pub fn new(
        reconciler: Reconciler<B>,
        dispatcher: WebhookDispatcher<C>,
        title: String,
        targets: Vec<WebhookTarget>,
    ) -> Self {
        Self {
            reconciler,
            dispatcher,
            title,
            targets,
        }
    }

    pub async fn run(&self, branches: &[BranchSpec]) -> EngineReport {
        tracing::info!("🚀 Starting reconciliation of {} branches", branches.len());
        let summary = self.reconciler.run(branches).await;

        let message = format_report(&summary, &self.title, &chrono::Local::now());
        tracing::debug!("Report:\n{}", message);

        let deliveries = self.dispatcher.dispatch(&message, &self.targets).await;

        EngineReport {
            summary,
            message,
            deliveries,
        }
    }

    pub fn into_reconciler(self) -> Reconciler<B> {
        self.reconciler
    }
}
