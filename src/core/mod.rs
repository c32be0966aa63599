pub mod dispatch;
pub mod engine;
pub mod extract;
pub mod readers;
pub mod report;
pub mod runner;
pub mod sync;

#[cfg(test)]
pub(crate) mod fake_browser;

pub use crate::domain::model::{
    BranchSpec, ComparisonResult, CountReading, DeliveryOutcome, ReadOutcome, RunSummary,
    WebhookTarget,
};
pub use crate::domain::ports::{Browser, Locator, WebhookClient};
pub use crate::utils::error::Result;
