pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::{HttpWebhookClient, WebDriverBrowser};
pub use config::ReconcileConfig;
pub use crate::core::{
    dispatch::WebhookDispatcher,
    engine::{EngineReport, ReconcileEngine},
    runner::Reconciler,
};
pub use utils::error::{ReconcileError, Result};
