#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;
pub mod webhooks;

#[cfg(feature = "cli")]
pub use cli::CliArgs;
pub use toml_config::{
    BrowserConfig, ReconcileConfig, ReportConfig, SourceAConfig, SourceBConfig, WebhookConfig,
};
