use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Element not found: {selector}")]
    ElementMissing { selector: String },

    #[error("Displayed total did not change within {timeout:?} after selecting {branch}")]
    StateSyncTimeout { branch: String, timeout: Duration },

    #[error("Webhook delivery to {url} failed: {message}")]
    Delivery { url: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Browser protocol error: {message}")]
    Browser { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Recovered locally, the run continues.
    Low,
    Medium,
    High,
    Critical,
}

impl ReconcileError {
    pub fn navigation(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn element_missing(selector: impl Into<String>) -> Self {
        Self::ElementMissing {
            selector: selector.into(),
        }
    }

    pub fn browser(message: impl Into<String>) -> Self {
        Self::Browser {
            message: message.into(),
        }
    }

    pub fn delivery(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::StateSyncTimeout { .. } | Self::Delivery { .. } => ErrorSeverity::Low,
            Self::Navigation { .. } | Self::ElementMissing { .. } | Self::Http(_) => {
                ErrorSeverity::Medium
            }
            Self::Configuration { .. }
            | Self::InvalidConfigValue { .. }
            | Self::TomlParse(_)
            | Self::Serialization(_) => ErrorSeverity::High,
            Self::Browser { .. } | Self::Io(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Navigation { .. } => "Check network access and that the page URL is still valid",
            Self::ElementMissing { .. } => {
                "The page layout may have changed; review the selectors in the config file"
            }
            Self::StateSyncTimeout { .. } => {
                "Increase source_b.change_timeout_ms if the page updates slowly"
            }
            Self::Delivery { .. } => "Verify the webhook URL and that the destination accepts posts",
            Self::Configuration { .. } | Self::InvalidConfigValue { .. } | Self::TomlParse(_) => {
                "Fix the configuration file and run again"
            }
            Self::Browser { .. } => "Make sure a WebDriver server is running at the configured address",
            Self::Http(_) => "Check network connectivity",
            Self::Io(_) => "Check file paths and permissions",
            Self::Serialization(_) => "Report this as a bug",
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
