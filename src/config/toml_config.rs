use crate::domain::model::BranchSpec;
use crate::utils::error::{ReconcileError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_WEBHOOK_PATTERN: &str = r"^https://hooks\.slack\.com/services/\S+$";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub report: ReportConfig,
    pub browser: BrowserConfig,
    pub source_a: SourceAConfig,
    pub source_b: SourceBConfig,
    pub webhook: WebhookConfig,
    pub branches: Vec<BranchSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub title: String,
    pub username: String,
    pub icon_emoji: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Autohammer vs Mobile.de Test Report".to_string(),
            username: "Autohammer Result Test".to_string(),
            icon_emoji: ":robot_face:".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub navigation_timeout_ms: u64,
    /// Upper bound for a single WebDriver command.
    pub command_timeout_ms: u64,
    /// Full-page screenshots are written here when set.
    pub screenshot_dir: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_string(),
            headless: true,
            window_width: 1280,
            window_height: 800,
            navigation_timeout_ms: 30_000,
            command_timeout_ms: 20_000,
            screenshot_dir: Some("screenshots".to_string()),
        }
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceAConfig {
    /// Tried in order; the first visible one is clicked.
    pub consent_selectors: Vec<String>,
    pub consent_pause_ms: u64,
    pub settle_ms: u64,
    pub count_selector: String,
    pub secondary_selector: Option<String>,
}

impl Default for SourceAConfig {
    fn default() -> Self {
        Self {
            consent_selectors: vec![
                "button.mde-consent-accept-btn".to_string(),
                "button.sc-bRKDuR.eIxcnl.mde-consent-accept-btn".to_string(),
            ],
            consent_pause_ms: 400,
            settle_ms: 800,
            count_selector: "span.resultsMatched".to_string(),
            secondary_selector: Some("span.resultCount".to_string()),
        }
    }
}

impl SourceAConfig {
    pub fn consent_pause(&self) -> Duration {
        Duration::from_millis(self.consent_pause_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceBConfig {
    pub listing_url: String,
    pub branch_select: String,
    pub total_block: String,
    pub total_selector: String,
    pub counter_selector: Option<String>,
    pub select_timeout_ms: u64,
    pub change_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub idle_timeout_ms: u64,
    pub settle_ms: u64,
    pub block_timeout_ms: u64,
}

impl Default for SourceBConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://autohammer.de/neuwagen-vorfuehrer-gebrauchtwagen".to_string(),
            branch_select: "select#branch-selector".to_string(),
            total_block: ".car-result-info__total".to_string(),
            total_selector: ".max".to_string(),
            counter_selector: Some(".counter".to_string()),
            select_timeout_ms: 15_000,
            change_timeout_ms: 15_000,
            poll_interval_ms: 250,
            idle_timeout_ms: 5_000,
            settle_ms: 800,
            block_timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub allowed_pattern: String,
    pub timeout_seconds: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            allowed_pattern: DEFAULT_WEBHOOK_PATTERN.to_string(),
            timeout_seconds: 10,
        }
    }
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

pub fn default_branches() -> Vec<BranchSpec> {
    vec![
        BranchSpec::new("Radebeul", "https://home.mobile.de/AUTO-HAMMER#ses", "3866"),
        BranchSpec::new("Grimma", "https://home.mobile.de/AUTOHAMMERGMBH#ses", "5749"),
    ]
}

impl ReconcileConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        let mut config: Self = toml::from_str(&processed_content)?;
        if config.branches.is_empty() {
            config.branches = default_branches();
        }
        Ok(config)
    }

    /// Built-in configuration used when no file is given.
    pub fn builtin() -> Self {
        Self {
            branches: default_branches(),
            ..Self::default()
        }
    }

    /// 替換環境變數 (例如 ${WEBDRIVER_URL})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([^}]+)\}").expect("static env var pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("browser.webdriver_url", &self.browser.webdriver_url)?;
        validation::validate_url("source_b.listing_url", &self.source_b.listing_url)?;
        validation::validate_non_empty_string("source_a.count_selector", &self.source_a.count_selector)?;
        validation::validate_non_empty_string("source_b.branch_select", &self.source_b.branch_select)?;
        validation::validate_non_empty_string("source_b.total_block", &self.source_b.total_block)?;
        validation::validate_non_empty_string("source_b.total_selector", &self.source_b.total_selector)?;
        validation::validate_positive_number(
            "browser.navigation_timeout_ms",
            self.browser.navigation_timeout_ms,
            1,
        )?;
        validation::validate_positive_number(
            "browser.command_timeout_ms",
            self.browser.command_timeout_ms,
            1,
        )?;
        validation::validate_positive_number(
            "source_b.change_timeout_ms",
            self.source_b.change_timeout_ms,
            1,
        )?;
        validation::validate_positive_number(
            "source_b.poll_interval_ms",
            self.source_b.poll_interval_ms,
            1,
        )?;
        validation::validate_positive_number(
            "webhook.timeout_seconds",
            self.webhook.timeout_seconds,
            1,
        )?;
        validation::validate_regex("webhook.allowed_pattern", &self.webhook.allowed_pattern)?;

        // Branch contents are not checked; a malformed branch runs and
        // reports as a failed comparison.
        if self.branches.is_empty() {
            return Err(ReconcileError::Configuration {
                message: "at least one [[branches]] entry is required".to_string(),
            });
        }

        Ok(())
    }
}

impl Validate for ReconcileConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
