use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "listing-reconciler")]
#[command(about = "Compares partner listing counts with the dealer site per branch and reports to Slack")]
pub struct CliArgs {
    /// Path to TOML configuration file; built-in defaults are used when omitted
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override browser.webdriver_url
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Skip webhook delivery and print the report instead
    #[arg(long)]
    pub no_notify: bool,

    /// Show configuration and resolved webhook targets without running
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with code 1 when any comparison failed
    #[arg(long)]
    pub strict: bool,

    /// Emit JSON log lines
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}
