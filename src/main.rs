use clap::Parser;
use listing_reconciler::config::webhooks::webhook_urls_from_env;
use listing_reconciler::core::dispatch::{compile_pattern, resolve_targets};
use listing_reconciler::domain::model::{DeliveryResult, WebhookTarget};
use listing_reconciler::utils::error::ErrorSeverity;
use listing_reconciler::utils::{logger, validation::Validate};
use listing_reconciler::{
    CliArgs, HttpWebhookClient, ReconcileConfig, ReconcileEngine, ReconcileError, Reconciler,
    WebDriverBrowser, WebhookDispatcher,
};

/// Exit status for an error that stopped the run before it completed.
fn exit_code(error: &ReconcileError) -> i32 {
    match error.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(error: ReconcileError) -> ! {
    tracing::error!("❌ {} (severity: {:?})", error, error.severity());
    eprintln!("❌ {}", error);
    eprintln!("💡 {}", error.recovery_suggestion());
    std::process::exit(exit_code(&error));
}

fn load_config(args: &CliArgs) -> Result<ReconcileConfig, ReconcileError> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            ReconcileConfig::from_file(path)?
        }
        None => {
            tracing::info!("📁 No config file given, using built-in configuration");
            ReconcileConfig::builtin()
        }
    };

    if let Some(url) = &args.webdriver_url {
        config.browser.webdriver_url = url.clone();
        tracing::info!("🔧 WebDriver URL overridden to: {}", url);
    }

    config.validate()?;
    Ok(config)
}

fn display_summary(config: &ReconcileConfig, targets: &[WebhookTarget]) {
    println!("📋 Configuration Summary:");
    println!("  Source B listing: {}", config.source_b.listing_url);
    println!("  WebDriver: {}", config.browser.webdriver_url);
    println!("  Branches:");
    for branch in &config.branches {
        println!(
            "    - {} → {} (option {})",
            branch.label, branch.source_a_target, branch.source_b_selector
        );
    }
    println!("  Webhooks:");
    if targets.is_empty() {
        println!("    (none)");
    }
    for target in targets {
        let mark = if target.validated { "✅" } else { "⚠️ ignored" };
        println!("    {} {}", mark, target.url);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }
    tracing::info!("Starting listing-reconciler");

    let config = load_config(&args).unwrap_or_else(|e| fail(e));
    let pattern = compile_pattern(&config.webhook.allowed_pattern).unwrap_or_else(|e| fail(e));
    let targets = if args.no_notify {
        tracing::info!("🔕 Notifications disabled");
        Vec::new()
    } else {
        resolve_targets(&webhook_urls_from_env(), &pattern)
    };

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No browser session will be opened");
        display_summary(&config, &targets);
        return Ok(());
    }

    let browser = WebDriverBrowser::connect(&config.browser)
        .await
        .unwrap_or_else(|e| fail(e));

    let engine = ReconcileEngine::new(
        Reconciler::from_config(browser, &config),
        WebhookDispatcher::from_config(HttpWebhookClient::new(), &config.report, &config.webhook),
        config.report.title.clone(),
        targets,
    );
    let report = engine.run(&config.branches).await;

    if let Err(e) = engine.into_reconciler().into_browser().close().await {
        tracing::warn!("Could not close WebDriver session: {}", e);
    }

    if args.no_notify {
        println!("{}", report.message);
    }
    for delivery in &report.deliveries {
        if let DeliveryResult::Failed { error } = &delivery.result {
            eprintln!("⚠️ Notification to {} failed: {}", delivery.url, error);
        }
    }

    println!(
        "🏁 {} checks: {} passed, {} failed",
        report.summary.total, report.summary.passed, report.summary.failed
    );

    if args.strict && !report.summary.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}
