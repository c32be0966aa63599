use crate::domain::model::{ComparisonResult, RunSummary};
use chrono::{DateTime, TimeZone};
use std::fmt::Display;

/// Renders a run as one Slack-flavoured message. Pure: the same summary,
/// title and timestamp always give the same text.
pub fn format_report<Tz>(summary: &RunSummary, title: &str, generated_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut message = format!(
        ":rocket: *{}*\n\
         :calendar: *Date and Time:* {}\n\
         :bar_chart: *Total Checks Performed:* {}\n\
         :white_check_mark: *Passed Checks:* {}\n\
         :x: *Failed Checks:* {}\n\
         \n*Details:*",
        title,
        generated_at.format("%d/%m/%Y %H:%M"),
        summary.total,
        summary.passed,
        summary.failed,
    );

    for entry in &summary.entries {
        message.push('\n');
        message.push_str(&render_entry(entry));
    }

    message
}

fn render_entry(entry: &ComparisonResult) -> String {
    let mut block = if entry.passed() {
        format!("✅ PASS ({}): {} matches {}", entry.label, entry.a, entry.b)
    } else if entry.matched {
        format!("❌ FAIL ({}): {} == {} but a read failed", entry.label, entry.a, entry.b)
    } else {
        format!(
            "❌ FAIL ({}): {} != {} (difference {})",
            entry.label, entry.a, entry.b, entry.difference
        )
    };

    for failure in &entry.failures {
        block.push_str(&format!("\n    ⚠️ {} read failed: {}", failure.source, failure.message));
    }

    block
}
