/// Delimited multi-value setting: `url1,url2;url3 url4`.
pub const WEBHOOK_URLS_VAR: &str = "SLACK_WEBHOOK_URLS";
/// Numbered settings: `SLACK_WEBHOOK_URL_1`, `SLACK_WEBHOOK_URL_2`, ...
pub const WEBHOOK_URL_PREFIX: &str = "SLACK_WEBHOOK_URL_";

/// Collects webhook URLs from the delimited setting followed by the numbered
/// sequence. The numbered sequence starts at 1 and ends at the first missing
/// or blank index. Values are trimmed; duplicates are kept here and removed
/// when targets are resolved.
pub fn collect_webhook_urls<F>(lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut urls: Vec<String> = lookup(WEBHOOK_URLS_VAR)
        .map(|raw| {
            raw.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    for index in 1.. {
        match lookup(&format!("{}{}", WEBHOOK_URL_PREFIX, index)) {
            Some(value) if !value.trim().is_empty() => urls.push(value.trim().to_string()),
            _ => break,
        }
    }

    urls
}

pub fn webhook_urls_from_env() -> Vec<String> {
    collect_webhook_urls(|key| std::env::var(key).ok())
}
