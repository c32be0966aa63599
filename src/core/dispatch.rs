use crate::config::{ReportConfig, WebhookConfig};
use crate::domain::model::{DeliveryOutcome, DeliveryResult, WebhookTarget};
use crate::domain::ports::WebhookClient;
use crate::utils::error::{ReconcileError, Result};
use futures_util::future::join_all;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;

/// Incoming-webhook body: the message plus sender identity, with link and
/// media previews turned off.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload<'a> {
    pub username: &'a str,
    pub icon_emoji: &'a str,
    pub text: &'a str,
    pub unfurl_links: bool,
    pub unfurl_media: bool,
}

pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ReconcileError::InvalidConfigValue {
        field: "webhook.allowed_pattern".to_string(),
        value: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Deduplicates `urls` by exact string (first occurrence wins) and marks
/// each target validated when it matches `pattern`. Rejected URLs are logged
/// and kept in the result with `validated: false`.
pub fn resolve_targets(urls: &[String], pattern: &Regex) -> Vec<WebhookTarget> {
    let mut seen = HashSet::new();

    urls.iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty() && seen.insert(url.to_string()))
        .map(|url| {
            let validated = pattern.is_match(url);
            if !validated {
                tracing::warn!("⚠️ Ignoring webhook URL that does not match the expected address: {}", url);
            }
            WebhookTarget {
                url: url.to_string(),
                validated,
            }
        })
        .collect()
}

pub struct WebhookDispatcher<C: WebhookClient> {
    client: C,
    username: String,
    icon_emoji: String,
    timeout: Duration,
}

impl<C: WebhookClient> WebhookDispatcher<C> {
    pub fn new(client: C, username: String, icon_emoji: String, timeout: Duration) -> Self {
        Self {
            client,
            username,
            icon_emoji,
            timeout,
        }
    }

    pub fn from_config(client: C, report: &ReportConfig, webhook: &WebhookConfig) -> Self {
        Self::new(
            client,
            report.username.clone(),
            report.icon_emoji.clone(),
            webhook.timeout(),
        )
    }

    pub fn payload(&self, message: &str) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(WebhookPayload {
            username: &self.username,
            icon_emoji: &self.icon_emoji,
            text: message,
            unfurl_links: false,
            unfurl_media: false,
        })?)
    }

    /// Posts `message` to every validated target at once. Each delivery has
    /// its own timeout and its own outcome; outcomes follow target order.
    pub async fn dispatch(&self, message: &str, targets: &[WebhookTarget]) -> Vec<DeliveryOutcome> {
        let validated: Vec<&WebhookTarget> = targets.iter().filter(|t| t.validated).collect();
        if validated.is_empty() {
            tracing::info!("ℹ️ No webhook destinations configured, skipping notification");
            return Vec::new();
        }

        let body = match self.payload(message) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("❌ Cannot build webhook payload: {}", e);
                return validated
                    .iter()
                    .map(|target| DeliveryOutcome {
                        url: target.url.clone(),
                        result: DeliveryResult::Failed {
                            error: e.to_string(),
                        },
                    })
                    .collect();
            }
        };

        let deliveries = validated
            .iter()
            .map(|target| self.deliver(&target.url, &body));
        let outcomes = join_all(deliveries).await;

        let delivered = outcomes.iter().filter(|o| o.is_success()).count();
        tracing::info!(
            "📨 Webhook delivery: {}/{} succeeded",
            delivered,
            outcomes.len()
        );
        outcomes
    }

    async fn deliver(&self, url: &str, body: &serde_json::Value) -> DeliveryOutcome {
        let attempt = tokio::time::timeout(self.timeout, self.client.post(url, body, self.timeout));

        let result = match attempt.await {
            Ok(Ok(status)) => {
                tracing::info!("✅ Notification sent to {}", url);
                DeliveryResult::Delivered { status }
            }
            Ok(Err(e)) => {
                tracing::error!("❌ {}", e);
                DeliveryResult::Failed {
                    error: e.to_string(),
                }
            }
            Err(_) => {
                let e = ReconcileError::delivery(url, format!("timed out after {:?}", self.timeout));
                tracing::error!("❌ {}", e);
                DeliveryResult::Failed {
                    error: e.to_string(),
                }
            }
        };

        DeliveryOutcome {
            url: url.to_string(),
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const X: &str = "https://hooks.example.com/services/X";
    const Y: &str = "https://hooks.example.com/services/Y";

    fn example_pattern() -> Regex {
        compile_pattern(r"^https://hooks\.example\.com/services/\S+$").unwrap()
    }

    enum Behaviour {
        Ok,
        Reject,
        Hang,
    }

    #[derive(Default)]
    struct RecordingClient {
        behaviour: HashMap<String, Behaviour>,
        calls: Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl RecordingClient {
        fn with(mut self, url: &str, behaviour: Behaviour) -> Self {
            self.behaviour.insert(url.to_string(), behaviour);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
        }
    }

    #[async_trait]
    impl WebhookClient for RecordingClient {
        async fn post(&self, url: &str, body: &serde_json::Value, _timeout: Duration) -> Result<u16> {
            self.calls.lock().unwrap().push((url.to_string(), body.clone()));
            match self.behaviour.get(url).unwrap_or(&Behaviour::Ok) {
                Behaviour::Ok => Ok(200),
                Behaviour::Reject => Err(ReconcileError::delivery(url, "HTTP 500")),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(200)
                }
            }
        }
    }

    fn dispatcher(client: RecordingClient) -> WebhookDispatcher<RecordingClient> {
        WebhookDispatcher::new(
            client,
            "Autohammer Result Test".to_string(),
            ":robot_face:".to_string(),
            Duration::from_millis(100),
        )
    }

    #[test]
    fn test_duplicates_resolve_to_one_target() {
        let targets = resolve_targets(&[X.to_string(), X.to_string()], &example_pattern());
        assert_eq!(
            targets,
            vec![WebhookTarget {
                url: X.to_string(),
                validated: true
            }]
        );
    }

    #[test]
    fn test_non_matching_urls_are_not_validated() {
        let targets = resolve_targets(
            &[X.to_string(), "ftp://bad".to_string(), "https://evil.example.com/services/X".to_string()],
            &example_pattern(),
        );
        let validated: Vec<&str> = targets
            .iter()
            .filter(|t| t.validated)
            .map(|t| t.url.as_str())
            .collect();
        assert_eq!(validated, vec![X]);
        assert_eq!(targets.len(), 3);
    }

    #[test]
    fn test_default_pattern_accepts_slack_hooks_only() {
        let pattern = compile_pattern(crate::config::toml_config::DEFAULT_WEBHOOK_PATTERN).unwrap();
        assert!(pattern.is_match("https://hooks.slack.com/services/T0/B0/abc"));
        assert!(!pattern.is_match("http://hooks.slack.com/services/T0/B0/abc"));
        assert!(!pattern.is_match("https://hooks.slack.com.evil.io/x"));
    }

    #[tokio::test]
    async fn test_duplicate_url_gets_one_delivery() {
        let targets = resolve_targets(&[X.to_string(), X.to_string()], &example_pattern());
        let dispatcher = dispatcher(RecordingClient::default());

        let outcomes = dispatcher.dispatch("report", &targets).await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(dispatcher.client.calls(), vec![X]);
    }

    #[tokio::test]
    async fn test_invalid_url_is_skipped() {
        let targets = resolve_targets(&[X.to_string(), "ftp://bad".to_string()], &example_pattern());
        let dispatcher = dispatcher(RecordingClient::default());

        let outcomes = dispatcher.dispatch("report", &targets).await;

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_success());
        assert_eq!(dispatcher.client.calls(), vec![X]);
    }

    #[tokio::test]
    async fn test_one_timeout_does_not_block_others() {
        let targets = resolve_targets(&[X.to_string(), Y.to_string()], &example_pattern());
        let dispatcher = dispatcher(RecordingClient::default().with(X, Behaviour::Hang));

        let started = std::time::Instant::now();
        let outcomes = dispatcher.dispatch("report", &targets).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].url, X);
        assert!(matches!(outcomes[0].result, DeliveryResult::Failed { .. }));
        assert_eq!(outcomes[1].url, Y);
        assert_eq!(outcomes[1].result, DeliveryResult::Delivered { status: 200 });
    }

    #[tokio::test]
    async fn test_rejection_is_reported_per_destination() {
        let targets = resolve_targets(&[X.to_string(), Y.to_string()], &example_pattern());
        let dispatcher = dispatcher(RecordingClient::default().with(Y, Behaviour::Reject));

        let outcomes = dispatcher.dispatch("report", &targets).await;

        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
    }

    #[tokio::test]
    async fn test_no_targets_is_a_no_op() {
        let dispatcher = dispatcher(RecordingClient::default());
        let unvalidated = vec![WebhookTarget {
            url: "ftp://bad".to_string(),
            validated: false,
        }];

        assert!(dispatcher.dispatch("report", &[]).await.is_empty());
        assert!(dispatcher.dispatch("report", &unvalidated).await.is_empty());
        assert!(dispatcher.client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_payload_shape() {
        let dispatcher = dispatcher(RecordingClient::default());
        let targets = resolve_targets(&[X.to_string()], &example_pattern());
        dispatcher.dispatch("hello", &targets).await;

        let calls = dispatcher.client.calls.lock().unwrap();
        assert_eq!(
            calls[0].1,
            serde_json::json!({
                "username": "Autohammer Result Test",
                "icon_emoji": ":robot_face:",
                "text": "hello",
                "unfurl_links": false,
                "unfurl_media": false
            })
        );
    }
}
