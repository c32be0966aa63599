use crate::domain::ports::WebhookClient;
use crate::utils::error::{ReconcileError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct HttpWebhookClient {
    client: Client,
}

impl HttpWebhookClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl WebhookClient for HttpWebhookClient {
    async fn post(&self, url: &str, body: &serde_json::Value, timeout: Duration) -> Result<u16> {
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ReconcileError::delivery(url, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            let detail = response.text().await.unwrap_or_default();
            Err(ReconcileError::delivery(
                url,
                format!("HTTP {} {}", status, detail.trim()),
            ))
        }
    }
}
