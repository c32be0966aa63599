//! `Browser` over the W3C WebDriver HTTP protocol (chromedriver,
//! geckodriver, Selenium). One instance owns one session.

use crate::config::BrowserConfig;
use crate::domain::ports::{Browser, Locator};
use crate::utils::error::{ReconcileError, Result};
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f713b76be8b";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct WebDriverBrowser {
    client: Client,
    base_url: String,
    session_id: String,
    command_timeout: Duration,
}

fn capabilities(config: &BrowserConfig) -> Value {
    let window = format!("--window-size={},{}", config.window_width, config.window_height);
    let mut chrome_args = vec![window];
    let mut firefox_args = Vec::new();
    if config.headless {
        chrome_args.push("--headless=new".to_string());
        firefox_args.push("-headless".to_string());
    }

    json!({
        "capabilities": {
            "alwaysMatch": {
                "pageLoadStrategy": "eager",
                "goog:chromeOptions": { "args": chrome_args },
                "moz:firefoxOptions": { "args": firefox_args }
            }
        }
    })
}

/// Sends one WebDriver command and unwraps the `value` envelope. A stalled
/// driver surfaces as a `reqwest` timeout after `timeout`.
async fn send(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<&Value>,
    timeout: Duration,
) -> Result<Value> {
    let mut request = client.request(method.clone(), url).timeout(timeout);
    if let Some(body) = body {
        request = request.json(body);
    } else if method == Method::POST {
        request = request.json(&json!({}));
    }

    let response = request.send().await?;
    let status = response.status();
    let payload: Value = response.json().await?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }

    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if error == "no such element" {
        Err(ReconcileError::element_missing(message))
    } else {
        Err(ReconcileError::browser(format!("{} ({}): {}", error, status, message)))
    }
}

impl WebDriverBrowser {
    pub async fn connect(config: &BrowserConfig) -> Result<Self> {
        let command_timeout = config.command_timeout();
        let client = Client::builder().timeout(command_timeout).build()?;
        let base_url = config.webdriver_url.trim_end_matches('/').to_string();

        tracing::info!("🌐 Opening WebDriver session at {}", base_url);
        // Browser startup can take longer than a regular command.
        let value = send(
            &client,
            Method::POST,
            &format!("{}/session", base_url),
            Some(&capabilities(config)),
            command_timeout.max(config.navigation_timeout()),
        )
        .await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ReconcileError::browser("new session response has no sessionId"))?
            .to_string();

        let browser = Self {
            client,
            base_url,
            session_id,
            command_timeout,
        };

        let timeouts = json!({ "pageLoad": config.navigation_timeout_ms });
        if let Err(e) = browser.command(Method::POST, "timeouts", Some(timeouts)).await {
            tracing::warn!("Could not set page load timeout: {}", e);
        }
        let rect = json!({ "width": config.window_width, "height": config.window_height });
        if let Err(e) = browser.command(Method::POST, "window/rect", Some(rect)).await {
            tracing::debug!("Could not resize window: {}", e);
        }

        Ok(browser)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn close(&self) -> Result<()> {
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        send(&self.client, Method::DELETE, &url, None, self.command_timeout).await?;
        tracing::debug!("WebDriver session {} closed", self.session_id);
        Ok(())
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        self.command_within(method, path, body, self.command_timeout)
            .await
    }

    async fn command_within(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        let url = format!("{}/session/{}/{}", self.base_url, self.session_id, path);
        send(&self.client, method, &url, body.as_ref(), timeout).await
    }

    async fn execute(&self, script: &str) -> Result<Value> {
        self.command(
            Method::POST,
            "execute/sync",
            Some(json!({ "script": script, "args": [] })),
        )
        .await
    }

    async fn find_in(&self, scope: Option<&str>, selector: &str) -> Result<Vec<String>> {
        let path = match scope {
            Some(id) => format!("element/{}/elements", id),
            None => "elements".to_string(),
        };
        let found = self
            .command(
                Method::POST,
                &path,
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await?;

        Ok(found
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get(ELEMENT_KEY).and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn displayed(&self, element: &str) -> Result<bool> {
        let value = self
            .command(Method::GET, &format!("element/{}/displayed", element), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Walks the locator chain from the outermost parent, taking the first
    /// (displayed, when required) match at every level.
    async fn resolve(&self, locator: &Locator) -> Result<String> {
        let mut chain = vec![locator];
        let mut current = locator;
        while let Some(parent) = &current.within {
            chain.push(parent.as_ref());
            current = parent.as_ref();
        }
        chain.reverse();

        let mut scope: Option<String> = None;
        for step in chain {
            let mut chosen = None;
            for id in self.find_in(scope.as_deref(), &step.selector).await? {
                if !step.visible_only || self.displayed(&id).await.unwrap_or(false) {
                    chosen = Some(id);
                    break;
                }
            }
            scope = Some(chosen.ok_or_else(|| ReconcileError::element_missing(locator.describe()))?);
        }

        scope.ok_or_else(|| ReconcileError::element_missing(locator.describe()))
    }

    async fn ready_state(&self) -> Result<String> {
        let value = self.execute("return document.readyState").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn wait_for_ready_state(&self, timeout: Duration) -> Result<()> {
        let poll = async {
            loop {
                if self.ready_state().await.map(|s| s == "complete").unwrap_or(false) {
                    return;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| ReconcileError::browser("document did not reach readyState=complete"))
    }
}

fn css_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        // With the eager page load strategy the driver answers at DOMContentLoaded.
        let load = self.command_within(Method::POST, "url", Some(json!({ "url": url })), timeout);

        match tokio::time::timeout(timeout, load).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ReconcileError::navigation(url, e.to_string())),
            Err(_) => Err(ReconcileError::navigation(
                url,
                format!("timed out after {:?}", timeout),
            )),
        }
    }

    async fn is_visible(&self, locator: &Locator) -> bool {
        match self.resolve(locator).await {
            Ok(id) => self.displayed(&id).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let id = self.resolve(locator).await?;
        self.command(Method::POST, &format!("element/{}/click", id), None)
            .await?;
        Ok(())
    }

    async fn text_content(&self, locator: &Locator) -> Result<Option<String>> {
        let id = self.resolve(locator).await?;
        let value = self
            .command(Method::GET, &format!("element/{}/property/textContent", id), None)
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn select_option(&self, locator: &Locator, value: &str) -> Result<()> {
        let select = self.resolve(locator).await?;
        let selector = format!("option[value=\"{}\"]", css_string(value));
        let option = self
            .find_in(Some(&select), &selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ReconcileError::element_missing(format!("{} {}", locator.describe(), selector))
            })?;
        self.command(Method::POST, &format!("element/{}/click", option), None)
            .await?;
        Ok(())
    }

    async fn wait_for_visible(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        let poll = async {
            while !self.is_visible(locator).await {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        // The deadline also cuts off a lookup the driver is still answering.
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| ReconcileError::element_missing(locator.describe()))
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<()> {
        // Full-page capture is a geckodriver extension; other drivers fall
        // back to the viewport.
        let encoded = if full_page {
            match self.command(Method::GET, "moz/screenshot/full", None).await {
                Ok(value) => value,
                Err(_) => self.command(Method::GET, "screenshot", None).await?,
            }
        } else {
            self.command(Method::GET, "screenshot", None).await?
        };

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_str().unwrap_or_default())
            .map_err(|e| ReconcileError::browser(format!("invalid screenshot data: {}", e)))?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn wait_for_idle(&self, timeout: Duration) -> Result<()> {
        self.wait_for_ready_state(timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn element(id: &str) -> Value {
        let mut reference = serde_json::Map::new();
        reference.insert(ELEMENT_KEY.to_string(), Value::from(id));
        Value::Object(reference)
    }

    async fn connected(server: &MockServer) -> WebDriverBrowser {
        connected_with(server, BrowserConfig::default()).await
    }

    async fn connected_with(server: &MockServer, config: BrowserConfig) -> WebDriverBrowser {
        server.mock(|when, then| {
            when.method(POST).path("/session");
            then.status(200)
                .json_body(json!({ "value": { "sessionId": "s1", "capabilities": {} } }));
        });
        server.mock(|when, then| {
            when.method(POST).path("/session/s1/timeouts");
            then.status(200).json_body(json!({ "value": null }));
        });

        let config = BrowserConfig {
            webdriver_url: server.base_url(),
            ..config
        };
        WebDriverBrowser::connect(&config).await.unwrap()
    }

    fn stalled_lookup(server: &MockServer) {
        server.mock(|when, then| {
            when.method(POST).path("/session/s1/elements");
            then.status(200)
                .delay(Duration::from_secs(2))
                .json_body(json!({ "value": [element("sel")] }));
        });
    }

    #[tokio::test]
    async fn test_connect_reads_session_id() {
        let server = MockServer::start();
        let browser = connected(&server).await;
        assert_eq!(browser.session_id(), "s1");
    }

    #[tokio::test]
    async fn test_text_content_resolves_visible_parent_then_child() {
        let server = MockServer::start();
        let browser = connected(&server).await;

        server.mock(|when, then| {
            when.method(POST)
                .path("/session/s1/elements")
                .json_body(json!({ "using": "css selector", "value": ".car-result-info__total" }));
            then.status(200)
                .json_body(json!({ "value": [element("hidden"), element("shown")] }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/session/s1/element/hidden/displayed");
            then.status(200).json_body(json!({ "value": false }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/session/s1/element/shown/displayed");
            then.status(200).json_body(json!({ "value": true }));
        });
        let child = server.mock(|when, then| {
            when.method(POST)
                .path("/session/s1/element/shown/elements")
                .json_body(json!({ "using": "css selector", "value": ".max" }));
            then.status(200).json_body(json!({ "value": [element("max")] }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/session/s1/element/max/property/textContent");
            then.status(200).json_body(json!({ "value": " 47 " }));
        });

        let locator = Locator::new(".car-result-info__total").visible().child(".max");
        let text = browser.text_content(&locator).await.unwrap();

        assert_eq!(text.as_deref(), Some(" 47 "));
        child.assert();
    }

    #[tokio::test]
    async fn test_missing_element() {
        let server = MockServer::start();
        let browser = connected(&server).await;
        server.mock(|when, then| {
            when.method(POST).path("/session/s1/elements");
            then.status(200).json_body(json!({ "value": [] }));
        });

        let locator = Locator::new("span.resultsMatched");
        let err = browser.text_content(&locator).await.unwrap_err();

        assert!(matches!(err, ReconcileError::ElementMissing { .. }));
        assert!(!browser.is_visible(&locator).await);
    }

    #[tokio::test]
    async fn test_navigation_error_is_mapped() {
        let server = MockServer::start();
        let browser = connected(&server).await;
        server.mock(|when, then| {
            when.method(POST).path("/session/s1/url");
            then.status(500).json_body(json!({
                "value": { "error": "unknown error", "message": "net::ERR_NAME_NOT_RESOLVED" }
            }));
        });

        let err = browser
            .navigate("https://nowhere.invalid", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Navigation { .. }));
        assert!(err.to_string().contains("ERR_NAME_NOT_RESOLVED"));
    }

    #[tokio::test]
    async fn test_select_option_clicks_matching_option() {
        let server = MockServer::start();
        let browser = connected(&server).await;
        server.mock(|when, then| {
            when.method(POST)
                .path("/session/s1/elements")
                .json_body(json!({ "using": "css selector", "value": "select#branch-selector" }));
            then.status(200).json_body(json!({ "value": [element("sel")] }));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/session/s1/element/sel/elements")
                .json_body(json!({ "using": "css selector", "value": "option[value=\"3866\"]" }));
            then.status(200).json_body(json!({ "value": [element("opt")] }));
        });
        let click = server.mock(|when, then| {
            when.method(POST).path("/session/s1/element/opt/click");
            then.status(200).json_body(json!({ "value": null }));
        });

        browser
            .select_option(&Locator::new("select#branch-selector"), "3866")
            .await
            .unwrap();

        click.assert();
    }

    #[tokio::test]
    async fn test_wait_for_visible_gives_up_at_deadline_on_stalled_driver() {
        let server = MockServer::start();
        let browser = connected(&server).await;
        stalled_lookup(&server);

        let started = std::time::Instant::now();
        let result = browser
            .wait_for_visible(&Locator::new("select#branch-selector"), Duration::from_millis(100))
            .await;

        assert!(matches!(result, Err(ReconcileError::ElementMissing { .. })));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_stalled_command_hits_command_timeout() {
        let server = MockServer::start();
        let config = BrowserConfig {
            command_timeout_ms: 200,
            ..BrowserConfig::default()
        };
        let browser = connected_with(&server, config).await;
        stalled_lookup(&server);

        let started = std::time::Instant::now();
        let err = browser
            .text_content(&Locator::new("span.resultsMatched"))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Http(_)));
        assert!(started.elapsed() < Duration::from_millis(1500));
        assert!(!browser.is_visible(&Locator::new("span.resultsMatched")).await);
    }

    #[tokio::test]
    async fn test_close_deletes_session() {
        let server = MockServer::start();
        let browser = connected(&server).await;
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/session/s1");
            then.status(200).json_body(json!({ "value": null }));
        });

        browser.close().await.unwrap();
        delete.assert();
    }
}
