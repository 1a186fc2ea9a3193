//! W3C WebDriver client
//!
//! Speaks the W3C WebDriver wire protocol over HTTP, which covers Appium
//! (mobile) as well as chromedriver and geckodriver (browsers). Only the
//! commands the runner needs are implemented.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Map, Value};

use crate::action::Locator;
use crate::common::{Error, Result};

use super::{ElementId, UiSession};

/// Key the W3C protocol uses for element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52f-4f735466cecf";
/// Legacy JSON Wire Protocol element key, still sent by older Appium servers
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Which kind of UI the session drives; decides how locators translate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Appium (UiAutomator2, XCUITest)
    #[default]
    Mobile,
    /// A desktop browser driver
    Browser,
}

/// An open WebDriver session
pub struct WebDriverSession {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
    platform: Platform,
    released: bool,
}

impl WebDriverSession {
    /// Create a new session with the given capabilities
    #[tracing::instrument(skip(capabilities))]
    pub async fn start(
        url: &str,
        platform: Platform,
        capabilities: Map<String, Value>,
        command_timeout: Duration,
    ) -> Result<Self> {
        let base_url = url.trim_end_matches('/').to_string();
        let start_error = |reason: String| Error::SessionStart {
            endpoint: base_url.clone(),
            reason,
        };

        let client = reqwest::Client::builder()
            .timeout(command_timeout)
            .build()
            .map_err(|e| start_error(e.to_string()))?;

        let body = json!({
            "capabilities": {
                "alwaysMatch": Value::Object(capabilities),
                "firstMatch": [{}],
            }
        });

        tracing::debug!("WebDriver >>> POST /session {}", body);
        let response = client
            .post(format!("{}/session", base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| start_error(e.to_string()))?;
        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| start_error(format!("invalid response: {}", e)))?;
        tracing::debug!("WebDriver <<< {} {}", status, payload);

        if !status.is_success() {
            return Err(start_error(protocol_error(&payload).to_string()));
        }

        let session_id = payload["value"]["sessionId"]
            .as_str()
            .or_else(|| payload["sessionId"].as_str())
            .ok_or_else(|| start_error("response carried no sessionId".to_string()))?
            .to_string();

        tracing::info!(session_id = %session_id, "WebDriver session started");

        Ok(Self {
            client,
            base_url,
            session_id,
            platform,
            released: false,
        })
    }

    /// Load a page in the session's browser
    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    /// Translate a locator into a W3C `(using, value)` strategy pair
    pub fn strategy(&self, locator: &Locator) -> (&'static str, String) {
        locator_strategy(self.platform, locator)
    }

    /// Send a session-scoped command and unwrap its `value`
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        tracing::debug!("WebDriver >>> {} {} {:?}", method, path, body);

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        let payload: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        tracing::debug!("WebDriver <<< {} {}", status, text);

        if status.is_success() && legacy_status(&payload) == 0 {
            Ok(payload.get("value").cloned().unwrap_or(Value::Null))
        } else {
            Err(protocol_error(&payload))
        }
    }

    async fn find_with(&self, path: &str, locator: &Locator) -> Result<Option<ElementId>> {
        let (using, value) = self.strategy(locator);
        match self
            .command(
                Method::POST,
                path,
                Some(json!({ "using": using, "value": value })),
            )
            .await
        {
            Ok(found) => element_id(&found).map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn element_bool(&self, element: &ElementId, property: &str) -> Result<bool> {
        let value = self
            .command(
                Method::GET,
                &format!("/element/{}/{}", element, property),
                None,
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}

#[async_trait]
impl UiSession for WebDriverSession {
    async fn find(&mut self, locator: &Locator) -> Result<Option<ElementId>> {
        self.find_with("/element", locator).await
    }

    async fn find_child(
        &mut self,
        parent: &ElementId,
        locator: &Locator,
    ) -> Result<Option<ElementId>> {
        self.find_with(&format!("/element/{}/element", parent), locator)
            .await
    }

    async fn is_displayed(&mut self, element: &ElementId) -> Result<bool> {
        self.element_bool(element, "displayed").await
    }

    async fn is_enabled(&mut self, element: &ElementId) -> Result<bool> {
        self.element_bool(element, "enabled").await
    }

    async fn is_selected(&mut self, element: &ElementId) -> Result<bool> {
        self.element_bool(element, "selected").await
    }

    async fn attribute(&mut self, element: &ElementId, name: &str) -> Result<Option<String>> {
        let value = self
            .command(
                Method::GET,
                &format!("/element/{}/attribute/{}", element, name),
                None,
            )
            .await?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    async fn text(&mut self, element: &ElementId) -> Result<String> {
        let value = self
            .command(Method::GET, &format!("/element/{}/text", element), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn click(&mut self, element: &ElementId) -> Result<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/click", element),
            Some(json!({})),
        )
        .await
        .map(|_| ())
    }

    async fn clear(&mut self, element: &ElementId) -> Result<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/clear", element),
            Some(json!({})),
        )
        .await
        .map(|_| ())
    }

    async fn send_keys(&mut self, element: &ElementId, text: &str) -> Result<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/value", element),
            Some(json!({ "text": text })),
        )
        .await
        .map(|_| ())
    }

    async fn quit(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.command(Method::DELETE, "", None).await?;
        tracing::info!(session_id = %self.session_id, "WebDriver session deleted");
        Ok(())
    }
}

/// Translate a locator for the given platform
pub fn locator_strategy(platform: Platform, locator: &Locator) -> (&'static str, String) {
    match (platform, locator) {
        (Platform::Mobile, Locator::Id(id)) => ("id", id.clone()),
        (Platform::Browser, Locator::Id(id)) => ("css selector", format!("[id={}]", css_string(id))),
        (Platform::Mobile, Locator::AccessibilityId(name)) => ("accessibility id", name.clone()),
        (Platform::Browser, Locator::AccessibilityId(name)) => {
            ("css selector", format!("[aria-label={}]", css_string(name)))
        }
        (Platform::Mobile, Locator::Text(text)) => (
            "xpath",
            format!("//*[contains(@text, {})]", xpath_literal(text)),
        ),
        (Platform::Browser, Locator::Text(text)) => (
            "xpath",
            format!(".//*[text()[contains(., {})]]", xpath_literal(text)),
        ),
        (_, Locator::XPath(path)) => ("xpath", path.clone()),
        (_, Locator::Css(selector)) => ("css selector", selector.clone()),
    }
}

/// Quote a string for use inside an XPath expression
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{}'", s)
    } else if !s.contains('"') {
        format!("\"{}\"", s)
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Quote a string as a CSS attribute value
fn css_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn element_id(value: &Value) -> Result<ElementId> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(Value::as_str)
        .map(|id| ElementId(id.to_string()))
        .ok_or_else(|| Error::webdriver("unknown error", &format!("no element reference in {}", value)))
}

/// Non-zero `status` is how the JSON Wire Protocol reported errors
fn legacy_status(payload: &Value) -> i64 {
    payload.get("status").and_then(Value::as_i64).unwrap_or(0)
}

fn protocol_error(payload: &Value) -> Error {
    let value = &payload["value"];
    let message = value["message"].as_str().unwrap_or("no message").to_string();
    let error = match value["error"].as_str() {
        Some(error) => error.to_string(),
        None => match legacy_status(payload) {
            6 => "invalid session id".to_string(),
            7 => "no such element".to_string(),
            10 => "stale element reference".to_string(),
            _ => "unknown error".to_string(),
        },
    };

    if error == "invalid session id" {
        Error::Session(message)
    } else {
        Error::WebDriver { error, message }
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_connect() {
        Error::Session(format!("WebDriver server unreachable: {}", e))
    } else {
        Error::Http(e.to_string())
    }
}
