//! HTTP API session

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::common::config::HttpConfig;
use crate::common::{Error, Result};

use super::ApiSession;

/// A request relative to the session's base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// `METHOD /path` for reports
    pub fn describe(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// A received response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body, `Null` when the body isn't JSON
    pub body: Value,
    /// Raw body text
    pub text: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Session against a fixed base URL with a pooled client
pub struct HttpSession {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSession {
    pub fn new(base_url: &str, config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::SessionStart {
                endpoint: base_url.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(base_url, "HTTP session opened");
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ApiSession for HttpSession {
    async fn send(&mut self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(&request.path);
        tracing::debug!(
            "HTTP >>> {} {} query={:?} body={:?}",
            request.method,
            url,
            request.query,
            request.body
        );

        let mut builder = self.client.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        tracing::debug!("HTTP <<< {} {}", status, text);

        Ok(ApiResponse { status, body, text })
    }

    async fn close(&mut self) -> Result<()> {
        tracing::info!(base_url = %self.base_url, "HTTP session closed");
        Ok(())
    }
}
