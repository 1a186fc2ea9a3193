//! Configuration file handling

use serde::Deserialize;
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Default wait policy for steps that don't set their own
    #[serde(default)]
    pub wait: WaitDefaults,

    /// WebDriver / Appium settings
    #[serde(default)]
    pub webdriver: WebDriverConfig,

    /// HTTP API session settings
    #[serde(default)]
    pub http: HttpConfig,
}

/// Wait policy defaults in milliseconds
#[derive(Debug, Deserialize, Clone)]
pub struct WaitDefaults {
    /// How long a step waits for its precondition
    #[serde(default = "default_wait_timeout")]
    pub timeout_ms: u64,

    /// Delay between precondition checks
    #[serde(default = "default_poll")]
    pub poll_ms: u64,
}

impl Default for WaitDefaults {
    fn default() -> Self {
        Self {
            timeout_ms: default_wait_timeout(),
            poll_ms: default_poll(),
        }
    }
}

fn default_wait_timeout() -> u64 {
    60_000
}
fn default_poll() -> u64 {
    500
}

/// WebDriver server settings
#[derive(Debug, Deserialize, Clone)]
pub struct WebDriverConfig {
    /// Server URL used when a scenario doesn't name one
    #[serde(default = "default_webdriver_url")]
    pub url: String,

    /// Timeout for individual WebDriver commands
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:4723/wd/hub".to_string()
}
fn default_command_timeout() -> u64 {
    300
}

/// HTTP API session settings
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Connect timeout for API sessions
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    10
}
fn default_user_agent() -> String {
    concat!("stepguard/", env!("CARGO_PKG_VERSION")).to_string()
}

impl WebDriverConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    super::Error::FileRead {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    }
                })?;
                return Self::parse(&content);
            }
        }
        Ok(Self::default())
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
