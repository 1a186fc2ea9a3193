//! Remote sessions
//!
//! A scenario owns exactly one session for its whole run: either a UI
//! session (WebDriver / Appium) or an HTTP API session. The session is
//! released once when the run ends, however it ends.

pub mod http;
pub mod webdriver;

pub use http::{ApiRequest, ApiResponse, HttpSession};
pub use webdriver::{Platform, WebDriverSession};

use std::fmt;

use async_trait::async_trait;

use crate::action::Locator;
use crate::common::Result;

/// Opaque reference to an element held by the remote side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId(pub String);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Commands a UI automation backend must support
#[async_trait]
pub trait UiSession: Send {
    /// Look an element up; `Ok(None)` when it isn't there (yet)
    async fn find(&mut self, locator: &Locator) -> Result<Option<ElementId>>;

    /// Look an element up beneath `parent`
    async fn find_child(&mut self, parent: &ElementId, locator: &Locator)
        -> Result<Option<ElementId>>;

    async fn is_displayed(&mut self, element: &ElementId) -> Result<bool>;
    async fn is_enabled(&mut self, element: &ElementId) -> Result<bool>;
    async fn is_selected(&mut self, element: &ElementId) -> Result<bool>;
    async fn attribute(&mut self, element: &ElementId, name: &str) -> Result<Option<String>>;
    async fn text(&mut self, element: &ElementId) -> Result<String>;

    async fn click(&mut self, element: &ElementId) -> Result<()>;
    async fn clear(&mut self, element: &ElementId) -> Result<()>;
    async fn send_keys(&mut self, element: &ElementId, text: &str) -> Result<()>;

    /// End the remote session
    async fn quit(&mut self) -> Result<()>;
}

/// Request/response backend
#[async_trait]
pub trait ApiSession: Send {
    async fn send(&mut self, request: &ApiRequest) -> Result<ApiResponse>;

    async fn close(&mut self) -> Result<()>;
}

/// The single session a scenario runs against
pub enum Session {
    Ui(Box<dyn UiSession>),
    Api(Box<dyn ApiSession>),
}

impl Session {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ui(_) => "ui",
            Self::Api(_) => "api",
        }
    }

    /// Release the remote side
    pub async fn release(&mut self) -> Result<()> {
        match self {
            Self::Ui(session) => session.quit().await,
            Self::Api(session) => session.close().await,
        }
    }
}
