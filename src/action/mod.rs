//! Actions: what to act on and what to do
//!
//! An [`Action`] pairs a target (an element locator or an HTTP endpoint)
//! with one operation. Running it wraps the operation in a guard that
//! waits for the target before acting once.

pub mod api;
pub mod expect;
pub mod ui;

pub use expect::{lookup, BodyShape, ResponseExpectation, ValueCheck};

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

use crate::common::Error;
use crate::guard::{run_guarded, Outcome, WaitPolicy};
use crate::session::{ApiRequest, Session};

/// How to find an element
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    /// Resource id (Android `package:id/name`, HTML `id`)
    Id(String),
    /// Accessibility identifier / label
    AccessibilityId(String),
    /// Visible text contains this string
    Text(String),
    /// Structural path expression
    #[serde(rename = "xpath")]
    XPath(String),
    /// CSS selector (browsers)
    Css(String),
}

impl Locator {
    /// Rewrite the locator's value, keeping its kind
    pub fn map_value(&self, f: impl FnOnce(&str) -> String) -> Self {
        match self {
            Self::Id(v) => Self::Id(f(v)),
            Self::AccessibilityId(v) => Self::AccessibilityId(f(v)),
            Self::Text(v) => Self::Text(f(v)),
            Self::XPath(v) => Self::XPath(f(v)),
            Self::Css(v) => Self::Css(f(v)),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Id(v)
            | Self::AccessibilityId(v)
            | Self::Text(v)
            | Self::XPath(v)
            | Self::Css(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(v) => write!(f, "id={}", v),
            Self::AccessibilityId(v) => write!(f, "accessibility_id={}", v),
            Self::Text(v) => write!(f, "text~{:?}", v),
            Self::XPath(v) => write!(f, "xpath={}", v),
            Self::Css(v) => write!(f, "css={}", v),
        }
    }
}

/// State an element must reach before the operation runs
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Precondition {
    /// Exists in the UI tree
    #[default]
    Present,
    /// Exists and is displayed
    Visible,
    /// Displayed and enabled
    Clickable,
}

/// What an action is aimed at
#[derive(Debug, Clone)]
pub enum Target {
    Element {
        locator: Locator,
        until: Precondition,
    },
    Endpoint(ApiRequest),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element { locator, until } => match until {
                Precondition::Present => write!(f, "{}", locator),
                other => write!(f, "{} ({:?})", locator, other),
            },
            Self::Endpoint(request) => f.write_str(&request.describe()),
        }
    }
}

/// What to do once the target is there
#[derive(Debug, Clone)]
pub enum Operation {
    Click,
    Type { text: String, clear: bool },
    /// Pick an `<option>` by its visible text
    Select { option: String },
    /// Bring a checkbox or radio to the given state
    SetChecked(bool),
    /// Text, or the named attribute
    Read { attribute: Option<String> },
    Verify(ValueCheck),
    /// Send a local file path to a file input
    Upload(PathBuf),
    /// Check the response of an endpoint target
    Respond(ResponseExpectation),
}

impl Operation {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Type { .. } => "type",
            Self::Select { .. } => "select",
            Self::SetChecked(_) => "check",
            Self::Read { .. } => "read",
            Self::Verify(_) => "verify",
            Self::Upload(_) => "upload",
            Self::Respond(_) => "request",
        }
    }
}

/// One automation step
#[derive(Debug, Clone)]
pub struct Action {
    pub target: Target,
    pub operation: Operation,
}

impl Action {
    pub fn new(target: Target, operation: Operation) -> Self {
        Self { target, operation }
    }

    /// Run this action against the session under the given wait policy
    pub async fn run(&self, session: &mut Session, policy: &WaitPolicy) -> Outcome {
        tracing::debug!(action = %self, timeout_ms = policy.timeout_ms(), "Running guarded action");
        match (&self.target, session) {
            (Target::Element { locator, until }, Session::Ui(ui)) => {
                let mut guard = ui::UiStep::new(ui.as_mut(), locator, *until, &self.operation);
                run_guarded(&mut guard, policy).await
            }
            (Target::Endpoint(request), Session::Api(api)) => match &self.operation {
                Operation::Respond(expect) => {
                    let mut guard = api::ApiCall::new(api.as_mut(), request, expect);
                    run_guarded(&mut guard, policy).await
                }
                other => Outcome::Failed(Error::Config(format!(
                    "'{}' cannot be applied to an endpoint",
                    other.verb()
                ))),
            },
            (target, session) => Outcome::Failed(Error::Config(format!(
                "{} cannot run against a {} session",
                target,
                session.kind()
            ))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Endpoint(_) => write!(f, "{}", self.target),
            Target::Element { .. } => write!(f, "{} {}", self.operation.verb(), self.target),
        }
    }
}
