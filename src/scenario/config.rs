//! Scenario configuration types
//!
//! Defines the data structures for deserializing YAML scenarios and the
//! checks run on them before any session is opened.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::action::{Locator, Precondition, ResponseExpectation};
use crate::common::{Error, Result};
use crate::guard::WaitOverride;
use crate::session::Platform;

use super::template;

/// A complete scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the scenario covers
    pub description: Option<String>,
    /// The remote session the steps run against
    pub session: SessionConfig,
    /// Default wait policy for every step
    #[serde(default)]
    pub wait: WaitOverride,
    /// The sequence of steps to execute
    pub steps: Vec<Step>,
}

/// Which remote session to open
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionConfig {
    /// W3C WebDriver / Appium server
    Webdriver {
        /// Server URL (default from config)
        url: Option<String>,
        #[serde(default)]
        platform: Platform,
        /// Capabilities sent as `alwaysMatch`
        #[serde(default)]
        capabilities: Map<String, Value>,
        /// Page to load once the session is up (browsers)
        start_url: Option<String>,
    },
    /// HTTP API rooted at a base URL
    Http { base_url: String },
}

impl SessionConfig {
    fn is_ui(&self) -> bool {
        matches!(self, Self::Webdriver { .. })
    }
}

fn default_true() -> bool {
    true
}

/// A single step of a scenario
#[derive(Deserialize, Debug, Clone)]
pub struct Step {
    /// Label used in the step report
    pub name: Option<String>,
    /// Per-step wait policy override
    #[serde(default)]
    pub wait: WaitOverride,
    /// A missed precondition is a skip (true) or a failure (false)
    #[serde(default = "default_true")]
    pub optional: bool,
    /// Stop the scenario if this step doesn't succeed
    #[serde(default)]
    pub halt: bool,
    /// Values to keep from this step's data: capture name -> dot-path
    #[serde(default)]
    pub capture: BTreeMap<String, String>,
    /// Captured values this step depends on
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(flatten)]
    pub kind: StepKind,
}

/// What a step does
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepKind {
    Click {
        target: Locator,
        #[serde(default)]
        until: Precondition,
    },
    Type {
        target: Locator,
        text: String,
        /// Clear the field first
        #[serde(default)]
        clear: bool,
        #[serde(default)]
        until: Precondition,
    },
    Select {
        target: Locator,
        /// Visible text of the option
        option: String,
        #[serde(default)]
        until: Precondition,
    },
    Check {
        target: Locator,
        /// Desired state
        #[serde(default = "default_true")]
        checked: bool,
        #[serde(default)]
        until: Precondition,
    },
    Read {
        target: Locator,
        /// Attribute to read; element text when unset
        attribute: Option<String>,
        #[serde(default)]
        until: Precondition,
    },
    Verify {
        target: Locator,
        attribute: Option<String>,
        equals: Option<String>,
        contains: Option<String>,
        #[serde(default)]
        until: Precondition,
    },
    Upload {
        target: Locator,
        /// Local file, relative to the scenario file
        file: PathBuf,
        #[serde(default)]
        until: Precondition,
    },
    /// One character per field; `{n}` in the locator is the 1-based position
    Digits {
        target: Locator,
        text: String,
        /// Delay between characters
        #[serde(default)]
        pause_ms: u64,
        #[serde(default)]
        until: Precondition,
    },
    /// Entries that stop at the first one that doesn't succeed
    Group { steps: Vec<StepKind> },
    Request {
        method: String,
        path: String,
        #[serde(default)]
        query: BTreeMap<String, String>,
        body: Option<Value>,
        #[serde(default)]
        expect: ResponseExpectation,
    },
    Pause { ms: u64 },
}

impl StepKind {
    /// Short description for reports when a step has no name
    pub fn summary(&self) -> String {
        match self {
            Self::Click { target, .. } => format!("click {}", target),
            Self::Type { target, .. } => format!("type into {}", target),
            Self::Select { target, option, .. } => format!("select '{}' in {}", option, target),
            Self::Check {
                target, checked, ..
            } => {
                if *checked {
                    format!("check {}", target)
                } else {
                    format!("uncheck {}", target)
                }
            }
            Self::Read { target, .. } => format!("read {}", target),
            Self::Verify { target, .. } => format!("verify {}", target),
            Self::Upload { target, file, .. } => {
                format!("upload {} to {}", file.display(), target)
            }
            Self::Digits { target, text, .. } => {
                format!("enter {} digits into {}", text.chars().count(), target)
            }
            Self::Group { steps } => format!("group of {} steps", steps.len()),
            Self::Request { method, path, .. } => format!("{} {}", method.to_uppercase(), path),
            Self::Pause { ms } => format!("pause {} ms", ms),
        }
    }

    fn is_ui(&self) -> Option<bool> {
        match self {
            Self::Request { .. } => Some(false),
            Self::Pause { .. } => None,
            Self::Group { steps } => steps.iter().find_map(StepKind::is_ui),
            _ => Some(true),
        }
    }

    /// Every `${name}` the step references
    pub fn variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        match self {
            Self::Click { target, .. }
            | Self::Select { target, .. }
            | Self::Check { target, .. }
            | Self::Read { target, .. }
            | Self::Upload { target, .. } => names.extend(template::variables(target.value())),
            Self::Type { target, text, .. } | Self::Digits { target, text, .. } => {
                names.extend(template::variables(target.value()));
                names.extend(template::variables(text));
            }
            Self::Verify {
                target,
                equals,
                contains,
                ..
            } => {
                names.extend(template::variables(target.value()));
                for s in equals.iter().chain(contains.iter()) {
                    names.extend(template::variables(s));
                }
            }
            Self::Group { steps } => names.extend(steps.iter().flat_map(StepKind::variables)),
            Self::Request {
                path,
                query,
                body,
                expect,
                ..
            } => {
                names.extend(template::variables(path));
                for value in query.values() {
                    names.extend(template::variables(value));
                }
                if let Some(body) = body {
                    names.extend(template::json_variables(body));
                }
                for value in expect.fields.values().chain(expect.each.values()) {
                    names.extend(template::json_variables(value));
                }
                for needle in expect.contains.values() {
                    names.extend(template::variables(needle));
                }
            }
            Self::Pause { .. } => {}
        }
        names
    }

    fn validate(&self, nested: bool) -> std::result::Result<(), String> {
        match self {
            Self::Group { steps } => {
                if nested {
                    return Err("groups cannot be nested".to_string());
                }
                if steps.is_empty() {
                    return Err("group has no steps".to_string());
                }
                steps.iter().try_for_each(|s| s.validate(true))
            }
            Self::Digits { target, text, .. } => {
                if text.is_empty() {
                    return Err("digits step has no text".to_string());
                }
                if !target.value().contains("{n}") {
                    return Err(format!(
                        "digits target {} needs a {{n}} placeholder",
                        target
                    ));
                }
                Ok(())
            }
            Self::Request { method, .. } => parse_method(method).map(|_| ()),
            _ => Ok(()),
        }
    }
}

/// Keys every top-level step accepts besides its action's own
const STEP_KEYS: &[&str] = &["name", "wait", "optional", "halt", "capture", "requires"];

/// Keys an action accepts, `action` included
fn action_keys(action: &str) -> Option<&'static [&'static str]> {
    Some(match action {
        "click" => &["action", "target", "until"],
        "type" => &["action", "target", "text", "clear", "until"],
        "select" => &["action", "target", "option", "until"],
        "check" => &["action", "target", "checked", "until"],
        "read" => &["action", "target", "attribute", "until"],
        "verify" => &["action", "target", "attribute", "equals", "contains", "until"],
        "upload" => &["action", "target", "file", "until"],
        "digits" => &["action", "target", "text", "pause_ms", "until"],
        "group" => &["action", "steps"],
        "request" => &["action", "method", "path", "query", "body", "expect"],
        "pause" => &["action", "ms"],
        _ => return None,
    })
}

/// Reject keys a step would silently ignore
///
/// Group entries only take their action's keys; step options such as
/// `wait` or `optional` belong on the group itself.
fn check_step_keys(step: &serde_yaml::Value, nested: bool) -> std::result::Result<(), String> {
    let Some(map) = step.as_mapping() else {
        return Ok(());
    };
    let Some(action) = map.get("action").and_then(serde_yaml::Value::as_str) else {
        return Ok(());
    };
    let Some(allowed) = action_keys(action) else {
        return Ok(());
    };

    for key in map.keys() {
        let key = key.as_str().unwrap_or_default();
        if allowed.contains(&key) {
            continue;
        }
        if !nested && STEP_KEYS.contains(&key) {
            continue;
        }
        return Err(if nested && STEP_KEYS.contains(&key) {
            format!("'{}' is not allowed on a group entry; set it on the group", key)
        } else {
            format!("unknown key '{}' for a {} step", key, action)
        });
    }

    if let Some(entries) = map.get("steps").and_then(serde_yaml::Value::as_sequence) {
        entries.iter().try_for_each(|entry| check_step_keys(entry, true))?;
    }
    Ok(())
}

/// Parse an HTTP method name
pub fn parse_method(method: &str) -> std::result::Result<Method, String> {
    let upper = method.to_uppercase();
    match upper.as_str() {
        "GET" | "POST" | "PUT" | "PATCH" | "DELETE" | "HEAD" | "OPTIONS" => {
            Method::from_bytes(upper.as_bytes()).map_err(|e| e.to_string())
        }
        _ => Err(format!("unsupported HTTP method '{}'", method)),
    }
}

impl Scenario {
    /// Load and validate a scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let scenario = Self::parse(&content, &path.display().to_string())?;
        Ok(scenario)
    }

    /// Parse and validate scenario YAML; `origin` names it in errors
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        let scenario: Scenario =
            serde_yaml::from_str(content).map_err(|e| Error::scenario(origin, e.to_string()))?;

        // Flattened step fields let unknown keys through; catch them here
        let raw: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| Error::scenario(origin, e.to_string()))?;
        if let Some(steps) = raw.get("steps").and_then(serde_yaml::Value::as_sequence) {
            for (i, step) in steps.iter().enumerate() {
                check_step_keys(step, false)
                    .map_err(|reason| Error::scenario(origin, format!("step {}: {}", i + 1, reason)))?;
            }
        }

        scenario
            .validate()
            .map_err(|reason| Error::scenario(origin, reason))?;
        Ok(scenario)
    }

    /// Structural checks that don't need a session
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.steps.is_empty() {
            return Err("scenario has no steps".to_string());
        }

        let ui = self.session.is_ui();
        let mut captured: BTreeSet<&str> = BTreeSet::new();

        for (i, step) in self.steps.iter().enumerate() {
            let number = i + 1;
            step.kind
                .validate(false)
                .map_err(|e| format!("step {}: {}", number, e))?;

            match step.kind.is_ui() {
                Some(true) if !ui => {
                    return Err(format!(
                        "step {}: '{}' needs a webdriver session",
                        number,
                        step.kind.summary()
                    ))
                }
                Some(false) if ui => {
                    return Err(format!(
                        "step {}: requests need an http session",
                        number
                    ))
                }
                _ => {}
            }

            for name in step.kind.variables().iter().chain(step.requires.iter()) {
                if !captured.contains(name.as_str()) {
                    return Err(format!(
                        "step {}: '{}' is never captured by an earlier step",
                        number, name
                    ));
                }
            }
            captured.extend(step.capture.keys().map(String::as_str));
        }
        Ok(())
    }
}
