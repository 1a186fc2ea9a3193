//! Response and value expectations
//!
//! Expectations run after the precondition was met, so every mismatch is
//! an execution failure rather than a skip.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::common::{Error, Result};
use crate::session::ApiResponse;

/// Top-level JSON shape of a response body
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BodyShape {
    Object,
    Array,
}

/// Expectations for a request step
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ResponseExpectation {
    /// Exact status; when unset any 2xx passes
    pub status: Option<u16>,
    /// Required top-level body shape
    pub body: Option<BodyShape>,
    /// Body must be a non-empty array, object or string
    #[serde(default)]
    pub non_empty: bool,
    /// Dot-path to exact JSON value
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    /// Dot-path to a substring of a string value
    #[serde(default)]
    pub contains: BTreeMap<String, String>,
    /// Dot-paths that must hold numbers
    #[serde(default)]
    pub numbers: Vec<String>,
    /// For array bodies, field values every element must carry
    #[serde(default)]
    pub each: BTreeMap<String, Value>,
}

impl ResponseExpectation {
    /// Check a response; `request` names it in error messages
    pub fn check(&self, request: &str, response: &ApiResponse) -> Result<()> {
        match self.status {
            Some(expected) if expected != response.status => {
                return Err(Error::unexpected_status(
                    request,
                    response.status,
                    response.text.clone(),
                ));
            }
            None if !response.is_success() => {
                return Err(Error::unexpected_status(
                    request,
                    response.status,
                    response.text.clone(),
                ));
            }
            _ => {}
        }

        let body = &response.body;

        if let Some(shape) = self.body {
            let matches = match shape {
                BodyShape::Object => body.is_object(),
                BodyShape::Array => body.is_array(),
            };
            if !matches {
                return Err(Error::Assertion(format!(
                    "{}: expected {:?} body, got {}",
                    request,
                    shape,
                    type_name(body)
                )));
            }
        }

        if self.non_empty {
            let empty = match body {
                Value::Array(items) => items.is_empty(),
                Value::Object(map) => map.is_empty(),
                Value::String(s) => s.is_empty(),
                Value::Null => true,
                _ => false,
            };
            if empty {
                return Err(Error::Assertion(format!("{}: body is empty", request)));
            }
        }

        for (path, expected) in &self.fields {
            let actual = require(body, path, request)?;
            if !json_eq(actual, expected) {
                return Err(Error::Assertion(format!(
                    "{}: field '{}' expected {}, got {}",
                    request, path, expected, actual
                )));
            }
        }

        for (path, needle) in &self.contains {
            let actual = require(body, path, request)?;
            let haystack = actual.as_str().ok_or_else(|| {
                Error::Assertion(format!(
                    "{}: field '{}' is {}, not a string",
                    request,
                    path,
                    type_name(actual)
                ))
            })?;
            if !haystack.contains(needle.as_str()) {
                return Err(Error::Assertion(format!(
                    "{}: field '{}' = {:?} does not contain {:?}",
                    request, path, haystack, needle
                )));
            }
        }

        for path in &self.numbers {
            let actual = require(body, path, request)?;
            if !actual.is_number() {
                return Err(Error::Assertion(format!(
                    "{}: field '{}' is {}, not a number",
                    request,
                    path,
                    type_name(actual)
                )));
            }
        }

        if !self.each.is_empty() {
            let items = body.as_array().ok_or_else(|| {
                Error::Assertion(format!(
                    "{}: 'each' needs an array body, got {}",
                    request,
                    type_name(body)
                ))
            })?;
            for (index, item) in items.iter().enumerate() {
                for (path, expected) in &self.each {
                    let actual = lookup(item, path).unwrap_or(&Value::Null);
                    if !json_eq(actual, expected) {
                        return Err(Error::Assertion(format!(
                            "{}: element {} field '{}' expected {}, got {}",
                            request, index, path, expected, actual
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Expectation on an element's text or attribute
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ValueCheck {
    /// Attribute to read; element text when unset
    pub attribute: Option<String>,
    pub equals: Option<String>,
    pub contains: Option<String>,
}

impl ValueCheck {
    pub fn check(&self, subject: &str, observed: &str) -> Result<()> {
        let what = self.attribute.as_deref().unwrap_or("text");
        if let Some(expected) = &self.equals {
            if observed != expected {
                return Err(Error::Assertion(format!(
                    "{} {}: expected {:?}, got {:?}",
                    subject, what, expected, observed
                )));
            }
        }
        if let Some(needle) = &self.contains {
            if !observed.contains(needle.as_str()) {
                return Err(Error::Assertion(format!(
                    "{} {}: {:?} does not contain {:?}",
                    subject, what, observed, needle
                )));
            }
        }
        Ok(())
    }
}

/// Resolve a dot-path (`category.name`, `tags.0.id`) inside a JSON value
///
/// An empty path or `.` is the value itself.
pub fn lookup<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() || path == "." {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn require<'v>(body: &'v Value, path: &str, request: &str) -> Result<&'v Value> {
    lookup(body, path).ok_or_else(|| {
        Error::Assertion(format!("{}: body has no field '{}'", request, path))
    })
}

/// Numbers compare by value so `10001` matches `10001.0`
fn json_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => a.as_f64() == b.as_f64(),
        },
        _ => actual == expected,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
