//! Error types for the guarded action runner
//!
//! Errors fall into three classes that decide how a step is reported:
//! precondition timeouts are soft, execution errors fail a single step,
//! and session errors abort the rest of the scenario.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for stepguard
#[derive(Error, Debug)]
pub enum Error {
    // === Precondition Errors ===
    #[error("Precondition not observed within {waited_ms} ms: {target}")]
    PreconditionTimeout { target: String, waited_ms: u64 },

    // === Execution Errors ===
    #[error("Action failed: {0}")]
    Execution(String),

    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("Unexpected status {status} for {request}{}", body_hint(.body))]
    UnexpectedStatus {
        request: String,
        status: u16,
        body: String,
    },

    #[error("WebDriver error '{error}': {message}")]
    WebDriver { error: String, message: String },

    #[error("HTTP transport error: {0}")]
    Http(String),

    // === Session Errors ===
    #[error("Failed to start session at {endpoint}: {reason}")]
    SessionStart { endpoint: String, reason: String },

    #[error("Session lost: {0}")]
    Session(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid scenario '{path}': {reason}")]
    ScenarioParse { path: String, reason: String },

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },
}

fn body_hint(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else if body.len() > 200 {
        let mut end = 200;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!(": {}...", &body[..end])
    } else {
        format!(": {}", body)
    }
}

impl Error {
    /// Create a precondition timeout error
    pub fn precondition_timeout(target: impl Into<String>, waited_ms: u64) -> Self {
        Self::PreconditionTimeout {
            target: target.into(),
            waited_ms,
        }
    }

    /// Create an unexpected status error
    pub fn unexpected_status(request: &str, status: u16, body: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            request: request.to_string(),
            status,
            body: body.into(),
        }
    }

    /// Create a WebDriver protocol error
    pub fn webdriver(error: &str, message: &str) -> Self {
        Self::WebDriver {
            error: error.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a scenario parse error
    pub fn scenario(path: &str, reason: impl Into<String>) -> Self {
        Self::ScenarioParse {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error ends the whole run rather than a single step
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SessionStart { .. } | Self::Session(_))
    }

    /// Whether the remote side reported the target as not found
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::UnexpectedStatus { status, .. } => *status == 404,
            Self::WebDriver { error, .. } => error == "no such element",
            _ => false,
        }
    }

    /// Short classification used in step reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PreconditionTimeout { .. } => "precondition-timeout",
            Self::UnexpectedStatus { status: 404, .. } => "not-found",
            Self::UnexpectedStatus { .. } => "unexpected-status",
            Self::Assertion(_) => "assertion",
            Self::Execution(_) | Self::WebDriver { .. } | Self::Http(_) => "execution",
            Self::SessionStart { .. } | Self::Session(_) => "session",
            _ => "internal",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = Error::unexpected_status("GET /pet/10001", 404, "Pet not found");
        assert!(err.is_not_found());
        assert_eq!(err.kind(), "not-found");
        assert!(!err.is_fatal());

        let err = Error::unexpected_status("GET /pet/10001", 500, "");
        assert!(!err.is_not_found());
        assert_eq!(err.kind(), "unexpected-status");
    }

    #[test]
    fn test_session_errors_are_fatal() {
        assert!(Error::Session("invalid session id".to_string()).is_fatal());
        assert!(Error::SessionStart {
            endpoint: "http://localhost:4723".to_string(),
            reason: "connection refused".to_string(),
        }
        .is_fatal());
        assert!(!Error::Assertion("x".to_string()).is_fatal());
    }

    #[test]
    fn test_status_message_truncates_long_bodies() {
        let err = Error::unexpected_status("GET /pet", 500, "x".repeat(500));
        let message = err.to_string();
        assert!(message.ends_with("..."));
        assert!(message.len() < 300);
    }
}
