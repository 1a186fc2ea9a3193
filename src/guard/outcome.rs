//! Step outcomes

use serde_json::Value;
use std::fmt;

use crate::common::Error;

/// Why a step did not run to completion without being a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The precondition never appeared within the wait policy
    PreconditionTimeout { target: String, waited_ms: u64 },
    /// A value this step depends on was never captured
    MissingCapture(String),
    /// An earlier entry of the same group did not succeed
    GroupAborted { after: usize },
    /// The scenario stopped at an earlier step
    Halted { at_step: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreconditionTimeout { target, waited_ms } => {
                write!(f, "{} not observed within {} ms", target, waited_ms)
            }
            Self::MissingCapture(name) => write!(f, "requires captured value '{}'", name),
            Self::GroupAborted { after } => write!(f, "group aborted after entry {}", after),
            Self::Halted { at_step } => write!(f, "scenario halted at step {}", at_step),
        }
    }
}

/// Terminal result of a guarded action
#[derive(Debug)]
pub enum Outcome {
    /// The action ran; carries any data it extracted
    Success(Option<Value>),
    /// The action was not attempted
    Skipped(SkipReason),
    /// The action, or the session underneath it, errored
    Failed(Error),
}

/// Outcome discriminant for reports and summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    Skipped,
    Failed,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success(_) => OutcomeKind::Success,
            Self::Skipped(_) => OutcomeKind::Skipped,
            Self::Failed(_) => OutcomeKind::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Data extracted by a successful action
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Success(data) => data.as_ref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the session underneath is gone
    pub fn is_fatal(&self) -> bool {
        self.error().map(Error::is_fatal).unwrap_or(false)
    }

    /// Human-readable detail for the step report
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Success(Some(Value::String(s))) => Some(s.clone()),
            Self::Success(Some(Value::Null)) | Self::Success(None) => None,
            Self::Success(Some(value)) => Some(compact(value)),
            Self::Skipped(reason) => Some(reason.to_string()),
            Self::Failed(e) => Some(format!("[{}] {}", e.kind(), e)),
        }
    }

    /// Turn a soft precondition timeout into a failure
    pub fn into_mandatory(self) -> Self {
        match self {
            Self::Skipped(SkipReason::PreconditionTimeout { target, waited_ms }) => {
                Self::Failed(Error::precondition_timeout(target, waited_ms))
            }
            other => other,
        }
    }
}

fn compact(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 120 {
        let cut: String = text.chars().take(117).collect();
        format!("{}...", cut)
    } else {
        text
    }
}
