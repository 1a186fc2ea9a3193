//! stepguard - guarded action runner for UI and API scenarios
//!
//! Every action waits a bounded time for its precondition, runs at most
//! once, and reports Success, Skipped or Failed without stopping the
//! scenario around it.

pub mod action;
pub mod cli;
pub mod commands;
pub mod common;
pub mod guard;
pub mod scenario;
pub mod session;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use guard::{Outcome, OutcomeKind, SkipReason, WaitPolicy};
