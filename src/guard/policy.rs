//! Wait policies
//!
//! A policy bounds how long the wait phase keeps checking for a
//! precondition and how long it sleeps between polls.

use serde::Deserialize;
use std::time::Duration;

use crate::common::config::WaitDefaults;

/// Smallest poll interval; a zero interval would spin the executor
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Bounds for the wait phase of a guarded action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Maximum time to wait for the precondition
    pub timeout: Duration,
    /// Delay between polls
    pub interval: Duration,
}

impl WaitPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn from_millis(timeout_ms: u64, poll_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(poll_ms),
        )
    }

    /// Observe exactly once and never sleep
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, MIN_INTERVAL)
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis().min(u64::MAX as u128) as u64
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::from(&WaitDefaults::default())
    }
}

impl From<&WaitDefaults> for WaitPolicy {
    fn from(defaults: &WaitDefaults) -> Self {
        Self::from_millis(defaults.timeout_ms, defaults.poll_ms)
    }
}

/// Partial wait policy as written in scenarios; unset fields inherit
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitOverride {
    pub timeout_ms: Option<u64>,
    pub poll_ms: Option<u64>,
}

impl WaitOverride {
    /// Apply this override on top of `base`
    pub fn apply(&self, base: WaitPolicy) -> WaitPolicy {
        WaitPolicy::new(
            self.timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(base.timeout),
            self.poll_ms
                .map(Duration::from_millis)
                .unwrap_or(base.interval),
        )
    }
}
