//! Guarded actions
//!
//! A guarded action waits a bounded time for its precondition, then acts
//! exactly once. Only the wait phase retries: the check may run many
//! times, the action never runs more than once.
//!
//! ```text
//! Idle -> Waiting -> { Success | Skipped | Failed }
//! ```

mod outcome;
mod policy;

pub use outcome::{Outcome, OutcomeKind, SkipReason};
pub use policy::{WaitOverride, WaitPolicy};

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use crate::common::Result;

/// A single action with an observable precondition
#[async_trait]
pub trait Guarded: Send {
    /// Whatever `observe` found, handed to `execute` (an element, a response)
    type Ready: Send;

    /// Short description of the precondition for reports
    fn describe(&self) -> String;

    /// Check the precondition once
    ///
    /// `Ok(None)` means "not yet"; errors end the wait immediately.
    /// `remaining` is the time left before the wait expires.
    async fn observe(&mut self, remaining: Duration) -> Result<Option<Self::Ready>>;

    /// Perform the action against what `observe` found
    async fn execute(&mut self, ready: Self::Ready) -> Result<Option<Value>>;
}

/// Poll until the precondition is observed or the policy expires
///
/// Sleeps between polls are clamped to the time remaining, so an
/// unobserved precondition resolves within `timeout + interval`.
pub async fn wait_for<G: Guarded>(guard: &mut G, policy: &WaitPolicy) -> Result<Option<G::Ready>> {
    let started = Instant::now();
    let deadline = started + policy.timeout;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        if let Some(ready) = guard.observe(remaining).await? {
            tracing::debug!(
                target_desc = %guard.describe(),
                attempts,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Precondition observed"
            );
            return Ok(Some(ready));
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::debug!(
                target_desc = %guard.describe(),
                attempts,
                "Precondition not observed before deadline"
            );
            return Ok(None);
        }
        tokio::time::sleep(policy.interval.min(deadline - now)).await;
    }
}

/// Run a guarded action to a terminal outcome
///
/// A missed precondition is Skipped; errors while observing or acting are Failed.
pub async fn run_guarded<G: Guarded>(guard: &mut G, policy: &WaitPolicy) -> Outcome {
    match wait_for(guard, policy).await {
        Ok(Some(ready)) => match guard.execute(ready).await {
            Ok(data) => Outcome::Success(data),
            Err(e) => Outcome::Failed(e),
        },
        Ok(None) => Outcome::Skipped(SkipReason::PreconditionTimeout {
            target: guard.describe(),
            waited_ms: policy.timeout_ms(),
        }),
        Err(e) => Outcome::Failed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use serde_json::json;

    /// Precondition that appears at a fixed offset from creation
    struct Appears {
        at: Option<Duration>,
        created: Instant,
        observations: u32,
        executions: u32,
        fail_with: Option<String>,
    }

    impl Appears {
        fn after(at: Duration) -> Self {
            Self {
                at: Some(at),
                created: Instant::now(),
                observations: 0,
                executions: 0,
                fail_with: None,
            }
        }

        fn never() -> Self {
            Self {
                at: None,
                ..Self::after(Duration::ZERO)
            }
        }
    }

    #[async_trait]
    impl Guarded for Appears {
        type Ready = ();

        fn describe(&self) -> String {
            "test element".to_string()
        }

        async fn observe(&mut self, _remaining: Duration) -> Result<Option<()>> {
            self.observations += 1;
            match self.at {
                Some(at) if self.created.elapsed() >= at => Ok(Some(())),
                _ => Ok(None),
            }
        }

        async fn execute(&mut self, _ready: ()) -> Result<Option<Value>> {
            self.executions += 1;
            match &self.fail_with {
                Some(msg) => Err(Error::Execution(msg.clone())),
                None => Ok(Some(json!("done"))),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_observed_resolves_within_timeout_plus_interval() {
        for (timeout_ms, poll_ms) in [(1000, 300), (250, 100), (50, 70), (5000, 1)] {
            let policy = WaitPolicy::from_millis(timeout_ms, poll_ms);
            let mut guard = Appears::never();
            let started = Instant::now();

            let outcome = run_guarded(&mut guard, &policy).await;

            assert!(started.elapsed() <= policy.timeout + policy.interval);
            assert!(matches!(
                outcome,
                Outcome::Skipped(SkipReason::PreconditionTimeout { .. })
            ));
            assert_eq!(guard.executions, 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_precondition_executes_once() {
        let policy = WaitPolicy::from_millis(1000, 100);
        let mut guard = Appears::after(Duration::from_millis(450));

        let outcome = run_guarded(&mut guard, &policy).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.data(), Some(&json!("done")));
        assert_eq!(guard.executions, 1);
        assert!(guard.observations > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_observes_once() {
        let mut guard = Appears::never();
        let started = Instant::now();

        let outcome = run_guarded(&mut guard, &WaitPolicy::immediate()).await;

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(outcome.kind(), OutcomeKind::Skipped);
        assert_eq!(guard.observations, 1);
        assert_eq!(guard.executions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execution_error_is_failed_not_retried() {
        let policy = WaitPolicy::from_millis(1000, 100);
        let mut guard = Appears::after(Duration::ZERO);
        guard.fail_with = Some("stale element".to_string());

        let outcome = run_guarded(&mut guard, &policy).await;

        assert!(matches!(outcome, Outcome::Failed(Error::Execution(_))));
        assert_eq!(guard.executions, 1);
    }
}
