//! Guarded request/response actions
//!
//! The precondition of a request is "a response arrived". The request is
//! sent once and awaited for the rest of the wait; it is never re-sent.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::common::Result;
use crate::guard::Guarded;
use crate::session::{ApiRequest, ApiResponse, ApiSession};

use super::ResponseExpectation;

/// One request waiting on its response
pub struct ApiCall<'a> {
    session: &'a mut dyn ApiSession,
    request: &'a ApiRequest,
    expect: &'a ResponseExpectation,
    sent: bool,
}

impl<'a> ApiCall<'a> {
    pub fn new(
        session: &'a mut dyn ApiSession,
        request: &'a ApiRequest,
        expect: &'a ResponseExpectation,
    ) -> Self {
        Self {
            session,
            request,
            expect,
            sent: false,
        }
    }
}

#[async_trait]
impl Guarded for ApiCall<'_> {
    type Ready = ApiResponse;

    fn describe(&self) -> String {
        format!("response to {}", self.request.describe())
    }

    async fn observe(&mut self, remaining: Duration) -> Result<Option<ApiResponse>> {
        if self.sent {
            return Ok(None);
        }
        self.sent = true;

        match tokio::time::timeout(remaining, self.session.send(self.request)).await {
            Ok(response) => response.map(Some),
            Err(_) => {
                tracing::debug!(
                    request = %self.request.describe(),
                    "No response before the wait expired"
                );
                Ok(None)
            }
        }
    }

    async fn execute(&mut self, response: ApiResponse) -> Result<Option<Value>> {
        self.expect.check(&self.request.describe(), &response)?;
        Ok(Some(response.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use crate::guard::{run_guarded, Outcome, OutcomeKind, WaitPolicy};
    use reqwest::Method;
    use serde_json::json;

    /// Answers after a fixed delay and counts how often it was asked
    struct DelayedApi {
        delay: Duration,
        status: u16,
        sends: u32,
    }

    #[async_trait]
    impl ApiSession for DelayedApi {
        async fn send(&mut self, _request: &ApiRequest) -> Result<ApiResponse> {
            self.sends += 1;
            tokio::time::sleep(self.delay).await;
            let body = json!({"id": 10001});
            Ok(ApiResponse {
                status: self.status,
                text: body.to_string(),
                body,
            })
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_response_is_skipped_and_sent_once() {
        let mut api = DelayedApi {
            delay: Duration::from_secs(10),
            status: 200,
            sends: 0,
        };
        let request = ApiRequest::new(Method::GET, "/pet/10001");
        let expect = ResponseExpectation::default();

        let outcome = {
            let mut call = ApiCall::new(&mut api, &request, &expect);
            run_guarded(&mut call, &WaitPolicy::from_millis(2000, 100)).await
        };

        assert_eq!(outcome.kind(), OutcomeKind::Skipped);
        assert_eq!(api.sends, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_2xx_is_failed_not_skipped() {
        let mut api = DelayedApi {
            delay: Duration::from_millis(10),
            status: 500,
            sends: 0,
        };
        let request = ApiRequest::new(Method::GET, "/store/inventory");
        let expect = ResponseExpectation::default();

        let mut call = ApiCall::new(&mut api, &request, &expect);
        let outcome = run_guarded(&mut call, &WaitPolicy::from_millis(2000, 100)).await;

        assert!(matches!(
            outcome,
            Outcome::Failed(Error::UnexpectedStatus { status: 500, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_body_is_step_data() {
        let mut api = DelayedApi {
            delay: Duration::ZERO,
            status: 200,
            sends: 0,
        };
        let request = ApiRequest::new(Method::POST, "/pet").with_body(json!({"id": 10001}));
        let expect = ResponseExpectation::default();

        let mut call = ApiCall::new(&mut api, &request, &expect);
        let outcome = run_guarded(&mut call, &WaitPolicy::from_millis(2000, 100)).await;

        assert_eq!(outcome.data(), Some(&json!({"id": 10001})));
    }
}
