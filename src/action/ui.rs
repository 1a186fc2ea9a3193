//! Guarded UI actions

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::common::{Error, Result};
use crate::guard::Guarded;
use crate::session::webdriver::xpath_literal;
use crate::session::{ElementId, UiSession};

use super::{Locator, Operation, Precondition};

/// An element operation waiting on its element
pub struct UiStep<'a> {
    session: &'a mut dyn UiSession,
    locator: &'a Locator,
    until: Precondition,
    operation: &'a Operation,
}

impl<'a> UiStep<'a> {
    pub fn new(
        session: &'a mut dyn UiSession,
        locator: &'a Locator,
        until: Precondition,
        operation: &'a Operation,
    ) -> Self {
        Self {
            session,
            locator,
            until,
            operation,
        }
    }

    async fn ready_state(&mut self, element: &ElementId) -> Result<bool> {
        match self.until {
            Precondition::Present => Ok(true),
            Precondition::Visible => self.session.is_displayed(element).await,
            Precondition::Clickable => {
                Ok(self.session.is_displayed(element).await?
                    && self.session.is_enabled(element).await?)
            }
        }
    }

    /// One lookup plus the precondition check
    async fn look_up(&mut self) -> Result<Option<ElementId>> {
        let Some(element) = self.session.find(self.locator).await? else {
            return Ok(None);
        };
        match self.ready_state(&element).await {
            Ok(true) => Ok(Some(element)),
            Ok(false) => Ok(None),
            // The element was replaced between lookup and state check
            Err(Error::WebDriver { error, .. }) if error == "stale element reference" => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Checkbox state: Android exposes a `checked` attribute, browsers `selected`
    async fn is_checked(&mut self, element: &ElementId) -> Result<bool> {
        match self.session.attribute(element, "checked").await? {
            Some(value) if value == "true" || value == "checked" => Ok(true),
            Some(value) if value == "false" => Ok(false),
            _ => self.session.is_selected(element).await,
        }
    }
}

#[async_trait]
impl Guarded for UiStep<'_> {
    type Ready = ElementId;

    fn describe(&self) -> String {
        match self.until {
            Precondition::Present => self.locator.to_string(),
            Precondition::Visible => format!("visible {}", self.locator),
            Precondition::Clickable => format!("clickable {}", self.locator),
        }
    }

    async fn observe(&mut self, remaining: Duration) -> Result<Option<ElementId>> {
        // A zero wait still gets one complete lookup
        if remaining.is_zero() {
            return self.look_up().await;
        }
        match tokio::time::timeout(remaining, self.look_up()).await {
            Ok(found) => found,
            Err(_) => {
                tracing::debug!(
                    locator = %self.locator,
                    "Lookup still pending when the wait expired"
                );
                Ok(None)
            }
        }
    }

    async fn execute(&mut self, element: ElementId) -> Result<Option<Value>> {
        let operation = self.operation;
        match operation {
            Operation::Click => {
                self.session.click(&element).await?;
                Ok(None)
            }
            Operation::Type { text, clear } => {
                if *clear {
                    self.session.clear(&element).await?;
                }
                self.session.send_keys(&element, text).await?;
                Ok(None)
            }
            Operation::Select { option } => {
                let option_locator = Locator::XPath(format!(
                    "./option[normalize-space(.)={}]",
                    xpath_literal(option)
                ));
                let Some(choice) = self.session.find_child(&element, &option_locator).await? else {
                    return Err(Error::Execution(format!(
                        "no option '{}' in {}",
                        option, self.locator
                    )));
                };
                self.session.click(&choice).await?;
                Ok(None)
            }
            Operation::SetChecked(desired) => {
                if self.is_checked(&element).await? == *desired {
                    tracing::debug!(locator = %self.locator, "Already in desired state");
                    return Ok(Some(Value::String("unchanged".to_string())));
                }
                self.session.click(&element).await?;
                Ok(Some(Value::String("changed".to_string())))
            }
            Operation::Read { attribute } => {
                let value = match attribute {
                    Some(name) => self.session.attribute(&element, name).await?,
                    None => Some(self.session.text(&element).await?),
                };
                Ok(Some(value.map(Value::String).unwrap_or(Value::Null)))
            }
            Operation::Verify(check) => {
                let observed = match &check.attribute {
                    Some(name) => self
                        .session
                        .attribute(&element, name)
                        .await?
                        .unwrap_or_default(),
                    None => self.session.text(&element).await?,
                };
                check.check(&self.locator.to_string(), &observed)?;
                Ok(Some(Value::String(observed)))
            }
            Operation::Upload(path) => {
                let path = path.canonicalize().map_err(|e| {
                    Error::Execution(format!("upload file '{}': {}", path.display(), e))
                })?;
                self.session
                    .send_keys(&element, &path.to_string_lossy())
                    .await?;
                Ok(None)
            }
            Operation::Respond(_) => Err(Error::Config(
                "request expectations need an API session".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, Target};
    use crate::guard::{Outcome, SkipReason, WaitPolicy};
    use crate::session::Session;
    use tokio::time::Instant;

    /// Backend whose lookups block like a server-side implicit wait
    struct HangingFind {
        lookup_delay: Duration,
        clicks: u32,
    }

    #[async_trait]
    impl UiSession for HangingFind {
        async fn find(&mut self, locator: &Locator) -> Result<Option<ElementId>> {
            tokio::time::sleep(self.lookup_delay).await;
            Ok(Some(ElementId(locator.value().to_string())))
        }

        async fn find_child(&mut self, _: &ElementId, _: &Locator) -> Result<Option<ElementId>> {
            Ok(None)
        }

        async fn is_displayed(&mut self, _: &ElementId) -> Result<bool> {
            Ok(true)
        }

        async fn is_enabled(&mut self, _: &ElementId) -> Result<bool> {
            Ok(true)
        }

        async fn is_selected(&mut self, _: &ElementId) -> Result<bool> {
            Ok(false)
        }

        async fn attribute(&mut self, _: &ElementId, _: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn text(&mut self, _: &ElementId) -> Result<String> {
            Ok(String::new())
        }

        async fn click(&mut self, _: &ElementId) -> Result<()> {
            self.clicks += 1;
            Ok(())
        }

        async fn clear(&mut self, _: &ElementId) -> Result<()> {
            Ok(())
        }

        async fn send_keys(&mut self, _: &ElementId, _: &str) -> Result<()> {
            Ok(())
        }

        async fn quit(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn click(id: &str) -> Action {
        Action::new(
            Target::Element {
                locator: Locator::Id(id.to_string()),
                until: Precondition::Present,
            },
            Operation::Click,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_lookup_is_cut_off_at_deadline() {
        let mut session = Session::Ui(Box::new(HangingFind {
            lookup_delay: Duration::from_secs(30),
            clicks: 0,
        }));
        let policy = WaitPolicy::from_millis(200, 50);
        let started = Instant::now();

        let outcome = click("create_wallet_button").run(&mut session, &policy).await;

        assert!(started.elapsed() <= policy.timeout + policy.interval);
        assert!(matches!(
            outcome,
            Outcome::Skipped(SkipReason::PreconditionTimeout { waited_ms: 200, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_within_deadline_acts_once() {
        let mut ui = HangingFind {
            lookup_delay: Duration::from_millis(120),
            clicks: 0,
        };
        let locator = Locator::Id("continue_button".to_string());
        let operation = Operation::Click;
        let policy = WaitPolicy::from_millis(500, 50);

        let outcome = {
            let mut step = UiStep::new(&mut ui, &locator, Precondition::Clickable, &operation);
            crate::guard::run_guarded(&mut step, &policy).await
        };

        assert!(outcome.is_success());
        assert_eq!(ui.clicks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_wait_completes_its_single_lookup() {
        let mut session = Session::Ui(Box::new(HangingFind {
            lookup_delay: Duration::from_millis(80),
            clicks: 0,
        }));

        let outcome = click("terms_checkbox")
            .run(&mut session, &WaitPolicy::from_millis(0, 50))
            .await;

        assert!(outcome.is_success());
    }
}
