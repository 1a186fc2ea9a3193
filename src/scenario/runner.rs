//! Scenario runner implementation
//!
//! Opens the scenario's session, runs the steps strictly in order and
//! releases the session once at the end, whatever happened in between.

use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;
use serde_json::Value;

use crate::action::lookup;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::guard::{Outcome, SkipReason, WaitPolicy};
use crate::session::{HttpSession, Session, UiSession, WebDriverSession};

use super::config::{Scenario, SessionConfig, Step};
use super::plan::{plan, PlanError, PlanItem};
use super::report::{print_step, print_summary, ScenarioResult, StepReport};
use super::template::Captures;

/// Settings that apply to every scenario of a run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Print step data for successful steps
    pub verbose: bool,
    /// Wait policy scenarios and steps start from
    pub wait: WaitPolicy,
    /// Overrides the WebDriver URL of every scenario
    pub webdriver_url: Option<String>,
    /// Overrides the base URL of every HTTP scenario
    pub base_url: Option<String>,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            verbose: false,
            wait: WaitPolicy::from(&config.wait),
            webdriver_url: None,
            base_url: None,
        }
    }
}

/// Run a scenario from a YAML file
pub async fn run_scenario(path: &Path, config: &Config, options: &RunOptions) -> Result<ScenarioResult> {
    let scenario = Scenario::load(path)?;

    println!(
        "\n{} {}",
        "Running Scenario:".blue().bold(),
        scenario.name.white().bold()
    );
    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }

    println!("\n{}", "Starting session...".cyan());
    let session = match open_session(&scenario.session, config, options).await {
        Ok(session) => session,
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            let mut result = ScenarioResult::new(&scenario.name);
            result.aborted = Some(e.to_string());
            print_summary(&result);
            return Ok(result);
        }
    };
    println!("  {} {} session started", "✓".green(), session.kind());

    println!("\n{}", "Steps:".cyan());
    let base_dir = path.parent().unwrap_or(Path::new("."));
    let result = ScenarioRunner::new(session, options.wait, base_dir)
        .verbose(options.verbose)
        .run(&scenario)
        .await;

    print_summary(&result);
    Ok(result)
}

/// Open the session a scenario asks for
pub async fn open_session(
    session: &SessionConfig,
    config: &Config,
    options: &RunOptions,
) -> Result<Session> {
    match session {
        SessionConfig::Webdriver {
            url,
            platform,
            capabilities,
            start_url,
        } => {
            let url = options
                .webdriver_url
                .as_deref()
                .or(url.as_deref())
                .unwrap_or(&config.webdriver.url);
            let mut driver = WebDriverSession::start(
                url,
                *platform,
                capabilities.clone(),
                config.webdriver.command_timeout(),
            )
            .await?;
            if let Some(page) = start_url {
                tracing::info!(url = %page, "Loading start page");
                if let Err(e) = driver.navigate(page).await {
                    if let Err(release) = driver.quit().await {
                        tracing::warn!("Failed to release ui session: {}", release);
                    }
                    return Err(Error::SessionStart {
                        endpoint: url.to_string(),
                        reason: format!("could not load {}: {}", page, e),
                    });
                }
            }
            Ok(Session::Ui(Box::new(driver)))
        }
        SessionConfig::Http { base_url } => {
            let base_url = options.base_url.as_deref().unwrap_or(base_url);
            Ok(Session::Api(Box::new(HttpSession::new(base_url, &config.http)?)))
        }
    }
}

/// Runs one scenario against a session it owns
pub struct ScenarioRunner {
    session: Session,
    base: WaitPolicy,
    base_dir: PathBuf,
    captures: Captures,
    verbose: bool,
}

impl ScenarioRunner {
    pub fn new(session: Session, base: WaitPolicy, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            session,
            base,
            base_dir: base_dir.into(),
            captures: Captures::new(),
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run every step, then release the session
    pub async fn run(mut self, scenario: &Scenario) -> ScenarioResult {
        let result = self.run_steps(scenario).await;

        if let Err(e) = self.session.release().await {
            tracing::warn!("Failed to release {} session: {}", self.session.kind(), e);
        }
        result
    }

    async fn run_steps(&mut self, scenario: &Scenario) -> ScenarioResult {
        let mut result = ScenarioResult::new(&scenario.name);
        let policy = scenario.wait.apply(self.base);
        let mut stopped_at: Option<usize> = None;

        for (i, step) in scenario.steps.iter().enumerate() {
            let number = i + 1;
            let name = step.name.clone().unwrap_or_else(|| step.kind.summary());

            let outcome = match stopped_at {
                Some(at_step) => Outcome::Skipped(SkipReason::Halted { at_step }),
                None => {
                    let outcome = self.run_step(step, step.wait.apply(policy)).await;
                    if let Some(e) = outcome.error().filter(|e| e.is_fatal()) {
                        tracing::error!(step = number, "Session error, aborting run: {}", e);
                        result.aborted = Some(e.to_string());
                        stopped_at = Some(number);
                    } else if step.halt && !outcome.is_success() {
                        tracing::info!(step = number, "Step marked halt did not succeed");
                        stopped_at = Some(number);
                    }
                    outcome
                }
            };

            tracing::debug!(step = number, outcome = %outcome.kind(), "Step finished");
            let report = StepReport {
                number,
                name,
                outcome,
            };
            print_step(&report, self.verbose);
            result.steps.push(report);
        }

        result
    }

    async fn run_step(&mut self, step: &Step, policy: WaitPolicy) -> Outcome {
        if let Some(missing) = step.requires.iter().find(|n| !self.captures.contains(n)) {
            return Outcome::Skipped(SkipReason::MissingCapture(missing.clone()));
        }

        let items = match plan(&step.kind, &self.captures, &self.base_dir) {
            Ok(items) => items,
            Err(PlanError::MissingCapture(name)) => {
                return Outcome::Skipped(SkipReason::MissingCapture(name))
            }
            Err(PlanError::Invalid(e)) => return Outcome::Failed(e),
        };

        let mut outcome = self.run_items(&items, &policy).await;
        if !step.optional {
            outcome = outcome.into_mandatory();
        }

        if let Outcome::Success(data) = &outcome {
            self.capture(step, data.as_ref());
        }
        outcome
    }

    /// Run plan entries in order, stopping at the first that doesn't succeed
    async fn run_items(&mut self, items: &[PlanItem], policy: &WaitPolicy) -> Outcome {
        let total = items
            .iter()
            .filter(|item| matches!(item, PlanItem::Act(_)))
            .count();
        let mut done = 0;
        let mut paused = Duration::ZERO;
        let mut last = Outcome::Success(None);

        for item in items {
            match item {
                PlanItem::Pause(duration) => {
                    tokio::time::sleep(*duration).await;
                    paused += *duration;
                }
                PlanItem::Act(action) => {
                    let outcome = action.run(&mut self.session, policy).await;
                    done += 1;
                    if !outcome.is_success() {
                        if done < total {
                            tracing::info!(
                                entry = done,
                                remaining = total - done,
                                "Entry did not succeed, abandoning the rest of the step"
                            );
                        }
                        return outcome;
                    }
                    last = outcome;
                }
            }
        }
        if total == 0 {
            return Outcome::Success(Some(Value::String(format!(
                "paused {} ms",
                paused.as_millis()
            ))));
        }
        last
    }

    fn capture(&mut self, step: &Step, data: Option<&Value>) {
        for (name, path) in &step.capture {
            match data.and_then(|d| lookup(d, path)) {
                Some(value) => {
                    tracing::debug!(name = %name, value = %value, "Captured value");
                    self.captures.insert(name.clone(), value.clone());
                }
                None => tracing::warn!(
                    name = %name,
                    path = %path,
                    "Nothing to capture; dependent steps will be skipped"
                ),
            }
        }
    }
}
