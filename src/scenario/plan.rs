//! Turn steps into action sequences
//!
//! Templates are rendered against the captures available when the step
//! starts, and multi-part steps (digits, groups) are flattened into a
//! sequence the executor runs fail-fast.

use std::path::Path;
use std::time::Duration;

use crate::action::{Action, Locator, Operation, Precondition, Target, ValueCheck};
use crate::common::paths::resolve_relative;
use crate::common::Error;
use crate::session::ApiRequest;

use super::config::{parse_method, StepKind};
use super::template::{self, Captures};

/// One entry of a step's plan
#[derive(Debug, Clone)]
pub enum PlanItem {
    Act(Action),
    Pause(Duration),
}

/// Why a step could not be planned
#[derive(Debug)]
pub enum PlanError {
    /// A referenced capture is absent
    MissingCapture(String),
    Invalid(Error),
}

impl From<Error> for PlanError {
    fn from(e: Error) -> Self {
        Self::Invalid(e)
    }
}

type PlanResult<T> = std::result::Result<T, PlanError>;

/// Build the plan for a step
pub fn plan(kind: &StepKind, captures: &Captures, base_dir: &Path) -> PlanResult<Vec<PlanItem>> {
    let render = |s: &str| template::render(s, captures).map_err(PlanError::MissingCapture);
    let locate = |locator: &Locator| -> PlanResult<Locator> {
        let rendered = render(locator.value())?;
        Ok(locator.map_value(|_| rendered))
    };
    let element = |locator: &Locator, until: Precondition| -> PlanResult<Target> {
        Ok(Target::Element {
            locator: locate(locator)?,
            until,
        })
    };
    let single = |target: Target, operation: Operation| vec![PlanItem::Act(Action::new(target, operation))];

    Ok(match kind {
        StepKind::Click { target, until } => single(element(target, *until)?, Operation::Click),
        StepKind::Type {
            target,
            text,
            clear,
            until,
        } => single(
            element(target, *until)?,
            Operation::Type {
                text: render(text)?,
                clear: *clear,
            },
        ),
        StepKind::Select {
            target,
            option,
            until,
        } => single(
            element(target, *until)?,
            Operation::Select {
                option: render(option)?,
            },
        ),
        StepKind::Check {
            target,
            checked,
            until,
        } => single(element(target, *until)?, Operation::SetChecked(*checked)),
        StepKind::Read {
            target,
            attribute,
            until,
        } => single(
            element(target, *until)?,
            Operation::Read {
                attribute: attribute.clone(),
            },
        ),
        StepKind::Verify {
            target,
            attribute,
            equals,
            contains,
            until,
        } => single(
            element(target, *until)?,
            Operation::Verify(ValueCheck {
                attribute: attribute.clone(),
                equals: equals.as_deref().map(render).transpose()?,
                contains: contains.as_deref().map(render).transpose()?,
            }),
        ),
        StepKind::Upload {
            target,
            file,
            until,
        } => single(
            element(target, *until)?,
            Operation::Upload(resolve_relative(base_dir, file)),
        ),
        StepKind::Digits {
            target,
            text,
            pause_ms,
            until,
        } => {
            let text = render(text)?;
            let pause = Duration::from_millis(*pause_ms);
            let mut items = Vec::new();
            for (i, ch) in text.chars().enumerate() {
                if i > 0 && !pause.is_zero() {
                    items.push(PlanItem::Pause(pause));
                }
                let position = (i + 1).to_string();
                let locator = locate(target)?.map_value(|v| v.replace("{n}", &position));
                items.push(PlanItem::Act(Action::new(
                    Target::Element {
                        locator,
                        until: *until,
                    },
                    Operation::Type {
                        text: ch.to_string(),
                        clear: false,
                    },
                )));
            }
            items
        }
        StepKind::Group { steps } => {
            let mut items = Vec::new();
            for step in steps {
                items.extend(plan(step, captures, base_dir)?);
            }
            items
        }
        StepKind::Request {
            method,
            path,
            query,
            body,
            expect,
        } => {
            let method = parse_method(method).map_err(Error::Config)?;
            let mut request = ApiRequest::new(method, render(path)?);
            for (key, value) in query {
                request = request.with_query(key.clone(), render(value)?);
            }
            if let Some(body) = body {
                let body = template::render_json(body, captures).map_err(PlanError::MissingCapture)?;
                request = request.with_body(body);
            }
            let mut expect = expect.clone();
            for value in expect.fields.values_mut().chain(expect.each.values_mut()) {
                *value = template::render_json(value, captures).map_err(PlanError::MissingCapture)?;
            }
            for needle in expect.contains.values_mut() {
                *needle = render(needle.as_str())?;
            }
            single(Target::Endpoint(request), Operation::Respond(expect))
        }
        StepKind::Pause { ms } => vec![PlanItem::Pause(Duration::from_millis(*ms))],
    })
}
