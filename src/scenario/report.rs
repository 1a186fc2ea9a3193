//! Step and scenario reports

use colored::Colorize;

use crate::guard::{Outcome, OutcomeKind};

/// Outcome of one scenario step
#[derive(Debug)]
pub struct StepReport {
    /// 1-based position in the scenario
    pub number: usize,
    pub name: String,
    pub outcome: Outcome,
}

/// Result of a scenario run
#[derive(Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub steps: Vec<StepReport>,
    /// Set when the run ended early on a session error
    pub aborted: Option<String>,
}

impl ScenarioResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            aborted: None,
        }
    }

    /// No step failed and the session held up
    pub fn passed(&self) -> bool {
        self.aborted.is_none() && self.count(OutcomeKind::Failed) == 0
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.steps
            .iter()
            .filter(|s| s.outcome.kind() == kind)
            .count()
    }

    pub fn step(&self, number: usize) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.number == number)
    }
}

/// Print the report line for one step
pub fn print_step(report: &StepReport, verbose: bool) {
    let label = format!("Step {}: {}", report.number, report.name);
    match report.outcome.kind() {
        OutcomeKind::Success => match report.outcome.detail() {
            Some(detail) if verbose => {
                println!("  {} {} ({})", "✓".green(), label, detail.dimmed())
            }
            _ => println!("  {} {}", "✓".green(), label),
        },
        OutcomeKind::Skipped => println!(
            "  {} {} {}",
            "~".yellow(),
            label,
            format!("skipped: {}", report.outcome.detail().unwrap_or_default()).yellow()
        ),
        OutcomeKind::Failed => println!(
            "  {} {} {}",
            "✗".red(),
            label,
            format!("failed: {}", report.outcome.detail().unwrap_or_default()).red()
        ),
    }
}

/// Print the closing summary of a scenario
pub fn print_summary(result: &ScenarioResult) {
    let counts = format!(
        "{} succeeded, {} skipped, {} failed",
        result.count(OutcomeKind::Success),
        result.count(OutcomeKind::Skipped),
        result.count(OutcomeKind::Failed)
    );

    if let Some(reason) = &result.aborted {
        println!("\n{} {}", "Aborted:".red().bold(), reason);
    }

    if result.passed() {
        println!(
            "\n{} {} ({})\n",
            "✓".green().bold(),
            "Scenario Passed".green().bold(),
            counts
        );
    } else {
        println!(
            "\n{} {} ({})\n",
            "✗".red().bold(),
            "Scenario Failed".red().bold(),
            counts
        );
    }
}
