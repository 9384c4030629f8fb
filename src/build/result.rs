//! Build result types.
//!
//! Each executed [`StepKind`] reports one [`StepResult`]. A [`BuildResult`]
//! collects them for one plan run, plus the steps a failure kept from running.

use crate::build::StepKind;
use crate::category::AssetCategory;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// How a step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// The step ran to completion
    Success,
    /// Dry run: the step was planned only
    Skipped,
    /// The step failed; the message is the error chain
    Failed(String),
}

impl BuildStatus {
    /// Whether the step did not fail.
    pub fn is_success(&self) -> bool {
        !self.is_failure()
    }

    /// Whether the step failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, BuildStatus::Failed(_))
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStatus::Success => write!(f, "success"),
            BuildStatus::Skipped => write!(f, "skipped"),
            BuildStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Completion signal of one step.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub step: StepKind,
    pub status: BuildStatus,
    /// Files written, in write order
    pub outputs: Vec<PathBuf>,
    pub duration: Duration,
    /// Per-file errors of a lenient category
    pub warnings: Vec<String>,
}

impl StepResult {
    pub fn success(step: StepKind, outputs: Vec<PathBuf>, duration: Duration) -> Self {
        Self { step, status: BuildStatus::Success, outputs, duration, warnings: vec![] }
    }

    pub fn skipped(step: StepKind) -> Self {
        Self {
            step,
            status: BuildStatus::Skipped,
            outputs: vec![],
            duration: Duration::ZERO,
            warnings: vec![],
        }
    }

    pub fn failed(step: StepKind, error: String, duration: Duration) -> Self {
        Self { step, status: BuildStatus::Failed(error), outputs: vec![], duration, warnings: vec![] }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The category this step built, or `None` for the clean step.
    pub fn category(&self) -> Option<AssetCategory> {
        match self.step {
            StepKind::Clean => None,
            StepKind::Asset(category) => Some(category),
        }
    }

    /// One summary line, e.g. `scss     2 files, 1 warning (12ms)`.
    fn describe(&self) -> String {
        let detail = match (&self.status, self.step) {
            (BuildStatus::Failed(err), _) => format!("FAILED: {}", err),
            (BuildStatus::Skipped, _) => "planned".to_string(),
            (BuildStatus::Success, StepKind::Clean) => "removed build output".to_string(),
            (BuildStatus::Success, StepKind::Asset(_)) => {
                let mut text = plural(self.outputs.len(), "file");
                if !self.warnings.is_empty() {
                    text.push_str(&format!(", {}", plural(self.warnings.len(), "warning")));
                }
                text
            }
        };
        format!("{:<8} {} ({:?})", self.step.id(), detail, self.duration)
    }
}

fn plural(count: usize, noun: &str) -> String {
    format!("{} {}{}", count, noun, if count == 1 { "" } else { "s" })
}

/// Outcome of one plan run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Steps that ran, in order
    pub steps: Vec<StepResult>,
    /// Planned steps that never started because an earlier one failed
    pub not_run: Vec<StepKind>,
    pub total_duration: Duration,
}

impl BuildResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: StepResult) {
        self.steps.push(result);
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Whether no step failed.
    pub fn is_success(&self) -> bool {
        self.failed_step().is_none()
    }

    /// The step that stopped the build, if any.
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.iter().find(|r| r.status.is_failure())
    }

    /// Whether every step was only planned.
    pub fn is_dry_run(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|r| r.status == BuildStatus::Skipped)
    }

    pub fn step(&self, step: StepKind) -> Option<&StepResult> {
        self.steps.iter().find(|r| r.step == step)
    }

    /// The result of one category's pipeline.
    pub fn category(&self, category: AssetCategory) -> Option<&StepResult> {
        self.step(StepKind::Asset(category))
    }

    /// Every file written, in step order.
    pub fn outputs(&self) -> impl Iterator<Item = &PathBuf> {
        self.steps.iter().flat_map(|r| r.outputs.iter())
    }

    /// Per-file warnings, prefixed with their step.
    pub fn warnings(&self) -> Vec<String> {
        self.steps
            .iter()
            .flat_map(|r| r.warnings.iter().map(move |w| format!("{}: {}", r.step, w)))
            .collect()
    }

    /// Human-readable report: one line per step, then the verdict.
    pub fn summary(&self) -> String {
        let mut lines: Vec<String> = self.steps.iter().map(|r| format!("  {}", r.describe())).collect();

        let warnings = self.warnings();
        for warning in warnings.iter().take(5) {
            lines.push(format!("  warning: {}", warning));
        }
        if warnings.len() > 5 {
            lines.push(format!("  ... and {} more warnings", warnings.len() - 5));
        }

        let verdict = if let Some(failed) = self.failed_step() {
            let mut text = format!("Build failed at '{}' after {:?}", failed.step, self.total_duration);
            if !self.not_run.is_empty() {
                let names: Vec<&str> = self.not_run.iter().map(StepKind::id).collect();
                text.push_str(&format!("; not run: {}", names.join(", ")));
            }
            text
        } else if self.is_dry_run() {
            format!("Dry run: {} planned, nothing written", plural(self.steps.len(), "step"))
        } else {
            format!(
                "Build succeeded: {} written in {:?}",
                plural(self.outputs().count(), "file"),
                self.total_duration
            )
        };
        lines.push(verdict);

        lines.join("\n")
    }
}
