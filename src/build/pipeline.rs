//! Build pipeline orchestration.
//!
//! [`run_category`] runs one asset pipeline. [`BuildPipeline`] executes a
//! [`BuildPlan`] step by step, stopping at the first failure.

use crate::build::{
    clean_output, discover_sources, BuildContext, BuildPlan, BuildResult, CleanError,
    DiscoveryError, StepKind, StepResult,
};
use crate::category::AssetCategory;
use crate::transforms::{self, PipelineOutput, TransformError};
use std::time::Instant;
use thiserror::Error;

/// Error during build execution.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Discovery error
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
    /// Clean step error
    #[error("Clean error: {0}")]
    Clean(#[from] CleanError),
    /// A transform failed
    #[error("{category} pipeline failed: {source}")]
    Transform {
        category: AssetCategory,
        #[source]
        source: TransformError,
    },
}

/// Run one category's pipeline: discover sources, transform, write.
pub fn run_category(
    ctx: &BuildContext,
    category: AssetCategory,
) -> Result<PipelineOutput, BuildError> {
    let sources = discover_sources(ctx, category)?;
    let dest = ctx.dest_dir(category);
    let config = ctx.config();

    tracing::debug!(%category, files = sources.len(), dest = %dest.display(), "running pipeline");

    let result = match category {
        AssetCategory::Html | AssetCategory::Font => transforms::copy::run(&sources, &dest),
        AssetCategory::Style => {
            transforms::style::run(&sources, &dest, &config.style, ctx.project_root())
        }
        AssetCategory::Script => transforms::script::run(&sources, &dest, &config.script),
        AssetCategory::Image => transforms::image::run(&sources, &dest, &config.image),
    };

    result.map_err(|source| BuildError::Transform { category, source })
}

/// Build pipeline for executing builds.
pub struct BuildPipeline {
    /// Build context
    context: BuildContext,
    /// Whether to do a dry run (don't actually build)
    dry_run: bool,
}

impl BuildPipeline {
    /// Create a new build pipeline.
    pub fn new(context: BuildContext) -> Self {
        Self { context, dry_run: false }
    }

    /// Set dry-run mode (don't actually build).
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Get the build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Run the production build: clean, then every category in order.
    pub fn build(&self) -> BuildResult {
        self.build_plan(&BuildPlan::production())
    }

    /// Run a plan, stopping at the first failed step.
    ///
    /// Steps that ran before the failure keep their outputs.
    pub fn build_plan(&self, plan: &BuildPlan) -> BuildResult {
        let start = Instant::now();
        let mut result = BuildResult::new();

        if self.context.is_verbose() {
            println!("Build plan: {} steps", plan.len());
            for step in plan.steps() {
                println!("  - {}", step);
            }
        }

        for (index, step) in plan.steps().iter().enumerate() {
            let step_result = self.run_step(*step);
            let failed = step_result.status.is_failure();
            result.push(step_result);

            if failed {
                result.not_run = plan.steps()[index + 1..].to_vec();
                tracing::error!(step = %step, not_run = result.not_run.len(), "build stopped");
                break;
            }
        }

        result.with_duration(start.elapsed())
    }

    /// Execute a single step.
    pub fn run_step(&self, step: StepKind) -> StepResult {
        let start = Instant::now();
        let id = step.id();

        if self.dry_run {
            return StepResult::skipped(step);
        }

        tracing::info!("Starting '{}'...", id);

        let outcome = match step {
            StepKind::Clean => clean_output(&self.context)
                .map(|_| PipelineOutput::new())
                .map_err(BuildError::from),
            StepKind::Asset(category) => run_category(&self.context, category),
        };

        let duration = start.elapsed();
        match outcome {
            Ok(output) => {
                if let StepKind::Asset(category) = step {
                    if category.is_lenient() && !output.warnings.is_empty() {
                        tracing::warn!(
                            "'{}' skipped {} file(s) with errors",
                            id,
                            output.warnings.len()
                        );
                    }
                }
                tracing::info!("Finished '{}' after {:?}", id, duration);
                StepResult::success(step, output.outputs, duration).with_warnings(output.warnings)
            }
            Err(e) => {
                tracing::error!("'{}' errored after {:?}: {}", id, duration, e);
                StepResult::failed(step, e.to_string(), duration)
            }
        }
    }
}
