//! Build command implementations (build, clean, single pipeline tasks)

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{load_context, EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{BuildPipeline, BuildPlan, StepKind};
use crate::category::AssetCategory;
use crate::config::loader::CliOverrides;

/// Run a plan and report the summary.
fn run_plan(pipeline: &BuildPipeline, plan: &BuildPlan) -> ExitCode {
    let result = pipeline.build_plan(plan);
    if result.is_success() {
        println!("{}", result.summary());
        ExitCode::from(EXIT_SUCCESS)
    } else {
        eprintln!("{}", result.summary());
        ExitCode::from(EXIT_ERROR)
    }
}

/// Run the build command
pub fn run_build(config: Option<&Path>, out: Option<PathBuf>, dry_run: bool, verbose: bool) -> ExitCode {
    let overrides = CliOverrides { out, ..Default::default() };
    let context = match load_context(config, &overrides, verbose) {
        Ok(context) => context,
        Err(code) => return ExitCode::from(code),
    };

    let plan = BuildPlan::production();

    // Dry run mode
    if dry_run {
        println!("Dry run - would build:");
        println!("  Project: {}", context.project_root().display());
        println!("  Output: {}", context.out_dir().display());
        for step in plan.steps() {
            match step {
                StepKind::Clean => println!("    - clean (remove {})", context.out_dir().display()),
                StepKind::Asset(category) => println!(
                    "    - {} ({} -> {})",
                    step,
                    context.paths(*category).src,
                    context.dest_dir(*category).display()
                ),
            }
        }
        let pipeline = BuildPipeline::new(context).with_dry_run(true);
        return run_plan(&pipeline, &plan);
    }

    println!("Building {}...", context.config().project.name);
    run_plan(&BuildPipeline::new(context), &plan)
}

/// Run the clean step only
pub fn run_clean(config: Option<&Path>, verbose: bool) -> ExitCode {
    match load_context(config, &CliOverrides::default(), verbose) {
        Ok(context) => run_plan(&BuildPipeline::new(context), &BuildPlan::single(StepKind::Clean)),
        Err(code) => ExitCode::from(code),
    }
}

/// Run a single category pipeline
pub fn run_category(config: Option<&Path>, category: AssetCategory, verbose: bool) -> ExitCode {
    match load_context(config, &CliOverrides::default(), verbose) {
        Ok(context) => run_plan(
            &BuildPipeline::new(context),
            &BuildPlan::single(StepKind::Asset(category)),
        ),
        Err(code) => ExitCode::from(code),
    }
}
