//! Verbatim copy, used by the html and font pipelines.

use super::{output_path, PipelineOutput, TransformError};
use crate::build::SourceFile;
use std::fs;
use std::path::Path;

/// Copy every source into `dest`, preserving its path below the glob base.
pub fn run(sources: &[SourceFile], dest: &Path) -> Result<PipelineOutput, TransformError> {
    let mut output = PipelineOutput::new();

    for source in sources {
        let target = output_path(dest, source, None);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| TransformError::Write { path: target.clone(), source: e })?;
        }
        fs::copy(&source.path, &target)
            .map_err(|e| TransformError::Write { path: target.clone(), source: e })?;
        output.outputs.push(target);
    }

    Ok(output)
}
