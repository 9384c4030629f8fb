//! Clean step: remove the build output tree.

use crate::build::BuildContext;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error during the clean step.
#[derive(Debug, Error)]
pub enum CleanError {
    /// The output directory would take the project with it
    #[error("Refusing to remove {0}: it contains the project root")]
    Unsafe(PathBuf),
    /// IO error while removing
    #[error("Failed to remove {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Remove the output directory.
///
/// Returns `Ok(true)` when a directory was removed and `Ok(false)` when there
/// was nothing to remove. Containment is checked on canonical paths, so `..`
/// segments and symlinks cannot point the removal at the project itself.
pub fn clean_output(ctx: &BuildContext) -> Result<bool, CleanError> {
    let out_dir = ctx.out_dir();

    let resolved = match fs::canonicalize(&out_dir) {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(source) => return Err(CleanError::Io { path: out_dir, source }),
    };
    let root = fs::canonicalize(ctx.project_root())
        .map_err(|source| CleanError::Io { path: ctx.project_root().to_path_buf(), source })?;

    if root.starts_with(&resolved) {
        return Err(CleanError::Unsafe(resolved));
    }

    match fs::remove_dir_all(&out_dir) {
        Ok(()) => {
            tracing::debug!(dir = %out_dir.display(), "removed build output");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(CleanError::Io { path: out_dir, source }),
    }
}
