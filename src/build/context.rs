//! Build context containing configuration and paths for a build.

use crate::category::AssetCategory;
use crate::config::{AssetConfig, PathEntry};
use std::path::{Path, PathBuf};

/// Build context containing configuration and paths for a build operation.
///
/// The context is the explicit replacement for a process-wide path table:
/// every pipeline, the clean step and the watch loop receive it by reference,
/// so several independent contexts can coexist (one per test, for example).
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: AssetConfig,
    /// Project root directory (where assetflow.toml is located)
    project_root: PathBuf,
    /// Whether to run in verbose mode
    verbose: bool,
}

impl BuildContext {
    /// Create a new build context.
    pub fn new(config: AssetConfig, project_root: PathBuf) -> Self {
        Self { config, project_root, verbose: false }
    }

    /// Get the configuration.
    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the source directory (resolved to absolute path).
    pub fn src_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.src)
    }

    /// Get the output directory (resolved to absolute path).
    pub fn out_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.out)
    }

    /// Get the path table entry for a category.
    pub fn paths(&self, category: AssetCategory) -> &PathEntry {
        self.config.paths.entry(category)
    }

    /// Get the destination directory for a category (resolved to absolute path).
    pub fn dest_dir(&self, category: AssetCategory) -> PathBuf {
        self.resolve_path(&self.paths(category).dest)
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Resolve a path relative to the project root.
    ///
    /// If the path is absolute, returns it unchanged.
    /// If relative, joins it with the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        crate::config::loader::resolve_path(&self.project_root, path)
    }
}
