//! Source file discovery for the build system.
//!
//! Resolves the glob patterns of the path table into concrete source files.
//! Each file keeps its path relative to the glob base, the literal directory
//! prefix of the pattern, so outputs mirror the source layout below it.

use crate::build::BuildContext;
use crate::category::AssetCategory;
use glob::{glob, Pattern};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Error during source discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Invalid glob pattern
    #[error("Invalid glob pattern '{0}': {1}")]
    InvalidPattern(String, glob::PatternError),
}

/// A discovered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Path relative to the glob base, used to place the output
    pub relative: PathBuf,
}

/// Check whether a pattern component contains glob syntax.
fn is_magic(component: &str) -> bool {
    component.contains(['*', '?', '[', '{'])
}

/// Literal directory prefix of a glob pattern.
///
/// `src/scss/**/*.scss` has base `src/scss`. A pattern without wildcards
/// names a single file, so its base is the parent directory.
pub fn glob_base(pattern: &str) -> PathBuf {
    let path = Path::new(pattern);
    let mut base = PathBuf::new();
    let mut saw_magic = false;

    for component in path.components() {
        if let Component::Normal(part) = component {
            if is_magic(&part.to_string_lossy()) {
                saw_magic = true;
                break;
            }
        }
        base.push(component.as_os_str());
    }

    if !saw_magic {
        base.pop();
    }
    base
}

/// Discover files matching a glob pattern.
///
/// Relative patterns are resolved against `base_dir`. Directories are
/// skipped and the result is sorted for deterministic builds.
pub fn discover_files(base_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let full_pattern = absolute_pattern(base_dir, pattern);

    let paths =
        glob(&full_pattern).map_err(|e| DiscoveryError::InvalidPattern(pattern.to_string(), e))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    files.push(path);
                }
            }
            Err(e) => {
                tracing::warn!("error reading path: {}", e);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Join a pattern onto a base directory, escaping the directory part.
pub fn absolute_pattern(base_dir: &Path, pattern: &str) -> String {
    if Path::new(pattern).is_absolute() {
        return pattern.to_string();
    }
    let escaped = Pattern::escape(&base_dir.to_string_lossy());
    format!("{}/{}", escaped.trim_end_matches('/'), pattern)
}

/// Discover the sources of one category.
pub fn discover_sources(
    ctx: &BuildContext,
    category: AssetCategory,
) -> Result<Vec<SourceFile>, DiscoveryError> {
    let pattern = &ctx.paths(category).src;
    let base = ctx.resolve_path(&glob_base(pattern));

    let files = discover_files(ctx.project_root(), pattern)?;
    Ok(files
        .into_iter()
        .map(|path| {
            let relative = path
                .strip_prefix(&base)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.file_name().map(PathBuf::from).unwrap_or_default());
            SourceFile { path, relative }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(&path).unwrap().write_all(b"x").unwrap();
        path
    }

    #[test]
    fn test_glob_base() {
        assert_eq!(glob_base("src/scss/**/*.scss"), PathBuf::from("src/scss"));
        assert_eq!(glob_base("src/fonts/**/*"), PathBuf::from("src/fonts"));
        assert_eq!(glob_base("src/index.html"), PathBuf::from("src"));
        assert_eq!(glob_base("src/js/script.js"), PathBuf::from("src/js"));
        assert_eq!(glob_base("*.html"), PathBuf::new());
        assert_eq!(glob_base("src/img/icon-?.png"), PathBuf::from("src/img"));
    }

    #[test]
    fn test_discover_files_simple() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "index.html");
        create_test_file(temp.path(), "notes.txt");

        let files = discover_files(temp.path(), "*.html").unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("index.html"));
    }

    #[test]
    fn test_discover_files_recursive_skips_dirs() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "fonts/a.woff2");
        create_test_file(temp.path(), "fonts/sub/b.woff");
        create_test_file(temp.path(), "fonts/sub/deep/c.ttf");

        let files = discover_files(temp.path(), "fonts/**/*").unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|f| f.is_file()));
    }

    #[test]
    fn test_discover_files_no_match() {
        let temp = TempDir::new().unwrap();
        let files = discover_files(temp.path(), "src/img/**/*").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_discover_files_invalid_pattern() {
        let temp = TempDir::new().unwrap();
        let result = discover_files(temp.path(), "src/[**");
        assert!(matches!(result, Err(DiscoveryError::InvalidPattern(_, _))));
    }

    #[test]
    fn test_discover_sources_relative_paths() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "src/fonts/open-sans.woff2");
        create_test_file(temp.path(), "src/fonts/icons/icons.ttf");

        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());
        let sources = discover_sources(&ctx, AssetCategory::Font).unwrap();

        let relative: Vec<_> = sources.iter().map(|s| s.relative.clone()).collect();
        assert_eq!(
            relative,
            vec![PathBuf::from("icons/icons.ttf"), PathBuf::from("open-sans.woff2")]
        );
    }

    #[test]
    fn test_discover_sources_single_file() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "src/index.html");
        create_test_file(temp.path(), "src/about.html");

        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());
        let sources = discover_sources(&ctx, AssetCategory::Html).unwrap();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].relative, PathBuf::from("index.html"));
    }
}
