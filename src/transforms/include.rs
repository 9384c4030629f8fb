//! Script include directive expansion.
//!
//! Recognized directives, each on a line of its own:
//!
//! ```text
//! //= include lib/util.js
//! //= require vendor/*.js
//! /*= include "polyfills" */
//! ```
//!
//! Paths are relative to the including file, may contain glob wildcards, and
//! get `.js` appended when they carry no extension. `include` always inlines
//! the target; `require` inlines it only if it is not already part of the
//! bundle. The directive line itself is dropped from the output.
//!
//! The expanded bundle is kept as a list of [`Segment`]s so later stages can
//! map output lines back to the file and line they came from.

use super::{read_source, TransformError};
use crate::build::discovery::discover_files;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

const DIRECTIVE: &str = r"^\s*(?://|/\*)=\s*(include|require)\s+(.+?)\s*(?:\*/)?\s*$";

/// A run of consecutive lines that came from one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Index into [`Bundle::sources`]
    pub source: usize,
    /// Zero-based line in the source where the run starts
    pub line: u32,
    /// The lines, joined with `\n`
    pub text: String,
}

/// A script with all include directives expanded.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    /// Every file that contributed to the bundle, entry first
    pub sources: Vec<PathBuf>,
    /// Original contents, parallel to `sources`
    pub contents: Vec<String>,
    /// Bundle text in order
    pub segments: Vec<Segment>,
    /// Unresolved includes that were skipped
    pub warnings: Vec<String>,
}

impl Bundle {
    /// The full expanded source text.
    pub fn code(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectiveKind {
    Include,
    Require,
}

struct Expander {
    directive: Regex,
    strict: bool,
    bundle: Bundle,
    included: HashSet<PathBuf>,
    stack: Vec<PathBuf>,
}

/// Expand every include directive reachable from `entry`.
///
/// With `strict`, an include that matches no file is an error; otherwise it
/// is logged and recorded in [`Bundle::warnings`]. Include cycles are always
/// an error.
pub fn bundle(entry: &Path, strict: bool) -> Result<Bundle, TransformError> {
    let directive = Regex::new(DIRECTIVE).map_err(|e| TransformError::Include {
        path: entry.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut expander = Expander {
        directive,
        strict,
        bundle: Bundle::default(),
        included: HashSet::new(),
        stack: Vec::new(),
    };
    expander.expand(entry)?;
    Ok(expander.bundle)
}

impl Expander {
    fn expand(&mut self, path: &Path) -> Result<(), TransformError> {
        let canonical = fs::canonicalize(path)
            .map_err(|source| TransformError::Read { path: path.to_path_buf(), source })?;

        if self.stack.contains(&canonical) {
            let chain: Vec<String> = self
                .stack
                .iter()
                .chain(std::iter::once(&canonical))
                .map(|p| p.display().to_string())
                .collect();
            return Err(TransformError::Include {
                path: path.to_path_buf(),
                message: format!("include cycle: {}", chain.join(" -> ")),
            });
        }

        let contents = read_source(path)?;
        let index = self.bundle.sources.len();
        self.bundle.sources.push(path.to_path_buf());
        self.bundle.contents.push(contents.clone());
        self.included.insert(canonical.clone());
        self.stack.push(canonical);

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut pending: Vec<&str> = Vec::new();
        let mut start = 0u32;

        for (number, line) in contents.lines().enumerate() {
            let number = number as u32;
            let Some((kind, target)) = self.parse_directive(line) else {
                if pending.is_empty() {
                    start = number;
                }
                pending.push(line);
                continue;
            };

            self.flush(index, start, &mut pending);
            for resolved in self.resolve(path, dir, number, &target)? {
                let seen = fs::canonicalize(&resolved)
                    .map(|c| self.included.contains(&c))
                    .unwrap_or(false);
                if kind == DirectiveKind::Require && seen {
                    tracing::debug!(file = %resolved.display(), "already required, skipping");
                    continue;
                }
                self.expand(&resolved)?;
            }
        }
        self.flush(index, start, &mut pending);

        self.stack.pop();
        Ok(())
    }

    fn flush(&mut self, source: usize, line: u32, pending: &mut Vec<&str>) {
        if pending.is_empty() {
            return;
        }
        self.bundle.segments.push(Segment { source, line, text: pending.join("\n") });
        pending.clear();
    }

    fn parse_directive(&self, line: &str) -> Option<(DirectiveKind, String)> {
        let captures = self.directive.captures(line)?;
        let kind = match &captures[1] {
            "require" => DirectiveKind::Require,
            _ => DirectiveKind::Include,
        };
        let target = captures[2].trim_matches(|c| c == '"' || c == '\'').to_string();
        Some((kind, target))
    }

    /// Files an include target names, in sorted order.
    fn resolve(
        &mut self,
        from: &Path,
        dir: &Path,
        line: u32,
        target: &str,
    ) -> Result<Vec<PathBuf>, TransformError> {
        let magic = target.contains(['*', '?', '[']);
        let mut target = target.to_string();
        if !magic && Path::new(&target).extension().is_none() {
            target.push_str(".js");
        }

        let found = if magic {
            discover_files(dir, &target).map_err(|e| TransformError::Include {
                path: from.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            let candidate = if Path::new(&target).is_absolute() {
                PathBuf::from(&target)
            } else {
                dir.join(&target)
            };
            if candidate.is_file() {
                vec![candidate]
            } else {
                vec![]
            }
        };

        if found.is_empty() {
            let message = format!("no file matches '{}' (line {})", target, line + 1);
            if self.strict {
                return Err(TransformError::Include { path: from.to_path_buf(), message });
            }
            tracing::warn!(file = %from.display(), "{}", message);
            self.bundle.warnings.push(format!("{}: {}", from.display(), message));
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, name: &str, contents: &str) -> PathBuf {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_no_directives_is_single_segment() {
        let temp = TempDir::new().unwrap();
        let entry = write(temp.path(), "script.js", "var a = 1;\nvar b = 2;");

        let bundle = bundle(&entry, false).unwrap();
        assert_eq!(bundle.sources.len(), 1);
        assert_eq!(bundle.segments.len(), 1);
        assert_eq!(bundle.code(), "var a = 1;\nvar b = 2;");
    }

    #[test]
    fn test_include_inlines_file_and_tracks_lines() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lib/util.js", "function util() {}");
        let entry = write(temp.path(), "script.js", "var a = 1;\n//= include lib/util\nutil();");

        let bundle = bundle(&entry, false).unwrap();
        assert_eq!(bundle.code(), "var a = 1;\nfunction util() {}\nutil();");
        assert_eq!(bundle.segments.len(), 3);
        assert_eq!(bundle.segments[1].source, 1);
        assert_eq!(bundle.segments[1].line, 0);
        assert_eq!(bundle.segments[2].source, 0);
        assert_eq!(bundle.segments[2].line, 2);
    }

    #[test]
    fn test_block_comment_form_with_quotes() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.js", "var fromA;");
        let entry = write(temp.path(), "script.js", "/*= include \"a.js\" */\nvar main;");

        let bundle = bundle(&entry, false).unwrap();
        assert_eq!(bundle.code(), "var fromA;\nvar main;");
    }

    #[test]
    fn test_glob_include_is_sorted() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "parts/b.js", "var b;");
        write(temp.path(), "parts/a.js", "var a;");
        let entry = write(temp.path(), "script.js", "//= include parts/*.js");

        let bundle = bundle(&entry, false).unwrap();
        assert_eq!(bundle.code(), "var a;\nvar b;");
    }

    #[test]
    fn test_require_includes_once() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "dep.js", "var dep;");
        let entry = write(
            temp.path(),
            "script.js",
            "//= require dep\n//= require dep\n//= include dep",
        );

        let bundle = bundle(&entry, false).unwrap();
        assert_eq!(bundle.code(), "var dep;\nvar dep;");
    }

    #[test]
    fn test_cycle_is_error() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.js", "//= include b");
        write(temp.path(), "b.js", "//= include a");

        let err = bundle(&temp.path().join("a.js"), false).unwrap_err();
        assert!(err.to_string().contains("include cycle"));
    }

    #[test]
    fn test_missing_include_warns_when_lenient() {
        let temp = TempDir::new().unwrap();
        let entry = write(temp.path(), "script.js", "//= include missing\nvar a;");

        let bundle = bundle(&entry, false).unwrap();
        assert_eq!(bundle.warnings.len(), 1);
        assert!(bundle.warnings[0].contains("missing.js"));
        assert_eq!(bundle.code(), "var a;");
    }

    #[test]
    fn test_missing_include_fails_when_strict() {
        let temp = TempDir::new().unwrap();
        let entry = write(temp.path(), "script.js", "//= include missing\nvar a;");

        assert!(matches!(bundle(&entry, true), Err(TransformError::Include { .. })));
    }

    #[test]
    fn test_plain_comments_are_not_directives() {
        let temp = TempDir::new().unwrap();
        let entry = write(temp.path(), "script.js", "// include nothing\n/* = include x */");

        let bundle = bundle(&entry, true).unwrap();
        assert_eq!(bundle.segments.len(), 1);
    }
}
