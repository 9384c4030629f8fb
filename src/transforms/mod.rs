//! Asset transforms, one module per kind of work.
//!
//! # Module Structure
//!
//! - [`copy`] - Verbatim copy (html, fonts)
//! - [`style`] - Sass compilation, vendor prefixing, minification
//! - [`include`] - Script include directive expansion
//! - [`script`] - Script validation, transpilation, minification
//! - [`image`] - Lossless/lossy image recompression
//!
//! Every pipeline consumes discovered [`SourceFile`]s and returns a
//! [`PipelineOutput`]. A hard failure is a [`TransformError`]; lenient
//! pipelines record per-file failures as warnings instead.

pub mod copy;
pub mod image;
pub mod include;
pub mod script;
pub mod style;

use crate::build::SourceFile;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error produced by a single transform.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransformError {
    /// Reading a source failed
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Writing an output failed
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Sass compilation failed
    #[error("Sass error in {}: {message}", .path.display())]
    Sass { path: PathBuf, message: String },
    /// CSS parsing, prefixing or printing failed
    #[error("CSS error in {}: {message}", .path.display())]
    Css { path: PathBuf, message: String },
    /// Browserslist queries could not be resolved
    #[error("Invalid browserslist query: {0}")]
    Browsers(String),
    /// An include directive could not be resolved
    #[error("Include error in {}: {message}", .path.display())]
    Include { path: PathBuf, message: String },
    /// The script bundle does not parse
    #[error("Syntax error in {}: {message}", .path.display())]
    Syntax { path: PathBuf, message: String },
    /// The external transpiler failed
    #[error("Transpiler failed for {}: {message}", .path.display())]
    Transpile { path: PathBuf, message: String },
    /// Image decoding or encoding failed
    #[error("Image error in {}: {message}", .path.display())]
    Image { path: PathBuf, message: String },
    /// Source map serialization failed
    #[error("Source map error for {}: {message}", .path.display())]
    SourceMap { path: PathBuf, message: String },
}

impl TransformError {
    /// File the error is about, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            TransformError::Read { path, .. }
            | TransformError::Write { path, .. }
            | TransformError::Sass { path, .. }
            | TransformError::Css { path, .. }
            | TransformError::Include { path, .. }
            | TransformError::Syntax { path, .. }
            | TransformError::Transpile { path, .. }
            | TransformError::Image { path, .. }
            | TransformError::SourceMap { path, .. } => Some(path),
            TransformError::Browsers(_) => None,
        }
    }
}

/// Files written by one pipeline run, plus errors it logged and skipped.
#[derive(Debug, Default, Clone)]
pub struct PipelineOutput {
    /// Files written
    pub outputs: Vec<PathBuf>,
    /// Per-file errors that did not fail the pipeline
    pub warnings: Vec<String>,
}

impl PipelineOutput {
    /// Create an empty output.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Read a source file as UTF-8 text.
pub(crate) fn read_source(path: &Path) -> Result<String, TransformError> {
    fs::read_to_string(path)
        .map_err(|source| TransformError::Read { path: path.to_path_buf(), source })
}

/// Write an output file, creating parent directories.
pub(crate) fn write_output(path: &Path, contents: &[u8]) -> Result<(), TransformError> {
    let write = || -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)
    };
    write().map_err(|source| TransformError::Write { path: path.to_path_buf(), source })
}

/// Destination of a source file, optionally with a new extension.
pub(crate) fn output_path(dest: &Path, source: &SourceFile, extension: Option<&str>) -> PathBuf {
    let path = dest.join(&source.relative);
    match extension {
        Some(ext) => path.with_extension(ext),
        None => path,
    }
}

/// `<file>.map` next to an output file.
pub(crate) fn map_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".map");
    output.with_file_name(name)
}

/// File name of a path as a string, for source map references.
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}
