//! Style pipeline: Sass compilation, vendor prefixing and minification.
//!
//! Each non-partial `.scss` entry is compiled with grass, then handed to
//! lightningcss which adds prefixes for the configured browserslist targets
//! and prints the result, optionally minified, together with a source map.
//!
//! The pipeline is lenient: a file that fails to compile is logged and
//! recorded as a warning, and the remaining files are still processed.

use super::{file_name, map_path, output_path, write_output, PipelineOutput, TransformError};
use crate::build::SourceFile;
use crate::config::{OutputStyle, StyleConfig};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use std::path::{Path, PathBuf};

/// Compiled stylesheet ready to be written.
#[derive(Debug, Clone)]
pub struct CompiledStyle {
    /// Final CSS text, without the source map reference
    pub css: String,
    /// Source map JSON, when enabled
    pub map: Option<String>,
}

/// Whether a Sass file is a partial (`_name.scss`), only meant to be imported.
pub fn is_partial(path: &Path) -> bool {
    path.file_name().map(|name| name.to_string_lossy().starts_with('_')).unwrap_or(false)
}

/// Resolve browserslist queries into lightningcss targets.
pub fn resolve_targets(browsers: &[String]) -> Result<Targets, TransformError> {
    let browsers =
        Browsers::from_browserslist(browsers).map_err(|e| TransformError::Browsers(e.to_string()))?;
    Ok(Targets { browsers, ..Targets::default() })
}

/// Compile one Sass entry.
pub fn compile(
    path: &Path,
    config: &StyleConfig,
    load_paths: &[PathBuf],
    targets: Targets,
) -> Result<CompiledStyle, TransformError> {
    let options = grass::Options::default().style(grass::OutputStyle::Expanded).load_paths(load_paths);
    let css = grass::from_path(path, &options)
        .map_err(|e| TransformError::Sass { path: path.to_path_buf(), message: e.to_string() })?;

    prefix_and_print(path, &css, config, targets)
}

/// Run compiled CSS through lightningcss.
///
/// `path` names the original source in diagnostics and in the source map.
pub fn prefix_and_print(
    path: &Path,
    css: &str,
    config: &StyleConfig,
    targets: Targets,
) -> Result<CompiledStyle, TransformError> {
    let css_error =
        |message: String| TransformError::Css { path: path.to_path_buf(), message };

    let source_name = file_name(path);
    let mut stylesheet = StyleSheet::parse(
        css,
        ParserOptions { filename: source_name.clone(), ..ParserOptions::default() },
    )
    .map_err(|e| css_error(e.to_string()))?;

    stylesheet
        .minify(MinifyOptions { targets, ..MinifyOptions::default() })
        .map_err(|e| css_error(e.to_string()))?;

    let mut source_map = if config.source_maps {
        let mut map = SourceMap::new("/");
        map.add_source(&source_name);
        map.set_source_content(0, css).map_err(|e| css_error(format!("{:?}", e)))?;
        Some(map)
    } else {
        None
    };

    let printed = stylesheet
        .to_css(PrinterOptions {
            minify: config.output_style == OutputStyle::Compressed,
            source_map: source_map.as_mut(),
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| css_error(e.to_string()))?;

    let map = match source_map.as_mut() {
        Some(map) => Some(map.to_json(None).map_err(|e| TransformError::SourceMap {
            path: path.to_path_buf(),
            message: format!("{:?}", e),
        })?),
        None => None,
    };

    Ok(CompiledStyle { css: printed.code, map })
}

/// Compile and write one entry, returning the files written.
fn build_one(
    source: &SourceFile,
    dest: &Path,
    config: &StyleConfig,
    load_paths: &[PathBuf],
    targets: Targets,
) -> Result<Vec<PathBuf>, TransformError> {
    let mut compiled = compile(&source.path, config, load_paths, targets)?;
    let css_path = output_path(dest, source, Some("css"));

    let mut written = Vec::new();
    if let Some(map) = &compiled.map {
        let map_file = map_path(&css_path);
        compiled.css.push_str(&format!("\n/*# sourceMappingURL={} */\n", file_name(&map_file)));
        write_output(&css_path, compiled.css.as_bytes())?;
        write_output(&map_file, map.as_bytes())?;
        written.push(css_path);
        written.push(map_file);
    } else {
        write_output(&css_path, compiled.css.as_bytes())?;
        written.push(css_path);
    }
    Ok(written)
}

/// Run the style pipeline over discovered sources.
///
/// The directory of every entry is added to the Sass load paths after the
/// configured ones.
pub fn run(
    sources: &[SourceFile],
    dest: &Path,
    config: &StyleConfig,
    project_root: &Path,
) -> Result<PipelineOutput, TransformError> {
    let targets = resolve_targets(&config.browsers)?;
    let mut output = PipelineOutput::new();

    let configured: Vec<PathBuf> =
        config.load_paths.iter().map(|p| crate::config::loader::resolve_path(project_root, p)).collect();

    for source in sources.iter().filter(|s| !is_partial(&s.path)) {
        let mut load_paths = configured.clone();
        if let Some(parent) = source.path.parent() {
            load_paths.push(parent.to_path_buf());
        }

        match build_one(source, dest, config, &load_paths, targets) {
            Ok(mut written) => {
                tracing::debug!(file = %source.relative.display(), "compiled stylesheet");
                output.outputs.append(&mut written);
            }
            Err(e) => {
                tracing::error!("{}", e);
                output.warnings.push(e.to_string());
            }
        }
    }

    Ok(output)
}
