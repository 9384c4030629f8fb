//! Script pipeline: include expansion, validation, optional transpilation,
//! minification and source maps.
//!
//! Every entry is fully processed in memory before anything is written, so
//! a failing entry leaves the destination untouched.

use super::include::{self, Bundle, Segment};
use super::{file_name, map_path, output_path, write_output, PipelineOutput, TransformError};
use crate::build::SourceFile;
use crate::config::ScriptConfig;
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use parcel_sourcemap::{OriginalLocation, SourceMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A processed script ready to be written.
#[derive(Debug, Clone)]
pub struct CompiledScript {
    /// Output code, without the source map reference
    pub code: String,
    /// Source map JSON, when enabled
    pub map: Option<String>,
    /// Include warnings
    pub warnings: Vec<String>,
}

/// Output position to source position, all zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mapping {
    generated_line: u32,
    generated_column: u32,
    source: usize,
    original_line: u32,
    original_column: u32,
}

/// Check that `code` parses as JavaScript, returning the goal it parsed as.
///
/// Classic scripts are tried first, then modules; the error reported is the
/// one from the classic script parse.
pub fn validate(path: &Path, code: &str) -> Result<SourceType, TransformError> {
    let script_type = SourceType::default().with_module(false);
    let allocator = Allocator::default();
    let script = Parser::new(&allocator, code, script_type).parse();
    if script.errors.is_empty() && !script.panicked {
        return Ok(script_type);
    }

    let module_type = SourceType::default().with_module(true);
    let module_allocator = Allocator::default();
    let module = Parser::new(&module_allocator, code, module_type).parse();
    if module.errors.is_empty() && !module.panicked {
        return Ok(module_type);
    }

    let message = script
        .errors
        .first()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "parser aborted".to_string());
    Err(TransformError::Syntax { path: path.to_path_buf(), message })
}

/// Pipe `code` through an external command, returning its stdout.
pub fn transpile(path: &Path, command: &[String], code: &str) -> Result<String, TransformError> {
    let transpile_error =
        |message: String| TransformError::Transpile { path: path.to_path_buf(), message };

    let (program, args) = command
        .split_first()
        .ok_or_else(|| transpile_error("empty transpile command".to_string()))?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| transpile_error(format!("failed to start '{}': {}", program, e)))?;

    // stdin is fed from a thread: the child may fill stdout before reading it all.
    let writer = child.stdin.take().map(|mut stdin| {
        let input = code.to_string();
        std::thread::spawn(move || stdin.write_all(input.as_bytes()))
    });

    let output = child.wait_with_output().map_err(|e| transpile_error(e.to_string()))?;

    if let Some(handle) = writer {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(transpile_error(format!("writing stdin: {}", e))),
            Err(_) => return Err(transpile_error("stdin writer panicked".to_string())),
        }
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(transpile_error(format!("{}: {}", output.status, stderr.trim())));
    }

    String::from_utf8(output.stdout).map_err(|e| transpile_error(e.to_string()))
}

/// Minified code and its mappings into the bundle text.
struct Minified {
    code: String,
    /// (generated line, generated column, bundle line, bundle column)
    tokens: Vec<(u32, u32, u32, u32)>,
}

/// Compress and reprint `code` with oxc.
///
/// Identifiers keep their names: concatenated classic scripts share one
/// global scope, so renaming is left out.
fn minify(
    path: &Path,
    code: &str,
    source_type: SourceType,
    with_map: bool,
) -> Result<Minified, TransformError> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, code, source_type).parse();
    if parsed.panicked || !parsed.errors.is_empty() {
        let message = parsed
            .errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "parser aborted".to_string());
        return Err(TransformError::Syntax { path: path.to_path_buf(), message });
    }
    let mut program = parsed.program;

    Minifier::new(MinifierOptions::default()).build(&allocator, &mut program);

    let options = CodegenOptions {
        minify: true,
        source_map_path: with_map.then(|| path.to_path_buf()),
        ..CodegenOptions::default()
    };
    let printed = Codegen::new().with_options(options).build(&program);

    let tokens = printed
        .map
        .map(|map| {
            map.get_tokens()
                .map(|t| (t.get_dst_line(), t.get_dst_col(), t.get_src_line(), t.get_src_col()))
                .collect()
        })
        .unwrap_or_default();

    Ok(Minified { code: printed.code, tokens })
}

/// Find the source and line of a bundle line.
///
/// Segments are joined with `\n` in [`Bundle::code`], so segment `n` starts
/// right after the lines of the segments before it.
fn locate(segments: &[Segment], bundle_line: u32) -> Option<(usize, u32)> {
    let mut start = 0u32;
    for segment in segments {
        let count = segment.text.split('\n').count() as u32;
        if bundle_line < start + count {
            return Some((segment.source, segment.line + bundle_line - start));
        }
        start += count;
    }
    None
}

/// One mapping per line of the unminified bundle.
fn line_mappings(segments: &[Segment]) -> Vec<Mapping> {
    let mut mappings = Vec::new();
    for segment in segments {
        for offset in 0..segment.text.split('\n').count() as u32 {
            mappings.push(Mapping {
                generated_line: mappings.len() as u32,
                generated_column: 0,
                source: segment.source,
                original_line: segment.line + offset,
                original_column: 0,
            });
        }
    }
    mappings
}

/// Translate minifier tokens from bundle positions to source positions.
fn token_mappings(segments: &[Segment], tokens: &[(u32, u32, u32, u32)]) -> Vec<Mapping> {
    tokens
        .iter()
        .filter_map(|&(generated_line, generated_column, bundle_line, column)| {
            let (source, original_line) = locate(segments, bundle_line)?;
            Some(Mapping {
                generated_line,
                generated_column,
                source,
                original_line,
                original_column: column,
            })
        })
        .collect()
}

/// Name a bundle source as seen from the output map.
fn source_name(entry_dir: &Path, source: &Path) -> String {
    source
        .strip_prefix(entry_dir)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| source.display().to_string())
}

fn build_map(path: &Path, bundle: &Bundle, mappings: &[Mapping]) -> Result<String, TransformError> {
    let map_error = |message: String| TransformError::SourceMap { path: path.to_path_buf(), message };

    let entry_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let mut map = SourceMap::new("/");
    for (index, source) in bundle.sources.iter().enumerate() {
        map.add_source(&source_name(entry_dir, source));
        map.set_source_content(index, &bundle.contents[index])
            .map_err(|e| map_error(format!("{:?}", e)))?;
    }
    for mapping in mappings {
        map.add_mapping(
            mapping.generated_line,
            mapping.generated_column,
            Some(OriginalLocation::new(
                mapping.original_line,
                mapping.original_column,
                mapping.source as u32,
                None,
            )),
        );
    }
    map.to_json(None).map_err(|e| map_error(format!("{:?}", e)))
}

/// Run one entry through every stage.
///
/// Minified output is parsed again before it is accepted, so a printer
/// defect fails the step instead of shipping a broken script.
pub fn compile(path: &Path, config: &ScriptConfig) -> Result<CompiledScript, TransformError> {
    let mut bundle = include::bundle(path, config.strict_includes)?;
    let mut source_type = validate(path, &bundle.code())?;

    if !config.transpile.is_empty() {
        let transpiled = transpile(path, &config.transpile, &bundle.code())?;
        source_type = validate(path, &transpiled)?;
        bundle.segments = vec![Segment { source: 0, line: 0, text: transpiled }];
    }

    let code = bundle.code();
    let (code, mappings) = if config.minify {
        let minified = minify(path, &code, source_type, config.source_maps)?;
        validate(path, &minified.code)?;
        let mappings = token_mappings(&bundle.segments, &minified.tokens);
        (minified.code, mappings)
    } else {
        let mappings = line_mappings(&bundle.segments);
        (code, mappings)
    };

    let map = if config.source_maps { Some(build_map(path, &bundle, &mappings)?) } else { None };

    Ok(CompiledScript { code, map, warnings: bundle.warnings })
}

/// Run the script pipeline over discovered entries.
pub fn run(
    sources: &[SourceFile],
    dest: &Path,
    config: &ScriptConfig,
) -> Result<PipelineOutput, TransformError> {
    let mut compiled = Vec::with_capacity(sources.len());
    for source in sources {
        compiled.push((output_path(dest, source, Some("js")), compile(&source.path, config)?));
    }

    let mut output = PipelineOutput::new();
    for (js_path, script) in compiled {
        let mut written: Vec<PathBuf> = Vec::new();
        let mut code = script.code;
        if let Some(map) = &script.map {
            let map_file = map_path(&js_path);
            code.push_str(&format!("\n//# sourceMappingURL={}\n", file_name(&map_file)));
            write_output(&js_path, code.as_bytes())?;
            write_output(&map_file, map.as_bytes())?;
            written.push(js_path);
            written.push(map_file);
        } else {
            code.push('\n');
            write_output(&js_path, code.as_bytes())?;
            written.push(js_path);
        }
        output.outputs.append(&mut written);
        output.warnings.extend(script.warnings);
    }

    Ok(output)
}
