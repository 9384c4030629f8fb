//! Criterion benchmarks for assetflow critical paths
//!
//! Benchmarks the operations that dominate watch-mode rebuild latency:
//! - Include: directive expansion over a tree of script files
//! - Script: bundle, validate, minify and source map for one entry
//! - Style: Sass compilation plus prefixing and printing

use assetflow::config::{OutputStyle, ScriptConfig, StyleConfig};
use assetflow::transforms::{include, script, style};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// Test Data Generators
// =============================================================================

/// Write an entry script including `modules` library files.
fn make_script_tree(root: &Path, modules: usize) -> PathBuf {
    let lib = root.join("lib");
    fs::create_dir_all(&lib).unwrap();

    let mut entry = String::new();
    for i in 0..modules {
        let body: String = (0..20)
            .map(|j| format!("  var v{j} = a + {j}; // step {j}\n"))
            .collect();
        fs::write(
            lib.join(format!("mod{i}.js")),
            format!("function f{i}(a) {{\n{body}  return a * {i};\n}}\n"),
        )
        .unwrap();
        entry.push_str(&format!("//= include lib/mod{i}.js\n"));
    }
    entry.push_str("console.log(f0(1));\n");

    let path = root.join("script.js");
    fs::write(&path, entry).unwrap();
    path
}

/// Write a Sass entry with `rules` nested rules and one partial.
fn make_style_tree(root: &Path, rules: usize) -> PathBuf {
    fs::write(root.join("_vars.scss"), "$gap: 4px;\n$accent: #3366ff;\n").unwrap();
    let mut scss = String::from("@import 'vars';\n");
    for i in 0..rules {
        scss.push_str(&format!(
            ".card-{i} {{\n  display: flex;\n  user-select: none;\n  margin: $gap * {n};\n  \
             &:hover {{ color: darken($accent, 10%); }}\n}}\n",
            n = i % 8
        ));
    }
    let path = root.join("main.scss");
    fs::write(&path, scss).unwrap();
    path
}

// =============================================================================
// Script Benchmarks
// =============================================================================

fn bench_script(c: &mut Criterion) {
    let mut group = c.benchmark_group("script");
    let temp = TempDir::new().unwrap();

    for modules in [4usize, 32, 128] {
        let dir = temp.path().join(format!("tree{modules}"));
        let entry = make_script_tree(&dir, modules);

        group.bench_with_input(BenchmarkId::new("bundle", modules), &entry, |b, entry| {
            b.iter(|| include::bundle(black_box(entry), true).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("compile", modules), &entry, |b, entry| {
            let config = ScriptConfig::default();
            b.iter(|| script::compile(black_box(entry), &config).unwrap())
        });
    }

    group.finish();
}

// =============================================================================
// Style Benchmarks
// =============================================================================

fn bench_style(c: &mut Criterion) {
    let mut group = c.benchmark_group("style");
    let temp = TempDir::new().unwrap();
    let targets = style::resolve_targets(&StyleConfig::default().browsers).unwrap();

    for rules in [10usize, 200] {
        let dir = temp.path().join(format!("sheet{rules}"));
        fs::create_dir_all(&dir).unwrap();
        let entry = make_style_tree(&dir, rules);
        let load_paths = vec![dir.clone()];

        group.bench_with_input(BenchmarkId::new("compressed", rules), &entry, |b, entry| {
            let config = StyleConfig::default();
            b.iter(|| style::compile(black_box(entry), &config, &load_paths, targets).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("expanded", rules), &entry, |b, entry| {
            let config = StyleConfig { output_style: OutputStyle::Expanded, ..Default::default() };
            b.iter(|| style::compile(black_box(entry), &config, &load_paths, targets).unwrap())
        });
    }

    group.finish();
}

// =============================================================================
// Criterion Configuration
// =============================================================================

criterion_group!(benches, bench_script, bench_style);

criterion_main!(benches);
