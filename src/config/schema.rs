//! Configuration schema types for `assetflow.toml`
//!
//! Defines the structure and validation rules for an asset project. Apart
//! from the project name every field has a default, so a file with just a
//! `[project]` section describes the conventional `src/` → `build/` layout.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::category::AssetCategory;

/// Project metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,
    /// Source root, watched in dev mode
    #[serde(default = "default_src")]
    pub src: PathBuf,
    /// Build output root, removed by the clean step
    #[serde(default = "default_out")]
    pub out: PathBuf,
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_out() -> PathBuf {
    PathBuf::from("build")
}

/// One row of the path table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    /// Glob selecting the sources fed to the pipeline
    pub src: String,
    /// Glob that triggers a rebuild in watch mode (defaults to `src`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch: Option<String>,
    /// Destination directory for the pipeline outputs
    pub dest: PathBuf,
}

impl PathEntry {
    fn new(src: &str, dest: &str) -> Self {
        Self { src: src.to_string(), watch: None, dest: PathBuf::from(dest) }
    }

    /// Glob used for change detection.
    pub fn watch_glob(&self) -> &str {
        self.watch.as_deref().unwrap_or(&self.src)
    }
}

fn default_html_paths() -> PathEntry {
    PathEntry::new("src/index.html", "build")
}

fn default_style_paths() -> PathEntry {
    PathEntry::new("src/scss/**/*.scss", "build/css")
}

fn default_script_paths() -> PathEntry {
    PathEntry {
        src: "src/js/script.js".to_string(),
        watch: Some("src/js/**/*.js".to_string()),
        dest: PathBuf::from("build/js"),
    }
}

fn default_font_paths() -> PathEntry {
    PathEntry::new("src/fonts/**/*", "build/fonts")
}

fn default_image_paths() -> PathEntry {
    PathEntry::new("src/img/**/*", "build/img")
}

/// Path table: where each category reads from and writes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_html_paths")]
    pub html: PathEntry,
    #[serde(default = "default_style_paths")]
    pub style: PathEntry,
    #[serde(default = "default_script_paths")]
    pub script: PathEntry,
    #[serde(default = "default_font_paths")]
    pub font: PathEntry,
    #[serde(default = "default_image_paths")]
    pub image: PathEntry,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            html: default_html_paths(),
            style: default_style_paths(),
            script: default_script_paths(),
            font: default_font_paths(),
            image: default_image_paths(),
        }
    }
}

impl PathsConfig {
    /// Get the path entry for a category.
    pub fn entry(&self, category: AssetCategory) -> &PathEntry {
        match category {
            AssetCategory::Html => &self.html,
            AssetCategory::Style => &self.style,
            AssetCategory::Script => &self.script,
            AssetCategory::Font => &self.font,
            AssetCategory::Image => &self.image,
        }
    }

    /// Get a mutable path entry for a category.
    pub fn entry_mut(&mut self, category: AssetCategory) -> &mut PathEntry {
        match category {
            AssetCategory::Html => &mut self.html,
            AssetCategory::Style => &mut self.style,
            AssetCategory::Script => &mut self.script,
            AssetCategory::Font => &mut self.font,
            AssetCategory::Image => &mut self.image,
        }
    }
}

/// CSS output style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    /// Minified output
    #[default]
    Compressed,
    /// Readable output
    Expanded,
}

/// Stylesheet pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    /// Browserslist queries used for vendor prefixing
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
    /// Output style
    #[serde(default)]
    pub output_style: OutputStyle,
    /// Write `.css.map` files next to the stylesheets
    #[serde(default = "default_true")]
    pub source_maps: bool,
    /// Extra directories searched by `@use` and `@import`
    #[serde(default)]
    pub load_paths: Vec<PathBuf>,
}

fn default_browsers() -> Vec<String> {
    vec!["last 100 versions".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            browsers: default_browsers(),
            output_style: OutputStyle::default(),
            source_maps: true,
            load_paths: Vec::new(),
        }
    }
}

/// Script pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Minify the bundle
    #[serde(default = "default_true")]
    pub minify: bool,
    /// Write `.js.map` files next to the bundles
    #[serde(default = "default_true")]
    pub source_maps: bool,
    /// Fail when an include directive matches no file
    #[serde(default)]
    pub strict_includes: bool,
    /// External transpiler command (program followed by arguments), fed
    /// the bundle on stdin
    #[serde(default)]
    pub transpile: Vec<String>,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self { minify: true, source_maps: true, strict_includes: false, transpile: Vec::new() }
    }
}

/// Image pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Re-encode PNG files at maximum compression
    #[serde(default = "default_true")]
    pub optimize_png: bool,
    /// Re-encode JPEG files at this quality (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_jpeg_quality() -> u8 {
    80
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self { optimize_png: true, jpeg_quality: default_jpeg_quality() }
    }
}

/// Dev server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind (0 picks a free port)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Inject the reload client into served HTML
    #[serde(default = "default_true")]
    pub inject_client: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), inject_client: true }
    }
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between rebuilds
    #[serde(default)]
    pub clear_screen: bool,
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), clear_screen: false }
    }
}

/// Complete assetflow.toml configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Project metadata
    pub project: ProjectConfig,
    /// Path table
    #[serde(default)]
    pub paths: PathsConfig,
    /// Stylesheet settings
    #[serde(default)]
    pub style: StyleConfig,
    /// Script settings
    #[serde(default)]
    pub script: ScriptConfig,
    /// Image settings
    #[serde(default)]
    pub image: ImageConfig,
    /// Dev server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "paths.style.src")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "assetflow.toml: '{}' {}", self.field, self.message)
    }
}

impl AssetConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: String, message: &str| {
            errors.push(ConfigValidationError { field, message: message.to_string() });
        };

        if self.project.name.is_empty() {
            push("project.name".to_string(), "must be a non-empty string");
        }

        if self.project.out.as_os_str().is_empty() {
            push("project.out".to_string(), "must be a non-empty path");
        }

        for category in AssetCategory::ALL {
            let entry = self.paths.entry(category);
            let key = category.label();
            if entry.src.trim().is_empty() {
                push(format!("paths.{}.src", key), "must contain a glob pattern");
            } else if let Err(e) = glob::Pattern::new(&entry.src) {
                push(format!("paths.{}.src", key), &format!("is not a valid glob: {}", e));
            }
            if let Some(watch) = &entry.watch {
                if let Err(e) = glob::Pattern::new(watch) {
                    push(format!("paths.{}.watch", key), &format!("is not a valid glob: {}", e));
                }
            }
            if entry.dest.as_os_str().is_empty() {
                push(format!("paths.{}.dest", key), "must be a non-empty path");
            }
        }

        if self.style.browsers.is_empty() {
            push("style.browsers".to_string(), "must contain at least one query");
        }

        if self.script.transpile.first().is_some_and(|program| program.trim().is_empty()) {
            push("script.transpile".to_string(), "must start with a program name");
        }

        if !(1..=100).contains(&self.image.jpeg_quality) {
            push("image.jpeg_quality".to_string(), "must be between 1 and 100");
        }

        if self.server.host.trim().is_empty() {
            push("server.host".to_string(), "must be a non-empty string");
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parse() {
        let toml = r#"
[project]
name = "site"
"#;
        let config: AssetConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.project.name, "site");
        assert_eq!(config.project.src, PathBuf::from("src"));
        assert_eq!(config.project.out, PathBuf::from("build"));
        assert_eq!(config.paths.html.src, "src/index.html");
        assert_eq!(config.paths.style.dest, PathBuf::from("build/css"));
        assert_eq!(config.paths.script.watch_glob(), "src/js/**/*.js");
        assert_eq!(config.paths.image.watch_glob(), "src/img/**/*");
        assert!(config.is_valid());
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[project]
name = "landing"
src = "assets"
out = "dist"

[paths.style]
src = "assets/styles/**/*.scss"
dest = "dist/styles"

[paths.script]
src = "assets/js/main.js"
watch = "assets/js/**/*.js"
dest = "dist/js"

[style]
browsers = ["last 2 versions", "not dead"]
output_style = "expanded"
source_maps = false
load_paths = ["node_modules"]

[script]
minify = false
strict_includes = true
transpile = ["npx", "babel", "--presets", "@babel/env"]

[image]
optimize_png = false
jpeg_quality = 70

[server]
host = "0.0.0.0"
port = 8080
inject_client = false

[watch]
debounce_ms = 250
clear_screen = true
"#;
        let config: AssetConfig = toml::from_str(toml).unwrap();

        assert_eq!(config.project.out, PathBuf::from("dist"));
        assert_eq!(config.paths.style.src, "assets/styles/**/*.scss");
        assert_eq!(config.paths.html.src, "src/index.html");
        assert_eq!(config.style.browsers.len(), 2);
        assert_eq!(config.style.output_style, OutputStyle::Expanded);
        assert!(!config.style.source_maps);
        assert_eq!(config.style.load_paths, vec![PathBuf::from("node_modules")]);
        assert!(!config.script.minify);
        assert!(config.script.source_maps);
        assert!(config.script.strict_includes);
        assert_eq!(config.script.transpile[1], "babel");
        assert!(!config.image.optimize_png);
        assert_eq!(config.image.jpeg_quality, 70);
        assert_eq!(config.server.port, 8080);
        assert!(!config.server.inject_client);
        assert_eq!(config.watch.debounce_ms, 250);
        assert!(config.watch.clear_screen);
    }

    #[test]
    fn test_unknown_output_style_rejected() {
        let toml = r#"
[project]
name = "site"

[style]
output_style = "nested"
"#;
        assert!(toml::from_str::<AssetConfig>(toml).is_err());
    }

    #[test]
    fn test_validation_empty_name() {
        let toml = r#"
[project]
name = ""
"#;
        let config: AssetConfig = toml::from_str(toml).unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "project.name"));
    }

    #[test]
    fn test_validation_empty_glob() {
        let toml = r#"
[project]
name = "site"

[paths.font]
src = ""
dest = "build/fonts"
"#;
        let config: AssetConfig = toml::from_str(toml).unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "paths.font.src"));
    }

    #[test]
    fn test_validation_bad_glob() {
        let toml = r#"
[project]
name = "site"

[paths.image]
src = "src/img/[**"
dest = "build/img"
"#;
        let config: AssetConfig = toml::from_str(toml).unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "paths.image.src"));
    }

    #[test]
    fn test_validation_jpeg_quality_range() {
        let toml = r#"
[project]
name = "site"

[image]
jpeg_quality = 0
"#;
        let config: AssetConfig = toml::from_str(toml).unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "image.jpeg_quality"));
    }

    #[test]
    fn test_validation_empty_browsers() {
        let toml = r#"
[project]
name = "site"

[style]
browsers = []
"#;
        let config: AssetConfig = toml::from_str(toml).unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "style.browsers"));
    }

    #[test]
    fn test_validation_error_display() {
        let error = ConfigValidationError {
            field: "server.host".to_string(),
            message: "must be a non-empty string".to_string(),
        };
        assert_eq!(error.to_string(), "assetflow.toml: 'server.host' must be a non-empty string");
    }

    #[test]
    fn test_entry_mut_updates_table() {
        let mut paths = PathsConfig::default();
        paths.entry_mut(AssetCategory::Font).dest = PathBuf::from("out/fonts");
        assert_eq!(paths.entry(AssetCategory::Font).dest, PathBuf::from("out/fonts"));
    }
}
