//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;
mod dev;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::build::BuildContext;
use crate::category::AssetCategory;
use crate::config::loader::{find_config, merge_cli_overrides, CliOverrides};
use crate::config::{default_config, load_config, ConfigError};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_CONFIG: u8 = 2;

/// assetflow - Build front-end assets and serve them with live reload
#[derive(Parser)]
#[command(name = "assetflow")]
#[command(about = "assetflow - Build front-end assets (html, scss, js, fonts, images) with live reload")]
#[command(version)]
pub struct Cli {
    /// Path to assetflow.toml (default: search upward from the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to run (default: dev)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Remove the build directory
    Clean,

    /// Copy HTML pages into the build directory
    Html,

    /// Compile, prefix and minify stylesheets
    #[command(visible_alias = "style")]
    Scss,

    /// Bundle, validate and minify scripts
    #[command(name = "js-prod", visible_aliases = ["jsProd", "js"])]
    JsProd,

    /// Copy fonts into the build directory
    Fonts,

    /// Recompress images into the build directory
    #[command(visible_alias = "images")]
    Img,

    /// Production build: clean, then every pipeline in order
    Build {
        /// Show the build plan without running it
        #[arg(long)]
        dry_run: bool,

        /// Override the output directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Serve the build directory and rebuild on changes
    Watch {
        #[command(flatten)]
        server: ServerArgs,
    },

    /// Production build, then watch (the default command)
    Dev {
        #[command(flatten)]
        server: ServerArgs,
    },
}

/// Reload server overrides.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServerArgs {
    /// Port for the reload server
    #[arg(long)]
    pub port: Option<u16>,

    /// Host for the reload server
    #[arg(long)]
    pub host: Option<String>,
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `info`, or `debug` when verbose.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load the configuration and resolve the project root.
///
/// On failure the error is printed and the exit code to use is returned.
pub(crate) fn load_context(
    config_path: Option<&Path>,
    overrides: &CliOverrides,
    verbose: bool,
) -> Result<BuildContext, u8> {
    let cwd = std::env::current_dir().unwrap_or_default();
    let found = config_path.map(Path::to_path_buf).or_else(find_config);

    let (mut config, project_root) = match found {
        Some(config_path) => {
            if verbose {
                println!("Using config: {}", config_path.display());
            }
            let config = load_config(Some(config_path.as_path())).map_err(|e| {
                eprintln!("Error loading config: {}", e);
                match e {
                    ConfigError::Io(_) => EXIT_ERROR,
                    _ => EXIT_INVALID_CONFIG,
                }
            })?;
            let root = match config_path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
                _ => cwd,
            };
            (config, root)
        }
        None => {
            if verbose {
                println!("No assetflow.toml found, using defaults");
            }
            (default_config(), cwd)
        }
    };

    merge_cli_overrides(&mut config, overrides);
    Ok(BuildContext::new(config, project_root).with_verbose(verbose))
}

/// Run the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    let verbose = cli.verbose;

    match cli.command.unwrap_or(Commands::Dev { server: ServerArgs::default() }) {
        Commands::Clean => build::run_clean(config, verbose),
        Commands::Html => build::run_category(config, AssetCategory::Html, verbose),
        Commands::Scss => build::run_category(config, AssetCategory::Style, verbose),
        Commands::JsProd => build::run_category(config, AssetCategory::Script, verbose),
        Commands::Fonts => build::run_category(config, AssetCategory::Font, verbose),
        Commands::Img => build::run_category(config, AssetCategory::Image, verbose),
        Commands::Build { dry_run, out } => build::run_build(config, out, dry_run, verbose),
        Commands::Watch { server } => dev::run_watch(config, &server, false, verbose),
        Commands::Dev { server } => dev::run_watch(config, &server, true, verbose),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_is_dev() {
        let cli = Cli::try_parse_from(["assetflow"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_task_aliases() {
        for name in ["js-prod", "jsProd", "js"] {
            let cli = Cli::try_parse_from(["assetflow", name]).unwrap();
            assert!(matches!(cli.command, Some(Commands::JsProd)));
        }
        let cli = Cli::try_parse_from(["assetflow", "style"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Scss)));
        let cli = Cli::try_parse_from(["assetflow", "images"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Img)));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["assetflow", "build", "--dry-run", "-v", "--config", "x.toml"])
                .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Some(Commands::Build { dry_run: true, .. })));
    }

    #[test]
    fn test_watch_server_args() {
        let cli = Cli::try_parse_from(["assetflow", "watch", "--port", "8080"]).unwrap();
        match cli.command {
            Some(Commands::Watch { server }) => assert_eq!(server.port, Some(8080)),
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_load_context_invalid_config_exit_code() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("assetflow.toml");
        std::fs::write(&path, "[project]\nname = \"site\"\n[image]\njpeg_quality = 0\n").unwrap();

        let result = load_context(Some(&path), &CliOverrides::default(), false);
        assert_eq!(result.err(), Some(EXIT_INVALID_CONFIG));
    }

    #[test]
    fn test_load_context_uses_config_dir_as_root() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("assetflow.toml");
        std::fs::write(&path, "[project]\nname = \"site\"\n").unwrap();

        let ctx = load_context(Some(&path), &CliOverrides::default(), false).unwrap();
        assert_eq!(ctx.project_root(), temp.path());
        assert_eq!(ctx.config().project.name, "site");
    }
}
