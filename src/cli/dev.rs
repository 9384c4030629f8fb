//! Development commands: reload server plus watch loop (watch, dev)

use std::path::Path;
use std::process::ExitCode;

use super::{load_context, ServerArgs, EXIT_ERROR, EXIT_SUCCESS};
use crate::build::BuildPipeline;
use crate::config::loader::CliOverrides;
use crate::server::{ReloadHub, ReloadServer};

/// Serve the build directory and rebuild on change.
///
/// With `initial_build`, a full production build runs first and a failure
/// aborts before anything is served.
pub fn run_watch(
    config: Option<&Path>,
    server_args: &ServerArgs,
    initial_build: bool,
    verbose: bool,
) -> ExitCode {
    let overrides = CliOverrides {
        port: server_args.port,
        host: server_args.host.clone(),
        ..Default::default()
    };
    let context = match load_context(config, &overrides, verbose) {
        Ok(context) => context,
        Err(code) => return ExitCode::from(code),
    };

    if initial_build {
        let result = BuildPipeline::new(context.clone()).build();
        if !result.is_success() {
            eprintln!("{}", result.summary());
            return ExitCode::from(EXIT_ERROR);
        }
        println!("{}", result.summary());
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let hub = ReloadHub::default();
    let server = match runtime.block_on(ReloadServer::bind(
        &context.config().server,
        context.out_dir(),
        hub.clone(),
    )) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    println!("Serving {} at {}", context.out_dir().display(), server.url());
    println!("Press Ctrl+C to stop");
    println!();

    runtime.spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!("reload server exited: {}", e);
        }
    });

    match crate::watch::watch_and_rebuild(context, hub) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Watch error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
