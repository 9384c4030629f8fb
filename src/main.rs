//! assetflow - Command-line tool for building front-end assets with live reload

use std::process::ExitCode;

use assetflow::cli;

fn main() -> ExitCode {
    cli::run()
}
