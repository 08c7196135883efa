//! Buildmatrix CLI - build one artifact per toolchain/platform/flag combination

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use buildmatrix::MatrixError;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

/// 2 when the matrix data itself is inconsistent, 1 for everything else.
fn exit_code(err: &anyhow::Error) -> i32 {
    let inconsistent = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<MatrixError>())
        .any(MatrixError::is_config_error);
    if inconsistent {
        2
    } else {
        1
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("buildmatrix=debug")
        } else {
            EnvFilter::new("buildmatrix=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let global = cli.global();

    // Execute command
    match cli.command {
        Commands::Build(args) => commands::build::execute(args, &global),
        Commands::List(args) => commands::list::execute(args, &global),
        Commands::Toolchain(args) => commands::toolchain::execute(args, &global),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
